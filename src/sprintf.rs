//! printf-style format compilation.
//!
//! A format given as a string literal is compiled once into a Python
//! `str.format` template plus a list of coerced argument expressions. Any other
//! format is handed to the runtime's `sprintf` at run time. Both paths share the
//! conversion table below so their output agrees.

use regex::Regex;

use crate::error::Result;

/// How one conversion character is rendered in Python.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub letter: char,
    /// Python expression template; `{}` is replaced by the argument expression.
    pub recipe: &'static str,
    /// Presentation type appended to a `str.format` spec.
    pub format_suffix: &'static str,
    pub default_precision: Option<&'static str>,
}

impl Conversion {
    pub fn apply(&self, argument: &str) -> String {
        self.recipe.replace("{}", argument)
    }
}

const fn conv(
    letter: char,
    recipe: &'static str,
    format_suffix: &'static str,
    default_precision: Option<&'static str>,
) -> Conversion {
    Conversion {
        letter,
        recipe,
        format_suffix,
        default_precision,
    }
}

/// Every conversion character AWK's printf accepts.
pub const CONVERSIONS: &[Conversion] = &[
    conv('a', "hex(float({}))[2:]", "", None),
    conv('A', "hex(float({}))[2:].upper()", "", None),
    conv('c', "str({})[0]", "", None),
    conv('d', "int({})", "", None),
    conv('i', "int({})", "", None),
    conv('u', "int({})", "", None),
    conv('e', "float({})", "e", Some("6")),
    conv('E', "float({})", "E", Some("6")),
    conv('f', "float({})", "f", Some("6")),
    conv('F', "float({})", "F", Some("6")),
    conv('g', "self._format_g({})", "", None),
    conv('G', "self._format_g({}).upper()", "", None),
    conv('o', "oct(int({}))[2:]", "", None),
    conv('s', "str({})", "", None),
    conv('x', "hex(int({}))[2:]", "", None),
    conv('X', "hex(int({}))[2:].upper()", "", None),
];

/// Recipe used for `*` width and precision arguments.
const STAR: Conversion = conv('d', "int({})", "", None);

pub fn conversion(letter: char) -> Option<&'static Conversion> {
    CONVERSIONS.iter().find(|c| c.letter == letter)
}

const FIELD_SPEC: &str = r"([0-9]*\$)?([-+ 0'#])?([1-9*][0-9]*)?([.][0-9*]+)?([aAcdeEfFgGiosuxX])";

/// Compiles literal formats; holds the two scanning patterns.
#[derive(Debug, Clone)]
pub struct FormatCompiler {
    pieces: Regex,
    field: Regex,
}

/// Result of compiling one sprintf/printf call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFormat {
    pub code: String,
    /// Problems worth reporting that did not stop compilation.
    pub warnings: Vec<String>,
}

impl FormatCompiler {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pieces: Regex::new(&format!(r"([\\%]%)|([{{}}])|(%{})", FIELD_SPEC))?,
            field: Regex::new(&format!("^{}$", FIELD_SPEC))?,
        })
    }

    /// Compile `sprintf(args[0], args[1..])` where `args` are already-emitted
    /// Python expressions.
    pub fn compile(&self, args: &[String]) -> CompiledFormat {
        let Some((format, rest)) = args.split_first() else {
            return CompiledFormat {
                code: "\"\"".to_string(),
                warnings: vec!["sprintf called without a format".to_string()],
            };
        };
        if !is_string_literal(format) {
            return CompiledFormat {
                code: format!("self.sprintf({})", args.join(", ")),
                warnings: Vec::new(),
            };
        }
        self.compile_literal(format, rest)
    }

    fn compile_literal(&self, format: &str, rest: &[String]) -> CompiledFormat {
        let mut builder = FormatBuilder::new(rest);
        let mut template = String::with_capacity(format.len() + 8);
        let mut doubled_braces = false;
        let mut last = 0;

        for m in self.pieces.find_iter(format) {
            template.push_str(&format[last..m.start()]);
            last = m.end();
            let token = m.as_str();
            match token {
                "%%" | "\\%" => template.push('%'),
                "{" => {
                    template.push_str("{{");
                    doubled_braces = true;
                }
                "}" => {
                    template.push_str("}}");
                    doubled_braces = true;
                }
                _ => match self.field.captures(&token[1..]) {
                    Some(caps) => {
                        let part = |i: usize| caps.get(i).map_or("", |g| g.as_str());
                        let spec = Specifier {
                            parameter: part(1),
                            flags: part(2),
                            width: part(3),
                            precision: part(4),
                            letter: part(5).chars().next().unwrap_or('s'),
                        };
                        template.push_str(&builder.field(&spec));
                    }
                    None => {
                        builder
                            .warnings
                            .push(format!("internal error, cannot re-match format specifier {}", token));
                        template.push_str(token);
                    }
                },
            }
        }
        template.push_str(&format[last..]);

        let FormatBuilder {
            outputs, warnings, ..
        } = builder;
        let code = if outputs.is_empty() {
            if doubled_braces {
                format!("{}.format()", template)
            } else {
                template
            }
        } else {
            format!("{}.format({})", template, outputs.join(", "))
        };
        CompiledFormat { code, warnings }
    }
}

fn is_string_literal(text: &str) -> bool {
    text.len() >= 2 && text.starts_with('"') && text.ends_with('"')
}

struct Specifier<'s> {
    parameter: &'s str,
    flags: &'s str,
    width: &'s str,
    precision: &'s str,
    letter: char,
}

/// Tracks which source argument feeds which `str.format` slot.
struct FormatBuilder<'a> {
    inputs: &'a [String],
    next_input: usize,
    /// (input index, conversion letter) -> output slot
    aliases: Vec<((usize, char), usize)>,
    outputs: Vec<String>,
    warnings: Vec<String>,
}

impl<'a> FormatBuilder<'a> {
    fn new(inputs: &'a [String]) -> Self {
        Self {
            inputs,
            next_input: 0,
            aliases: Vec::new(),
            outputs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn take_input(&mut self) -> usize {
        let n = self.next_input;
        self.next_input += 1;
        n
    }

    fn argument(&mut self, input: usize) -> String {
        match self.inputs.get(input) {
            Some(arg) => arg.clone(),
            None => {
                self.warnings
                    .push(format!("format refers to missing argument {}", input + 1));
                "AwkEmptyVarInstance".to_string()
            }
        }
    }

    fn slot(&mut self, input: usize, conversion: &Conversion) -> usize {
        let key = (input, conversion.letter);
        if let Some((_, slot)) = self.aliases.iter().find(|(k, _)| *k == key) {
            return *slot;
        }
        let argument = self.argument(input);
        self.outputs.push(conversion.apply(&argument));
        let slot = self.outputs.len() - 1;
        self.aliases.push((key, slot));
        slot
    }

    fn field(&mut self, spec: &Specifier<'_>) -> String {
        let Some(conversion) = conversion(spec.letter) else {
            self.warnings
                .push(format!("unknown conversion %{}", spec.letter));
            return String::new();
        };
        for flag in spec.flags.chars().filter(|f| *f != '-') {
            self.warnings
                .push(format!("printf flag '{}' is not supported and was ignored", flag));
        }

        let precision = if spec.precision.is_empty() {
            conversion.default_precision.unwrap_or("")
        } else {
            spec.precision.trim_start_matches('.')
        };

        // Python rejects a precision on integers; there it is a minimum digit
        // count, rendered by %-formatting before alignment.
        let integer = matches!(conversion.letter, 'd' | 'i' | 'u' | 'o' | 'x' | 'X');
        let mut digits = None;

        // width and precision may consume arguments ahead of the value itself
        let mut width = String::new();
        if !spec.width.is_empty() || !precision.is_empty() {
            width = match spec.width {
                "" if integer => String::new(),
                "" => "0".to_string(),
                "*" => {
                    let input = self.take_input();
                    format!("{{{}}}", self.slot(input, &STAR))
                }
                w => w.to_string(),
            };
            if integer && !precision.is_empty() {
                let letter = match conversion.letter {
                    'd' | 'i' | 'u' => 'd',
                    other => other,
                };
                digits = Some(if precision == "*" {
                    let input = self.take_input();
                    (format!("%.*{}", letter), Some(self.argument(input)))
                } else {
                    (format!("%.{}{}", precision, letter), None)
                });
            } else if !precision.is_empty() {
                width.push('.');
                if precision == "*" {
                    let input = self.take_input();
                    width.push_str(&format!("{{{}}}", self.slot(input, &STAR)));
                } else {
                    width.push_str(precision);
                }
            }
        }

        let input = if spec.parameter.is_empty() {
            self.take_input()
        } else {
            match spec.parameter.trim_end_matches('$').parse::<usize>() {
                Ok(n) if n > 0 => n - 1,
                _ => {
                    self.warnings
                        .push(format!("bad positional reference {}", spec.parameter));
                    0
                }
            }
        };
        let (slot, suffix) = match digits {
            Some((format, count)) => {
                let argument = self.argument(input);
                self.outputs.push(match count {
                    Some(count) => format!("\"{}\" % (int({}), int({}))", format, count, argument),
                    None => format!("\"{}\" % int({})", format, argument),
                });
                (self.outputs.len() - 1, "")
            }
            None => (self.slot(input, conversion), conversion.format_suffix),
        };

        if width.is_empty() {
            format!("{{{}}}", slot)
        } else {
            let align = if spec.flags.contains('-') { '<' } else { '>' };
            format!("{{{}:{}{}{}}}", slot, align, width, suffix)
        }
    }
}
