//! Command-line triage.
//!
//! Splits the `awkpy` command line into the arguments the compiler consumes
//! (sources and presets) and the ones handed untouched to the generated
//! program's own `_run`.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Help,
    Version,
    Run,
}

/// The command line, sorted by consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTriage {
    /// `-e`/`-f`/`-i` pairs in the form `Compiler::compile_args` accepts.
    pub compiler_args: Vec<String>,
    /// `name=value` presets, in command-line order.
    pub variable_args: Vec<String>,
    /// Everything the generated program sees as its own arguments.
    pub runtime_args: Vec<String>,
    pub output: Option<PathBuf>,
    pub debug: bool,
    pub mode: Mode,
}

impl Default for ArgTriage {
    fn default() -> Self {
        Self {
            compiler_args: Vec::new(),
            variable_args: Vec::new(),
            runtime_args: Vec::new(),
            output: None,
            debug: false,
            mode: Mode::Run,
        }
    }
}

impl ArgTriage {
    /// True once some program text has been named.
    pub fn has_program(&self) -> bool {
        self.compiler_args
            .iter()
            .any(|arg| arg == "-e" || arg == "-f")
    }
}

/// Option value, either attached (`-ffile`) or the next argument.
fn option_value<'a>(
    flag: &str,
    attached: &'a str,
    args: &'a [String],
    i: &mut usize,
) -> Result<&'a str> {
    if !attached.is_empty() {
        return Ok(attached);
    }
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| Error::usage(format!("option {} requires an argument", flag)))
}

pub fn triage(args: &[String]) -> Result<ArgTriage> {
    let mut triage = ArgTriage::default();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();

        if arg == "--help" || arg == "-h" {
            triage.mode = Mode::Help;
            return Ok(triage);
        }

        if arg == "--version" {
            triage.mode = Mode::Version;
            return Ok(triage);
        }

        if arg == "--" {
            triage.runtime_args.extend(args[i + 1..].iter().cloned());
            break;
        }

        if arg == "-Wr" {
            triage.runtime_args.extend(args[i..].iter().cloned());
            break;
        }

        if arg == "-d" {
            triage.debug = true;
        } else if let Some(rest) = arg.strip_prefix("-e") {
            let value = option_value("-e", rest, args, &mut i)?;
            triage.compiler_args.extend(["-e".to_string(), value.to_string()]);
        } else if let Some(rest) = arg.strip_prefix("-f") {
            let value = option_value("-f", rest, args, &mut i)?;
            triage.compiler_args.extend(["-f".to_string(), value.to_string()]);
        } else if let Some(rest) = arg.strip_prefix("-i") {
            let value = option_value("-i", rest, args, &mut i)?;
            triage.compiler_args.extend(["-i".to_string(), value.to_string()]);
        } else if let Some(rest) = arg.strip_prefix("-v") {
            let value = option_value("-v", rest, args, &mut i)?;
            if !value.contains('=') {
                return Err(Error::usage(format!("invalid variable assignment: {}", value)));
            }
            triage.variable_args.push(value.to_string());
        } else if let Some(rest) = arg.strip_prefix("-F") {
            let value = option_value("-F", rest, args, &mut i)?;
            triage.variable_args.push(format!("FS={}", value));
        } else if let Some(rest) = arg.strip_prefix("-o") {
            let value = option_value("-o", rest, args, &mut i)?;
            triage.output = Some(PathBuf::from(value));
        } else if arg.starts_with('-') && arg != "-" {
            return Err(Error::usage(format!("unknown option: {}", arg)));
        } else if !triage.has_program() {
            // First operand is the program; the rest belong to it.
            triage.compiler_args.extend(["-e".to_string(), arg.to_string()]);
            triage.runtime_args.extend(args[i + 1..].iter().cloned());
            break;
        } else {
            triage.runtime_args.extend(args[i..].iter().cloned());
            break;
        }

        i += 1;
    }

    if triage.mode == Mode::Run && !triage.has_program() {
        return Err(Error::usage("no program provided"));
    }
    Ok(triage)
}
