//! Final assembly of the emitted buckets into one Python program.

use super::Compiler;
use crate::symbols::{Section, SymbolKind};

/// Names the generated program imports from the runtime module.
pub const RUNTIME_NAMES: &[&str] = &[
    "AwkpyRuntimeVarOwner",
    "AwkpyRuntimeWrapper",
    "AwkNext",
    "AwkNextFile",
    "AwkExit",
    "AwkEmptyVar",
    "AwkEmptyVarInstance",
];

/// Python module the generated program imports.
pub const RUNTIME_MODULE: &str = "awkpy_runtime";

/// Class the generated program defines.
pub const PROGRAM_CLASS: &str = "AwkPyTranslated";

fn indented(depth: usize, line: &str) -> String {
    if line.is_empty() {
        String::new()
    } else {
        format!("{}{}", "    ".repeat(depth), line)
    }
}

impl Compiler {
    pub(crate) fn assemble(&self) -> String {
        let mut lines: Vec<String> = vec!["#! /usr/bin/env python3".to_string()];
        lines.push(format!("# Translated from AWK by awkpy {}", env!("CARGO_PKG_VERSION")));
        lines.extend(self.headers.iter().cloned());
        lines.push("import re".to_string());
        lines.push("import sys".to_string());
        for library in &self.imports {
            lines.push(format!("import {}", library));
        }
        lines.push("from collections import defaultdict".to_string());
        lines.push(format!("from {} import {}", RUNTIME_MODULE, RUNTIME_NAMES.join(", ")));
        lines.push(String::new());
        lines.push(String::new());
        lines.push(format!("class {}(AwkpyRuntimeWrapper):", PROGRAM_CLASS));

        lines.extend(self.out.functions().iter().map(|l| indented(1, l)));

        lines.push(indented(1, "def __init__(self):"));
        lines.push(indented(2, "super().__init__()"));
        if self.has_mainloop {
            lines.push(indented(2, "self._has_mainloop = True"));
        }
        for (_, symbol) in self.symbols.iter() {
            let initialized = match &symbol.kind {
                SymbolKind::Variable(v) => !v.built_in,
                SymbolKind::Regex => true,
                _ => false,
            };
            if initialized && !symbol.init.is_empty() {
                lines.push(indented(2, &format!("{} = {}", symbol.emit, symbol.init)));
            }
        }

        for section in Section::ALL {
            let body = self.out.section(section);
            if body.is_empty() {
                continue;
            }
            lines.push(String::new());
            lines.push(indented(1, &format!("def {}(self):", section.method_name())));
            if section == Section::MainLoop {
                lines.push(indented(2, "try:"));
                lines.extend(body.iter().map(|l| indented(3, l)));
                lines.push(indented(2, "except AwkNext:"));
                lines.push(indented(3, "pass"));
            } else {
                lines.extend(body.iter().map(|l| indented(2, l)));
            }
        }

        lines.push(String::new());
        lines.push(String::new());
        lines.push(format!("runtime = {}()", PROGRAM_CLASS));
        lines.push("sys.exit(runtime._run(sys.argv))".to_string());
        let mut program = lines.join("\n");
        program.push('\n');
        program
    }
}
