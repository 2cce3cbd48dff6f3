#![no_main]

use libfuzzer_sys::fuzz_target;
use awkpy::lexer::{Lexer, SourceFiles, TokenPatterns};
use awkpy::namespace::NamespaceRegistry;
use awkpy::symbols::SymbolTable;

fuzz_target!(|data: &str| {
    let Ok(patterns) = TokenPatterns::new() else {
        return;
    };
    let mut symbols = SymbolTable::new();
    let mut namespaces = NamespaceRegistry::new();
    let mut files = SourceFiles::default();
    let mut lexer = Lexer::new(&patterns, &mut symbols, &mut namespaces, &mut files, &[]);
    // We don't care if it fails, just that it doesn't panic or hang
    let _ = lexer.tokenize(data);
});
