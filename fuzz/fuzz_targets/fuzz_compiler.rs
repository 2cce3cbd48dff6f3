#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use awkpy::{Compiler, Source};

/// A compilation: presets followed by program segments.
#[derive(Debug, Arbitrary)]
struct Input<'a> {
    presets: Vec<&'a str>,
    segments: Vec<&'a str>,
}

fuzz_target!(|input: Input<'_>| {
    // Limit sizes to prevent hangs
    if input.segments.iter().map(|s| s.len()).sum::<usize>() > 10000 {
        return;
    }

    let Ok(mut compiler) = Compiler::new() else {
        return;
    };
    for preset in input.presets {
        let _ = compiler.preset_variable(preset);
    }
    for segment in input.segments {
        // @include would reach the filesystem
        if segment.contains("@include") {
            return;
        }
        if compiler.add_source(Source::Inline(segment)).is_err() {
            return;
        }
    }
    let _ = compiler.finish();
});
