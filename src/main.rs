use std::env;
use std::process;

use awkpy::args::{self, Mode};
use awkpy::{Compiler, Config, runner};

fn main() {
    let args: Vec<String> = env::args().collect();

    match run(&args[1..]) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("awkpy: {}", e);
            process::exit(2);
        }
    }
}

fn run(args: &[String]) -> Result<i32, Box<dyn std::error::Error>> {
    let triage = args::triage(args)?;

    match triage.mode {
        Mode::Help => {
            print_help();
            return Ok(0);
        }
        Mode::Version => {
            println!("awkpy {}", env!("CARGO_PKG_VERSION"));
            return Ok(0);
        }
        Mode::Run => {}
    }

    let config = Config::from_env();
    let mut compiler = Compiler::with_options(config.compile_options().debug(triage.debug))?;

    // Presets first so the program sees them as already-classified scalars
    for assignment in &triage.variable_args {
        compiler.preset_variable(assignment)?;
    }
    compiler.compile_args(&triage.compiler_args)?;
    let program = compiler.finish()?;

    for diagnostic in compiler.diagnostics() {
        eprintln!("awkpy: warning: {}", diagnostic);
    }

    if triage.debug {
        eprint!("{}", program);
    }

    if let Some(path) = &triage.output {
        runner::write_program(path, &program)?;
        return Ok(0);
    }

    Ok(runner::run(&config, &program, &triage.runtime_args)?)
}

fn print_help() {
    println!(
        r#"Usage: awkpy [OPTIONS] 'program' [file ...]
       awkpy [OPTIONS] -f progfile [file ...]

Translates an AWK program to Python 3 and runs it, or writes it out with -o.

Options:
  -e src         Add program text
  -f progfile    Add a program source file
  -i incfile     Include a source file once, however often it is named
  -v var=val     Preset a variable (ns::var=val for a namespace)
  -F fs          Set the field separator to fs
  -o file        Write the generated Python to file instead of running it
  -d             Dump the generated Python to stderr
  --             Pass every remaining argument to the program
  -Wr            Pass this and every remaining argument to the program
  --version      Print version information
  --help         Print this help message

Environment:
  AWKPY_PYTHON       Python interpreter (default python3)
  AWKPY_RUNTIME_DIR  Directory holding awkpy_runtime.py
  AWKPATH            Search path for -f, -i and @include

Examples:
  awkpy '{{ print $1 }}' file.txt
  awkpy -F: '{{ print $1 }}' /etc/passwd
  awkpy -o hello.py 'BEGIN {{ print "Hello" }}'
"#
    );
}
