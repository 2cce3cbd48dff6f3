//! Hands a generated program to python.

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

use crate::config::Config;
use crate::error::Result;

/// File name the program gets inside the scratch directory.
const SCRIPT_NAME: &str = "awkpy_program.py";

/// Writes `program` to `path`, executable by everyone on unix.
pub fn write_program(path: &Path, program: &str) -> Result<()> {
    fs::write(path, program)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Builds the python invocation for a program already on disk.
pub fn command(config: &Config, script: &Path, runtime_args: &[String]) -> Result<Command> {
    let mut command = Command::new(&config.python);
    command.arg(script).args(runtime_args);
    if let Some(dir) = &config.runtime_dir {
        let mut paths = vec![dir.clone()];
        if let Some(existing) = env::var_os("PYTHONPATH") {
            paths.extend(env::split_paths(&existing));
        }
        command.env("PYTHONPATH", env::join_paths(paths).map_err(std::io::Error::other)?);
    }
    Ok(command)
}

/// Runs `program` with python and returns its exit code.
///
/// A process killed by a signal reports 2.
pub fn run(config: &Config, program: &str, runtime_args: &[String]) -> Result<i32> {
    let dir = tempdir()?;
    let script = dir.path().join(SCRIPT_NAME);
    write_program(&script, program)?;
    let status = command(config, &script, runtime_args)?.status()?;
    Ok(status.code().unwrap_or(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_write_program() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.py");
        write_program(&path, "print(1)\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "print(1)\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_write_program_missing_dir() {
        let dir = tempdir().unwrap();
        let err = write_program(&dir.path().join("no/such/out.py"), "").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_command_arguments() {
        let config = Config {
            python: "python3.11".to_string(),
            runtime_dir: Some(PathBuf::from("/opt/awkpy")),
            include_path: Vec::new(),
        };
        let script = PathBuf::from("/tmp/prog.py");
        let command = command(&config, &script, &["a.txt".to_string()]).unwrap();
        assert_eq!(command.get_program(), "python3.11");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["/tmp/prog.py", "a.txt"]);
        let pythonpath = command
            .get_envs()
            .find(|(key, _)| *key == "PYTHONPATH")
            .and_then(|(_, value)| value)
            .unwrap();
        assert!(pythonpath.to_string_lossy().starts_with("/opt/awkpy"));
    }

    #[test]
    fn test_command_without_runtime_dir() {
        let config = Config::default();
        let command = command(&config, Path::new("p.py"), &[]).unwrap();
        assert!(command.get_envs().all(|(key, _)| key != "PYTHONPATH"));
    }
}
