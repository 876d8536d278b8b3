use std::io::Write;
use std::path::PathBuf;

use log::debug;
use nix::unistd::{getuid, User};

use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::execution::{EvalResult, Evaluator, ShellExit};

mod job_cmds;

pub const BUILTIN_NAMES: [&str; 3] = ["cd", "exit", "jobs"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

impl Evaluator {
    /// Run a builtin in the shell process. `out` receives anything the
    /// builtin prints; diagnostics go to standard error.
    pub fn run_builtin(&mut self, name: &str, args: &[&str], out: &mut dyn Write) -> EvalResult {
        debug!("builtin event=run name={} argc={}", name, args.len());
        let result = match name {
            "cd" => change_directory(args),
            "exit" => match exit_code(args) {
                Ok(code) => {
                    debug!("builtin event=exit code={}", code);
                    return Err(ShellExit(code));
                }
                Err(err) => Err(err),
            },
            "jobs" => job_cmds::list_jobs(self.jobs_mut(), args, out),
            other => Err(ShellError::new(
                ErrorKind::Builtin,
                format!("{other}: not a builtin"),
            )),
        };
        match result {
            Ok(()) => Ok(0),
            Err(err) => {
                err.report();
                Ok(1)
            }
        }
    }
}

pub fn change_directory(args: &[&str]) -> ShellResult<()> {
    let target = match args {
        [] => home_directory()?,
        [dir] => PathBuf::from(dir),
        _ => return Err(ShellError::invalid_argument("cd")),
    };
    debug!("builtin event=cd target={}", target.display());
    std::env::set_current_dir(&target)
        .map_err(|err| ShellError::from_io(ErrorKind::Builtin, "cd", &err))
}

/// Home directory from the user database entry of the real uid.
pub fn home_directory() -> ShellResult<PathBuf> {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => Ok(user.dir),
        _ => Err(ShellError::new(
            ErrorKind::Builtin,
            "cd: cannot determine home directory",
        )),
    }
}

/// Status requested by `exit`; the whole argument must be a decimal `i32`.
pub fn exit_code(args: &[&str]) -> ShellResult<i32> {
    match args {
        [] => Ok(0),
        [code] => code
            .parse::<i32>()
            .map_err(|_| ShellError::invalid_argument("exit")),
        _ => Err(ShellError::invalid_argument("exit")),
    }
}
