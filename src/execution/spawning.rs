use std::fs::File;
use std::io::{self, Write};
use std::process::Command;

use log::{debug, warn};
use nix::unistd::{fork, ForkResult};

use crate::builtins::is_builtin;
use crate::error::{ErrorKind, ShellError};
use crate::parse::Ast;
use crate::signals::restore_default_signals;

use super::redirection::{open_redirects, Redirections};
use super::{Evaluator, Launch, ShellExit, StageIo};

impl Evaluator {
    /// Start one pipeline stage. Builtins run to completion here; external
    /// programs are spawned and returned for the caller to wait on.
    pub(super) fn eval_command(
        &mut self,
        command: &Ast,
        stage: StageIo,
    ) -> Result<Launch, ShellExit> {
        let Ast::Command(children) = command else {
            ShellError::new(
                ErrorKind::Execution,
                format!("unexpected AST node: {}", command.kind_name()),
            )
            .report();
            return Ok(Launch::Failed(1));
        };
        let words: Vec<&str> = children
            .iter()
            .filter_map(|child| match child {
                Ast::Word(word) => Some(word.as_str()),
                _ => None,
            })
            .collect();
        let redirects =
            match open_redirects(children.iter().filter(|child| matches!(child, Ast::Redirect(_)))) {
                Ok(redirects) => redirects,
                Err(err) => {
                    err.report();
                    return Ok(Launch::Failed(1));
                }
            };
        let Some((&program, args)) = words.split_first() else {
            ShellError::new(ErrorKind::Execution, "empty command").report();
            return Ok(Launch::Failed(1));
        };

        if is_builtin(program) {
            let mut out: Box<dyn Write> = match (redirects.stdout, stage.stdout) {
                (Some(file), _) => Box::new(file),
                (None, Some(fd)) => Box::new(File::from(fd)),
                (None, None) => Box::new(io::stdout()),
            };
            let status = self.run_builtin(program, args, &mut out)?;
            if let Err(err) = out.flush() {
                ShellError::from_io(ErrorKind::Builtin, program, &err).report();
            }
            debug!("job event=builtin name={} status={}", program, status);
            return Ok(Launch::Builtin(status));
        }
        Ok(spawn_external(program, args, redirects, stage))
    }

    /// Fork a copy of the shell that evaluates `statement` and exits with
    /// its status. Returns the new job id, or `None` if the fork failed.
    pub(super) fn spawn_background(&mut self, statement: &Ast) -> Option<usize> {
        if let Err(err) = io::stdout().flush() {
            warn!("job event=flush error={}", err);
        }
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                self.jobs.clear();
                let status = match self.eval(statement) {
                    Ok(status) => status,
                    Err(ShellExit(code)) => code,
                };
                let _ = io::stdout().flush();
                std::process::exit(status);
            }
            Ok(ForkResult::Parent { child }) => {
                let id = self.jobs.add(child);
                debug!("job event=spawn kind=background id={} pid={}", id, child);
                println!("[{id}] {child}");
                Some(id)
            }
            Err(err) => {
                ShellError::from_errno(ErrorKind::Execution, "fork", err).report();
                None
            }
        }
    }
}

fn spawn_external(program: &str, args: &[&str], redirects: Redirections, stage: StageIo) -> Launch {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(file) = redirects.stdin {
        command.stdin(file);
    }
    if let Some(file) = redirects.stdout {
        command.stdout(file);
    } else if let Some(fd) = stage.stdout {
        command.stdout(File::from(fd));
    }
    restore_default_signals(&mut command);

    match command.spawn() {
        Ok(child) => {
            debug!("job event=spawn kind=foreground program={} pid={}", program, child.id());
            Launch::Spawned(child)
        }
        Err(err) => {
            let err = ShellError::from_io(ErrorKind::Execution, program, &err);
            err.report();
            Launch::Failed(err.os_code.unwrap_or(127))
        }
    }
}
