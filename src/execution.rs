use std::os::fd::OwnedFd;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ExitStatus};

use log::{debug, warn};

use crate::error::{ErrorKind, ShellError};
use crate::job_control::JobTable;
use crate::parse::{check_ast_error, Ast};

mod redirection;
mod spawning;

use redirection::{open_pipe, SavedStdin};

/// Raised by the `exit` builtin; carries the status the session ends with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellExit(pub i32);

pub type EvalResult = Result<i32, ShellExit>;

/// Status given to a line that failed to parse.
pub const PARSE_ERROR_STATUS: i32 = 2;

/// How one pipeline stage was started.
#[derive(Debug)]
pub enum Launch {
    Spawned(Child),
    Builtin(i32),
    /// Nothing to wait for; the status the stage would have produced.
    Failed(i32),
}

/// Descriptors a pipeline stage writes to instead of the shell's own
/// standard output. Standard input is inherited from the shell.
#[derive(Debug, Default)]
pub struct StageIo {
    pub stdout: Option<OwnedFd>,
}

/// Tree-walking evaluator. Owns the background job table for the session.
#[derive(Debug, Default)]
pub struct Evaluator {
    jobs: JobTable,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn jobs_mut(&mut self) -> &mut JobTable {
        &mut self.jobs
    }

    /// Report parse errors, or evaluate the tree when it has none.
    pub fn run(&mut self, ast: &Ast) -> EvalResult {
        if check_ast_error(ast) {
            return Ok(PARSE_ERROR_STATUS);
        }
        self.eval(ast)
    }

    pub fn eval(&mut self, ast: &Ast) -> EvalResult {
        match ast {
            Ast::Program(children) => self.eval_program(children),
            Ast::And(left, right) => {
                let status = self.eval(left)?;
                if status == 0 {
                    self.eval(right)
                } else {
                    Ok(status)
                }
            }
            Ast::Or(left, right) => {
                let status = self.eval(left)?;
                if status != 0 {
                    self.eval(right)
                } else {
                    Ok(status)
                }
            }
            Ast::PipeSequence(commands) => self.eval_pipe_seq(commands),
            Ast::Command(_) => self.eval_pipe_seq(std::slice::from_ref(ast)),
            other => {
                ShellError::new(
                    ErrorKind::Execution,
                    format!("unexpected AST node: {}", other.kind_name()),
                )
                .report();
                Ok(1)
            }
        }
    }

    fn eval_program(&mut self, children: &[Ast]) -> EvalResult {
        let mut status = 0;
        for (idx, child) in children.iter().enumerate() {
            if child.is_separator() {
                continue;
            }
            if matches!(children.get(idx + 1), Some(Ast::Ampersand)) {
                if self.spawn_background(child).is_none() {
                    status = 1;
                }
            } else {
                status = self.eval(child)?;
            }
            self.poll_background_jobs();
        }
        Ok(status)
    }

    fn eval_pipe_seq(&mut self, commands: &[Ast]) -> EvalResult {
        debug!("pipeline event=start count={}", commands.len());
        let mut launches = Vec::with_capacity(commands.len());
        {
            let saved_stdin = match commands.len() {
                0 | 1 => None,
                _ => match SavedStdin::new() {
                    Ok(saved) => Some(saved),
                    Err(err) => {
                        err.report();
                        return Ok(1);
                    }
                },
            };

            for (idx, command) in commands.iter().enumerate() {
                let Some(saved_stdin) = saved_stdin.as_ref().filter(|_| idx + 1 < commands.len())
                else {
                    launches.push(self.eval_command(command, StageIo::default())?);
                    break;
                };
                let (read_end, write_end) = match open_pipe() {
                    Ok(ends) => ends,
                    Err(err) => {
                        err.report();
                        launches.push(Launch::Failed(1));
                        break;
                    }
                };
                let io = StageIo {
                    stdout: Some(write_end),
                };
                launches.push(self.eval_command(command, io)?);
                if let Err(err) = saved_stdin.repoint(read_end) {
                    err.report();
                    launches.push(Launch::Failed(1));
                    break;
                }
            }
        }

        let mut status = 0;
        for launch in launches {
            status = match launch {
                Launch::Spawned(mut child) => match child.wait() {
                    Ok(exit) => exit_status_code(exit),
                    Err(err) => {
                        warn!("pipeline event=wait pid={} error={}", child.id(), err);
                        ShellError::from_io(ErrorKind::Execution, "wait", &err).report();
                        1
                    }
                },
                Launch::Builtin(code) | Launch::Failed(code) => code,
            };
        }
        debug!("pipeline event=done status={}", status);
        Ok(status)
    }

    /// Report and forget background jobs that finished since the last poll.
    pub fn poll_background_jobs(&mut self) {
        for id in self.jobs.reap_finished() {
            println!("[{id}]+ Done");
        }
    }
}

pub fn exit_status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        code
    } else if let Some(sig) = status.signal() {
        128 + sig
    } else {
        1
    }
}
