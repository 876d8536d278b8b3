//! Core of the shell: lexing, parsing and evaluation of one line at a time.
//!
//! The interactive loop lives in the binary; this crate exposes what it
//! needs so tests and fuzz targets can drive the same code without a
//! terminal or any line-editing dependency.

pub mod builtins;
pub mod config;
pub mod debug;
pub mod error;
pub mod execution;
pub mod job_control;
pub mod parse;
pub mod signals;

pub use error::{ErrorKind, ShellError, ShellResult};
pub use execution::{EvalResult, Evaluator, ShellExit};
pub use job_control::{Job, JobState, JobTable};
pub use parse::{check_ast_error, parse_line, tokenize, Ast, Lexer, Parser, Token, TokenKind};

/// Fuzz helper for parser-only targets.
pub fn fuzz_parse_bytes(data: &[u8]) {
    let input = String::from_utf8_lossy(data);
    let _ = tokenize(&input);
    let ast = parse_line(&input);
    let _ = ast.errors();
    let _ = debug::format_ast(&ast);
}
