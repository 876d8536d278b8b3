//! Error types and reporting for the shell.
//!
//! Failures are reported where they happen and never unwind the read loop.
//! Functions that can fail return `ShellError`, which carries:
//! - Error kind (parsing, redirection, execution, builtin usage, ...)
//! - Human-readable message
//! - Optional context about what input caused the error

use std::fmt;
use std::io;

/// Categorized error types for better diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Syntax error during tokenization/parsing
    Parse,
    /// Error opening a redirect target
    Redirection,
    /// Error creating processes, pipes or duplicating descriptors
    Execution,
    /// Wrong argument count or type for a builtin
    Builtin,
    /// Error probing or reaping a background job
    Job,
    /// Error loading/parsing configuration
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::Redirection => write!(f, "redirection error"),
            ErrorKind::Execution => write!(f, "execution error"),
            ErrorKind::Builtin => write!(f, "builtin error"),
            ErrorKind::Job => write!(f, "job error"),
            ErrorKind::Config => write!(f, "config error"),
        }
    }
}

/// Rich error type with context information
#[derive(Debug, Clone)]
pub struct ShellError {
    pub kind: ErrorKind,
    pub message: String,
    /// Additional context explaining what was being processed
    pub context: Option<String>,
    /// Raw OS error number, when the failure came from a system call
    pub os_code: Option<i32>,
}

impl ShellError {
    /// Create a new error with just the kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ShellError {
            kind,
            message: message.into(),
            context: None,
            os_code: None,
        }
    }

    /// Builtin usage error: `<builtin>: Invalid argument`.
    pub fn invalid_argument(builtin: &str) -> Self {
        ShellError::new(
            ErrorKind::Builtin,
            format!("{builtin}: {}", nix::errno::Errno::EINVAL.desc()),
        )
        .with_os_code(nix::errno::Errno::EINVAL as i32)
    }

    /// Wrap an `io::Error`, prefixing the message with what failed.
    pub fn from_io(kind: ErrorKind, what: &str, err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => Self::from_errno(kind, what, nix::errno::Errno::from_raw(code)),
            None => ShellError::new(kind, format!("{what}: {err}")),
        }
    }

    /// Wrap a `nix` errno, prefixing the message with what failed.
    pub fn from_errno(kind: ErrorKind, what: &str, err: nix::errno::Errno) -> Self {
        ShellError::new(kind, format!("{what}: {}", err.desc())).with_os_code(err as i32)
    }

    /// Add context string (e.g., "while opening out.txt")
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_os_code(mut self, code: i32) -> Self {
        self.os_code = Some(code);
        self
    }

    /// Simplified display without input context
    pub fn display_simple(&self) -> String {
        let mut msg = self.message.clone();
        if let Some(context) = &self.context {
            msg.push_str(&format!("\n  hint: {}", context));
        }
        msg
    }

    /// Print the error to stderr with the shell's prefix.
    pub fn report(&self) {
        eprintln!("minishell: {self}");
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_simple())
    }
}

impl std::error::Error for ShellError {}

/// Convenience type alias for Results with ShellError
pub type ShellResult<T> = Result<T, ShellError>;
