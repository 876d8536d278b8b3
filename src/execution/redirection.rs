use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};

use log::{debug, warn};
use nix::fcntl::OFlag;
use nix::unistd::{dup2, pipe2};

use crate::error::{ErrorKind, ShellError, ShellResult};
use crate::parse::Ast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stream {
    Stdin,
    Stdout,
}

impl Stream {
    fn default_fd(self) -> i32 {
        match self {
            Stream::Stdin => libc::STDIN_FILENO,
            Stream::Stdout => libc::STDOUT_FILENO,
        }
    }
}

#[derive(Debug)]
pub(crate) struct RedirectTarget {
    pub stream: Stream,
    pub file: File,
}

/// Files a command's redirects resolved to; later redirects of the same
/// direction replace earlier ones.
#[derive(Debug, Default)]
pub(crate) struct Redirections {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
}

/// Open every `Redirect` node in order. Stops at the first target that
/// cannot be opened; targets opened before it have already been created.
pub(crate) fn open_redirects<'a>(
    nodes: impl IntoIterator<Item = &'a Ast>,
) -> ShellResult<Redirections> {
    let mut out = Redirections::default();
    for node in nodes {
        let target = open_redirect(node)?;
        match target.stream {
            Stream::Stdin => out.stdin = Some(target.file),
            Stream::Stdout => out.stdout = Some(target.file),
        }
    }
    Ok(out)
}

pub(crate) fn open_redirect(node: &Ast) -> ShellResult<RedirectTarget> {
    let Ast::Redirect(children) = node else {
        return Err(ShellError::new(
            ErrorKind::Execution,
            format!("unexpected AST node: {}", node.kind_name()),
        ));
    };
    let (fd, rest) = match children.as_slice() {
        [Ast::Number(fd), rest @ ..] => (Some(*fd), rest),
        rest => (None, rest),
    };
    let [Ast::RedirectOperator(op), Ast::Word(path)] = rest else {
        return Err(ShellError::new(ErrorKind::Redirection, "malformed redirect"));
    };

    let mut opts = OpenOptions::new();
    let stream = match op.as_str() {
        "<" => {
            opts.read(true);
            Stream::Stdin
        }
        ">" => {
            opts.write(true).create(true).truncate(true);
            Stream::Stdout
        }
        ">>" => {
            opts.append(true).create(true);
            Stream::Stdout
        }
        other => {
            return Err(ShellError::new(
                ErrorKind::Redirection,
                format!("unsupported redirect operator {other}"),
            ));
        }
    };
    if let Some(fd) = fd {
        if fd != stream.default_fd() {
            return Err(ShellError::new(
                ErrorKind::Redirection,
                format!("redirecting file descriptor {fd} is not supported"),
            ));
        }
    }

    let file = opts
        .open(path)
        .map_err(|err| ShellError::from_io(ErrorKind::Redirection, path, &err))?;
    debug!("redirect event=open op={} path={}", op, path);
    Ok(RedirectTarget { stream, file })
}

/// Anonymous pipe whose ends are closed on exec; only descriptors dup'ed
/// onto a standard stream reach a child.
pub(crate) fn open_pipe() -> ShellResult<(OwnedFd, OwnedFd)> {
    pipe2(OFlag::O_CLOEXEC).map_err(|err| ShellError::from_errno(ErrorKind::Execution, "pipe", err))
}

/// Copy of the shell's standard input, put back on drop.
pub(crate) struct SavedStdin {
    saved: OwnedFd,
}

impl SavedStdin {
    pub fn new() -> ShellResult<Self> {
        let saved = io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .map_err(|err| ShellError::from_io(ErrorKind::Execution, "dup", &err))?;
        Ok(Self { saved })
    }

    /// Make `fd` the shell's standard input. The original descriptor is
    /// closed once duplicated.
    pub fn repoint(&self, fd: OwnedFd) -> ShellResult<()> {
        dup2(fd.as_raw_fd(), libc::STDIN_FILENO)
            .map(|_| ())
            .map_err(|err| ShellError::from_errno(ErrorKind::Execution, "dup2", err))
    }
}

impl Drop for SavedStdin {
    fn drop(&mut self) {
        if let Err(err) = dup2(self.saved.as_raw_fd(), libc::STDIN_FILENO) {
            warn!("stdin event=restore error={}", err);
        }
    }
}
