use std::fmt;

use crate::error::{ErrorKind, ShellError};

/// Syntax tree for one input line.
///
/// Each interior node exclusively owns its children. Parse failures are
/// stored in the tree as `Error` nodes so that the rest of the line still
/// has a well-formed shape; such a tree must never be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// Statements interleaved with their `Semicolon`/`Ampersand` separators.
    Program(Vec<Ast>),
    Semicolon,
    Ampersand,
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    PipeSequence(Vec<Ast>),
    /// Leading `Word`s (program and arguments) followed by `Redirect`s.
    Command(Vec<Ast>),
    Word(String),
    /// Optional `Number`, then `RedirectOperator`, then the target `Word`.
    Redirect(Vec<Ast>),
    RedirectOperator(String),
    Number(i32),
    Error(String),
}

impl Ast {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Ast::Program(_) => "PROGRAM",
            Ast::Semicolon => "SEMI",
            Ast::Ampersand => "AMP",
            Ast::And(_, _) => "AND",
            Ast::Or(_, _) => "OR",
            Ast::PipeSequence(_) => "PIPE_SEQ",
            Ast::Command(_) => "COMMAND",
            Ast::Word(_) => "WORD",
            Ast::Redirect(_) => "REDIRECT",
            Ast::RedirectOperator(_) => "REDIR_OP",
            Ast::Number(_) => "NUMBER",
            Ast::Error(_) => "ERROR",
        }
    }

    pub fn children(&self) -> Vec<&Ast> {
        match self {
            Ast::Program(children)
            | Ast::PipeSequence(children)
            | Ast::Command(children)
            | Ast::Redirect(children) => children.iter().collect(),
            Ast::And(left, right) | Ast::Or(left, right) => vec![left.as_ref(), right.as_ref()],
            _ => Vec::new(),
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Ast::Semicolon | Ast::Ampersand)
    }

    /// Every error message in the tree, in pre-order.
    pub fn errors(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_errors(&mut out);
        out
    }

    fn collect_errors<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Ast::Error(message) = self {
            out.push(message);
            return;
        }
        for child in self.children() {
            child.collect_errors(out);
        }
    }

    pub fn has_error(&self) -> bool {
        match self {
            Ast::Error(_) => true,
            _ => self.children().into_iter().any(Ast::has_error),
        }
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ast::Word(text) | Ast::RedirectOperator(text) | Ast::Error(text) => {
                write!(f, "{}({text})", self.kind_name())
            }
            Ast::Number(value) => write!(f, "{}({value})", self.kind_name()),
            _ => {
                let children = self.children();
                if children.is_empty() {
                    return f.write_str(self.kind_name());
                }
                write!(f, "{}[", self.kind_name())?;
                for (idx, child) in children.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Report every error node on stderr. Returns true when the tree must not
/// be evaluated.
pub fn check_ast_error(ast: &Ast) -> bool {
    let errors = ast.errors();
    for message in &errors {
        let err = ShellError::new(ErrorKind::Parse, *message);
        eprintln!("{}: {err}", err.kind);
    }
    !errors.is_empty()
}
