//! Recursive-descent parser. Each rule of the grammar maps to one method:
//!
//! ```text
//! program   := and_or ( (AMP|SEMI) and_or? )* EOF
//! and_or    := pipe_seq ( (AND|OR) pipe_seq )*
//! pipe_seq  := command ( PIPE command )*
//! command   := WORD+ redirect*
//! redirect  := IONUM? (LT|GT|DGT) WORD
//! ```
use log::debug;

use super::ast::Ast;
use super::lexer::{Lexer, Token, TokenKind};

/// Longest `&&`/`||` chain accepted in one statement. And/Or nodes nest one
/// level per operator and every tree walk recurses over that depth.
pub const MAX_AND_OR_CHAIN: usize = 1000;

pub const NESTED_TOO_DEEPLY: &str = "expression nested too deeply";

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    pub fn parse(mut self) -> Ast {
        let mut children = vec![self.parse_and_or()];
        while self.at(TokenKind::Amp) || self.at(TokenKind::Semi) {
            children.push(if self.at(TokenKind::Amp) {
                Ast::Ampersand
            } else {
                Ast::Semicolon
            });
            self.advance();
            if !matches!(
                self.current.kind,
                TokenKind::Amp | TokenKind::Semi | TokenKind::Eof
            ) {
                children.push(self.parse_and_or());
            }
        }

        if !self.at(TokenKind::Eof) {
            debug!(
                "parse event=trailing kind={} partial={}",
                self.current.kind,
                Ast::Program(children)
            );
            return self.unexpected("EOF");
        }
        Ast::Program(children)
    }

    fn parse_and_or(&mut self) -> Ast {
        let mut left = self.parse_pipe_seq();
        let mut depth = 0;
        loop {
            let is_and = match self.current.kind {
                TokenKind::And => true,
                TokenKind::Or => false,
                _ => return left,
            };
            depth += 1;
            if depth > MAX_AND_OR_CHAIN {
                debug!("parse event=too_deep limit={}", MAX_AND_OR_CHAIN);
                self.skip_statement();
                return Ast::Error(NESTED_TOO_DEEPLY.to_string());
            }
            self.advance();
            let right = Box::new(self.parse_pipe_seq());
            left = if is_and {
                Ast::And(Box::new(left), right)
            } else {
                Ast::Or(Box::new(left), right)
            };
        }
    }

    fn parse_pipe_seq(&mut self) -> Ast {
        let mut commands = vec![self.parse_command()];
        while self.at(TokenKind::Pipe) {
            self.advance();
            commands.push(self.parse_command());
        }
        Ast::PipeSequence(commands)
    }

    fn parse_command(&mut self) -> Ast {
        if !self.at(TokenKind::Word) {
            let err = self.unexpected("WORD");
            self.advance();
            return err;
        }

        let mut children = Vec::new();
        while self.at(TokenKind::Word) {
            children.push(Ast::Word(self.current.text.to_string()));
            self.advance();
        }
        while self.at(TokenKind::IoNumber) || self.current.kind.is_redirect_operator() {
            children.push(self.parse_redirect());
            self.advance();
        }
        Ast::Command(children)
    }

    /// Leaves the target word (or the offending token) as the current token.
    fn parse_redirect(&mut self) -> Ast {
        let mut children = Vec::with_capacity(3);
        if self.at(TokenKind::IoNumber) {
            match self.current.text.parse::<i32>() {
                Ok(fd) => children.push(Ast::Number(fd)),
                Err(_) => return Ast::Error("file descriptor out of range".to_string()),
            }
            self.advance();
        }

        if !self.current.kind.is_redirect_operator() {
            return self.unexpected("LT, GT or DGT");
        }
        children.push(Ast::RedirectOperator(self.current.text.to_string()));

        self.advance();
        if !self.at(TokenKind::Word) {
            return self.unexpected("WORD");
        }
        children.push(Ast::Word(self.current.text.to_string()));
        Ast::Redirect(children)
    }

    /// Discard tokens up to the next statement separator.
    fn skip_statement(&mut self) {
        while !matches!(
            self.current.kind,
            TokenKind::Amp | TokenKind::Semi | TokenKind::Eof | TokenKind::Error
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> Ast {
        if self.at(TokenKind::Error) {
            return Ast::Error(self.current.text.to_string());
        }
        Ast::Error(format!("expected {expected}, got {}", self.current.kind))
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }
}

/// Parse one line into a `Program` tree, or a lone `Error` when tokens are
/// left over after a complete program.
pub fn parse_line(input: &str) -> Ast {
    Parser::new(input).parse()
}
