//! Syntax recognition: lexer, parser and the tree they produce.
//!
//! The lexer is pulled by the parser one token at a time; the parser never
//! fails outright but embeds `Ast::Error` nodes, which `check_ast_error`
//! reports before anything is evaluated.

mod ast;
mod lexer;
mod parser;

pub use ast::{check_ast_error, Ast};
pub use lexer::{tokenize, Lexer, Token, TokenKind, UNTERMINATED_QUOTE};
pub use parser::{parse_line, Parser, MAX_AND_OR_CHAIN, NESTED_TOO_DEEPLY};
