//! Human-readable renderings of tokens and trees for `-x` tracing.

use crate::parse::{Ast, Lexer, Token, TokenKind};

pub fn format_token(token: &Token<'_>) -> String {
    format!("token: {{ type: {}, content: {} }}", token.kind, token.text)
}

/// Render every token of `input`, EOF included.
pub fn format_tokens(input: &str) -> Vec<String> {
    let mut lexer = Lexer::new(input);
    let mut out = Vec::new();
    loop {
        let token = lexer.next_token();
        out.push(format_token(&token));
        if matches!(token.kind, TokenKind::Eof | TokenKind::Error) {
            break;
        }
    }
    out
}

/// One line per node, indented by depth.
pub fn format_ast(ast: &Ast) -> String {
    let mut out = String::new();
    write_node(&mut out, ast, 0);
    out
}

fn write_node(out: &mut String, node: &Ast, depth: usize) {
    let children = node.children();
    out.push_str(&"  ".repeat(depth));
    out.push_str(node.kind_name());
    match node {
        Ast::Word(text) | Ast::RedirectOperator(text) | Ast::Error(text) => {
            out.push_str(&format!(" {text:?}"));
        }
        Ast::Number(value) => out.push_str(&format!(" {value}")),
        _ if !children.is_empty() => out.push_str(&format!(" ({} children)", children.len())),
        _ => {}
    }
    out.push('\n');
    for child in children {
        write_node(out, child, depth + 1);
    }
}
