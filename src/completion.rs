use std::borrow::Cow;
use std::env;
use std::fs;

use minishell::builtins::BUILTIN_NAMES;
use minishell::{tokenize, Lexer, TokenKind};
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::SearchDirection;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{CompletionType, Context, Helper};

const RESET: &str = "\x1b[0m";
const OPERATOR_COLOR: &str = "\x1b[33m";
const QUOTED_COLOR: &str = "\x1b[32m";
const COMMAND_COLOR: &str = "\x1b[35m";
const NUMBER_COLOR: &str = "\x1b[34m";
const ERROR_COLOR: &str = "\x1b[31m";
const HINT_COLOR: &str = "\x1b[90m";

/// Editor helper: filename and command completion, history hints and
/// highlighting driven by the shell's own lexer.
pub struct LineHelper {
    completer: FilenameCompleter,
    commands: Vec<String>,
}

impl LineHelper {
    pub fn new() -> Self {
        Self {
            completer: FilenameCompleter::new(),
            commands: collect_commands(),
        }
    }
}

fn collect_commands() -> Vec<String> {
    let mut entries: Vec<String> = BUILTIN_NAMES.iter().map(|s| s.to_string()).collect();
    if let Some(path) = env::var_os("PATH") {
        for dir in env::split_paths(&path) {
            if let Ok(read) = fs::read_dir(dir) {
                for entry in read.flatten() {
                    if let Ok(name) = entry.file_name().into_string() {
                        entries.push(name);
                    }
                }
            }
        }
    }
    entries.sort();
    entries.dedup();
    entries
}

/// Start of the word under the cursor and its raw text.
fn current_word(line: &str, pos: usize) -> (usize, &str) {
    let start = line[..pos]
        .char_indices()
        .rev()
        .find(|&(_, ch)| ch.is_whitespace() || matches!(ch, '|' | '&' | ';' | '<' | '>'))
        .map(|(idx, ch)| idx + ch.len_utf8())
        .unwrap_or(0);
    (start, &line[start..pos])
}

/// A word starting at `start` names a program when everything before it is
/// empty or ends in a statement or pipe operator.
fn is_command_position(line: &str, start: usize) -> bool {
    match tokenize(&line[..start]).last() {
        None => true,
        Some(token) => matches!(
            token.kind,
            TokenKind::Pipe | TokenKind::And | TokenKind::Or | TokenKind::Semi | TokenKind::Amp
        ),
    }
}

fn paint(out: &mut String, color: &str, text: &str) {
    out.push_str(color);
    out.push_str(text);
    out.push_str(RESET);
}

fn highlight_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() * 2);
    let mut lexer = Lexer::new(line);
    let mut cursor = 0;
    let mut expect_command = true;
    loop {
        let token = lexer.next_token();
        if token.kind == TokenKind::Eof {
            break;
        }
        out.push_str(&line[cursor..token.span.start]);
        let raw = &line[token.span.clone()];
        match token.kind {
            TokenKind::Error => paint(&mut out, ERROR_COLOR, raw),
            TokenKind::IoNumber => paint(&mut out, NUMBER_COLOR, raw),
            TokenKind::Word if expect_command && BUILTIN_NAMES.contains(&&*token.text) => {
                paint(&mut out, COMMAND_COLOR, raw)
            }
            TokenKind::Word if matches!(token.text, Cow::Owned(_)) => {
                paint(&mut out, QUOTED_COLOR, raw)
            }
            TokenKind::Word => out.push_str(raw),
            _ => paint(&mut out, OPERATOR_COLOR, raw),
        }
        expect_command = matches!(
            token.kind,
            TokenKind::Pipe | TokenKind::And | TokenKind::Or | TokenKind::Semi | TokenKind::Amp
        );
        cursor = token.span.end;
        if token.kind == TokenKind::Error {
            break;
        }
    }
    out.push_str(&line[cursor..]);
    out
}

impl Helper for LineHelper {}

impl Completer for LineHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let (start, word) = current_word(line, pos);
        if is_command_position(line, start) && !word.contains('/') {
            let pairs: Vec<Pair> = self
                .commands
                .iter()
                .filter(|name| name.starts_with(word))
                .map(|name| Pair {
                    display: name.clone(),
                    replacement: name.clone(),
                })
                .collect();
            if !pairs.is_empty() {
                return Ok((start, pairs));
            }
        }
        self.completer.complete(line, pos, ctx)
    }
}

impl Hinter for LineHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        if line.is_empty() || pos < line.len() {
            return None;
        }
        let history = ctx.history();
        let start = if ctx.history_index() == history.len() {
            ctx.history_index().saturating_sub(1)
        } else {
            ctx.history_index()
        };
        let found = history
            .starts_with(line, start, SearchDirection::Reverse)
            .ok()
            .flatten()?;
        let remainder = found.entry.get(pos..)?;
        if remainder.is_empty() {
            return None;
        }
        Some(remainder.to_string())
    }
}

impl Highlighter for LineHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned(highlight_line(line))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if hint.is_empty() {
            return Cow::Borrowed(hint);
        }
        Cow::Owned(format!("{HINT_COLOR}{hint}{RESET}"))
    }

    fn highlight_candidate<'c>(&self, candidate: &'c str, _completion: CompletionType) -> Cow<'c, str> {
        Cow::Borrowed(candidate)
    }

    fn highlight_char(&self, _line: &str, _pos: usize) -> bool {
        true
    }
}

impl Validator for LineHelper {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> Result<ValidationResult, ReadlineError> {
        Ok(ValidationResult::Valid(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_words_are_untouched() {
        assert_eq!(highlight_line("ls -l"), "ls -l");
    }

    #[test]
    fn operators_quotes_and_builtins_are_colored() {
        let out = highlight_line("cd 'a b' | wc");
        assert_eq!(
            out,
            format!("{COMMAND_COLOR}cd{RESET} {QUOTED_COLOR}'a b'{RESET} {OPERATOR_COLOR}|{RESET} wc")
        );
    }

    #[test]
    fn unterminated_quote_is_marked() {
        let out = highlight_line("echo \"open");
        assert_eq!(out, format!("echo {ERROR_COLOR}\"open{RESET}"));
    }

    #[test]
    fn command_position_follows_operators() {
        assert!(is_command_position("", 0));
        assert!(is_command_position("ls | ", 5));
        assert!(is_command_position("a && ", 5));
        assert!(!is_command_position("ls ", 3));
    }

    #[test]
    fn current_word_stops_at_operators() {
        assert_eq!(current_word("ls|gr", 5), (3, "gr"));
        assert_eq!(current_word("cat fi", 6), (4, "fi"));
        assert_eq!(current_word("", 0), (0, ""));
    }
}
