//! On-demand tokenizer for one line of shell input.
//!
//! Words are scanned with a None/Single/Double/Backslash quoting state
//! machine. Quote delimiters and escaping backslashes are dropped from the
//! token text; the input itself is never modified, so a word without any
//! quoting borrows straight from the line and only quoted words allocate.
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

pub const UNTERMINATED_QUOTE: &str = "reached end of input before closing quote";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Gt,
    DGt,
    Lt,
    DLt,
    Pipe,
    Amp,
    Or,
    And,
    IoNumber,
    Semi,
    Word,
    Error,
    Eof,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Gt => "GT",
            TokenKind::DGt => "DGT",
            TokenKind::Lt => "LT",
            TokenKind::DLt => "DLT",
            TokenKind::Pipe => "PIPE",
            TokenKind::Amp => "AMP",
            TokenKind::Or => "OR",
            TokenKind::And => "AND",
            TokenKind::IoNumber => "IONUM",
            TokenKind::Semi => "SEMI",
            TokenKind::Word => "WORD",
            TokenKind::Error => "ERROR",
            TokenKind::Eof => "EOF",
        }
    }

    pub fn is_redirect_operator(self) -> bool {
        matches!(self, TokenKind::Lt | TokenKind::Gt | TokenKind::DGt)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Literal content: operator text, quote-stripped word, or error message.
    pub text: Cow<'a, str>,
    /// Byte range of the raw token in the input line, quotes included.
    pub span: Range<usize>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, text: Cow<'a, str>, span: Range<usize>) -> Self {
        Self { kind, text, span }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum QuoteMode {
    None,
    Single,
    Double,
    Backslash,
}

/// C-locale `isspace`.
pub(crate) fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\x0b' | '\x0c' | '\r')
}

pub(crate) fn is_operator_char(ch: char) -> bool {
    matches!(ch, '|' | '&' | '<' | '>' | ';')
}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Point the lexer at a new line and rewind to its start.
    pub fn reset(&mut self, input: &'a str) {
        self.input = input;
        self.pos = 0;
    }

    pub fn next_token(&mut self) -> Token<'a> {
        loop {
            let start = self.pos;
            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, Cow::Borrowed(""), start..start);
            };
            let kind = match ch {
                ';' => TokenKind::Semi,
                '|' if self.matches('|') => TokenKind::Or,
                '|' => TokenKind::Pipe,
                '&' if self.matches('&') => TokenKind::And,
                '&' => TokenKind::Amp,
                '<' if self.matches('<') => TokenKind::DLt,
                '<' => TokenKind::Lt,
                '>' if self.matches('>') => TokenKind::DGt,
                '>' => TokenKind::Gt,
                c if is_blank(c) => {
                    self.skip_whitespace();
                    continue;
                }
                _ => {
                    self.pos = start;
                    return self.word();
                }
            };
            return self.make_token(kind, start);
        }
    }

    fn word(&mut self) -> Token<'a> {
        let start = self.pos;
        let mut mode = QuoteMode::None;
        let mut literal = String::new();
        let mut stripped = false;

        while let Some(ch) = self.peek() {
            match mode {
                QuoteMode::None => {
                    if is_operator_char(ch) || is_blank(ch) {
                        break;
                    }
                    match ch {
                        '\\' => mode = QuoteMode::Backslash,
                        '\'' => mode = QuoteMode::Single,
                        '"' => mode = QuoteMode::Double,
                        _ => literal.push(ch),
                    }
                    if mode != QuoteMode::None {
                        stripped = true;
                    }
                }
                QuoteMode::Backslash => {
                    literal.push(ch);
                    mode = QuoteMode::None;
                }
                QuoteMode::Single if ch == '\'' => mode = QuoteMode::None,
                QuoteMode::Double if ch == '"' => mode = QuoteMode::None,
                QuoteMode::Single | QuoteMode::Double => literal.push(ch),
            }
            self.pos += ch.len_utf8();
        }

        if mode != QuoteMode::None {
            return Token::new(
                TokenKind::Error,
                Cow::Borrowed(UNTERMINATED_QUOTE),
                start..self.pos,
            );
        }

        let raw = &self.input[start..self.pos];
        let ionum = !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && matches!(self.peek(), Some('<' | '>'));
        let kind = if ionum {
            TokenKind::IoNumber
        } else {
            TokenKind::Word
        };
        let text = if stripped {
            Cow::Owned(literal)
        } else {
            Cow::Borrowed(raw)
        };
        Token::new(kind, text, start..self.pos)
    }

    fn make_token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token::new(kind, Cow::Borrowed(&self.input[start..self.pos]), start..self.pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if !is_blank(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }
}

/// Tokenize a whole line. The result stops before EOF, or right after the
/// first ERROR token.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Error => {
                tokens.push(token);
                break;
            }
            _ => tokens.push(token),
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input)
            .into_iter()
            .map(|t| t.text.into_owned())
            .collect()
    }

    #[test]
    fn operators_use_lookahead() {
        assert_eq!(
            kinds("> >> < << | || & && ;"),
            vec![
                TokenKind::Gt,
                TokenKind::DGt,
                TokenKind::Lt,
                TokenKind::DLt,
                TokenKind::Pipe,
                TokenKind::Or,
                TokenKind::Amp,
                TokenKind::And,
                TokenKind::Semi,
            ]
        );
    }

    #[test]
    fn operators_split_words_without_whitespace() {
        assert_eq!(texts("a|b&&c;d>e"), vec!["a", "|", "b", "&&", "c", ";", "d", ">", "e"]);
    }

    #[test]
    fn quoting_styles_produce_one_word() {
        for input in ["'a b'", "\"a b\"", "a\\ b"] {
            let tokens = tokenize(input);
            assert_eq!(tokens.len(), 1, "input {input}");
            assert_eq!(tokens[0].kind, TokenKind::Word);
            assert_eq!(tokens[0].text, "a b");
        }
    }

    #[test]
    fn quotes_protect_operator_characters() {
        assert_eq!(texts("echo 'a|b' \"c;d\" e\\&f"), vec!["echo", "a|b", "c;d", "e&f"]);
    }

    #[test]
    fn quoted_segments_join_surrounding_text() {
        assert_eq!(texts("ab\"c d\"e'f'"), vec!["abc def"]);
    }

    #[test]
    fn backslash_is_literal_inside_double_quotes() {
        assert_eq!(texts("\"a\\b\""), vec!["a\\b"]);
    }

    #[test]
    fn empty_quotes_are_an_empty_word() {
        let tokens = tokenize("''");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert!(tokens[0].is_empty());
    }

    #[test]
    fn plain_words_borrow_from_the_line() {
        let tokens = tokenize("ls -l 'x'");
        assert!(matches!(tokens[0].text, Cow::Borrowed("ls")));
        assert!(matches!(tokens[1].text, Cow::Borrowed("-l")));
        assert!(matches!(tokens[2].text, Cow::Owned(_)));
        assert_eq!(tokens[2].span, 6..9);
    }

    #[test]
    fn digits_before_redirect_are_ionum() {
        let tokens = tokenize("2>");
        assert_eq!(tokens[0].kind, TokenKind::IoNumber);
        assert_eq!(tokens[0].text, "2");
        assert_eq!(tokens[1].kind, TokenKind::Gt);

        assert_eq!(kinds("10<in"), vec![TokenKind::IoNumber, TokenKind::Lt, TokenKind::Word]);
        assert_eq!(kinds("1>>log"), vec![TokenKind::IoNumber, TokenKind::DGt, TokenKind::Word]);
    }

    #[test]
    fn non_digit_or_spaced_words_are_not_ionum() {
        let tokens = tokenize("2x>");
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[0].text, "2x");
        assert_eq!(tokens[1].kind, TokenKind::Gt);

        assert_eq!(kinds("2 >"), vec![TokenKind::Word, TokenKind::Gt]);
        assert_eq!(kinds("'2'>"), vec![TokenKind::Word, TokenKind::Gt]);
        assert_eq!(kinds("2|"), vec![TokenKind::Word, TokenKind::Pipe]);
    }

    #[test]
    fn unterminated_quote_is_an_error_token() {
        for input in ["echo 'abc", "echo \"abc", "echo abc\\"] {
            let tokens = tokenize(input);
            let last = tokens.last().unwrap();
            assert_eq!(last.kind, TokenKind::Error, "input {input}");
            assert_eq!(last.text, UNTERMINATED_QUOTE);
        }
    }

    #[test]
    fn eof_is_repeatable() {
        let mut lexer = Lexer::new("  echo  ");
        assert_eq!(lexer.next_token().kind, TokenKind::Word);
        for _ in 0..3 {
            assert_eq!(lexer.next_token().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn error_is_followed_by_eof() {
        let mut lexer = Lexer::new("'open");
        assert_eq!(lexer.next_token().kind, TokenKind::Error);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn reset_starts_a_new_line() {
        let mut lexer = Lexer::new("first");
        assert_eq!(lexer.next_token().text, "first");
        lexer.reset("second line");
        assert_eq!(lexer.next_token().text, "second");
        assert_eq!(lexer.next_token().text, "line");
    }

    #[test]
    fn all_c_whitespace_is_skipped() {
        assert_eq!(texts("a\tb\x0bc\x0cd\re\nf"), vec!["a", "b", "c", "d", "e", "f"]);
    }

    proptest! {
        #[test]
        fn unquoted_tokens_reconstruct_the_line(input in "[a-z0-9|&;<> \t]{0,40}") {
            let joined: String = tokenize(&input).iter().map(|t| t.text.as_ref()).collect();
            let expected: String = input.chars().filter(|c| !is_blank(*c)).collect();
            prop_assert_eq!(joined, expected);
        }

        #[test]
        fn single_quoted_words_survive_verbatim(words in prop::collection::vec("[a-z0-9|&;<> \"]{0,8}", 1..5)) {
            let line = words
                .iter()
                .map(|w| format!("'{w}'"))
                .collect::<Vec<_>>()
                .join(" ");
            let tokens = tokenize(&line);
            prop_assert!(tokens.iter().all(|t| t.kind == TokenKind::Word));
            let got: Vec<String> = tokens.into_iter().map(|t| t.text.into_owned()).collect();
            prop_assert_eq!(got, words);
        }
    }
}
