//! Expression lexer
//!
//! Splits expression text into identifier, number and symbol tokens. Lexing never
//! fails: characters that start no token are skipped.

use serde::{Deserialize, Serialize};

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Number,
    Symbol,
}

/// One lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_symbol(&self, text: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == text
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}'", self.text)
    }
}

/// Symbols ordered longest first so multi-character operators win over their prefixes
const SYMBOLS: &[&str] = &[
    "//", "==", "<=", ">=", "<>", "(", ")", "[", "]", "+", "-", "*", "/", "^", ",", "=", "<", ">",
];

/// Identifiers that lex as symbols. `mod` is recognised but no grammar rule consumes it.
const KEYWORDS: &[&str] = &["and", "or", "not", "mod"];

/// Tokenize an expression string
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos];

        if ch.is_ascii_alphabetic() || ch == b'_' {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let text = &source[start..pos];
            let kind = if KEYWORDS.contains(&text) {
                TokenKind::Symbol
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token {
                text: text.to_string(),
                kind,
            });
            continue;
        }

        if ch.is_ascii_digit() || (ch == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)) {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < bytes.len()
                && bytes[pos] == b'.'
                && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit)
            {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            tokens.push(Token {
                text: source[start..pos].to_string(),
                kind: TokenKind::Number,
            });
            continue;
        }

        if let Some(sym) = SYMBOLS.iter().find(|s| source[pos..].starts_with(**s)) {
            tokens.push(Token {
                text: sym.to_string(),
                kind: TokenKind::Symbol,
            });
            pos += sym.len();
            continue;
        }

        // whitespace and unknown characters; step over a whole UTF-8 sequence
        pos += source[pos..].chars().next().map_or(1, char::len_utf8);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_longest_match_symbols() {
        assert_eq!(texts("a//b<=c<>d==e"), vec!["a", "//", "b", "<=", "c", "<>", "d", "==", "e"]);
        assert_eq!(texts("a = b < c"), vec!["a", "=", "b", "<", "c"]);
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("12 3.25 .5 7.");
        assert_eq!(
            tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["12", "3.25", ".5", "7"]
        );
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_keywords_are_symbols() {
        let tokens = tokenize("not x and y or z mod w");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Symbol,
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Identifier,
            ]
        );
        assert!(tokens[6].is_symbol("mod"));
    }

    #[test]
    fn test_unknown_characters_skipped() {
        assert_eq!(texts("a $ b # é"), vec!["a", "b"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_identifier_with_digits() {
        let tokens = tokenize("arg12+x_1");
        assert_eq!(tokens[0].text, "arg12");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[2].text, "x_1");
    }
}
