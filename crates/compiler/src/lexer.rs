//! Tokenizer for the source language (spec §6).
//!
//! A hand-written, single-pass scanner producing a flat token stream with
//! 0-indexed line numbers. `//` and `#` line comments and `/* */` block
//! comments are stripped here; they never reach the parser.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    IntLit(i64),
    StringLit(String),
    /// Keywords and punctuation, kept as their literal spelling.
    Symbol(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

const KEYWORDS: &[&str] = &[
    "int", "boolean", "string", "void", "if", "else", "while", "for", "return", "new", "true",
    "false",
];

const MULTI_CHAR_SYMBOLS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "++", "--",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, (usize, String)> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // Line comments
        if c == '#' || (c == '/' && chars.get(i + 1) == Some(&'/')) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        // Block comments
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            if i >= chars.len() {
                return Err((line, "unterminated block comment".to_string()));
            }
            i += 2;
            continue;
        }
        // String literals
        if c == '"' {
            let start_line = line;
            i += 1;
            let mut s = String::new();
            loop {
                if i >= chars.len() {
                    return Err((start_line, "unterminated string literal".to_string()));
                }
                match chars[i] {
                    '"' => {
                        i += 1;
                        break;
                    }
                    '\\' => {
                        i += 1;
                        if i >= chars.len() {
                            return Err((start_line, "unterminated string literal".to_string()));
                        }
                        let escaped = match chars[i] {
                            'n' => '\n',
                            't' => '\t',
                            '"' => '"',
                            '\\' => '\\',
                            other => other,
                        };
                        s.push(escaped);
                        i += 1;
                    }
                    other => {
                        s.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::StringLit(s),
                line: start_line,
            });
            continue;
        }
        // Identifiers and keywords
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token {
                kind: if KEYWORDS.contains(&text.as_str()) {
                    TokenKind::Symbol(text)
                } else {
                    TokenKind::Ident(text)
                },
                line,
            });
            continue;
        }
        // Integer literals
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value: i64 = text
                .parse()
                .map_err(|_| (line, format!("invalid integer literal '{text}'")))?;
            tokens.push(Token {
                kind: TokenKind::IntLit(value),
                line,
            });
            continue;
        }
        // Multi-char symbols
        if let Some(sym) = MULTI_CHAR_SYMBOLS
            .iter()
            .find(|s| chars[i..].starts_with(&s.chars().collect::<Vec<_>>()[..]))
        {
            tokens.push(Token {
                kind: TokenKind::Symbol((*sym).to_string()),
                line,
            });
            i += sym.len();
            continue;
        }
        // Single-char punctuation
        if "+-*/%<>=!(){}[];,:.".contains(c) {
            tokens.push(Token {
                kind: TokenKind::Symbol(c.to_string()),
                line,
            });
            i += 1;
            continue;
        }

        return Err((line, format!("illegal character '{c}'")));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_keywords_and_identifiers() {
        let kinds = symbols("int x");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Symbol("int".to_string()),
                TokenKind::Ident("x".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_string_with_escapes() {
        let kinds = symbols(r#""hi\n""#);
        assert_eq!(
            kinds,
            vec![TokenKind::StringLit("hi\n".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn strips_comments() {
        let kinds = symbols("int x; // comment\n# also comment\n/* block \n comment */ int y;");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Symbol("int".to_string()),
                TokenKind::Ident("x".to_string()),
                TokenKind::Symbol(";".to_string()),
                TokenKind::Symbol("int".to_string()),
                TokenKind::Ident("y".to_string()),
                TokenKind::Symbol(";".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_multi_char_operators() {
        let kinds = symbols("a == b && c != d");
        assert!(kinds.contains(&TokenKind::Symbol("==".to_string())));
        assert!(kinds.contains(&TokenKind::Symbol("&&".to_string())));
        assert!(kinds.contains(&TokenKind::Symbol("!=".to_string())));
    }

    #[test]
    fn rejects_illegal_character() {
        let err = tokenize("int x = 1 @ 2;").unwrap_err();
        assert_eq!(err.1, "illegal character '@'");
    }
}
