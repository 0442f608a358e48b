//! Tokenizer.
//!
//! Recognises more than the arithmetic grammar accepts (strings,
//! comparisons, assignments, brackets) so the parser can name what it
//! rejects instead of failing with a generic parse error.

use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Str,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Assign,
    AugAssign,
    Walrus,
    Compare,
    Bitwise,
    Tilde,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

const STRING_PREFIXES: &[&str] = &["r", "b", "f", "u", "rb", "br", "fr", "rf"];

pub(crate) fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let (value, next) = lex_number(&chars, i)?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                pos: start,
            });
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();

            if matches!(chars.get(i), Some('"' | '\''))
                && STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str())
            {
                i = lex_string(&chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Str,
                    pos: start,
                });
            } else {
                tokens.push(Token {
                    kind: TokenKind::Ident(word),
                    pos: start,
                });
            }
            continue;
        }

        if c == '"' || c == '\'' {
            i = lex_string(&chars, i)?;
            tokens.push(Token {
                kind: TokenKind::Str,
                pos: start,
            });
            continue;
        }

        let (kind, len) = lex_operator(&chars[i..])
            .ok_or_else(|| EvalError::parse(start, format!("unexpected character '{c}'")))?;
        tokens.push(Token { kind, pos: start });
        i += len;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: chars.len(),
    });
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> EvalResult<(f64, usize)> {
    let mut i = start;
    let digits = |i: &mut usize| {
        while *i < chars.len() && (chars[*i].is_ascii_digit() || chars[*i] == '_') {
            *i += 1;
        }
    };

    digits(&mut i);
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        digits(&mut i);
    }
    if i < chars.len() && matches!(chars[i], 'e' | 'E') {
        let mut j = i + 1;
        if j < chars.len() && matches!(chars[j], '+' | '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            i = j;
            digits(&mut i);
        }
    }

    let text = &chars[start..i];
    for (k, ch) in text.iter().enumerate() {
        if *ch == '_' {
            let before = k.checked_sub(1).and_then(|p| text.get(p));
            let after = text.get(k + 1);
            if !before.is_some_and(char::is_ascii_digit) || !after.is_some_and(char::is_ascii_digit) {
                return Err(EvalError::parse(start + k, "invalid underscore in number"));
            }
        }
    }

    let cleaned: String = text.iter().filter(|c| **c != '_').collect();
    cleaned
        .parse::<f64>()
        .map(|value| (value, i))
        .map_err(|_| EvalError::parse(start, format!("invalid number '{cleaned}'")))
}

/// Returns the index just past the closing quote.
fn lex_string(chars: &[char], start: usize) -> EvalResult<usize> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = if triple { start + 3 } else { start + 1 };

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => {
                if !triple {
                    return Ok(i + 1);
                }
                if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                    return Ok(i + 3);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    Err(EvalError::parse(start, "unterminated string literal"))
}

fn lex_operator(rest: &[char]) -> Option<(TokenKind, usize)> {
    let at = |n: usize| rest.get(n).copied();

    if let (Some(a), Some(b), Some('=')) = (at(0), at(1), at(2))
        && matches!((a, b), ('*', '*') | ('/', '/') | ('>', '>') | ('<', '<'))
    {
        return Some((TokenKind::AugAssign, 3));
    }

    if let (Some(a), Some(b)) = (at(0), at(1)) {
        let two = match (a, b) {
            ('*', '*') => Some(TokenKind::DoubleStar),
            ('/', '/') => Some(TokenKind::DoubleSlash),
            ('=', '=') | ('!', '=') | ('<', '=') | ('>', '=') => Some(TokenKind::Compare),
            (':', '=') => Some(TokenKind::Walrus),
            ('<', '<') | ('>', '>') => Some(TokenKind::Bitwise),
            ('+' | '-' | '*' | '/' | '%' | '^' | '&' | '|', '=') => Some(TokenKind::AugAssign),
            _ => None,
        };
        if let Some(kind) = two {
            return Some((kind, 2));
        }
    }

    let one = match at(0)? {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '/' => TokenKind::Slash,
        '%' => TokenKind::Percent,
        '^' => TokenKind::Caret,
        '(' => TokenKind::LParen,
        ')' => TokenKind::RParen,
        '[' => TokenKind::LBracket,
        ']' => TokenKind::RBracket,
        '{' => TokenKind::LBrace,
        '}' => TokenKind::RBrace,
        ',' => TokenKind::Comma,
        '.' => TokenKind::Dot,
        ':' => TokenKind::Colon,
        ';' => TokenKind::Semicolon,
        '=' => TokenKind::Assign,
        '<' | '>' => TokenKind::Compare,
        '&' | '|' => TokenKind::Bitwise,
        '~' => TokenKind::Tilde,
        _ => return None,
    };
    Some((one, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("12 3.5 .5 1e3 1_000 2."),
            vec![
                TokenKind::Number(12.0),
                TokenKind::Number(3.5),
                TokenKind::Number(0.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(1000.0),
                TokenKind::Number(2.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bad_underscore() {
        assert!(tokenize("1__0").is_err());
        assert!(tokenize("10_").is_err());
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("2**3//4 **= :="),
            vec![
                TokenKind::Number(2.0),
                TokenKind::DoubleStar,
                TokenKind::Number(3.0),
                TokenKind::DoubleSlash,
                TokenKind::Number(4.0),
                TokenKind::AugAssign,
                TokenKind::Walrus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_prefixes() {
        assert_eq!(
            kinds(r#"open("/etc/passwd") f'x' '''a'b'''"#),
            vec![
                TokenKind::Ident("open".into()),
                TokenKind::LParen,
                TokenKind::Str,
                TokenKind::RParen,
                TokenKind::Str,
                TokenKind::Str,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'abc").unwrap_err();
        assert!(matches!(err, EvalError::ParseFailure { position: 0, .. }));
    }

    #[test]
    fn test_stray_character_position() {
        let err = tokenize("1 + $").unwrap_err();
        assert!(matches!(err, EvalError::ParseFailure { position: 4, .. }));
    }
}
