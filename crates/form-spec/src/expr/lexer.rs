use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use super::ExprError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Text between single or double quotes, quotes stripped.
    Quoted(String),
    /// Unquoted literal such as `true` or `42`.
    Word(String),
    And,
    Or,
    Eq,
    Ne,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Quoted(text) => write!(f, "'{}'", text),
            TokenKind::Word(word) => f.write_str(word),
            TokenKind::And => f.write_str("&&"),
            TokenKind::Or => f.write_str("||"),
            TokenKind::Eq => f.write_str("=="),
            TokenKind::Ne => f.write_str("!="),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub position: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match ch {
            '\'' | '"' => {
                chars.next();
                TokenKind::Quoted(read_quoted(&mut chars, ch, position)?)
            }
            '&' => {
                chars.next();
                expect_char(&mut chars, '&')?;
                TokenKind::And
            }
            '|' => {
                chars.next();
                expect_char(&mut chars, '|')?;
                TokenKind::Or
            }
            '=' => {
                chars.next();
                expect_char(&mut chars, '=')?;
                // `===` reads the same as `==`.
                chars.next_if(|&(_, next)| next == '=');
                TokenKind::Eq
            }
            '!' => {
                chars.next();
                expect_char(&mut chars, '=')?;
                chars.next_if(|&(_, next)| next == '=');
                TokenKind::Ne
            }
            '(' => {
                chars.next();
                TokenKind::LParen
            }
            ')' => {
                chars.next();
                TokenKind::RParen
            }
            ch if is_word_char(ch) => TokenKind::Word(read_word(&mut chars)),
            other => {
                return Err(ExprError::UnexpectedChar {
                    ch: other,
                    position,
                });
            }
        };
        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

fn expect_char(chars: &mut Peekable<CharIndices<'_>>, expected: char) -> Result<(), ExprError> {
    match chars.next() {
        Some((_, ch)) if ch == expected => Ok(()),
        Some((position, ch)) => Err(ExprError::UnexpectedChar { ch, position }),
        None => Err(ExprError::UnexpectedEnd),
    }
}

fn read_quoted(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, ExprError> {
    let mut text = String::new();
    while let Some((_, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            ch if ch == quote => return Ok(text),
            ch => text.push(ch),
        }
    }
    Err(ExprError::UnterminatedString { position: start })
}

fn read_word(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut word = String::new();
    while let Some((_, ch)) = chars.next_if(|&(_, ch)| is_word_char(ch)) {
        word.push(ch);
    }
    word
}
