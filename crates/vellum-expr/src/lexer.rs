//! Tokenizer for interpolation expressions.

use crate::error::ParseError;

/// Operators and punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Question,
    Colon,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(Punct),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub offset: usize,
}

/// Split `src` into tokens, ending with [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer {
        src,
        chars: src.char_indices().peekable(),
    }
    .run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(&(offset, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }
            let kind = if ch.is_ascii_digit() || (ch == '.' && self.digit_follows(offset)) {
                self.number(offset)?
            } else if ch == '"' || ch == '\'' {
                self.string(offset, ch)?
            } else if is_ident_start(ch) {
                self.ident(offset)
            } else {
                self.punct(offset, ch)?
            };
            tokens.push(Token { kind, offset });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            offset: self.src.len(),
        });
        Ok(tokens)
    }

    fn digit_follows(&self, offset: usize) -> bool {
        self.src[offset + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let mut end = start;
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(&(i, c)) = self.chars.peek() {
            let accept = match c {
                '0'..='9' => true,
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    true
                }
                'e' | 'E' if !seen_exp => {
                    seen_exp = true;
                    // Optional sign right after the exponent marker.
                    self.chars.next();
                    end = i + 1;
                    if let Some(&(j, '+' | '-')) = self.chars.peek() {
                        self.chars.next();
                        end = j + 1;
                    }
                    continue;
                }
                _ => false,
            };
            if !accept {
                break;
            }
            self.chars.next();
            end = i + c.len_utf8();
        }
        let text = &self.src[start..end];
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| ParseError::new(format!("invalid number literal `{text}`"), start))
    }

    fn string(&mut self, start: usize, quote: char) -> Result<TokenKind, ParseError> {
        self.chars.next();
        let mut out = String::new();
        while let Some((i, c)) = self.chars.next() {
            match c {
                c if c == quote => return Ok(TokenKind::Str(out)),
                '\\' => {
                    let Some((_, esc)) = self.chars.next() else {
                        return Err(ParseError::new("unterminated escape", i));
                    };
                    out.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                c => out.push(c),
            }
        }
        Err(ParseError::new("unterminated string literal", start))
    }

    fn ident(&mut self, start: usize) -> TokenKind {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !is_ident_continue(c) {
                break;
            }
            self.chars.next();
            end = i + c.len_utf8();
        }
        TokenKind::Ident(self.src[start..end].to_string())
    }

    fn punct(&mut self, offset: usize, ch: char) -> Result<TokenKind, ParseError> {
        self.chars.next();
        let punct = match ch {
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '?' => Punct::Question,
            ':' => Punct::Colon,
            '.' => Punct::Dot,
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '!' => {
                if self.eat('=') {
                    if self.eat('=') { Punct::NotEqEq } else { Punct::NotEq }
                } else {
                    Punct::Bang
                }
            }
            '=' => {
                if !self.eat('=') {
                    return Err(ParseError::new("assignment is not supported", offset));
                }
                if self.eat('=') { Punct::EqEqEq } else { Punct::EqEq }
            }
            '<' => {
                if self.eat('=') { Punct::Le } else { Punct::Lt }
            }
            '>' => {
                if self.eat('=') { Punct::Ge } else { Punct::Gt }
            }
            '&' if self.eat('&') => Punct::AndAnd,
            '|' if self.eat('|') => Punct::OrOr,
            other => {
                return Err(ParseError::new(
                    format!("unexpected character `{other}`"),
                    offset,
                ));
            }
        };
        Ok(TokenKind::Punct(punct))
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek().is_some_and(|&(_, c)| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
