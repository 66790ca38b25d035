//! Lexical analysis: source text to a flat token stream.

use crate::common::error::{CompileError, CompileResult};

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Integer(i32),

    KwInt,
    KwVoid,
    KwConst,
    KwIf,
    KwElse,
    KwWhile,
    KwBreak,
    KwContinue,
    KwReturn,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    AndAnd,
    OrOr,
    Not,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based source line, for diagnostics.
    pub line: u32,
}

/// Tokenizer over raw source bytes.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { src: source.as_bytes(), pos: 0, line: 1 }
    }

    pub fn tokenize(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments()?;
            let line = self.line;
            let Some(c) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, line });
                return Ok(tokens);
            };
            let kind = match c {
                b'0'..=b'9' => self.read_integer()?,
                c if c == b'_' || c.is_ascii_alphabetic() => self.read_word(),
                _ => self.read_punctuator()?,
            };
            tokens.push(Token { kind, line });
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) -> CompileResult<()> {
        loop {
            match (self.peek(), self.peek2()) {
                (Some(c), _) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                (Some(b'/'), Some(b'/')) => {
                    while let Some(c) = self.bump() {
                        if c == b'\n' {
                            break;
                        }
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let line = self.line;
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek2()) {
                            (Some(b'*'), Some(b'/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(CompileError::Lex(format!(
                                    "unterminated block comment starting at line {}",
                                    line
                                )));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Decimal, hexadecimal (`0x`) or octal (leading `0`) integer literal.
    /// The value is kept as the 32-bit bit pattern; `-2147483648` arrives as a
    /// unary minus applied to the wrapped literal.
    fn read_integer(&mut self) -> CompileResult<TokenKind> {
        let line = self.line;
        let radix = if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'x') | Some(b'X'))
        {
            self.bump();
            self.bump();
            16
        } else if self.peek() == Some(b'0') && matches!(self.peek2(), Some(b'0'..=b'7')) {
            self.bump();
            8
        } else {
            10
        };
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(c) = self.peek() {
            let digit = match c {
                b'0'..=b'9' => (c - b'0') as u64,
                b'a'..=b'f' => (c - b'a') as u64 + 10,
                b'A'..=b'F' => (c - b'A') as u64 + 10,
                _ => break,
            };
            if digit >= radix {
                return Err(CompileError::Lex(format!(
                    "invalid digit in integer literal at line {}",
                    line
                )));
            }
            value = value * radix + digit;
            if value > u32::MAX as u64 {
                return Err(CompileError::Lex(format!(
                    "integer literal out of range at line {}",
                    line
                )));
            }
            self.bump();
        }
        if self.pos == start && radix == 16 {
            return Err(CompileError::Lex(format!(
                "missing digits in hexadecimal literal at line {}",
                line
            )));
        }
        Ok(TokenKind::Integer(value as u32 as i32))
    }

    fn read_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'_' || c.is_ascii_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        let word = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match word {
            "int" => TokenKind::KwInt,
            "void" => TokenKind::KwVoid,
            "const" => TokenKind::KwConst,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "break" => TokenKind::KwBreak,
            "continue" => TokenKind::KwContinue,
            "return" => TokenKind::KwReturn,
            _ => TokenKind::Ident(word.to_string()),
        }
    }

    fn read_punctuator(&mut self) -> CompileResult<TokenKind> {
        let line = self.line;
        let c = self.bump().unwrap();
        let kind = match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'=' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::Eq
            }
            b'=' => TokenKind::Assign,
            b'!' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::Ne
            }
            b'!' => TokenKind::Not,
            b'<' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::Le
            }
            b'<' => TokenKind::Lt,
            b'>' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::Ge
            }
            b'>' => TokenKind::Gt,
            b'&' if self.peek() == Some(b'&') => {
                self.bump();
                TokenKind::AndAnd
            }
            b'|' if self.peek() == Some(b'|') => {
                self.bump();
                TokenKind::OrOr
            }
            _ => {
                return Err(CompileError::Lex(format!(
                    "unexpected character '{}' at line {}",
                    c as char, line
                )));
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("int main while whileX"),
            vec![
                TokenKind::KwInt,
                TokenKind::Ident("main".into()),
                TokenKind::KwWhile,
                TokenKind::Ident("whileX".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_integer_radices() {
        assert_eq!(
            kinds("42 0x2a 052 0"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Integer(42),
                TokenKind::Integer(42),
                TokenKind::Integer(0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_int_min_literal_wraps() {
        // -2147483648 lexes as Minus + wrapped literal.
        assert_eq!(
            kinds("-2147483648"),
            vec![TokenKind::Minus, TokenKind::Integer(i32::MIN), TokenKind::Eof]
        );
    }

    #[test]
    fn test_literal_out_of_range() {
        assert!(Lexer::new("4294967296").tokenize().is_err());
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("<= >= == != && || < ! ="),
            vec![
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Lt,
                TokenKind::Not,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("1 // line\n2 /* block\nstill */ 3"),
            vec![
                TokenKind::Integer(1),
                TokenKind::Integer(2),
                TokenKind::Integer(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(Lexer::new("1 /* oops").tokenize().is_err());
    }

    #[test]
    fn test_line_numbers() {
        let tokens = Lexer::new("a\nb\n\nc").tokenize().unwrap();
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 2, 4, 4]);
    }
}
