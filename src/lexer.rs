//! Byte-stream lexer for SPL.
//!
//! Uses a `Parser`-style `{ tokens, pos }` cursor shape, except here the
//! cursor walks raw input bytes instead of pre-split whitespace tokens,
//! since SPL's grammar needs genuine character-class lexing (identifiers,
//! hex/decimal literals, two-character operators, escaped character
//! literals).

use crate::diagnostics::CompileError;
use crate::token::{Token, TokenKind, TokenStream};

/// Consumes a byte stream terminated by a NUL sentinel and produces a
/// [`TokenStream`].
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 0,
        }
    }

    pub fn lex(mut self) -> Result<TokenStream, CompileError> {
        let mut out = TokenStream::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let Some(c) = self.peek() else {
                out.push(Token::new(TokenKind::Eof, line));
                break;
            };
            let kind = match c {
                b'(' => self.advance_with(TokenKind::LParen),
                b')' => self.advance_with(TokenKind::RParen),
                b'{' => self.advance_with(TokenKind::LBrace),
                b'}' => self.advance_with(TokenKind::RBrace),
                b'[' => self.advance_with(TokenKind::LBracket),
                b']' => self.advance_with(TokenKind::RBracket),
                b',' => self.advance_with(TokenKind::Comma),
                b';' => self.advance_with(TokenKind::Semicolon),
                b'+' => self.advance_with(TokenKind::Plus),
                b'-' => self.advance_with(TokenKind::Minus),
                b'*' => self.advance_with(TokenKind::Star),
                b'/' => self.advance_with(TokenKind::Slash),
                b'=' => self.advance_with(TokenKind::Eq),
                b'#' => self.advance_with(TokenKind::NotEq),
                b':' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::Assign
                    } else {
                        TokenKind::Colon
                    }
                }
                b'<' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::LtEq
                    } else {
                        TokenKind::Lt
                    }
                }
                b'>' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::GtEq
                    } else {
                        TokenKind::Gt
                    }
                }
                b'\'' => self.lex_char_literal()?,
                b'0'..=b'9' => self.lex_number()?,
                c if is_ident_start(c) => self.lex_identifier(),
                other => {
                    return Err(CompileError::lexical(
                        format!("unrecognized byte 0x{:02x}", other),
                        line,
                    ));
                }
            };
            out.push(Token::new(kind, line));
        }
        Ok(out)
    }

    fn advance_with(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied().filter(|&b| b != 0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied().filter(|&b| b != 0)
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_ident_continue(b) {
                self.bump();
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier(text))
    }

    fn lex_number(&mut self) -> Result<TokenKind, CompileError> {
        let line = self.line;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.bump();
            self.bump();
            let start = self.pos;
            while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
                self.bump();
            }
            if self.pos == start {
                return Err(CompileError::lexical("malformed hex literal", line));
            }
            let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
            let value = i64::from_str_radix(text, 16)
                .map_err(|_| CompileError::lexical("integer literal overflow", line))?;
            return Ok(TokenKind::IntLiteral(value));
        }

        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let value = text
            .parse::<i64>()
            .map_err(|_| CompileError::lexical("integer literal overflow", line))?;
        Ok(TokenKind::IntLiteral(value))
    }

    fn lex_char_literal(&mut self) -> Result<TokenKind, CompileError> {
        let line = self.line;
        self.bump(); // opening '
        let value = match self.bump() {
            Some(b'\\') => match self.bump() {
                Some(b'n') => b'\n',
                Some(b't') => b'\t',
                Some(b'r') => b'\r',
                Some(b'0') => 0u8,
                Some(b'\\') => b'\\',
                Some(b'\'') => b'\'',
                _ => return Err(CompileError::lexical("bad escape in character literal", line)),
            },
            Some(b) => b,
            None => return Err(CompileError::lexical("unterminated character literal", line)),
        };
        if self.bump() != Some(b'\'') {
            return Err(CompileError::lexical("unterminated character literal", line));
        }
        Ok(TokenKind::CharLiteral(value as i64))
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Lex a full source buffer. The caller must supply a NUL-terminated
/// buffer.
pub fn lex(src: &[u8]) -> Result<TokenStream, CompileError> {
    Lexer::new(src).lex()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut buf = src.as_bytes().to_vec();
        buf.push(0);
        lex(&buf)
            .unwrap()
            .tokens
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(
            kinds("proc main ref"),
            vec![
                TokenKind::Proc,
                TokenKind::Identifier("main".into()),
                TokenKind::Ref,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn two_char_operators_take_priority() {
        assert_eq!(
            kinds(":= <= >= < > :"),
            vec![
                TokenKind::Assign,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Colon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn not_equal_is_hash() {
        assert_eq!(kinds("#"), vec![TokenKind::NotEq, TokenKind::Eof]);
    }

    #[test]
    fn decimal_and_hex_literals() {
        assert_eq!(
            kinds("42 0x2A"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::IntLiteral(42),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn integer_overflow_is_lexical_error() {
        let mut buf = b"99999999999999999999".to_vec();
        buf.push(0);
        assert!(matches!(
            lex(&buf),
            Err(CompileError::Lexical { .. })
        ));
    }

    #[test]
    fn i64_boundary_literal_parses() {
        assert_eq!(
            kinds("9223372036854775807"),
            vec![TokenKind::IntLiteral(i64::MAX), TokenKind::Eof]
        );
    }

    #[test]
    fn char_literal_escapes() {
        assert_eq!(
            kinds(r"'\n' '\t' 'a'"),
            vec![
                TokenKind::CharLiteral(b'\n' as i64),
                TokenKind::CharLiteral(b'\t' as i64),
                TokenKind::CharLiteral(b'a' as i64),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_char_literal_is_lexical_error() {
        let mut buf = b"'a".to_vec();
        buf.push(0);
        assert!(matches!(lex(&buf), Err(CompileError::Lexical { .. })));
    }

    #[test]
    fn line_comments_are_ignored() {
        assert_eq!(
            kinds("proc // a comment\nmain"),
            vec![
                TokenKind::Proc,
                TokenKind::Identifier("main".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unrecognized_byte_is_lexical_error() {
        let mut buf = b"@".to_vec();
        buf.push(0);
        assert!(matches!(lex(&buf), Err(CompileError::Lexical { .. })));
    }
}
