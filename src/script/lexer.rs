/*
    FluxConv
    https://github.com/dbalsom/fluxconv

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! Disk-script tokenizer: C-style comments, decimal and hex integer
//! literals, keywords, and the `{ } ; : ,` punctuation set.

use crate::FluxConvError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    Eof,
    Int(i32),
    Track,
    Repeat,
    Byte,
    Bytes,
    SpecialByte,
    PadBits,
    CrcBegin,
    CrcEnd,
    Flux,
    NoFlux,
    Geometry,
    Colon,
    Semicolon,
    Comma,
    LBrace,
    RBrace,
}

pub(crate) struct Lexer<'a> {
    file_name: &'a str,
    src: &'a [u8],
    pos: usize,
    line_no: u32,
    line_start: usize,
    token_start: usize,
    pushed: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(file_name: &'a str, source: &'a str) -> Lexer<'a> {
        Lexer {
            file_name,
            src: source.as_bytes(),
            pos: 0,
            line_no: 1,
            line_start: 0,
            token_start: 0,
            pushed: None,
        }
    }

    /// Build a positioned error at the current token.
    pub fn error(&self, message: impl Into<String>) -> FluxConvError {
        FluxConvError::ScriptParse {
            file: self.file_name.to_string(),
            line: self.line_no,
            col: (self.token_start - self.line_start) as u32,
            message: message.into(),
        }
    }

    pub fn push(&mut self, token: Token) {
        self.pushed = Some(token);
    }

    pub fn token(&mut self) -> Result<Token, FluxConvError> {
        if let Some(token) = self.pushed.take() {
            return Ok(token);
        }

        // skip whitespace and comments
        let c = loop {
            let Some(&c) = self.src.get(self.pos) else {
                return Ok(Token::Eof);
            };
            self.pos += 1;

            if c == b'/' && self.src.get(self.pos) == Some(&b'*') {
                self.pos += 1;
                self.skip_block_comment()?;
                continue;
            }
            if c == b'/' && self.src.get(self.pos) == Some(&b'/') {
                while self.pos < self.src.len() && self.src[self.pos] != b'\r' && self.src[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if c == b'\r' || c == b'\n' {
                // consume a CRLF or LFCR pair as one newline
                if self.src.get(self.pos) == Some(&(c ^ (b'\r' ^ b'\n'))) {
                    self.pos += 1;
                }
                self.line_start = self.pos;
                self.line_no += 1;
            }
            else if c != b' ' && c != b'\t' {
                break c;
            }
        };

        self.token_start = self.pos - 1;

        match c {
            b':' => return Ok(Token::Colon),
            b';' => return Ok(Token::Semicolon),
            b',' => return Ok(Token::Comma),
            b'{' => return Ok(Token::LBrace),
            b'}' => return Ok(Token::RBrace),
            _ => {}
        }

        if c == b'0' && matches!(self.src.get(self.pos), Some(b'x') | Some(b'X')) {
            self.pos += 1;
            return self.hex_literal();
        }

        if c.is_ascii_digit() {
            return self.decimal_literal(c);
        }

        if c.is_ascii_alphabetic() {
            while self
                .src
                .get(self.pos)
                .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_')
            {
                self.pos += 1;
            }

            let word = &self.src[self.token_start..self.pos];
            return match word {
                b"byte" => Ok(Token::Byte),
                b"bytes" => Ok(Token::Bytes),
                b"special_byte" => Ok(Token::SpecialByte),
                b"pad_bits" => Ok(Token::PadBits),
                b"crc_begin" => Ok(Token::CrcBegin),
                b"crc_end" => Ok(Token::CrcEnd),
                b"flux" => Ok(Token::Flux),
                b"no_flux" => Ok(Token::NoFlux),
                b"track" => Ok(Token::Track),
                b"repeat" => Ok(Token::Repeat),
                b"geometry" => Ok(Token::Geometry),
                _ => Err(self.error(format!(
                    "Unrecognized keyword: '{}'",
                    String::from_utf8_lossy(word)
                ))),
            };
        }

        if (0x20..0x7F).contains(&c) {
            Err(self.error(format!("Unrecognized character '{}'", c as char)))
        }
        else {
            Err(self.error(format!("Unrecognized character 0x{:02X}", c)))
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), FluxConvError> {
        loop {
            let Some(&c) = self.src.get(self.pos) else {
                self.token_start = self.pos;
                return Err(self.error("Unterminated multi-line comment"));
            };
            self.pos += 1;

            if c == b'\r' || c == b'\n' {
                if self.src.get(self.pos) == Some(&(c ^ (b'\r' ^ b'\n'))) {
                    self.pos += 1;
                }
                self.line_start = self.pos;
                self.line_no += 1;
            }
            else if c == b'*' && self.src.get(self.pos) == Some(&b'/') {
                self.pos += 1;
                return Ok(());
            }
        }
    }

    fn hex_literal(&mut self) -> Result<Token, FluxConvError> {
        let mut value: i32 = 0;
        let mut valid = false;

        while let Some(&c) = self.src.get(self.pos) {
            let digit = match c {
                b'0'..=b'9' => (c - b'0') as i32,
                b'a'..=b'f' => (c - b'a') as i32 + 10,
                b'A'..=b'F' => (c - b'A') as i32 + 10,
                _ => break,
            };
            self.pos += 1;
            valid = true;

            if value > 0x7FF_FFFF {
                return Err(self.error("Integral constant too big"));
            }
            value = value * 16 + digit;
        }

        if !valid {
            return Err(self.error("Invalid hex constant"));
        }

        Ok(Token::Int(value))
    }

    fn decimal_literal(&mut self, first: u8) -> Result<Token, FluxConvError> {
        let mut value: i32 = (first - b'0') as i32;

        while let Some(&c) = self.src.get(self.pos) {
            if !c.is_ascii_digit() {
                break;
            }
            self.pos += 1;

            if value > 214_748_364 {
                return Err(self.error("Integral constant too big"));
            }
            value = value * 10;

            let digit = (c - b'0') as i32;
            if i32::MAX - value < digit {
                return Err(self.error("Integral constant too big"));
            }
            value += digit;
        }

        Ok(Token::Int(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new("test", src);
        let mut out = Vec::new();
        loop {
            let t = lexer.token().unwrap();
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn test_punctuation_and_keywords() {
        assert_eq!(
            tokens("track 5 { byte 0x1F; }"),
            vec![
                Token::Track,
                Token::Int(5),
                Token::LBrace,
                Token::Byte,
                Token::Int(0x1F),
                Token::Semicolon,
                Token::RBrace,
            ]
        );
    }

    #[test]
    fn test_all_keywords() {
        assert_eq!(
            tokens("byte bytes special_byte pad_bits crc_begin crc_end flux no_flux track repeat geometry"),
            vec![
                Token::Byte,
                Token::Bytes,
                Token::SpecialByte,
                Token::PadBits,
                Token::CrcBegin,
                Token::CrcEnd,
                Token::Flux,
                Token::NoFlux,
                Token::Track,
                Token::Repeat,
                Token::Geometry,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(tokens("// whole line\nbyte /* inline */ 2;"), vec![
            Token::Byte,
            Token::Int(2),
            Token::Semicolon
        ]);
    }

    #[test]
    fn test_unterminated_comment() {
        let mut lexer = Lexer::new("test", "/* never ends");
        assert!(lexer.token().is_err());
    }

    #[test]
    fn test_bad_keyword_position() {
        let mut lexer = Lexer::new("test", "byte;\nnope");
        assert_eq!(lexer.token().unwrap(), Token::Byte);
        assert_eq!(lexer.token().unwrap(), Token::Semicolon);
        let err = lexer.token().unwrap_err();
        match err {
            FluxConvError::ScriptParse { line, col, .. } => {
                assert_eq!(line, 2);
                assert_eq!(col, 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_hex_limits() {
        assert_eq!(tokens("0x7FFFFFF"), vec![Token::Int(0x7FF_FFFF)]);
        let mut lexer = Lexer::new("test", "0x100000000");
        assert!(lexer.token().is_err());
        let mut lexer = Lexer::new("test", "0xZZ");
        assert!(lexer.token().is_err());
    }

    #[test]
    fn test_decimal_limit() {
        assert_eq!(tokens("2147483647"), vec![Token::Int(i32::MAX)]);
        let mut lexer = Lexer::new("test", "2147483648");
        assert!(lexer.token().is_err());
    }

    #[test]
    fn test_push_back() {
        let mut lexer = Lexer::new("test", "byte");
        let t = lexer.token().unwrap();
        lexer.push(t);
        assert_eq!(lexer.token().unwrap(), Token::Byte);
        assert_eq!(lexer.token().unwrap(), Token::Eof);
    }
}
