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

//! Disk-script recursive-descent parser and statement tree.

use crate::{
    script::lexer::{Lexer, Token},
    FluxConvError,
};

/// One statement of the script tree. Values stay as parsed integers; range
/// validation happens at execution time (except `bytes` lists, which are
/// checked while parsing).
#[derive(Clone, Debug)]
pub(crate) enum Statement {
    Block(Vec<Statement>),
    Track {
        track: i32,
        side: Option<i32>,
        body: Box<Statement>,
    },
    Repeat {
        count: i32,
        body: Box<Statement>,
    },
    Byte {
        special: bool,
        value: i32,
    },
    Bytes(Vec<u8>),
    PadBits {
        count: i32,
        value: i32,
    },
    CrcBegin,
    CrcEnd,
    Flux(i32),
    NoFlux(i32),
    Geometry {
        tracks: i32,
        sides: i32,
    },
}

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(file_name: &'a str, source: &'a str) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(file_name, source),
        }
    }

    /// Parse the whole script into a statement list.
    pub fn parse_program(&mut self) -> Result<Vec<Statement>, FluxConvError> {
        let mut statements = Vec::new();

        loop {
            let token = self.lexer.token()?;
            if token == Token::Eof {
                break;
            }
            self.lexer.push(token);

            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement, FluxConvError> {
        let statement = match self.lexer.token()? {
            Token::Track => {
                let track = self.parse_value()?;

                let side = match self.lexer.token()? {
                    Token::Comma => Some(self.parse_value()?),
                    other => {
                        self.lexer.push(other);
                        None
                    }
                };

                let body = self.parse_child_statement()?;

                // track and repeat own their terminators
                return Ok(Statement::Track {
                    track,
                    side,
                    body: Box::new(body),
                });
            }
            Token::Repeat => {
                let count = self.parse_value()?;
                let body = self.parse_child_statement()?;

                return Ok(Statement::Repeat {
                    count,
                    body: Box::new(body),
                });
            }
            Token::Byte => Statement::Byte {
                special: false,
                value: self.parse_value()?,
            },
            Token::SpecialByte => Statement::Byte {
                special: true,
                value: self.parse_value()?,
            },
            Token::Bytes => return self.parse_bytes(),
            Token::PadBits => {
                let count = self.parse_value()?;
                self.expect(Token::Comma, "Expected ','")?;
                let value = self.parse_value()?;

                Statement::PadBits { count, value }
            }
            Token::CrcBegin => Statement::CrcBegin,
            Token::CrcEnd => Statement::CrcEnd,
            Token::Flux => Statement::Flux(self.parse_value()?),
            Token::NoFlux => Statement::NoFlux(self.parse_value()?),
            Token::Geometry => {
                let tracks = self.parse_value()?;
                self.expect(Token::Comma, "Expected side count after track count")?;
                let sides = self.parse_value()?;

                Statement::Geometry { tracks, sides }
            }
            _ => return Err(self.lexer.error("Expected statement")),
        };

        self.expect(Token::Semicolon, "Expected ';' at end of statement")?;
        Ok(statement)
    }

    /// A child statement is either `: stmt;` or a braced block.
    fn parse_child_statement(&mut self) -> Result<Statement, FluxConvError> {
        match self.lexer.token()? {
            Token::Colon => self.parse_statement(),
            Token::LBrace => {
                let mut children = Vec::new();

                loop {
                    let token = self.lexer.token()?;
                    if token == Token::RBrace {
                        break;
                    }
                    self.lexer.push(token);

                    children.push(self.parse_statement()?);
                }

                if children.len() == 1 {
                    Ok(children.pop().unwrap())
                }
                else {
                    Ok(Statement::Block(children))
                }
            }
            _ => Err(self.lexer.error("Expected child statement")),
        }
    }

    fn parse_bytes(&mut self) -> Result<Statement, FluxConvError> {
        let mut data = Vec::new();

        loop {
            match self.lexer.token()? {
                Token::Int(value) => {
                    if !(0..=255).contains(&value) {
                        return Err(self.lexer.error("Value out of range (must be 0-255)"));
                    }
                    data.push(value as u8);
                }
                _ => return Err(self.lexer.error("Expected integral constant")),
            }

            match self.lexer.token()? {
                Token::Semicolon => break,
                Token::Comma => {}
                _ => return Err(self.lexer.error("Expected ',' or end of statement")),
            }
        }

        Ok(Statement::Bytes(data))
    }

    fn parse_value(&mut self) -> Result<i32, FluxConvError> {
        match self.lexer.token()? {
            Token::Int(value) => Ok(value),
            _ => Err(self.lexer.error("Expected value")),
        }
    }

    fn expect(&mut self, token: Token, message: &str) -> Result<(), FluxConvError> {
        if self.lexer.token()? == token {
            Ok(())
        }
        else {
            Err(self.lexer.error(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<Vec<Statement>, FluxConvError> {
        Parser::new("test", src).parse_program()
    }

    #[test]
    fn test_track_with_block() {
        let prog = parse("track 3, 1 { byte 1; byte 2; }").unwrap();
        assert_eq!(prog.len(), 1);
        match &prog[0] {
            Statement::Track { track, side, body } => {
                assert_eq!(*track, 3);
                assert_eq!(*side, Some(1));
                assert!(matches!(**body, Statement::Block(ref v) if v.len() == 2));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_track_with_colon_form() {
        let prog = parse("track 0 : byte 0xFF;").unwrap();
        match &prog[0] {
            Statement::Track { side, body, .. } => {
                assert_eq!(*side, None);
                assert!(matches!(**body, Statement::Byte { special: false, value: 0xFF }));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_single_child_block_collapses() {
        let prog = parse("repeat 5 { byte 1; }").unwrap();
        match &prog[0] {
            Statement::Repeat { count, body } => {
                assert_eq!(*count, 5);
                assert!(matches!(**body, Statement::Byte { .. }));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_bytes_list() {
        let prog = parse("bytes 1, 2, 0xFF;").unwrap();
        assert!(matches!(&prog[0], Statement::Bytes(v) if v == &vec![1, 2, 0xFF]));
    }

    #[test]
    fn test_bytes_range_checked_at_parse() {
        assert!(parse("bytes 1, 300;").is_err());
    }

    #[test]
    fn test_missing_semicolon() {
        assert!(parse("byte 1").is_err());
    }

    #[test]
    fn test_pad_bits_needs_two_values() {
        assert!(parse("pad_bits 5;").is_err());
        assert!(parse("pad_bits 5, 1;").is_ok());
    }

    #[test]
    fn test_geometry_needs_two_values() {
        assert!(parse("geometry 40;").is_err());
        assert!(parse("geometry 40, 1;").is_ok());
    }

    #[test]
    fn test_nested_structures() {
        let prog = parse("track 0 { repeat 2 { crc_begin; byte 1; crc_end; } flux 100; }").unwrap();
        assert_eq!(prog.len(), 1);
    }
}
