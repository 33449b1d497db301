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

//! The disk-script compiler: a small declarative language for synthesizing
//! flux tracks directly.
//!
//! ```text
//! geometry 40, 1;
//! track 0 {
//!     repeat 10 : byte 0x00;
//!     crc_begin;
//!     special_byte 0xFE;
//!     bytes 0x00, 0x00, 0x01, 0x00;
//!     crc_end;
//! }
//! ```
//!
//! Compilation is single pass: the tokenizer and recursive-descent parser
//! build a statement tree, which then executes against a synthesis engine
//! emitting FM bit cells on a 25ns / 360 RPM timeline. Every lexical or
//! parse error carries `file(line,col)` positioning.

mod engine;
mod lexer;
mod parser;

use crate::{disk::RawDisk, FluxConvError};

/// Compile and execute a disk script against a raw disk.
pub fn compile(file_name: &str, source: &str, raw_disk: &mut RawDisk) -> Result<(), FluxConvError> {
    let statements = parser::Parser::new(file_name, source).parse_program()?;

    let mut engine = engine::ScriptEngine::new(raw_disk);
    for statement in &statements {
        engine.execute(statement)?;
    }

    raw_disk.synthesized = true;
    Ok(())
}
