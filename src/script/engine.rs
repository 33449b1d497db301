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

//! Disk-script synthesis engine.
//!
//! Executes the parsed statement tree against a raw disk, emitting FM bit
//! cells on a 25ns-per-tick, 360 RPM timeline (8,333,333 ticks per
//! revolution). Each data byte spends 16 cells of 160 ticks with pulses
//! centered in their cells; a running CRC-CCITT register serves the
//! `crc_begin`/`crc_end` bracket. Closing a track pads the rest of the
//! revolution and duplicates the whole stream one revolution later, so
//! downstream consumers always see two index-aligned revolutions.

use crate::{
    crc::{crc_ccitt_byte, CRC_CCITT_INITIAL},
    disk::RawDisk,
    script::parser::Statement,
    FluxConvError,
};

/// Ticks per revolution at 25ns / 360 RPM.
const TICKS_PER_REV: u32 = 8_333_333;
/// One FM bit cell pair (clock cell + data cell) is 320 ticks; each half
/// cell is 160 ticks with the pulse at +80.
const CELL_TICKS: u32 = 160;
const PULSE_OFFSET: u32 = 80;

pub(crate) struct ScriptEngine<'a> {
    raw_disk: &'a mut RawDisk,
    /// Physical track index of the open track context, side 0.
    current: Option<usize>,
    current_logical_track: i32,
    track_pos: u32,
    crc: u16,
    cell_frac_accum: i32,
}

impl<'a> ScriptEngine<'a> {
    pub fn new(raw_disk: &'a mut RawDisk) -> ScriptEngine<'a> {
        for side in &mut raw_disk.tracks {
            for track in side {
                track.samples_per_rev = TICKS_PER_REV as f64;
                track.splice = None;
            }
        }

        ScriptEngine {
            raw_disk,
            current: None,
            current_logical_track: 0,
            track_pos: 0,
            crc: 0,
            cell_frac_accum: 128,
        }
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<(), FluxConvError> {
        match statement {
            Statement::Block(children) => {
                for child in children {
                    self.execute(child)?;
                }
                Ok(())
            }
            Statement::Track { track, side, body } => {
                self.begin_track(*track, side.unwrap_or(0))?;
                self.execute(body)?;
                self.end_track();
                Ok(())
            }
            Statement::Repeat { count, body } => {
                for _ in 0..*count {
                    self.execute(body)?;
                }
                Ok(())
            }
            Statement::Byte { special, value } => {
                if !(0..=255).contains(value) {
                    return Err(FluxConvError::ScriptExec(format!("Invalid data byte: {}", value)));
                }
                self.emit_byte(*special, *value as u8)
            }
            Statement::Bytes(data) => {
                for &byte in data {
                    self.emit_byte(false, byte)?;
                }
                Ok(())
            }
            Statement::PadBits { count, value } => {
                if !(0..=1_000_000).contains(count) {
                    return Err(FluxConvError::ScriptExec(format!(
                        "Invalid pad bit count: {}",
                        count
                    )));
                }
                if !(0..=1).contains(value) {
                    return Err(FluxConvError::ScriptExec(format!(
                        "Invalid pad bit value: {}",
                        value
                    )));
                }
                self.emit_pad_bits(*count as u32, *value != 0)
            }
            Statement::CrcBegin => {
                self.crc = CRC_CCITT_INITIAL;
                Ok(())
            }
            Statement::CrcEnd => {
                // emitting the CRC bytes changes the running CRC, so latch it
                let crc = self.crc;
                self.emit_byte(false, (crc >> 8) as u8)?;
                self.emit_byte(false, crc as u8)
            }
            Statement::Flux(count) => {
                if !(1..=1_000_000).contains(count) {
                    return Err(FluxConvError::ScriptExec(format!("Invalid cell delay: {}", count)));
                }
                self.emit_cell_delay(cell_delay_units(*count), true)
            }
            Statement::NoFlux(count) => {
                if !(1..=1_000_000).contains(count) {
                    return Err(FluxConvError::ScriptExec(format!("Invalid cell delay: {}", count)));
                }
                self.emit_cell_delay(cell_delay_units(*count), false)
            }
            Statement::Geometry { tracks, sides } => self.set_geometry(*tracks, *sides),
        }
    }

    fn begin_track(&mut self, track: i32, side: i32) -> Result<(), FluxConvError> {
        let step = self.raw_disk.track_step as i32;
        if track < 0 || track * step >= crate::disk::MAX_PHYS_TRACKS as i32 {
            return Err(FluxConvError::ScriptExec(format!("Invalid track number: {}", track)));
        }
        if side < 0 || side >= self.raw_disk.side_count as i32 {
            return Err(FluxConvError::ScriptExec(format!("Invalid side number: {}", side)));
        }

        let phys_track = (track * step) as usize;
        self.current = Some(phys_track);
        self.current_logical_track = track;

        let raw_track = &mut self.raw_disk.tracks[0][phys_track];
        raw_track.index_times = vec![0, TICKS_PER_REV, TICKS_PER_REV * 2];
        raw_track.transitions.clear();

        self.track_pos = 0;
        Ok(())
    }

    fn end_track(&mut self) {
        let phys_track = self.current.take().expect("track context");
        let raw_track = &mut self.raw_disk.tracks[0][phys_track];

        let end_pos = raw_track.index_times[1];

        if self.track_pos > end_pos {
            const TICKS_TO_BITS: f32 = 1.0 / (CELL_TICKS as f32);
            log::warn!(
                "Overrun on track {} ({:.1} bit cells > {:.1} bit cells). Track will be truncated.",
                self.current_logical_track,
                self.track_pos as f32 * TICKS_TO_BITS,
                end_pos as f32 * TICKS_TO_BITS
            );

            let keep = raw_track.transitions.partition_point(|&t| t < end_pos);
            raw_track.transitions.truncate(keep);

            self.track_pos = end_pos;
        }

        raw_track.splice = Some((self.track_pos, end_pos));

        // pad the rest of the revolution with FF-style pulses
        while self.track_pos + CELL_TICKS < end_pos {
            raw_track.transitions.push(self.track_pos + PULSE_OFFSET);
            self.track_pos += CELL_TICKS;
        }

        // duplicate the stream one revolution later
        let len = raw_track.transitions.len();
        for i in 0..len {
            let t = raw_track.transitions[i];
            raw_track.transitions.push(t + end_pos);
        }
    }

    fn set_geometry(&mut self, tracks: i32, sides: i32) -> Result<(), FluxConvError> {
        if !(1..=84).contains(&tracks) {
            return Err(FluxConvError::ScriptExec(format!("Invalid track count: {}", tracks)));
        }
        if !(1..=2).contains(&sides) {
            return Err(FluxConvError::ScriptExec(format!("Invalid side count: {}", sides)));
        }

        self.raw_disk.track_count = tracks as u8;
        self.raw_disk.track_step = if tracks < 42 { 2 } else { 1 };
        self.raw_disk.side_count = sides as u8;
        Ok(())
    }

    fn emit_byte(&mut self, special: bool, byte: u8) -> Result<(), FluxConvError> {
        let Some(phys_track) = self.current else {
            return Err(FluxConvError::ScriptExec(
                "Cannot emit data byte outside of a track.".to_string(),
            ));
        };

        self.crc = crc_ccitt_byte(byte, self.crc);

        let raw_track = &mut self.raw_disk.tracks[0][phys_track];

        let mut clock_bits: u8 = if special { 0xC7 } else { 0xFF };
        let mut data_bits = byte;

        for _ in 0..8 {
            if clock_bits & 0x80 != 0 {
                raw_track.transitions.push(self.track_pos + PULSE_OFFSET);
            }
            clock_bits = clock_bits.wrapping_shl(1);
            self.track_pos += CELL_TICKS;

            if data_bits & 0x80 != 0 {
                raw_track.transitions.push(self.track_pos + PULSE_OFFSET);
            }
            data_bits = data_bits.wrapping_shl(1);
            self.track_pos += CELL_TICKS;
        }

        Ok(())
    }

    fn emit_pad_bits(&mut self, count: u32, set: bool) -> Result<(), FluxConvError> {
        let Some(phys_track) = self.current else {
            return Err(FluxConvError::ScriptExec(
                "Cannot emit pad bits outside of a track.".to_string(),
            ));
        };

        let raw_track = &mut self.raw_disk.tracks[0][phys_track];

        for _ in 0..count {
            raw_track.transitions.push(self.track_pos + PULSE_OFFSET);
            self.track_pos += CELL_TICKS;

            if set {
                raw_track.transitions.push(self.track_pos + PULSE_OFFSET);
            }
            self.track_pos += CELL_TICKS;
        }

        Ok(())
    }

    /// Advance time through the fractional accumulator; with `flux` set,
    /// emit a transition at the accumulated position.
    fn emit_cell_delay(&mut self, count256: i64, flux: bool) -> Result<(), FluxConvError> {
        let Some(phys_track) = self.current else {
            return Err(FluxConvError::ScriptExec(
                "Cannot emit flux outside of a track.".to_string(),
            ));
        };

        self.cell_frac_accum += count256 as i32;

        let mut delay = self.cell_frac_accum >> 8;
        if flux && delay < 1 {
            delay = 1;
        }

        self.cell_frac_accum -= delay << 8;
        self.track_pos = (self.track_pos as i64 + delay as i64) as u32;

        if flux {
            self.raw_disk.tracks[0][phys_track].transitions.push(self.track_pos);
        }

        Ok(())
    }
}

/// Convert a `flux`/`no_flux` count (hundredths of a bit cell) into
/// 1/256-tick accumulator units, rounded.
fn cell_delay_units(count: i32) -> i64 {
    (count as i64 * CELL_TICKS as i64 * 256 + 50) / 100
}
