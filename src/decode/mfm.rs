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

//! Generic MFM (double density) sector state machine and the shared MFM
//! track driver.
//!
//! The on-disk sync mark is an MFM-encoded 0xA1 with a deliberately missing
//! clock pulse between bits 4 and 5; at the register-pair level it reads as
//! `(0x0A, 0xA1)`. The track driver demands three such syncs, spaced exactly
//! one byte apart, before spawning a sector instance (or, for the Amiga
//! variant, spawns on the second sync).

use crate::{
    crc::crc_ccitt,
    decode::{amiga::AmigaSectorParser, ending_position, rotation_position, ParseOutcome},
    disk::{DecodedSector, DecodedTrack, RawTrack},
    flux::pll::{cell_length, PairSeparator},
    types::CoreOptions,
    MAXIMUM_SECTOR_SIZE,
};

const BUF_LEN: usize = MAXIMUM_SECTOR_SIZE + 6;

// read_phase landmarks
const ID_DONE: usize = 7;
const SYNC_2: usize = 8;
const SYNC_3: usize = 9;
const DAM_WAIT: usize = 10;

pub(crate) struct MfmSectorParser {
    track: u8,
    side: u8,
    sector: u8,
    sector_size: usize,
    read_phase: usize,
    bit_phase: u32,
    raw_start: u32,
    computed_address_crc: u16,
    recorded_address_crc: u16,
    rot_pos: f32,
    rot_start: u32,
    rot_end: u32,
    buf: Box<[u8; BUF_LEN]>,
}

impl MfmSectorParser {
    pub fn new(track: u8, side: u8, raw_start: u32) -> MfmSectorParser {
        MfmSectorParser {
            track,
            side,
            sector: 0,
            sector_size: 0,
            read_phase: 0,
            bit_phase: 0,
            raw_start,
            computed_address_crc: 0,
            recorded_address_crc: 0,
            rot_pos: 0.0,
            rot_start: 0,
            rot_end: 0,
            buf: Box::new([0; BUF_LEN]),
        }
    }

    pub fn parse(&mut self, tick: u32, clock: u8, data: u8, index_times: &[u32]) -> ParseOutcome {
        if self.read_phase < ID_DONE {
            self.bit_phase += 1;
            if self.bit_phase == 16 {
                self.bit_phase = 0;

                self.buf[self.read_phase + 3] = data;
                self.read_phase += 1;

                if self.read_phase == ID_DONE {
                    return self.finish_id_field(tick, index_times);
                }
            }
            ParseOutcome::Continue
        }
        else if self.read_phase == ID_DONE {
            // wait for the first data-field sync
            if (clock & 0x7F) == 0x0A && data == 0xA1 {
                self.read_phase += 1;
            }
            ParseOutcome::Continue
        }
        else if self.read_phase == SYNC_2 || self.read_phase == SYNC_3 {
            if (clock & 0x7F) == 0x0A {
                if data != 0xA1 {
                    self.read_phase = ID_DONE;
                    return ParseOutcome::Continue;
                }

                self.read_phase += 1;
                self.bit_phase = 0;
                self.buf[0] = data;
                self.buf[1] = data;
                self.buf[2] = data;
            }
            ParseOutcome::Continue
        }
        else if self.read_phase == DAM_WAIT {
            self.bit_phase += 1;
            if self.bit_phase == 16 {
                if clock == 0x0A && data == 0xA1 {
                    // further sync bytes keep the byte clock aligned
                    self.bit_phase = 0;
                }
                else if (0xF8..=0xFB).contains(&data) {
                    self.read_phase += 1;
                    self.bit_phase = 0;
                    self.buf[3] = data;
                }
                else {
                    return ParseOutcome::Discard;
                }
            }
            ParseOutcome::Continue
        }
        else {
            self.bit_phase += 1;
            if self.bit_phase == 16 {
                self.buf[self.read_phase - ID_DONE] = data;
                self.bit_phase = 0;

                self.read_phase += 1;
                if self.read_phase >= ID_DONE + self.sector_size + 6 {
                    return self.finish_data_field(tick);
                }
            }
            ParseOutcome::Continue
        }
    }

    /// ID bytes are buffered behind a virtual A1 A1 A1 prefix so the CRC can
    /// run over the wire framing.
    fn finish_id_field(&mut self, tick: u32, index_times: &[u32]) -> ParseOutcome {
        if self.buf[3] != 0xFE {
            return ParseOutcome::Discard;
        }

        if self.buf[4] != self.track {
            log::warn!(
                "Track number mismatch on track {}.{}: {:02X} != {:02X}",
                self.track,
                self.side,
                self.buf[4],
                self.track
            );
            return ParseOutcome::Discard;
        }

        self.sector_size = 128 << (self.buf[7] & 3);

        self.buf[0] = 0xA1;
        self.buf[1] = 0xA1;
        self.buf[2] = 0xA1;
        let computed_crc = crc_ccitt(&self.buf[0..8], None);
        let recorded_crc = ((self.buf[8] as u16) << 8) + self.buf[9] as u16;

        self.recorded_address_crc = recorded_crc;
        self.computed_address_crc = computed_crc;

        if computed_crc != recorded_crc {
            log::warn!(
                "Track {:2}, sector {:2}: CRC failure on sector header: {:04X} != {:04X}",
                self.track,
                self.buf[6],
                computed_crc,
                recorded_crc
            );
            return ParseOutcome::Discard;
        }

        self.sector = self.buf[6];

        let Some(rev) = rotation_position(index_times, tick) else {
            log::debug!(
                "Skipping track {}, sector {} outside the indexed revolutions",
                self.track,
                self.sector
            );
            return ParseOutcome::Discard;
        };

        self.rot_start = rev.start;
        self.rot_end = rev.end;
        self.rot_pos = rev.position;

        log::debug!(
            "Found track {}, sector {} at position {:4.2}",
            self.track,
            self.sector,
            self.rot_pos
        );

        ParseOutcome::Continue
    }

    fn finish_data_field(&mut self, tick: u32) -> ParseOutcome {
        // CRC covers the A1 triple, the DAM, and the payload as recorded.
        let crc = crc_ccitt(&self.buf[0..self.sector_size + 4], None);
        let recorded_crc =
            ((self.buf[self.sector_size + 4] as u16) << 8) + self.buf[self.sector_size + 5] as u16;

        let mut sector = DecodedSector {
            index: self.sector,
            sector_size: self.sector_size,
            is_mfm: true,
            address_mark: self.buf[3],
            recorded_address_crc: self.recorded_address_crc,
            computed_address_crc: self.computed_address_crc,
            recorded_crc: recorded_crc as u32,
            computed_crc: crc as u32,
            data: Vec::with_capacity(self.sector_size),
            weak_offset: None,
            position: self.rot_pos,
            ending_position: ending_position(self.rot_start, self.rot_end, tick),
            raw_start: self.raw_start,
            raw_end: tick,
        };

        for i in 0..self.sector_size {
            sector.data.push(!self.buf[i + 4]);
        }

        log::debug!(
            "Decoded MFM track {:2}, sector {:2} with {} bytes, DAM {:02X}, recorded CRC {:04X} (computed {:04X}) [pos {:.3}-{:.3}]",
            self.track,
            self.sector,
            self.sector_size,
            self.buf[3],
            recorded_crc,
            crc,
            sector.position,
            sector.ending_position
        );

        ParseOutcome::Complete(sector)
    }
}

/// Decode one raw track as MFM. `decode_amiga` switches to the Amiga
/// trackdisk state machine; `use_300rpm` selects the PC/Amiga cell rate over
/// the Atari 288 RPM rate.
pub fn decode_track_mfm(
    raw_track: &RawTrack,
    dst_track: &mut DecodedTrack,
    track_step: u8,
    opts: &CoreOptions,
    decode_amiga: bool,
    use_300rpm: bool,
) {
    if raw_track.transitions.len() < 2 {
        return;
    }

    let cells_per_rev = 500_000.0 / (if use_300rpm { 300.0 } else { 288.0 } / 60.0)
        * if opts.high_density { 2.0 } else { 1.0 };
    let cell_len = cell_length(raw_track.samples_per_rev, cells_per_rev, opts.clock_period_adjust);

    let logical_track = raw_track.phys_track / track_step.max(1);

    let mut parsers: Vec<MfmSectorParser> = Vec::new();
    let mut amiga_parsers: Vec<AmigaSectorParser> = Vec::new();

    // Counts bits between sync marks: three `(0x0A, 0xA1)` syncs exactly 16
    // bit cells apart announce a sector.
    let mut sync_state = 0u32;

    for (tick, clock, data) in PairSeparator::new(&raw_track.transitions, cell_len, cell_len / 2) {
        if decode_amiga {
            amiga_parsers.retain_mut(|parser| match parser.parse(tick, data, &raw_track.index_times) {
                ParseOutcome::Continue => true,
                ParseOutcome::Discard => false,
                ParseOutcome::Complete(sector) => {
                    dst_track.sectors.push(sector);
                    false
                }
            });
        }
        else {
            parsers.retain_mut(|parser| match parser.parse(tick, clock, data, &raw_track.index_times) {
                ParseOutcome::Continue => true,
                ParseOutcome::Discard => false,
                ParseOutcome::Complete(sector) => {
                    dst_track.sectors.push(sector);
                    false
                }
            });
        }

        if sync_state == 0 {
            if clock == 0x0A && data == 0xA1 {
                sync_state += 1;
            }
        }
        else if sync_state == 16 {
            if clock == 0x0A && data == 0xA1 {
                sync_state += 1;

                if decode_amiga {
                    amiga_parsers.push(AmigaSectorParser::new(
                        raw_track.phys_track,
                        raw_track.side,
                        tick,
                    ));
                    sync_state = 0;
                }
            }
            else {
                sync_state = 0;
            }
        }
        else if sync_state == 32 {
            if clock == 0x0A && data == 0xA1 {
                parsers.push(MfmSectorParser::new(logical_track, raw_track.side, tick));
            }
            sync_state = 0;
        }
        else {
            sync_state += 1;
        }
    }
}
