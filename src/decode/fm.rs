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

//! FM (single density) sector state machine, as recorded by the WD1771/1772
//! family at 288 RPM on Atari drives.
//!
//! The track driver spawns an instance whenever the separator's register pair
//! reads `(0xC7, 0xFE)` -- an IDAM with its address-mark clocking. The
//! instance reads the six ID bytes, validates the address CRC, waits a
//! bounded window for a DAM, then collects the complemented payload and the
//! data CRC.

use crate::{
    crc::crc_ccitt,
    decode::{ending_position, rotation_position, ParseOutcome},
    disk::{blank_sector, DecodedSector, DecodedTrack, RawTrack},
    flux::pll::{cell_length, PairSeparator},
    types::CoreOptions,
    MAXIMUM_SECTOR_SIZE,
};

const BUF_LEN: usize = MAXIMUM_SECTOR_SIZE + 4;

// ID field byte counts, relative to the read phase counter.
const ID_BYTES: usize = 6;

pub(crate) struct FmSectorParser {
    track: u8,
    sector: u8,
    sector_size: usize,
    read_phase: usize,
    bit_phase: u32,
    dam_bit_counter: i32,
    dam_min_time: u32,
    dam_timeout_time: u32,
    raw_start: u32,
    computed_address_crc: u16,
    recorded_address_crc: u16,
    rot_pos: f32,
    rot_start: u32,
    rot_end: u32,
    samples_per_cell: f32,
    dump_bad: bool,
    buf: Box<[u8; BUF_LEN]>,
    clock_buf: Box<[u8; BUF_LEN]>,
    times: Box<[u32; BUF_LEN]>,
}

impl FmSectorParser {
    pub fn new(track: u8, samples_per_cell: f32, raw_start: u32, dump_bad: bool) -> FmSectorParser {
        FmSectorParser {
            track,
            sector: 0,
            sector_size: 0,
            read_phase: 0,
            bit_phase: 0,
            dam_bit_counter: 0,
            dam_min_time: 0,
            dam_timeout_time: 0,
            raw_start,
            computed_address_crc: 0,
            recorded_address_crc: 0,
            rot_pos: 0.0,
            rot_start: 0,
            rot_end: 0,
            samples_per_cell,
            dump_bad,
            buf: Box::new([0; BUF_LEN]),
            clock_buf: Box::new([0; BUF_LEN]),
            times: Box::new([0; BUF_LEN]),
        }
    }

    pub fn parse(&mut self, tick: u32, clock: u8, data: u8, index_times: &[u32]) -> ParseOutcome {
        if self.read_phase < ID_BYTES {
            self.bit_phase += 1;
            if self.bit_phase == 16 {
                self.bit_phase = 0;

                if clock != 0xFF {
                    return ParseOutcome::Discard;
                }

                self.read_phase += 1;
                self.buf[self.read_phase] = data;

                if self.read_phase == ID_BYTES {
                    return self.finish_id_field(tick, index_times);
                }
            }
            ParseOutcome::Continue
        }
        else if self.read_phase == ID_BYTES {
            self.wait_for_dam(tick, clock, data)
        }
        else {
            self.bit_phase += 1;
            if self.bit_phase == 16 {
                self.bit_phase = 0;

                if clock != 0xFF {
                    log::debug!("Bad data clock: {:02X}", clock);
                }

                self.buf[self.read_phase - ID_BYTES] = data;
                self.clock_buf[self.read_phase - ID_BYTES] = clock;
                self.times[self.read_phase - ID_BYTES] = tick;

                self.read_phase += 1;
                if self.read_phase >= self.sector_size + 3 + ID_BYTES {
                    return self.finish_data_field(tick);
                }
            }
            ParseOutcome::Continue
        }
    }

    /// All six ID bytes are in: validate, locate the sector on its
    /// revolution, and arm the DAM search window.
    fn finish_id_field(&mut self, tick: u32, index_times: &[u32]) -> ParseOutcome {
        if self.buf[1] != self.track {
            return ParseOutcome::Discard;
        }

        // Byte 2 is the side indicator, nominally zero for the 1771, but it
        // is not validated: Rescue on Fractalus has garbage there.

        if self.buf[3] < 1 || self.buf[3] > 18 {
            log::debug!("Invalid sector number: {}", self.buf[3]);
            return ParseOutcome::Discard;
        }

        self.buf[0] = 0xFE;
        let computed_crc = crc_ccitt(&self.buf[0..5], None);
        let recorded_crc = ((self.buf[5] as u16) << 8) + self.buf[6] as u16;

        self.sector = self.buf[3];

        // Only the low two bits of the size code are used. Fight Night
        // (Accolade) abuses this.
        self.sector_size = 128 << (self.buf[4] & 3);

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

        self.recorded_address_crc = recorded_crc;
        self.computed_address_crc = computed_crc;

        if computed_crc != recorded_crc {
            log::warn!(
                "Track {:2}, sector {:2}: bad address CRC: {:04X} != {:04X}",
                self.track,
                self.sector,
                computed_crc,
                recorded_crc
            );

            // Emit a placeholder so downstream formats can re-mark the error.
            let mut placeholder = blank_sector(self.sector_size);
            placeholder.index = self.sector;
            placeholder.raw_start = self.raw_start;
            placeholder.raw_end = tick;
            placeholder.position = self.rot_pos;
            placeholder.ending_position = ending_position(self.rot_start, self.rot_end, tick);
            placeholder.address_mark = 0xFB;
            placeholder.recorded_address_crc = recorded_crc;
            placeholder.computed_address_crc = computed_crc;

            return ParseOutcome::Complete(placeholder);
        }

        // The WD1772 requires the DAM within 30 bytes. Count both bit cells
        // and time, with 20% slack on the time side.
        self.dam_bit_counter = 30 * 16 + 1;
        self.dam_min_time = tick.wrapping_add((11.0 * 16.0 * self.samples_per_cell) as u32);
        self.dam_timeout_time = tick.wrapping_add((30.0 * 20.0 * self.samples_per_cell) as u32);

        ParseOutcome::Continue
    }

    fn wait_for_dam(&mut self, tick: u32, clock: u8, data: u8) -> ParseOutcome {
        self.dam_bit_counter -= 1;
        if self.dam_bit_counter == 0 || tick.wrapping_sub(self.dam_timeout_time) < 0x8000_0000 {
            log::debug!(
                "FM track {}, sector {}: timeout while searching for DAM",
                self.track,
                self.sector
            );
            return ParseOutcome::Discard;
        }

        self.bit_phase += 1;

        if tick.wrapping_sub(self.dam_min_time) >= 0x8000_0000 {
            // still inside the minimum gap; early DAM-like patterns here are
            // spurious
            return ParseOutcome::Continue;
        }

        if clock == 0xC7 {
            // An IDAM seen here does NOT terminate the search: Blue Max
            // interleaves IDAM and DAM marks, and the byte/time windows above
            // already bound the search.

            if (0xF8..=0xFB).contains(&data) {
                log::debug!("DAM detected ({:02X})", data);

                self.read_phase = ID_BYTES + 1;
                self.bit_phase = 0;
                self.buf[0] = data;
                self.clock_buf[0] = clock;
                self.times[0] = tick;
            }
        }

        ParseOutcome::Continue
    }

    fn finish_data_field(&mut self, tick: u32) -> ParseOutcome {
        // CRC covers the DAM and the payload as recorded on the wire.
        let crc = crc_ccitt(&self.buf[0..self.sector_size + 1], None);
        let recorded_crc =
            ((self.buf[self.sector_size + 1] as u16) << 8) + self.buf[self.sector_size + 2] as u16;

        let mut sector = DecodedSector {
            index: self.sector,
            sector_size: self.sector_size,
            is_mfm: false,
            address_mark: self.buf[0],
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

        // payload is complemented on the wire
        for i in 0..self.sector_size {
            sector.data.push(!self.buf[i + 1]);
        }

        log::debug!(
            "Decoded FM track {:2}, sector {:2}: {} bytes, pos {:5.3}-{:5.3}, DAM {:02X}, CRC {:04X} ({})",
            self.track,
            self.sector,
            self.sector_size,
            sector.position,
            sector.ending_position,
            self.buf[0],
            recorded_crc,
            if crc == recorded_crc {
                "OK"
            }
            else {
                "bad"
            }
        );

        if self.dump_bad && crc != recorded_crc {
            log::debug!("  Index Clk Data Cells");
            for i in 0..self.sector_size + 1 {
                let cells = if i > 0 {
                    (self.times[i].wrapping_sub(self.times[i - 1])) as f32 / self.samples_per_cell
                }
                else {
                    0.0
                };
                log::debug!(
                    "  {:4}  {:02X} | {:02X} | {:+6.1}{}",
                    i as i32 - 1,
                    self.clock_buf[i],
                    self.buf[i],
                    cells,
                    if i > 0 && self.clock_buf[i] != 0xFF { " <!>" } else { "" }
                );
            }
        }

        ParseOutcome::Complete(sector)
    }
}

/// Decode one raw track as Atari FM: spawn a parser per IDAM and collect
/// whatever sectors complete.
pub fn decode_track_fm(raw_track: &RawTrack, dst_track: &mut DecodedTrack, track_step: u8, opts: &CoreOptions) {
    if raw_track.transitions.len() < 2 {
        return;
    }

    // Atari FM produces 250,000 cells per second at 288 RPM; derive the
    // effective samples-per-cell from the track's actual revolution time.
    let cells_per_rev = 250_000.0 / (288.0 / 60.0) * if opts.high_density { 2.0 } else { 1.0 };
    let scks_per_cell = raw_track.samples_per_rev / cells_per_rev * opts.clock_period_adjust;

    let cell_len = cell_length(raw_track.samples_per_rev, cells_per_rev, opts.clock_period_adjust);
    let logical_track = raw_track.phys_track / track_step.max(1);

    let mut parsers: Vec<FmSectorParser> = Vec::new();

    for (tick, clock, data) in PairSeparator::new(&raw_track.transitions, cell_len, cell_len / 3) {
        parsers.retain_mut(|parser| match parser.parse(tick, clock, data, &raw_track.index_times) {
            ParseOutcome::Continue => true,
            ParseOutcome::Discard => false,
            ParseOutcome::Complete(sector) => {
                dst_track.sectors.push(sector);
                false
            }
        });

        if clock == 0xC7 && data == 0xFE {
            parsers.push(FmSectorParser::new(
                logical_track,
                scks_per_cell as f32,
                tick,
                opts.dump_bad_sectors,
            ));
        }
    }
}
