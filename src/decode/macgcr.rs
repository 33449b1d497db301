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

//! Macintosh variable-speed 6-and-2 GCR track state machine (400K/800K
//! Sony drives).
//!
//! The drive spins faster toward the center in five 16-track zones, keeping
//! the linear bit density roughly constant; the bit cell is 2.02us
//! (a 7.8336 MHz clock divided by 16), not an even 2us. The data field
//! carries 524 bytes (512 payload plus 12 tag bytes) under three chained
//! 8-bit checksums with rotate and carry feedback; the exact operation
//! ordering in the decode loop is load-bearing for real disks.

use crate::{
    decode::{ending_position, rotation_position},
    disk::{DecodedSector, DecodedTrack, RawTrack},
    flux::pll::{cell_length, GcrPhase, GcrSeparator, GcrStep},
    gcr::GCR6_DECODE,
    types::CoreOptions,
};

const DATA_FIELD_LEN: usize = 704;
const ADDRESS_FIELD_LEN: usize = 5;

/// Rotational speed for a physical track, per the five Sony speed zones.
pub fn mac_track_rpm(phys_track: u8) -> f64 {
    match phys_track {
        0..=15 => 394.0,
        16..=31 => 429.0,
        32..=47 => 472.0,
        48..=63 => 525.0,
        _ => 590.0,
    }
}

/// Bit cells per revolution for a physical track: 2.02us cells at the zone
/// speed.
pub fn mac_cells_per_rev(phys_track: u8) -> f64 {
    1_000_000.0 / 2.02 / (mac_track_rpm(phys_track) / 60.0)
}

enum MarkState {
    WaitFf,
    WaitD5,
    WaitAa,
    WaitMark,
    Address(usize),
    Data(usize),
}

pub fn decode_track_macgcr(raw_track: &RawTrack, dst_track: &mut DecodedTrack, opts: &CoreOptions) {
    if raw_track.transitions.len() < 2 {
        return;
    }

    let cells_per_rev = mac_cells_per_rev(raw_track.phys_track);
    let cell_len = cell_length(raw_track.samples_per_rev, cells_per_rev, opts.clock_period_adjust);

    let mut bit_state = 0u32;
    let mut mark_state = MarkState::WaitFf;

    let mut sector_headers = 0u32;
    let mut data_sectors = 0u32;
    let mut good_sectors = 0u32;

    let mut sector_index: Option<u8> = None;
    let mut sector_position = 0.0f32;
    let mut rot_start = 0u32;
    let mut rot_end = 0u32;

    let mut buf = [0u8; DATA_FIELD_LEN];
    let mut header = [0u8; ADDRESS_FIELD_LEN];

    for step in GcrSeparator::new(&raw_track.transitions, cell_len, cell_len / 2, GcrPhase::Banded) {
        let (tick, shifter) = match step {
            GcrStep::Resync => {
                bit_state = 0;
                continue;
            }
            GcrStep::Bit { tick, shifter } => (tick, shifter),
        };

        if bit_state != 0 {
            bit_state += 1;
            if bit_state == 8 {
                bit_state = 0;
            }
            continue;
        }

        if shifter & 0x80 == 0 {
            continue;
        }
        bit_state = 1;

        mark_state = match mark_state {
            MarkState::WaitFf => {
                if shifter == 0xFF {
                    MarkState::WaitD5
                }
                else {
                    MarkState::WaitFf
                }
            }
            MarkState::WaitD5 => match shifter {
                0xD5 => MarkState::WaitAa,
                0xFF => MarkState::WaitD5,
                _ => MarkState::WaitFf,
            },
            MarkState::WaitAa => match shifter {
                0xAA => MarkState::WaitMark,
                0xFF => MarkState::WaitD5,
                _ => MarkState::WaitFf,
            },
            MarkState::WaitMark => match shifter {
                0x96 => MarkState::Address(0),
                0xAD => {
                    if sector_index.is_some() {
                        MarkState::Data(0)
                    }
                    else {
                        MarkState::WaitFf
                    }
                }
                0xFF => MarkState::WaitD5,
                _ => MarkState::WaitFf,
            },
            MarkState::Address(i) => {
                header[i] = shifter;

                if i + 1 < ADDRESS_FIELD_LEN {
                    MarkState::Address(i + 1)
                }
                else {
                    // track-lo, sector, track-hi+side, format, checksum
                    let mut decoded = [0u8; ADDRESS_FIELD_LEN];
                    let mut checksum = 0u8;
                    for j in 0..ADDRESS_FIELD_LEN {
                        decoded[j] = GCR6_DECODE[header[j] as usize];
                        checksum ^= decoded[j];
                    }

                    if checksum == 0 {
                        let track = decoded[0].wrapping_add((decoded[2] & 1) << 6);
                        let side = if decoded[2] & 0x20 != 0 { 1 } else { 0 };

                        if track != raw_track.phys_track || side != raw_track.side {
                            // cross-track or cross-side header from a mis-seek
                            log::debug!(
                                "Ignoring sector header -- track {}, side {}, sector {} is on the wrong track.",
                                track,
                                side,
                                decoded[1]
                            );
                            sector_index = None;
                        }
                        else {
                            log::debug!(
                                "Sector header {:02X} {:02X} {:02X} {:02X} {:02X} (checksum OK)",
                                decoded[0],
                                decoded[1],
                                decoded[2],
                                decoded[3],
                                decoded[4]
                            );

                            if let Some(rev) = rotation_position(&raw_track.index_times, tick) {
                                rot_start = rev.start;
                                rot_end = rev.end;
                                sector_position = rev.position;
                                sector_index = Some(decoded[1]);
                            }
                            else {
                                log::debug!(
                                    "Skipping track {}, sector {} outside the indexed revolutions",
                                    raw_track.phys_track,
                                    decoded[1]
                                );
                                sector_index = None;
                            }
                        }
                    }
                    else {
                        log::debug!(
                            "Sector header {:02X} {:02X} {:02X} {:02X} {:02X} (checksum BAD)",
                            decoded[0],
                            decoded[1],
                            decoded[2],
                            decoded[3],
                            decoded[4]
                        );
                        sector_index = None;
                    }

                    sector_headers += 1;
                    MarkState::WaitFf
                }
            }
            MarkState::Data(i) => {
                buf[i] = shifter;

                if i + 1 < DATA_FIELD_LEN {
                    MarkState::Data(i + 1)
                }
                else {
                    if let Some(sector) = decode_data_field(
                        &buf,
                        sector_index,
                        sector_position,
                        rot_start,
                        rot_end,
                        tick,
                        raw_track,
                    ) {
                        data_sectors += 1;
                        if sector.recorded_crc == sector.computed_crc {
                            good_sectors += 1;
                        }
                        dst_track.sectors.push(sector);
                    }

                    MarkState::WaitD5
                }
            }
        };
    }

    log::debug!(
        "macgcr track {}.{}: {} sector headers, {} data sectors, {} good sectors decoded",
        raw_track.phys_track,
        raw_track.side,
        sector_headers,
        data_sectors,
        good_sectors
    );
}

/// Decode the 704-byte data field: 174 full three-byte groups plus a partial
/// group cover the 524 recorded bytes, followed by three checksum bytes.
fn decode_data_field(
    buf: &[u8; DATA_FIELD_LEN],
    sector_index: Option<u8>,
    sector_position: f32,
    rot_start: u32,
    rot_end: u32,
    tick: u32,
    raw_track: &RawTrack,
) -> Option<DecodedSector> {
    let expected = sector_index?;

    // the data field restates the sector number
    let marked_sector = GCR6_DECODE[buf[0] as usize];
    if marked_sector != expected {
        log::debug!("Rejecting sector {} (expected sector {})", marked_sector, expected);
        return None;
    }

    let mut decbuf = [0u8; 528];

    let mut checksum_a = 0u8;
    let mut checksum_b = 0u8;
    let mut checksum_c = 0u8;
    let mut invalid = 0u32;

    for i in 0..175 {
        let x0 = GCR6_DECODE[buf[i * 4 + 1] as usize];
        let x1 = GCR6_DECODE[buf[i * 4 + 2] as usize];
        let x2 = GCR6_DECODE[buf[i * 4 + 3] as usize];
        let x3 = GCR6_DECODE[buf[i * 4 + 4] as usize];

        invalid += (x0 >> 7) as u32;
        invalid += (x1 >> 7) as u32;
        invalid += (x2 >> 7) as u32;
        invalid += (x3 >> 7) as u32;

        checksum_c = checksum_c.rotate_left(1);

        // The XOR against the running checksum comes before the carry-chained
        // sum; this ordering is required to decode real disks.
        let mut y0 = x1.wrapping_add((x0 << 2) & 0xC0);
        y0 ^= checksum_c;

        let sum_a = checksum_a as u32 + y0 as u32 + (checksum_c & 1) as u32;
        checksum_a = sum_a as u8;
        let mut carry = sum_a >> 8;

        let mut y1 = x2.wrapping_add((x0 << 4) & 0xC0);
        y1 ^= checksum_a;

        let sum_b = checksum_b as u32 + y1 as u32 + carry;
        checksum_b = sum_b as u8;
        carry = sum_b >> 8;

        decbuf[i * 3] = y0;
        decbuf[i * 3 + 1] = y1;

        if i < 174 {
            let mut y2 = x3.wrapping_add((x0 << 6) & 0xC0);
            y2 ^= checksum_b;

            let sum_c = checksum_c as u32 + y2 as u32 + carry;
            checksum_c = sum_c as u8;
            decbuf[i * 3 + 2] = y2;
        }
    }

    // three trailing GCR bytes hold the expected checksums
    let z0 = GCR6_DECODE[buf[175 * 4] as usize];
    let z1 = GCR6_DECODE[buf[175 * 4 + 1] as usize];
    let z2 = GCR6_DECODE[buf[175 * 4 + 2] as usize];
    let z3 = GCR6_DECODE[buf[175 * 4 + 3] as usize];
    invalid += (z0 >> 7) as u32;
    invalid += (z1 >> 7) as u32;
    invalid += (z2 >> 7) as u32;
    invalid += (z3 >> 7) as u32;

    let dec_check_a = z1.wrapping_add((z0 << 2) & 0xC0);
    let dec_check_b = z2.wrapping_add((z0 << 4) & 0xC0);
    let dec_check_c = z3.wrapping_add((z0 << 6) & 0xC0);

    if invalid != 0 {
        log::debug!("{} invalid GCR bytes encountered", invalid);
    }

    let checksum_ok = checksum_a == dec_check_a && checksum_b == dec_check_b && checksum_c == dec_check_c;

    log::debug!(
        "checksums: {:02X} {:02X} {:02X} vs. {:02X} {:02X} {:02X} ({})",
        checksum_a,
        checksum_b,
        checksum_c,
        dec_check_a,
        dec_check_b,
        dec_check_c,
        if checksum_ok { "good" } else { "BAD" }
    );

    if !checksum_ok {
        log::warn!(
            "Track {:2}, sector {:2}: data checksum mismatch",
            raw_track.phys_track,
            expected
        );
    }

    let sector = DecodedSector {
        index: expected,
        sector_size: 512,
        is_mfm: false,
        address_mark: 0,
        recorded_address_crc: 0,
        computed_address_crc: 0,
        recorded_crc: ((checksum_a as u32) << 16) + ((checksum_b as u32) << 8) + checksum_c as u32,
        computed_crc: ((dec_check_a as u32) << 16) + ((dec_check_b as u32) << 8) + dec_check_c as u32,
        data: decbuf[..512].to_vec(),
        weak_offset: None,
        position: sector_position,
        ending_position: ending_position(rot_start, rot_end, tick),
        raw_start: 0,
        raw_end: tick,
    };

    log::debug!(
        "Decoded Mac track {:2}.{}, sector {:2} [pos {:.3}-{:.3}]",
        raw_track.phys_track,
        raw_track.side,
        expected,
        sector.position,
        sector.ending_position
    );

    Some(sector)
}
