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

//! Apple II 6-and-2 GCR track state machine (Disk II / DOS 3.3 layout).
//!
//! Byte alignment comes free with the encoding: every GCR byte has its MSB
//! set, so a set MSB in the shift register frames a byte and the next seven
//! bit cells are skipped. The address field is `D5 AA 96` followed by
//! 4-and-4 encoded volume/track/sector/checksum; the data field is
//! `D5 AA AD` followed by 343 GCR bytes carrying 256 payload bytes under an
//! adjacent-XOR checksum chain.
//!
//! Every framed byte is also appended verbatim to the track's GCR stream so
//! NIB-format writers can reproduce the raw nibbles.

use crate::{
    decode::{ending_position, rotation_position},
    disk::{DecodedSector, DecodedTrack, RawTrack},
    flux::pll::{cell_length, GcrPhase, GcrSeparator, GcrStep},
    gcr::{decode_44, GCR6_DECODE},
    types::CoreOptions,
};

const DATA_FIELD_LEN: usize = 343;

/// Byte-level recognizer state.
enum MarkState {
    WaitFf,
    WaitD5,
    WaitAa,
    WaitMark,
    Address(usize),
    Data(usize),
}

pub fn decode_track_a2gcr(
    raw_track: &RawTrack,
    dst_track: &mut DecodedTrack,
    track_step: u8,
    opts: &CoreOptions,
) {
    if raw_track.transitions.len() < 2 {
        return;
    }

    let cells_per_rev = 250_000.0 / (300.0 / 60.0);
    let cell_len = cell_length(raw_track.samples_per_rev, cells_per_rev, opts.clock_period_adjust);
    let logical_track = raw_track.phys_track / track_step.max(1);

    let mut bit_state = 0u32;
    let mut mark_state = MarkState::WaitFf;

    let mut sector_headers = 0u32;
    let mut data_sectors = 0u32;
    let mut good_sectors = 0u32;

    let mut sector_index: Option<u8> = None;
    let mut sector_position = 0.0f32;
    let mut sector_volume = 0u8;
    let mut raw_start = 0u32;
    let mut rot_start = 0u32;
    let mut rot_end = 0u32;

    let mut buf = [0u8; DATA_FIELD_LEN];
    let mut header = [0u8; 8];

    let invert = if opts.invert_bit7 { 0x80u8 } else { 0x00u8 };

    for step in GcrSeparator::new(&raw_track.transitions, cell_len, cell_len / 3, GcrPhase::Proportional) {
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

        // every framed nibble feeds the NIB stream
        dst_track.gcr_stream.push(shifter);
        log::trace!("{:02X}", shifter);

        mark_state = match mark_state {
            MarkState::WaitFf => {
                raw_start = tick;
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
                        MarkState::WaitD5
                    }
                }
                0xFF => MarkState::WaitD5,
                _ => MarkState::WaitFf,
            },
            MarkState::Address(i) => {
                header[i] = shifter;

                if i + 1 < header.len() {
                    MarkState::Address(i + 1)
                }
                else {
                    // volume, track, sector, checksum in 4-and-4 encoding
                    let mut decoded = [0u8; 4];
                    let mut checksum = 0u8;
                    for j in 0..4 {
                        decoded[j] = decode_44(header[j * 2], header[j * 2 + 1]);
                        checksum ^= decoded[j];
                    }

                    if checksum == 0 && decoded[1] == logical_track {
                        log::debug!(
                            "Sector header {:02X} {:02X} {:02X} {:02X}",
                            decoded[0],
                            decoded[1],
                            decoded[2],
                            decoded[3]
                        );

                        if let Some(rev) = rotation_position(&raw_track.index_times, tick) {
                            rot_start = rev.start;
                            rot_end = rev.end;
                            sector_position = rev.position;
                            sector_volume = decoded[0];
                            sector_index = Some(decoded[2]);
                            sector_headers += 1;
                        }
                        else {
                            log::debug!(
                                "Skipping track {}, sector {} outside the indexed revolutions",
                                logical_track,
                                decoded[2]
                            );
                        }
                    }
                    // wrong-track headers are silently skipped

                    MarkState::WaitFf
                }
            }
            MarkState::Data(i) => {
                buf[i] = shifter;

                if i + 1 < DATA_FIELD_LEN {
                    MarkState::Data(i + 1)
                }
                else {
                    // Adjacent-XOR decode doubles as the checksum pass: the
                    // running value must return to zero after the final
                    // checksum byte.
                    let mut decbuf = [0u8; DATA_FIELD_LEN];
                    let mut chksum = 0u8;
                    let mut invalid = 0u32;

                    for (j, &g) in buf.iter().enumerate() {
                        let z = GCR6_DECODE[g as usize];
                        invalid += (z >> 7) as u32;
                        chksum ^= z;
                        decbuf[j] = chksum & 0x3F;
                    }

                    if invalid != 0 {
                        log::debug!("{} invalid GCR bytes encountered", invalid);
                    }

                    let index = sector_index.take().unwrap_or(0);

                    let checksum_ok = chksum == 0;
                    if !checksum_ok {
                        log::warn!(
                            "Track {:2}, sector {:2}: data checksum mismatch: {:02X}",
                            logical_track,
                            index,
                            chksum
                        );
                    }

                    data_sectors += 1;
                    if checksum_ok {
                        good_sectors += 1;
                    }

                    let mut sector = DecodedSector {
                        index,
                        sector_size: 256,
                        is_mfm: false,
                        address_mark: sector_volume,
                        recorded_address_crc: 0,
                        computed_address_crc: 0,
                        recorded_crc: chksum as u32,
                        computed_crc: 0,
                        data: Vec::with_capacity(256),
                        weak_offset: None,
                        position: sector_position,
                        ending_position: ending_position(rot_start, rot_end, tick),
                        raw_start,
                        raw_end: tick,
                    };

                    // Reverse the 6-and-2 nibblisation: six high bits from
                    // the payload group, two low bits (swapped) from the
                    // fragment groups.
                    for j in 0..256usize {
                        let c = decbuf[j + 86] << 2;
                        let d = match j {
                            172.. => (decbuf[j - 172] >> 4) & 0x03,
                            86.. => (decbuf[j - 86] >> 2) & 0x03,
                            _ => decbuf[j] & 0x03,
                        };

                        sector.data.push((c + ((d & 2) >> 1) + ((d & 1) << 1)) ^ invert);
                    }

                    dst_track.sectors.push(sector);

                    MarkState::WaitD5
                }
            }
        };
    }

    log::debug!(
        "a2gcr track {}: {} sector headers, {} data sectors, {} good sectors decoded",
        logical_track,
        sector_headers,
        data_sectors,
        good_sectors
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcr::encode_44;

    #[test]
    fn test_44_header_checksum() {
        // A 4-and-4 header checks out when the checksum byte XORs the other
        // three to zero.
        let vol = 0xFE;
        let trk = 0x11;
        let sec = 0x0C;
        let chk = vol ^ trk ^ sec;

        let mut header = [0u8; 8];
        for (i, v) in [vol, trk, sec, chk].into_iter().enumerate() {
            let (a, b) = encode_44(v);
            header[i * 2] = a;
            header[i * 2 + 1] = b;
        }

        let mut checksum = 0u8;
        let mut decoded = [0u8; 4];
        for j in 0..4 {
            decoded[j] = decode_44(header[j * 2], header[j * 2 + 1]);
            checksum ^= decoded[j];
        }

        assert_eq!(checksum, 0);
        assert_eq!(decoded, [vol, trk, sec, chk]);
    }
}
