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

    tests/common/mod.rs

    Common support routines for tests
*/

use fluxconv::{
    crc::{crc_ccitt, crc_ccitt_inverted},
    DecodedDisk,
    DecodedSector,
};

/// Build a good sector ready for encoding: angular position set, CRC fields
/// consistent with the wire framing so re-decoding reports it clean.
#[allow(dead_code)]
pub fn make_sector(index: u8, sector_size: usize, mfm: bool, position: f32, fill: u8) -> DecodedSector {
    let data: Vec<u8> = (0..sector_size)
        .map(|i| fill.wrapping_add(i as u8).wrapping_mul(index.wrapping_add(1)))
        .collect();

    // The data-field CRC as recorded on the wire: the (framed) DAM followed
    // by the complemented payload.
    let mut crc = if mfm {
        crc_ccitt(&[0xA1, 0xA1, 0xA1, 0xFB], None)
    }
    else {
        crc_ccitt(&[0xFB], None)
    };
    crc = crc_ccitt_inverted(&data, crc);

    DecodedSector {
        index,
        sector_size,
        is_mfm: mfm,
        address_mark: 0xFB,
        recorded_address_crc: 0,
        computed_address_crc: 0,
        recorded_crc: crc as u32,
        computed_crc: crc as u32,
        data,
        weak_offset: None,
        position,
        ending_position: position,
        raw_start: 0,
        raw_end: 0,
    }
}

/// Populate one track of a decoded disk with `count` sequential good sectors.
#[allow(dead_code)]
pub fn fill_track(
    disk: &mut DecodedDisk,
    track: u8,
    side: u8,
    count: u8,
    sector_size: usize,
    mfm: bool,
    first_index: u8,
) {
    let phys_track = track * disk.track_step;
    let dst = disk.track_mut(side, phys_track);

    for i in 0..count {
        dst.sectors.push(make_sector(
            first_index + i,
            sector_size,
            mfm,
            i as f32 / count as f32,
            0x21,
        ));
    }
}

/// Collect the sifted sectors of a decoded track, ordered by sector index.
#[allow(dead_code)]
pub fn sifted_by_index(disk: &mut DecodedDisk, track: u8, side: u8) -> Vec<DecodedSector> {
    let phys_track = track * disk.track_step;
    let dst = disk.track_mut(side, phys_track);

    let picks = fluxconv::sift_sectors(dst, track as u32);
    let mut sectors: Vec<DecodedSector> = picks.iter().map(|&i| dst.sectors[i].clone()).collect();
    sectors.sort_by_key(|sec| sec.index);
    sectors
}
