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

//! Decoded-to-raw conversion: synthesize FM, MFM, or Apple II GCR flux for a
//! track of sifted sectors.
//!
//! Output is on a canonical 5ns-per-tick, 360 RPM timeline (the basis both
//! SuperCard Pro and KryoFlux writers can divide down from), with six
//! synthetic index marks per track so downstream writers can pick any two.
//! Each sector is rendered to its own flux stream with critical-region
//! markers around the address and data fields; seven revolution-spaced
//! copies are then laid around the track, overlaps are cut in the
//! non-critical gaps, and the gaps between sectors are filled with periodic
//! keep-alive flux so a reader PLL never free-runs.

use std::collections::HashSet;

use crate::{
    crc::{crc_ccitt, crc_ccitt_inverted},
    disk::{sifter::sift_sectors, DecodedDisk, DecodedTrack, RawDisk, RawTrack},
    gcr::GCR6_ENCODE,
    types::CoreOptions,
};

/// Ticks per revolution on the synthesis timeline: 5ns ticks at 360 RPM.
pub const ENCODE_TICKS_PER_REV: f64 = 200_000_000.0 / 6.0;

/// Nominal FM bit-cell time: 4us at 288 RPM, scaled to the 360 RPM timeline.
pub const NOMINAL_FM_BIT_CELL_TIME: u32 = 640;
/// Nominal Apple II GCR bit-cell time: 4us at 300 RPM on the same timeline.
pub const NOMINAL_A2GCR_BIT_CELL_TIME: u32 = 667;

/// Expands a nibble to MFM data-bit positions (even slots).
#[rustfmt::skip]
static EXPAND4: [u8; 16] = [
    0b0000_0000, 0b0000_0001, 0b0000_0100, 0b0000_0101,
    0b0001_0000, 0b0001_0001, 0b0001_0100, 0b0001_0101,
    0b0100_0000, 0b0100_0001, 0b0100_0100, 0b0100_0101,
    0b0101_0000, 0b0101_0001, 0b0101_0100, 0b0101_0101,
];

/// Renders one sector into a private flux stream, tracking the critical
/// region that must stay contiguous when copies are cut against each other.
struct SectorEncoder {
    stream: Vec<u32>,
    time: u32,
    critical_start: u32,
    critical_end: u32,
    bit_cell_time: u32,
    mfm_shifter: u32,
    precomp_enabled: bool,
}

impl SectorEncoder {
    fn new(bit_cell_time: u32) -> SectorEncoder {
        SectorEncoder {
            stream: Vec::new(),
            time: 0,
            critical_start: u32::MAX,
            critical_end: u32::MAX,
            bit_cell_time,
            mfm_shifter: 0,
            precomp_enabled: false,
        }
    }

    fn begin_critical(&mut self) {
        self.critical_start = self.time;
    }

    fn end_critical(&mut self) {
        self.critical_end = self.time;
    }

    fn encode_byte_fm(&mut self, data: u8) {
        self.encode_byte_fm_clocked(0xFF, data);
    }

    fn encode_byte_fm_clocked(&mut self, clock: u8, data: u8) {
        let mut clock = clock;
        let mut data = data;

        for _ in 0..8 {
            if clock & 0x80 != 0 {
                self.stream.push(self.time);
            }
            if data & 0x80 != 0 {
                self.stream.push(self.time + self.bit_cell_time);
            }

            clock = clock.wrapping_shl(1);
            data = data.wrapping_shl(1);

            self.time += self.bit_cell_time * 2;
        }
    }

    /// One byte cell of irregular 1.5-cell-spaced flux; reads back with
    /// unstable framing, which is the point.
    fn encode_weak_byte_fm(&mut self) {
        for _ in 0..5 {
            self.stream.push(self.time);
            self.time += (self.bit_cell_time * 3) >> 1;
            self.stream.push(self.time);
            self.time += (self.bit_cell_time * 3 + 1) >> 1;
        }
        self.time += self.bit_cell_time;
    }

    fn encode_byte_mfm(&mut self, data: u8) {
        self.encode_byte_mfm_masked(0xFF, data, 8);
    }

    fn encode_byte_mfm_masked(&mut self, clock_mask: u8, data: u8, bits: u32) {
        // shift in data bits only
        self.mfm_shifter = (self.mfm_shifter & 0xFF_0000)
            + ((EXPAND4[(data >> 4) as usize] as u32) << 8)
            + EXPAND4[(data & 15) as usize] as u32;

        // recompute clock bits wherever neither neighbor has a transition
        let clock_mask32 =
            ((EXPAND4[(clock_mask >> 4) as usize] as u32) << 8) + EXPAND4[(clock_mask & 15) as usize] as u32;

        self.mfm_shifter = self
            .mfm_shifter
            .wrapping_add(!((self.mfm_shifter << 1) | (self.mfm_shifter >> 1)) & (clock_mask32 << 1));

        let bits2 = bits * 2;

        if self.precomp_enabled {
            // Write precompensation: nudge transitions an eighth/sixteenth
            // of a cell depending on which neighbor crowds them.
            for _ in 0..bits2 {
                if self.mfm_shifter & 0x8000 != 0 {
                    match self.mfm_shifter & 0x2_2000 {
                        0x2_0000 => {
                            // close to the prior transition: emit early
                            self.stream.push(self.time);
                        }
                        0x2000 => {
                            // close to the next transition: emit late
                            self.stream.push(self.time + (self.bit_cell_time >> 3));
                        }
                        _ => {
                            self.stream.push(self.time + (self.bit_cell_time >> 4));
                        }
                    }
                }

                self.mfm_shifter = self.mfm_shifter.wrapping_add(self.mfm_shifter);
                self.time += self.bit_cell_time;
            }
        }
        else {
            for _ in 0..bits2 {
                if self.mfm_shifter & 0x8000 != 0 {
                    self.stream.push(self.time);
                }

                self.mfm_shifter = self.mfm_shifter.wrapping_add(self.mfm_shifter);
                self.time += self.bit_cell_time;
            }
        }
    }

    /// Push the last buffered MFM bit pair out of the shifter.
    fn flush_mfm(&mut self) {
        self.encode_byte_mfm_masked(0xFF, 0, 2);
    }

    fn encode_byte_gcr(&mut self, data: u8) {
        let mut data = data;

        for _ in 0..8 {
            if data & 0x80 != 0 {
                self.stream.push(self.time);
            }
            data = data.wrapping_shl(1);
            self.time += self.bit_cell_time;
        }
    }

    /// A 10-cell Disk II self-sync byte: $FF followed by two slipped zero
    /// bits.
    fn encode_sync_byte_gcr(&mut self) {
        self.encode_byte_gcr(0xFF);
        self.time += self.bit_cell_time * 2;
    }

    fn encode_sync_bytes_gcr(&mut self, count: u32) {
        for _ in 0..count {
            self.encode_sync_byte_gcr();
        }
    }
}

/// One placement of an encoded sector on the output timeline.
struct SectorCopy {
    sector: usize,
    encoder: usize,
    position: u32,
    encode_start: u32,
    encode_end: u32,
}

fn encode_sector_a2gcr(enc: &mut SectorEncoder, track: u32, sector: &crate::disk::DecodedSector) {
    // Minimal layout per sector:
    //
    //   5 x FF_sync
    //   D5 AA 96, volume/track/sector/checksum (4-4), DE AA EB
    //   6 x FF_sync
    //   D5 AA AD, 343 x 6-2 encoded data + checksum, D5 AA EB
    //
    // 4us cells at 300 RPM give 50K raw bits per track; the layout above is
    // 3014 raw bits per sector, so 16 sectors leave room for about 11 sync
    // bytes of gap 3. Ten gives a little margin.

    enc.begin_critical();
    enc.encode_sync_bytes_gcr(5);
    enc.encode_byte_gcr(0xD5);
    enc.encode_byte_gcr(0xAA);
    enc.encode_byte_gcr(0x96);

    let mut header = [sector.address_mark, track as u8, sector.index, 0];
    header[3] = header[0] ^ header[1] ^ header[2];

    for v in header {
        let (a, b) = crate::gcr::encode_44(v);
        enc.encode_byte_gcr(a);
        enc.encode_byte_gcr(b);
    }

    enc.encode_byte_gcr(0xDE);
    enc.encode_byte_gcr(0xAA);
    enc.encode_byte_gcr(0xEB);
    enc.encode_sync_bytes_gcr(6);
    enc.encode_byte_gcr(0xD5);
    enc.encode_byte_gcr(0xAA);
    enc.encode_byte_gcr(0xAD);

    // prenibble the data block for 6-2 encoding
    let mut nibble_buf = [0u8; 344];

    // whole fragment bytes
    for j in 0..84 {
        let a = sector.data[j] & 3;
        let b = sector.data[j + 86] & 3;
        let c = sector.data[j + 172] & 3;
        let v = a + (b << 2) + (c << 4);

        nibble_buf[j + 1] = ((v >> 1) & 0x15) + ((v << 1) & 0x2A);
    }

    // partial fragment bytes
    for j in 84..86 {
        let a = sector.data[j] & 3;
        let b = sector.data[j + 86] & 3;
        let v = a + (b << 2);

        nibble_buf[j + 1] = ((v >> 1) & 0x15) + ((v << 1) & 0x2A);
    }

    // base bits 2-7
    for j in 0..256 {
        nibble_buf[j + 87] = sector.data[j] >> 2;
    }

    // adjacent-XOR and GCR encode; the final XOR against zero emits the
    // checksum byte
    for j in 0..343 {
        enc.encode_byte_gcr(GCR6_ENCODE[(nibble_buf[j] ^ nibble_buf[j + 1]) as usize]);
    }

    enc.encode_byte_gcr(0xD5);
    enc.encode_byte_gcr(0xAA);
    enc.encode_byte_gcr(0xEB);
    enc.end_critical();
    enc.encode_sync_bytes_gcr(10);
}

fn encode_sector_mfm(
    enc: &mut SectorEncoder,
    track: u32,
    side: u32,
    sector: &crate::disk::DecodedSector,
) {
    for _ in 0..11 {
        enc.encode_byte_mfm(0x00);
    }

    enc.begin_critical();
    enc.encode_byte_mfm(0x00);

    let mut sechdr = [
        0xA1,
        0xA1,
        0xA1,
        0xFE,
        track as u8,
        side as u8,
        sector.index,
        match sector.sector_size {
            256 => 1,
            512 => 2,
            1024 => 3,
            _ => 0,
        },
        0,
        0,
    ];

    let mut crc = crc_ccitt(&sechdr[0..8], None);

    // a bad recorded address CRC is reproduced as a bad CRC
    if sector.recorded_address_crc != sector.computed_address_crc {
        crc = !crc;
    }

    sechdr[8] = (crc >> 8) as u8;
    sechdr[9] = crc as u8;

    // the A1 sync triple takes the address-mark clocking but is covered by
    // the CRC
    enc.encode_byte_mfm_masked(0xFB, 0xA1, 8);
    enc.encode_byte_mfm_masked(0xFB, 0xA1, 8);
    enc.encode_byte_mfm_masked(0xFB, 0xA1, 8);

    for &b in &sechdr[3..10] {
        enc.encode_byte_mfm(b);
    }

    for _ in 0..22 {
        enc.encode_byte_mfm(0x4E);
    }

    for _ in 0..12 {
        enc.encode_byte_mfm(0x00);
    }

    if sector.address_mark != 0 {
        enc.encode_byte_mfm_masked(0xFB, 0xA1, 8);
        enc.encode_byte_mfm_masked(0xFB, 0xA1, 8);
        enc.encode_byte_mfm_masked(0xFB, 0xA1, 8);
        enc.encode_byte_mfm(sector.address_mark);

        for &b in &sector.data {
            enc.encode_byte_mfm(!b);
        }

        let mut crc2 = crc_ccitt(&[0xA1, 0xA1, 0xA1, sector.address_mark], None);
        crc2 = crc_ccitt_inverted(&sector.data, crc2);

        if sector.recorded_crc != sector.computed_crc {
            crc2 = !crc2;
        }

        enc.encode_byte_mfm((crc2 >> 8) as u8);
        enc.encode_byte_mfm(crc2 as u8);
    }
    else {
        // no data field was recorded; pad the space it would occupy
        for _ in 0..40 {
            enc.encode_byte_mfm(0x00);
        }
    }

    enc.encode_byte_mfm(0x4E);
    enc.end_critical();

    for _ in 1..24 {
        enc.encode_byte_mfm(0x4E);
    }

    enc.flush_mfm();
}

fn encode_sector_fm(
    enc: &mut SectorEncoder,
    track: u32,
    side: u32,
    sector: &crate::disk::DecodedSector,
    is_lowest: bool,
) {
    if is_lowest {
        // the lowest-numbered sector carries the track's IAM
        enc.begin_critical();
        enc.encode_byte_fm(0x00);
        enc.encode_byte_fm_clocked(0xD7, 0xFC);
    }

    for _ in 0..4 {
        enc.encode_byte_fm(0x00);
    }

    if !is_lowest {
        enc.begin_critical();
    }

    enc.encode_byte_fm(0x00);
    enc.encode_byte_fm(0x00);
    enc.encode_byte_fm_clocked(0xC7, 0xFE);

    let mut sechdr = [
        0xFE,
        track as u8,
        side as u8,
        sector.index,
        match sector.sector_size {
            256 => 1,
            512 => 2,
            1024 => 3,
            _ => 0,
        },
        0,
        0,
    ];

    let mut crc = crc_ccitt(&sechdr[0..5], None);

    if sector.recorded_address_crc != sector.computed_address_crc {
        crc = !crc;
    }

    sechdr[5] = (crc >> 8) as u8;
    sechdr[6] = crc as u8;

    for &b in &sechdr[1..7] {
        enc.encode_byte_fm(b);
    }

    for _ in 0..17 {
        enc.encode_byte_fm(0x00);
    }

    if sector.address_mark != 0 {
        let mut secdat = vec![0u8; sector.sector_size + 3];
        secdat[0] = sector.address_mark;

        for (j, &b) in sector.data.iter().enumerate() {
            secdat[j + 1] = !b;
        }

        secdat[sector.sector_size + 1] = (sector.recorded_crc >> 8) as u8;
        secdat[sector.sector_size + 2] = sector.recorded_crc as u8;

        enc.encode_byte_fm_clocked(0xC7, secdat[0]);

        // A long sector with a data CRC error is truncated to save track
        // room; the error re-manifests on readback either way.
        let end = if sector.computed_crc != sector.recorded_crc && sector.sector_size > 128 {
            131
        }
        else {
            sector.sector_size + 3
        };

        for (j, &b) in secdat.iter().enumerate().take(end).skip(1) {
            match sector.weak_offset {
                Some(weak) if j >= weak + 1 => enc.encode_weak_byte_fm(),
                _ => enc.encode_byte_fm(b),
            }
        }
    }
    else {
        for _ in 0..50 {
            enc.encode_byte_fm(0x00);
        }
    }

    enc.encode_byte_fm(0x00);
    enc.end_critical();

    for _ in 0..8 {
        enc.encode_byte_fm(0x00);
    }
}

/// Synthesize flux for one track of sifted sectors.
///
/// `period_multiplier` scales the nominal bit-cell times; `a2gcr` selects the
/// Apple II GCR layout (otherwise FM or MFM is chosen by the sectors'
/// `is_mfm` flags); `precise` places each copy at its recorded angular
/// position instead of packing sectors in order; `high_density` doubles the
/// FM/MFM bit-cell rate.
pub fn encode_track(
    dst_track: &mut RawTrack,
    src_track: &mut DecodedTrack,
    track: u32,
    side: u32,
    period_multiplier: f64,
    a2gcr: bool,
    precise: bool,
    high_density: bool,
) {
    let mut bit_cell_time = (0.5 + NOMINAL_FM_BIT_CELL_TIME as f64 * period_multiplier) as u32;

    let mfm = src_track.sectors.iter().any(|sec| sec.is_mfm);
    if mfm {
        bit_cell_time >>= 1;
    }

    if high_density {
        bit_cell_time >>= 1;
    }

    if a2gcr {
        bit_cell_time = (0.5 + NOMINAL_A2GCR_BIT_CELL_TIME as f64 * period_multiplier) as u32;
    }

    // 5ns ticks reach both KryoFlux (40ns) and SuperCard Pro (25ns) evenly.
    dst_track.samples_per_rev = ENCODE_TICKS_PER_REV;
    dst_track.transitions.clear();
    dst_track.index_times.clear();
    for i in 0u64..6 {
        dst_track.index_times.push((200_000_000 * (i + 1) / 6) as u32);
    }

    let sifted = sift_sectors(src_track, track);

    // the lowest-numbered sector carries the IAM and anchors ordered layout
    let lowest = sifted
        .iter()
        .copied()
        .min_by_key(|&idx| src_track.sectors[idx].index);

    // first by position; the splice goes just ahead of its second-rev copy
    let first_sec = sifted.first().copied();

    dst_track.splice = None;

    // render each sector into a private stream
    let mut encoders: Vec<SectorEncoder> = Vec::with_capacity(sifted.len());

    for &sec_idx in &sifted {
        let sector = &src_track.sectors[sec_idx];
        let mut enc = SectorEncoder::new(bit_cell_time);

        if a2gcr {
            encode_sector_a2gcr(&mut enc, track, sector);
        }
        else if mfm {
            enc.precomp_enabled = dst_track.phys_track >= 40;
            encode_sector_mfm(&mut enc, track, side, sector);
        }
        else {
            encode_sector_fm(&mut enc, track, side, sector, lowest == Some(sec_idx));
        }

        encoders.push(enc);
    }

    // Sectors align to data-bit boundaries: a formatter maintains byte
    // alignment through the address fields and that is easier on the reader
    // PLL. FM and MFM spend two bit cells per data bit, GCR one.
    let data_bit_time = bit_cell_time * if a2gcr { 1 } else { 2 };

    let mut copies: Vec<SectorCopy> = Vec::new();

    let mut encoding_position: u32 = 0;
    if let Some(lowest_idx) = lowest {
        encoding_position = ((0.5
            + src_track.sectors[lowest_idx].position as f64 * ENCODE_TICKS_PER_REV / data_bit_time as f64)
            as u32)
            * data_bit_time;
    }

    for (i, &sec_idx) in sifted.iter().enumerate() {
        let enc = &encoders[i];

        // an empty stream means the sector produced nothing to place
        if enc.stream.is_empty() {
            continue;
        }

        for j in 0..7u32 {
            // round positions to whole data bits
            let position = if precise {
                ((0.5
                    + (src_track.sectors[sec_idx].position as f64 + j as f64) * ENCODE_TICKS_PER_REV
                        / data_bit_time as f64) as u32)
                    * data_bit_time
            }
            else {
                encoding_position
                    + ((0.5 + j as f64 * ENCODE_TICKS_PER_REV / data_bit_time as f64) as u32) * data_bit_time
            };

            copies.push(SectorCopy {
                sector: sec_idx,
                encoder: i,
                position,
                encode_start: position,
                encode_end: position + enc.time,
            });

            if j == 0 {
                log::debug!(
                    "Encoding track {:2}, sector {:2} at {:.3}-{:.3} (critical {:.3}-{:.3})",
                    track,
                    src_track.sectors[sec_idx].index,
                    (encoding_position as f64 / ENCODE_TICKS_PER_REV).fract(),
                    ((encoding_position + enc.time) as f64 / ENCODE_TICKS_PER_REV).fract(),
                    ((encoding_position + enc.critical_start) as f64 / ENCODE_TICKS_PER_REV).fract(),
                    ((encoding_position + enc.critical_end) as f64 / ENCODE_TICKS_PER_REV).fract()
                );
            }
        }

        encoding_position += enc.time;
    }

    copies.sort_by_key(|copy| copy.position);

    // cut overlapping neighbors against each other in their non-critical
    // regions
    let mut reported_overlaps: HashSet<(u8, u8)> = HashSet::new();

    for i in 1..copies.len() {
        let (head, tail) = copies.split_at_mut(i);
        let cp0 = &mut head[i - 1];
        let cp1 = &mut tail[0];

        if cp0.encode_end > cp1.encode_start {
            let mut cut = cp1.encode_start + ((cp0.encode_end - cp1.encode_start) >> 1);
            let lo = cp0.position + encoders[cp0.encoder].critical_end;
            let hi = cp1.position + encoders[cp1.encoder].critical_start;

            if lo > hi {
                let pair = (
                    src_track.sectors[cp0.sector].index,
                    src_track.sectors[cp1.sector].index,
                );
                if reported_overlaps.insert(pair) {
                    log::warn!(
                        "Track {}, sectors {} and {} overlapped by {:.1} bytes during encoding. \
                         Encoded track may not work.",
                        track,
                        pair.0,
                        pair.1,
                        (lo - hi) as f64 / (data_bit_time as f64 * 8.0)
                    );
                }
            }
            else {
                cut = cut.clamp(lo, hi);
            }

            cp0.encode_end = cut;
            cp1.encode_start = cut;
        }
    }

    // emit the unified transition stream
    let mut time_last: u32 = 0;
    let gap_step = if mfm { bit_cell_time * 2 } else { bit_cell_time };

    for (i, copy) in copies.iter().enumerate() {
        let enc = &encoders[copy.encoder];
        let sector_start = copy.encode_start;

        // The splice goes halfway between the first position-ordered sector's
        // second-revolution copy and its predecessor.
        if i > 0
            && Some(copy.sector) == first_sec
            && copy.position >= dst_track.index_times[1]
            && copy.position < dst_track.index_times[2]
        {
            let splice_start = (copies[i - 1].position + copy.position) / 2;
            let splice_end = splice_start + (dst_track.index_times[2] - dst_track.index_times[1]);
            dst_track.splice = Some((splice_start, splice_end));

            log::debug!("Using {:?} as the splice points for track", dst_track.splice);
        }

        // keep-alive flux across the gap before the sector
        while sector_start > time_last && sector_start - time_last > gap_step {
            dst_track.transitions.push(time_last);
            time_last += gap_step;
        }

        // copy the trimmed slice of the sector's private stream
        let xfer_start = copy.encode_start as i64 - copy.position as i64;
        let xfer_end = copy.encode_end as i64 - copy.position as i64;

        assert!(xfer_start >= 0);
        assert!(xfer_end <= enc.time as i64);

        if xfer_end > xfer_start {
            let a = enc.stream.partition_point(|&t| (t as i64) < xfer_start);
            let b = a + enc.stream[a..].partition_point(|&t| (t as i64) < xfer_end);

            for &t in &enc.stream[a..b] {
                dst_track.transitions.push(copy.position + t);
            }
        }

        time_last = copy.encode_end;
    }
}

/// Encode every live track of a decoded disk onto a fresh raw disk with the
/// same geometry.
pub fn encode_disk(src_disk: &mut DecodedDisk, opts: &CoreOptions, a2gcr: bool) -> RawDisk {
    let mut dst_disk = RawDisk {
        track_count: src_disk.track_count,
        track_step: src_disk.track_step,
        side_count: src_disk.side_count,
        synthesized: true,
        ..RawDisk::default()
    };

    for track in 0..src_disk.track_count {
        if opts.track_select.is_some_and(|sel| sel != track) {
            continue;
        }

        for side in 0..src_disk.side_count {
            log::debug!("Encoding track {}, side {}", track, side);

            let phys_track = track * src_disk.track_step;
            encode_track(
                dst_disk.track_mut(side, phys_track),
                src_disk.track_mut(side, phys_track),
                track as u32,
                side as u32,
                opts.clock_period_adjust,
                a2gcr,
                opts.encode_precise,
                opts.high_density,
            );
        }
    }

    dst_disk
}
