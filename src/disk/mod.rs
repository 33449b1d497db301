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

//! The disk data model: raw flux-transition tracks, decoded sector tracks,
//! and the fixed `[side][phys_track]` containers that own them.
//!
//! The containers always allocate the full 2 x 84 physical grid; the
//! `track_count`/`track_step`/`side_count` fields describe which slots are
//! live. A track step of 2 means logical tracks occupy even physical slots
//! (a 48 tpi layout addressed on the 96 tpi grid).

pub mod sifter;
pub mod splice;

use crate::MAXIMUM_SECTOR_SIZE;

/// Number of physical track slots per side.
pub const MAX_PHYS_TRACKS: usize = 84;
/// Number of disk sides.
pub const MAX_SIDES: usize = 2;

/// One physical track's flux capture: a timeline of flux-transition
/// timestamps plus index-sensor timestamps, all in one opaque tick basis.
#[derive(Clone, Debug, Default)]
pub struct RawTrack {
    pub phys_track: u8,
    pub side: u8,
    /// Average timer ticks per revolution for this track's sample basis.
    pub samples_per_rev: f64,
    /// Monotonically non-decreasing transition timestamps. Equal adjacent
    /// values are tolerated and treated as zero-delta.
    pub transitions: Vec<u32>,
    /// Index-sensor timestamps, strictly increasing, usually revs + 1.
    pub index_times: Vec<u32>,
    /// One full revolution to commit to a non-index-aligned writer.
    pub splice: Option<(u32, u32)>,
}

impl RawTrack {
    /// The largest timestamp on this track's timeline.
    fn max_time(&self) -> u32 {
        let mut max_time = self.index_times.last().copied().unwrap_or(0);

        if let Some(&t) = self.transitions.last() {
            max_time = max_time.max(t);
        }

        if let Some((_, end)) = self.splice {
            max_time = max_time.max(end);
        }

        max_time
    }

    /// Reflect the track's timeline, as if the capture had been made with the
    /// disk flipped and spinning backwards.
    pub fn reverse(&mut self) {
        let max_time = self.max_time();

        for t in &mut self.index_times {
            *t = max_time - *t;
        }
        self.index_times.reverse();

        for t in &mut self.transitions {
            *t = max_time - *t;
        }
        self.transitions.reverse();

        if let Some((start, end)) = self.splice {
            self.splice = Some((max_time - end, max_time - start));
        }
    }
}

/// A raw disk: the full physical grid of [`RawTrack`]s.
#[derive(Clone, Debug)]
pub struct RawDisk {
    /// Indexed `[side][phys_track]`.
    pub tracks: Vec<Vec<RawTrack>>,
    pub track_count: u8,
    pub track_step: u8,
    pub side_count: u8,
    /// Set when the flux was synthesized (by the encoder or a disk script)
    /// rather than captured from media.
    pub synthesized: bool,
}

impl Default for RawDisk {
    fn default() -> Self {
        let tracks = (0..MAX_SIDES)
            .map(|side| {
                (0..MAX_PHYS_TRACKS)
                    .map(|phys| RawTrack {
                        phys_track: phys as u8,
                        side: side as u8,
                        ..RawTrack::default()
                    })
                    .collect()
            })
            .collect();

        RawDisk {
            tracks,
            track_count: 40,
            track_step: 2,
            side_count: 1,
            synthesized: false,
        }
    }
}

impl RawDisk {
    pub fn track(&self, side: u8, phys_track: u8) -> &RawTrack {
        &self.tracks[side as usize][phys_track as usize]
    }

    pub fn track_mut(&mut self, side: u8, phys_track: u8) -> &mut RawTrack {
        &mut self.tracks[side as usize][phys_track as usize]
    }
}

/// Time-reverse every track of a raw disk.
pub fn reverse_tracks(raw_disk: &mut RawDisk) {
    for side in &mut raw_disk.tracks {
        for track in side {
            track.reverse();
        }
    }
}

/// One decoded sector and its capture metadata.
///
/// A sector is *good* when both recorded CRCs match their computed
/// counterparts; anything else is bad but may still be the best copy
/// available.
#[derive(Clone, Debug)]
pub struct DecodedSector {
    /// Sector number in the encoding's physical numbering (FM/MFM 1-based,
    /// Apple II / Amiga 0-based).
    pub index: u8,
    pub sector_size: usize,
    pub is_mfm: bool,
    /// FM/MFM: data address mark byte (0 = no data field recorded).
    /// Apple II GCR: the volume byte. Amiga: the format byte.
    pub address_mark: u8,
    pub recorded_address_crc: u16,
    pub computed_address_crc: u16,
    pub recorded_crc: u32,
    pub computed_crc: u32,
    pub data: Vec<u8>,
    /// Byte offset at which the payload becomes unstable across reads.
    pub weak_offset: Option<usize>,
    /// Angular position of the sector header in [0, 1); -1.0 when unknown
    /// (decoded ingress before the interleave collaborator runs).
    pub position: f32,
    pub ending_position: f32,
    /// Absolute tick timestamps on the source flux timeline.
    pub raw_start: u32,
    pub raw_end: u32,
}

impl Default for DecodedSector {
    fn default() -> Self {
        DecodedSector {
            index: 0,
            sector_size: 0,
            is_mfm: false,
            address_mark: 0,
            recorded_address_crc: 0,
            computed_address_crc: 0,
            recorded_crc: 0,
            computed_crc: 0,
            data: Vec::new(),
            weak_offset: None,
            position: -1.0,
            ending_position: -1.0,
            raw_start: 0,
            raw_end: 0,
        }
    }
}

impl DecodedSector {
    /// Both the address and data CRCs match their computed values.
    pub fn is_good(&self) -> bool {
        self.recorded_address_crc == self.computed_address_crc && self.recorded_crc == self.computed_crc
    }

    /// Content hash for duplicate grouping in the sifter: an accumulator over
    /// the header fields plus a rotate-XOR over the payload words.
    pub fn content_hash(&self) -> u32 {
        let mut hash = self.is_mfm as u32;

        hash = hash.wrapping_add(self.address_mark as u32);
        hash = hash.wrapping_add(self.sector_size as u32);
        hash = hash.wrapping_add(self.computed_address_crc as u32);
        hash = hash.wrapping_add((self.recorded_address_crc as u32) << 16);
        hash = hash.wrapping_add(self.computed_crc);
        hash = hash.wrapping_add(self.recorded_crc.wrapping_shl(16));
        hash = hash.wrapping_add(self.sector_size as u32);

        for chunk in self.data.chunks_exact(4) {
            let word: u32 = bytemuck::pod_read_unaligned(chunk);
            hash = hash.wrapping_add(word);
            hash = (hash >> 1).wrapping_add(hash << 31);
        }

        hash
    }

    /// Full identity comparison used when grouping duplicate reads.
    pub fn has_same_contents(&self, other: &DecodedSector) -> bool {
        self.is_mfm == other.is_mfm
            && self.address_mark == other.address_mark
            && self.sector_size == other.sector_size
            && self.computed_address_crc == other.computed_address_crc
            && self.recorded_address_crc == other.recorded_address_crc
            && self.computed_crc == other.computed_crc
            && self.recorded_crc == other.recorded_crc
            && self.data == other.data
    }
}

/// One decoded track: an unordered multiset of sectors (the same index may
/// appear several times before sifting), plus the raw GCR byte stream for
/// Apple II tracks (kept for NIB-format writers).
#[derive(Clone, Debug, Default)]
pub struct DecodedTrack {
    pub sectors: Vec<DecodedSector>,
    pub gcr_stream: Vec<u8>,
}

/// A decoded disk: the full physical grid of [`DecodedTrack`]s plus primary
/// geometry hints for sector-image writers.
#[derive(Clone, Debug)]
pub struct DecodedDisk {
    /// Indexed `[side][phys_track]`.
    pub tracks: Vec<Vec<DecodedTrack>>,
    pub track_count: u8,
    pub track_step: u8,
    pub side_count: u8,
    pub primary_sector_size: usize,
    pub primary_sectors_per_track: usize,
}

impl Default for DecodedDisk {
    fn default() -> Self {
        DecodedDisk {
            tracks: (0..MAX_SIDES)
                .map(|_| (0..MAX_PHYS_TRACKS).map(|_| DecodedTrack::default()).collect())
                .collect(),
            track_count: 40,
            track_step: 2,
            side_count: 1,
            primary_sector_size: 128,
            primary_sectors_per_track: 18,
        }
    }
}

impl DecodedDisk {
    pub fn track(&self, side: u8, phys_track: u8) -> &DecodedTrack {
        &self.tracks[side as usize][phys_track as usize]
    }

    pub fn track_mut(&mut self, side: u8, phys_track: u8) -> &mut DecodedTrack {
        &mut self.tracks[side as usize][phys_track as usize]
    }
}

const LAYOUT_COLUMNS: usize = 68;

/// Render a text map of each track's sifted sector layout, one line per
/// track/side, with sector numbers placed at their angular positions.
pub fn layout_map(disk: &DecodedDisk, track_select: Option<u8>) -> Vec<String> {
    let mut lines = Vec::new();

    for i in 0..disk.track_count {
        if track_select.is_some_and(|sel| sel != i) {
            continue;
        }

        for side in 0..disk.side_count {
            let mut track = disk.track(side, i * disk.track_step).clone();
            let sifted = sifter::sift_sectors(&mut track, i as u32);

            // Two-digit sector numbers can spill one column past the end.
            let mut map = vec![b' '; LAYOUT_COLUMNS + 5];

            for &idx in &sifted {
                let sec = &track.sectors[idx];
                let mut x = ((sec.position.max(0.0) * LAYOUT_COLUMNS as f32) as usize).min(LAYOUT_COLUMNS - 1);

                if sec.index >= 10 {
                    map[x] = b'0' + sec.index / 10;
                    x += 1;
                }
                map[x] = b'0' + sec.index % 10;
            }

            let map_str = String::from_utf8_lossy(&map).trim_end().to_string();
            if disk.side_count > 1 {
                lines.push(format!("{:2}.{} ({:2}) | {}", i, side, sifted.len(), map_str));
            }
            else {
                lines.push(format!("{:2} ({:2}) | {}", i, sifted.len(), map_str));
            }
        }
    }

    lines
}

/// Build a sector with a fresh payload buffer of `sector_size` zeroes.
pub(crate) fn blank_sector(sector_size: usize) -> DecodedSector {
    debug_assert!(sector_size <= MAXIMUM_SECTOR_SIZE);
    DecodedSector {
        sector_size,
        data: vec![0; sector_size],
        ..DecodedSector::default()
    }
}
