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

//! Splice-point selection for non-index-aligned writers.
//!
//! The splice goes in the widest inter-sector gap, one third of the gap ahead
//! of the sector that follows it, with the window's end landing one measured
//! revolution later.

use crate::disk::{sifter::sift_sectors, DecodedTrack, RawDisk, RawTrack};

/// Locate a one-revolution splice window on a raw track from its decoded
/// companion. Requires at least two full revolutions of index marks;
/// non-index-aligned tracks cannot be written reliably from less.
pub fn find_splice_point(track_num: u32, raw_track: &mut RawTrack, decoded_track: &DecodedTrack) {
    if raw_track.index_times.len() < 3 {
        return;
    }

    // sift a scratch copy; the caller's decoded track stays untouched
    let mut temp_track = decoded_track.clone();
    let sifted = sift_sectors(&mut temp_track, track_num);

    let mut best_gap = 0.0f64;
    let mut splice_pos = 0.0f64;

    if !sifted.is_empty() {
        let mut first_pos: Option<f64> = None;

        for i in 0..sifted.len() {
            let prev = if i == 0 { sifted.len() - 1 } else { i - 1 };
            let mut gap = temp_track.sectors[sifted[i]].position as f64
                - temp_track.sectors[sifted[prev]].ending_position as f64;
            if gap < 0.0 {
                gap += 1.0;
            }

            if gap > best_gap {
                best_gap = gap;
                first_pos = Some(temp_track.sectors[sifted[i]].position as f64);
            }
        }

        if let Some(pos) = first_pos {
            splice_pos = pos - best_gap / 3.0;
            splice_pos -= splice_pos.floor();
        }
    }

    // Interpolate between the actual measured index intervals of the first
    // and second revolutions.
    let index0 = raw_track.index_times[0] as f64;
    let index1 = raw_track.index_times[1] as f64;
    let index2 = raw_track.index_times[2] as f64;

    raw_track.splice = Some((
        (index0 + (index1 - index0) * splice_pos) as u32,
        (index1 + (index2 - index1) * splice_pos) as u32,
    ));

    log::debug!(
        "find_splice_point(): track {} splice at {:?} (pos {:.3}, gap {:.3})",
        track_num,
        raw_track.splice,
        splice_pos,
        best_gap
    );
}

/// Annotate side 0 of a raw disk with splice windows derived from its decoded
/// companion.
pub fn find_splice_points(raw_disk: &mut RawDisk, decoded_disk: &crate::disk::DecodedDisk) {
    for track in 0..crate::disk::MAX_PHYS_TRACKS {
        find_splice_point(
            track as u32,
            &mut raw_disk.tracks[0][track],
            &decoded_disk.tracks[0][track],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DecodedSector;

    fn sector_at(index: u8, position: f32, ending: f32) -> DecodedSector {
        DecodedSector {
            index,
            sector_size: 128,
            data: vec![0; 128],
            position,
            ending_position: ending,
            ..DecodedSector::default()
        }
    }

    #[test]
    fn test_needs_three_index_marks() {
        let mut raw = RawTrack {
            index_times: vec![0, 1000],
            ..RawTrack::default()
        };
        find_splice_point(0, &mut raw, &DecodedTrack::default());
        assert!(raw.splice.is_none());
    }

    #[test]
    fn test_splice_lands_in_widest_gap() {
        let mut raw = RawTrack {
            index_times: vec![0, 100_000, 200_000],
            ..RawTrack::default()
        };

        let mut decoded = DecodedTrack::default();
        // gap between 0.45 and 0.80 is the widest
        decoded.sectors.push(sector_at(1, 0.10, 0.25));
        decoded.sectors.push(sector_at(2, 0.30, 0.45));
        decoded.sectors.push(sector_at(3, 0.80, 0.95));

        find_splice_point(0, &mut raw, &decoded);

        let (start, end) = raw.splice.unwrap();
        // splice_pos = 0.80 - 0.35/3
        let expected = 0.80 - 0.35 / 3.0;
        assert!((start as f64 - expected * 100_000.0).abs() < 2.0);
        assert!((end as f64 - (100_000.0 + expected * 100_000.0)).abs() < 2.0);
    }
}
