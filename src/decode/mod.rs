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

//! Raw-to-decoded conversion: per-encoding track drivers feeding sector
//! state machines off the data separator output.
//!
//! Each selected encoding makes an independent pass over the track's flux
//! timeline. FM and MFM drivers spawn a sector state machine instance per
//! recognized sync mark and retire instances as they complete or fail; the
//! self-framing GCR encodings run one track-wide state machine instead.

pub mod a2gcr;
pub mod amiga;
pub mod fm;
pub mod macgcr;
pub mod mfm;

use crate::{
    disk::{DecodedDisk, DecodedSector, DecodedTrack, RawDisk, RawTrack},
    types::{CoreOptions, EncodingSelect},
};

/// The result of feeding one bit to a sector state machine instance.
pub(crate) enum ParseOutcome {
    /// Keep the instance alive.
    Continue,
    /// Retire the instance without a sector.
    Discard,
    /// The instance recognized a complete sector; retire it.
    Complete(DecodedSector),
}

/// The revolution a tick falls in, located from the index-mark table.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Revolution {
    pub start: u32,
    pub end: u32,
    pub position: f32,
}

/// Locate `tick` between two adjacent index marks and compute its angular
/// position within that revolution. Ticks before the first or after the last
/// index mark have no revolution to belong to.
pub(crate) fn rotation_position(index_times: &[u32], tick: u32) -> Option<Revolution> {
    let after = index_times.partition_point(|&t| t <= tick.wrapping_add(1));

    if after == 0 || after == index_times.len() {
        return None;
    }

    let start = index_times[after - 1];
    let end = index_times[after];

    let offset = tick.wrapping_sub(start) as i32;
    let mut position = offset as f32 / end.wrapping_sub(start) as f32;
    position -= position.floor();

    Some(Revolution { start, end, position })
}

/// Angular position of `tick` within an already-located revolution; wraps
/// (extrapolating if needed) into [0, 1).
pub(crate) fn ending_position(rev_start: u32, rev_end: u32, tick: u32) -> f32 {
    let mut position = tick.wrapping_sub(rev_start) as i32 as f32 / rev_end.wrapping_sub(rev_start) as f32;
    position -= position.floor();
    position
}

/// Run every selected sector decoder over one raw track.
pub fn decode_track(raw_track: &RawTrack, dst_track: &mut DecodedTrack, track_step: u8, opts: &CoreOptions) {
    if opts.encodings.contains(EncodingSelect::FM) {
        fm::decode_track_fm(raw_track, dst_track, track_step, opts);
    }

    if opts.encodings.contains(EncodingSelect::MFM) {
        mfm::decode_track_mfm(raw_track, dst_track, track_step, opts, false, false);
    }

    if opts.encodings.contains(EncodingSelect::PC_MFM) {
        mfm::decode_track_mfm(raw_track, dst_track, track_step, opts, false, true);
    }

    if opts.encodings.contains(EncodingSelect::AMIGA_MFM) {
        amiga::decode_track_amiga(raw_track, dst_track, track_step, opts);
    }

    if opts.encodings.contains(EncodingSelect::MAC_GCR) {
        macgcr::decode_track_macgcr(raw_track, dst_track, opts);
    }

    if opts.encodings.contains(EncodingSelect::A2_GCR) {
        a2gcr::decode_track_a2gcr(raw_track, dst_track, track_step, opts);
    }
}

/// Decode every live track of a raw disk into a fresh decoded disk.
///
/// The output geometry is the intersection of the capture's geometry and the
/// requested one: a capture with more tracks than the logical format calls
/// for only decodes the tracks the format can hold.
pub fn decode_disk(raw_disk: &RawDisk, opts: &CoreOptions) -> DecodedDisk {
    let mut decoded_disk = DecodedDisk {
        track_count: raw_disk.track_count.min(opts.geometry.tracks),
        track_step: raw_disk.track_step,
        side_count: raw_disk.side_count.min(opts.geometry.sides),
        ..DecodedDisk::default()
    };

    for track in 0..decoded_disk.track_count {
        if opts.track_select.is_some_and(|sel| sel != track) {
            continue;
        }

        for side in 0..decoded_disk.side_count {
            let phys_track = track * raw_disk.track_step;
            decode_track(
                raw_disk.track(side, phys_track),
                decoded_disk.track_mut(side, phys_track),
                raw_disk.track_step,
                opts,
            );
        }
    }

    decoded_disk
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_position() {
        let index_times = [1000, 2000, 3000];

        // before the first index mark
        assert!(rotation_position(&index_times, 500).is_none());
        // after the last
        assert!(rotation_position(&index_times, 3500).is_none());

        let rev = rotation_position(&index_times, 1250).unwrap();
        assert_eq!(rev.start, 1000);
        assert_eq!(rev.end, 2000);
        assert!((rev.position - 0.25).abs() < 1e-6);

        let rev = rotation_position(&index_times, 2500).unwrap();
        assert_eq!(rev.start, 2000);
        assert!((rev.position - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ending_position_wraps() {
        // extrapolating past the revolution end wraps into [0, 1)
        let pos = ending_position(1000, 2000, 3500);
        assert!((pos - 0.5).abs() < 1e-6);
        assert!((0.0..1.0).contains(&ending_position(1000, 2000, 1999)));
    }
}
