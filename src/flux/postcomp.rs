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

//! Peak-shift post-compensation for captured flux.
//!
//! High-density recordings suffer peak shift on readback: closely spaced
//! transition pairs repel each other in the analog chain. The Macintosh 800K
//! filter reverses that distortion before decoding, with the correction
//! strength scaled on inner tracks where the same linear mapping would
//! overcorrect.

use crate::{
    types::{AnalysisMode, CoreOptions, EncodingSelect, PostCompMode},
    RawDisk,
    RawTrack,
};

/// Apply Macintosh 800K peak-shift correction to one track, in place.
/// Transition count and ordering are preserved.
pub fn postcomp_track_mac800k(track: &mut RawTrack) {
    let n = track.transitions.len();
    if n < 3 {
        return;
    }

    // Correction begins at roughly 1/45000th of a rotation. Standard 2us MFM
    // has a minimum spacing of 4us at 300 RPM (1/50000th); tracks 0-15 of a
    // Mac 800K disk have 2us minimum spacing at 394 RPM (1/76142th), which
    // makes them far more prone to peak shift. The track term compensates for
    // smaller circumferences toward the center, clamped after the third
    // speed zone.
    let thresh =
        (0.5 + track.samples_per_rev / 30000.0 * (160 + track.phys_track.min(47) as i32) as f64 / 240.0) as i32;

    let mut t0 = track.transitions[0];
    let mut t1 = track.transitions[1];

    for i in 2..n {
        let t2 = track.transitions[i];

        let t01 = t1.wrapping_sub(t0) as i32;
        let t12 = t2.wrapping_sub(t1) as i32;

        // anti peak-shift deltas for any pair narrower than the threshold
        let delta1 = (thresh - t01).max(0);
        let delta2 = (thresh - t12).max(0);

        // push apart, limited to half the distance on each side
        let shift = (((delta2 - delta1) * 5) / 12).clamp(-(t01 / 2), t12 / 2);
        track.transitions[i - 1] = (t1 as i64 + shift as i64) as u32;

        t0 = t1;
        t1 = t2;
    }
}

/// Apply the selected post-compensation filter to every track of a raw disk.
/// `None` and unresolved `Auto` are no-ops.
pub fn postcomp_disk(raw_disk: &mut RawDisk, mode: PostCompMode) {
    if mode != PostCompMode::Mac800k {
        return;
    }

    for side in &mut raw_disk.tracks {
        for track in side {
            postcomp_track_mac800k(track);
        }
    }
}

/// Resolve the `Auto` post-compensation mode: Mac 800K correction engages
/// only when the Macintosh GCR decoder (or Mac histogram calibration) is in
/// play.
pub fn resolve_postcomp(opts: &CoreOptions) -> PostCompMode {
    match opts.postcomp {
        PostCompMode::Auto => {
            if opts.encodings.contains(EncodingSelect::MAC_GCR) || opts.analysis == AnalysisMode::Mac {
                PostCompMode::Mac800k
            }
            else {
                PostCompMode::None
            }
        }
        mode => mode,
    }
}
