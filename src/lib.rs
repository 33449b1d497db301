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

//! # fluxconv
//!
//! fluxconv is a Rust library for converting between raw flux-transition
//! captures (SuperCard Pro, KryoFlux, disk scripts) and decoded sector images
//! for several vintage microcomputer recording schemes: FM, MFM (Atari, PC
//! and Amiga flavors), Apple II 6-and-2 GCR, and Macintosh variable-speed
//! GCR.
//!
//! The library operates entirely on in-memory structures: a [`RawDisk`] holds
//! per-track flux transition timelines, and a [`DecodedDisk`] holds per-track
//! sector multisets. Container file formats (SCP, ATR, ATX, ADF, VFD, ...),
//! serial transports, and the CLI are expected to live in host applications;
//! fluxconv supplies the data separator, the sector state machines, the
//! multi-revolution sector sifter, the track encoder, and the disk-script
//! compiler that sit between them.
//!
//! A raw-to-decoded conversion runs [`decode_disk`] (optionally preceded by
//! post-compensation and track reversal); a decoded-to-raw conversion runs
//! [`encode_disk`] and, for splice-aware writers, [`find_splice_points`].
//! All knobs travel in a single immutable [`CoreOptions`] record.

pub mod crc;
pub mod decode;
pub mod disk;
pub mod encode;
pub mod flux;
pub mod gcr;
pub mod script;
pub mod types;

use thiserror::Error;

/// The largest sector payload any supported encoding records.
pub const MAXIMUM_SECTOR_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum FluxConvError {
    #[error("invalid disk geometry: {0}")]
    Geometry(String),
    #[error("invalid parameter: {0}")]
    Parameter(String),
    #[error("{file}({line},{col}): Error: {message}")]
    ScriptParse {
        file: String,
        line: u32,
        col: u32,
        message: String,
    },
    #[error("script execution failed: {0}")]
    ScriptExec(String),
}

pub use crate::{
    decode::{decode_disk, decode_track},
    disk::{
        reverse_tracks,
        sifter::sift_sectors,
        splice::find_splice_points,
        DecodedDisk,
        DecodedSector,
        DecodedTrack,
        RawDisk,
        RawTrack,
    },
    encode::{encode_disk, encode_track},
    flux::postcomp::{postcomp_disk, resolve_postcomp},
    script::compile as compile_script,
    types::{AnalysisMode, CoreOptions, DiskGeometry, EncodingSelect, InterleaveMode, PostCompMode},
};

pub mod prelude {
    pub use crate::{
        decode::{decode_disk, decode_track},
        disk::{
            reverse_tracks,
            sifter::sift_sectors,
            splice::find_splice_points,
            DecodedDisk,
            DecodedSector,
            DecodedTrack,
            RawDisk,
            RawTrack,
        },
        encode::{encode_disk, encode_track},
        flux::postcomp::{postcomp_disk, resolve_postcomp},
        script::compile as compile_script,
        types::{AnalysisMode, CoreOptions, DiskGeometry, EncodingSelect, InterleaveMode, PostCompMode},
        FluxConvError,
    };
}

/// Run the raw-to-decoded half of a conversion: post-compensation, optional
/// track reversal, then per-track decoding with the selected sector decoders.
///
/// The raw disk is taken mutably because post-compensation and reversal edit
/// the flux timeline in place.
pub fn convert_raw(raw_disk: &mut RawDisk, opts: &CoreOptions) -> Result<DecodedDisk, FluxConvError> {
    opts.validate()?;

    postcomp_disk(raw_disk, resolve_postcomp(opts));

    if opts.reverse_tracks {
        reverse_tracks(raw_disk);
    }

    Ok(decode_disk(raw_disk, opts))
}

/// Run the decoded-to-raw half of a conversion: sift each track and synthesize
/// flux on the canonical 5ns / 360 RPM timeline.
///
/// `a2gcr` selects the Apple II GCR sector layout; it is a property of the
/// source image, not of the decoder selection, so it travels separately from
/// [`CoreOptions::encodings`].
pub fn convert_decoded(
    decoded_disk: &mut DecodedDisk,
    opts: &CoreOptions,
    a2gcr: bool,
) -> Result<RawDisk, FluxConvError> {
    opts.validate()?;

    Ok(encode_disk(decoded_disk, opts, a2gcr))
}
