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

//! The conversion options record.
//!
//! All pipeline knobs travel in one immutable [`CoreOptions`] value threaded
//! through decode and encode; there is no global configuration state.

use crate::{
    types::{AnalysisMode, EncodingSelect, InterleaveMode, PostCompMode},
    FluxConvError,
};

/// Logical disk geometry: track count, physical track step, and side count.
///
/// Physical addressing is always on the 96 tpi grid; 48 tpi layouts use a
/// step of 2 so that logical tracks occupy even physical slots.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiskGeometry {
    pub tracks: u8,
    pub step: u8,
    pub sides: u8,
}

impl Default for DiskGeometry {
    fn default() -> Self {
        DiskGeometry {
            tracks: 40,
            step: 2,
            sides: 1,
        }
    }
}

impl DiskGeometry {
    /// Build a geometry from a track and side count, deriving the physical
    /// track step from the track count.
    pub fn new(tracks: u8, sides: u8) -> Result<DiskGeometry, FluxConvError> {
        if !(1..=84).contains(&tracks) || !(1..=2).contains(&sides) {
            return Err(FluxConvError::Geometry(format!(
                "{} tracks, {} sides; must be 1-84 tracks, 1-2 sides",
                tracks, sides
            )));
        }

        Ok(DiskGeometry {
            tracks,
            step: if tracks > 41 { 1 } else { 2 },
            sides,
        })
    }
}

/// The conversion pipeline's option record.
#[derive(Clone, Debug)]
pub struct CoreOptions {
    /// Which sector decoders run on a raw-to-decoded conversion.
    pub encodings: EncodingSelect,
    /// Histogram calibration mode; participates in post-comp auto selection.
    pub analysis: AnalysisMode,
    /// Post-compensation filter for raw input.
    pub postcomp: PostCompMode,
    /// Interleave selection for decoded ingress without positions.
    pub interleave: InterleaveMode,
    /// Encode sectors at their recorded angular positions rather than packed
    /// in order. May cause overlaps on dense tracks.
    pub encode_precise: bool,
    /// Multiplies the nominal bit-cell period in both the data separator and
    /// the track encoder. Valid range 0.5 to 2.0.
    pub clock_period_adjust: f64,
    /// Double the FM/MFM bit-cell rate.
    pub high_density: bool,
    /// Time-reverse all raw tracks before decoding (flipped-disk captures).
    pub reverse_tracks: bool,
    /// XOR decoded Apple II GCR payload bytes with 0x80.
    pub invert_bit7: bool,
    /// Restrict processing to a single logical track.
    pub track_select: Option<u8>,
    /// Logical geometry of the conversion.
    pub geometry: DiskGeometry,
    /// Dump the contents of CRC-failed FM sectors to the debug log.
    pub dump_bad_sectors: bool,
}

impl Default for CoreOptions {
    fn default() -> Self {
        CoreOptions {
            encodings: EncodingSelect::default(),
            analysis: AnalysisMode::None,
            postcomp: PostCompMode::Auto,
            interleave: InterleaveMode::Auto,
            encode_precise: false,
            clock_period_adjust: 1.0,
            high_density: false,
            reverse_tracks: false,
            invert_bit7: false,
            track_select: None,
            geometry: DiskGeometry::default(),
            dump_bad_sectors: false,
        }
    }
}

impl CoreOptions {
    pub fn validate(&self) -> Result<(), FluxConvError> {
        if !(0.5..=2.0).contains(&self.clock_period_adjust) {
            return Err(FluxConvError::Parameter(format!(
                "clock period adjustment {} out of range (0.5-2.0)",
                self.clock_period_adjust
            )));
        }

        if self.geometry.tracks < 1 || self.geometry.tracks > 84 {
            return Err(FluxConvError::Geometry(format!(
                "invalid track count: {}",
                self.geometry.tracks
            )));
        }

        if self.geometry.sides < 1 || self.geometry.sides > 2 {
            return Err(FluxConvError::Geometry(format!(
                "invalid side count: {}",
                self.geometry.sides
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_step_derivation() {
        assert_eq!(DiskGeometry::new(40, 1).unwrap().step, 2);
        assert_eq!(DiskGeometry::new(41, 2).unwrap().step, 2);
        assert_eq!(DiskGeometry::new(42, 2).unwrap().step, 1);
        assert_eq!(DiskGeometry::new(80, 2).unwrap().step, 1);
        assert!(DiskGeometry::new(85, 1).is_err());
        assert!(DiskGeometry::new(40, 3).is_err());
    }

    #[test]
    fn test_options_validation() {
        let mut opts = CoreOptions::default();
        assert!(opts.validate().is_ok());

        opts.clock_period_adjust = 0.49;
        assert!(opts.validate().is_err());

        opts.clock_period_adjust = 2.0;
        assert!(opts.validate().is_ok());
    }
}
