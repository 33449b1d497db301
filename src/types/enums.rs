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

//! Option enums for the conversion pipeline.

use bitflags::bitflags;
use strum::{Display, EnumString};

bitflags! {
    /// The set of sector decoders to run against raw tracks. Multiple
    /// decoders may be selected; each runs as an independent pass over the
    /// track's flux timeline.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct EncodingSelect: u8 {
        /// Atari FM, 288 RPM single density.
        const FM        = 0b0000_0001;
        /// Atari MFM, 288 RPM enhanced/double density.
        const MFM       = 0b0000_0010;
        /// PC MFM, 300/360 RPM double density.
        const PC_MFM    = 0b0000_0100;
        /// Amiga trackdisk MFM, 300 RPM.
        const AMIGA_MFM = 0b0000_1000;
        /// Macintosh variable-speed 6-and-2 GCR.
        const MAC_GCR   = 0b0001_0000;
        /// Apple II 6-and-2 GCR, 300 RPM.
        const A2_GCR    = 0b0010_0000;
    }
}

impl Default for EncodingSelect {
    fn default() -> Self {
        EncodingSelect::FM | EncodingSelect::MFM
    }
}

/// Flux-timing histogram calibration modes. Histogram analysis itself lives
/// in the host application; the mode participates here because it feeds the
/// automatic post-compensation selection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum AnalysisMode {
    #[default]
    None,
    AtariFm,
    AtariMfm,
    #[strum(serialize = "pc-360k")]
    Pc360k,
    #[strum(serialize = "pc-1.2m")]
    Pc1_2m,
    #[strum(serialize = "pc-1.44m")]
    Pc1_44m,
    Amiga,
    Apple2,
    Mac,
}

/// Post-compensation filter selection for raw input. `Auto` resolves to
/// `Mac800k` when the Macintosh GCR decoder is in play and `None` otherwise.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PostCompMode {
    None,
    #[default]
    Auto,
    Mac800k,
}

/// Sector interleave selection, consumed by the interleave collaborator when
/// a decoded source arrives without angular positions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum InterleaveMode {
    #[default]
    Auto,
    ForceAuto,
    None,
    #[strum(serialize = "xf551-hs")]
    Xf551Hs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_encoding_default() {
        let enc = EncodingSelect::default();
        assert!(enc.contains(EncodingSelect::FM));
        assert!(enc.contains(EncodingSelect::MFM));
        assert!(!enc.contains(EncodingSelect::A2_GCR));
    }

    #[test]
    fn test_option_strings() {
        assert_eq!(AnalysisMode::from_str("atari-fm").unwrap(), AnalysisMode::AtariFm);
        assert_eq!(AnalysisMode::from_str("pc-1.44m").unwrap(), AnalysisMode::Pc1_44m);
        assert_eq!(PostCompMode::from_str("mac800k").unwrap(), PostCompMode::Mac800k);
        assert_eq!(InterleaveMode::from_str("xf551-hs").unwrap(), InterleaveMode::Xf551Hs);
        assert_eq!(InterleaveMode::from_str("force-auto").unwrap(), InterleaveMode::ForceAuto);
    }
}
