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

//! CRC-CCITT support shared by the sector state machines, the track encoder,
//! and the disk-script engine.
//!
//! Note: frequently attributed to CRC-CCITT; the exact parameterization is
//! CRC-16/IBM-3740. See: https://reveng.sourceforge.io/crc-catalogue/16.htm

/// The initial seed value for CRC-CCITT and related checksums.
pub const CRC_CCITT_INITIAL: u16 = 0xFFFF;

const POLY: u16 = 0x1021; // Polynomial x^16 + x^12 + x^5 + 1

/// Calculate a 16-bit checksum over a byte slice. `start` continues a running
/// checksum; `None` seeds a fresh one.
pub fn crc_ccitt(data: &[u8], start: Option<u16>) -> u16 {
    let mut crc: u16 = start.unwrap_or(CRC_CCITT_INITIAL);

    for &byte in data {
        crc = crc_ccitt_byte(byte, crc);
    }
    crc
}

/// Calculate a 16-bit checksum one byte at a time.
pub fn crc_ccitt_byte(byte: u8, crc: u16) -> u16 {
    let mut crc = crc;

    crc ^= (byte as u16) << 8;
    for _ in 0..8 {
        if (crc & 0x8000) != 0 {
            crc = (crc << 1) ^ POLY;
        }
        else {
            crc <<= 1;
        }
    }
    crc
}

/// Continue a running checksum over the bitwise complement of `data`.
///
/// FM and MFM sector payloads are recorded complemented on the wire, so the
/// data-field CRC must be computed over the complemented bytes.
pub fn crc_ccitt_inverted(data: &[u8], crc: u16) -> u16 {
    let mut crc = crc;

    for &byte in data {
        crc = crc_ccitt_byte(!byte, crc);
    }
    crc
}

/// Compute the address-field CRC for an FM or MFM sector header as it would
/// appear on the wire, including the three 0xA1 sync bytes in the MFM case.
pub fn address_crc(track: u8, side: u8, sector: u8, sector_size: usize, mfm: bool) -> u16 {
    let size_code = match sector_size {
        s if s > 512 => 3,
        s if s > 256 => 2,
        s if s > 128 => 1,
        _ => 0,
    };

    let data = [0xA1, 0xA1, 0xA1, 0xFE, track, side, sector, size_code];

    if mfm {
        crc_ccitt(&data, None)
    }
    else {
        crc_ccitt(&data[3..], None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // CRC-16/IBM-3740 check value
        assert_eq!(crc_ccitt(b"123456789", None), 0x29B1);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = [0xFE, 0x00, 0x00, 0x01, 0x00];
        let mut crc = CRC_CCITT_INITIAL;
        for &b in &data {
            crc = crc_ccitt_byte(b, crc);
        }
        assert_eq!(crc, crc_ccitt(&data, None));
    }

    #[test]
    fn test_inverted_input() {
        let data = [0x12, 0x34, 0x56];
        let complemented: Vec<u8> = data.iter().map(|&b| !b).collect();
        assert_eq!(
            crc_ccitt_inverted(&data, CRC_CCITT_INITIAL),
            crc_ccitt(&complemented, None)
        );
    }

    #[test]
    fn test_address_crc_framing() {
        // The FM address CRC skips the A1 sync prefix; the MFM one includes it.
        let fm = crc_ccitt(&[0xFE, 2, 0, 5, 0], None);
        let mfm = crc_ccitt(&[0xA1, 0xA1, 0xA1, 0xFE, 2, 0, 5, 0], None);
        assert_eq!(address_crc(2, 0, 5, 128, false), fm);
        assert_eq!(address_crc(2, 0, 5, 128, true), mfm);
        assert_ne!(fm, mfm);
    }

    #[test]
    fn test_size_codes() {
        assert_eq!(address_crc(0, 0, 1, 256, true), crc_ccitt(&[0xA1, 0xA1, 0xA1, 0xFE, 0, 0, 1, 1], None));
        assert_eq!(address_crc(0, 0, 1, 1024, true), crc_ccitt(&[0xA1, 0xA1, 0xA1, 0xFE, 0, 0, 1, 3], None));
    }
}
