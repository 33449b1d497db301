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

//! 6-and-2 GCR code tables and 4-and-4 helpers shared by the Apple II and
//! Macintosh sector state machines and the track encoder.

/// Marker for a byte that is not a valid 6-and-2 GCR code.
pub const GCR6_INVALID: u8 = 0xFF;

/// 6-bit value to GCR byte. All codes have the MSB set and no more than one
/// pair of adjacent zero bits, per the Disk II framing rules.
#[rustfmt::skip]
pub static GCR6_ENCODE: [u8; 64] = [
    0x96, 0x97, 0x9A, 0x9B, 0x9D, 0x9E, 0x9F, 0xA6,
    0xA7, 0xAB, 0xAC, 0xAD, 0xAE, 0xAF, 0xB2, 0xB3,
    0xB4, 0xB5, 0xB6, 0xB7, 0xB9, 0xBA, 0xBB, 0xBC,
    0xBD, 0xBE, 0xBF, 0xCB, 0xCD, 0xCE, 0xCF, 0xD3,
    0xD6, 0xD7, 0xD9, 0xDA, 0xDB, 0xDC, 0xDD, 0xDE,
    0xDF, 0xE5, 0xE6, 0xE7, 0xE9, 0xEA, 0xEB, 0xEC,
    0xED, 0xEE, 0xEF, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6,
    0xF7, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
];

/// GCR byte to 6-bit value, [`GCR6_INVALID`] for bytes outside the code.
#[rustfmt::skip]
pub static GCR6_DECODE: [u8; 256] = {
    const IL: u8 = GCR6_INVALID;
    [
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL,
        // $90
        IL, IL, IL, IL, IL, IL,  0,  1, IL, IL,  2,  3, IL,  4,  5,  6,
        // $A0
        IL, IL, IL, IL, IL, IL,  7,  8, IL, IL,  8,  9, 10, 11, 12, 13,
        // $B0
        IL, IL, 14, 15, 16, 17, 18, 19, IL, 20, 21, 22, 23, 24, 25, 26,
        // $C0
        IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, IL, 27, IL, 28, 29, 30,
        // $D0
        IL, IL, IL, 31, IL, IL, 32, 33, IL, 34, 35, 36, 37, 38, 39, 40,
        // $E0
        IL, IL, IL, IL, IL, 41, 42, 43, IL, 44, 45, 46, 47, 48, 49, 50,
        // $F0
        IL, IL, 51, 52, 53, 54, 55, 56, IL, 57, 58, 59, 60, 61, 62, 63,
    ]
};

/// Split a byte across two 4-and-4 encoded bytes (odd bits, then even bits,
/// with alternating one bits filled in).
#[inline]
pub fn encode_44(v: u8) -> (u8, u8) {
    ((v >> 1) | 0xAA, v | 0xAA)
}

/// Recombine a 4-and-4 encoded byte pair.
#[inline]
pub fn decode_44(a: u8, b: u8) -> u8 {
    (a & 0x55).wrapping_mul(2).wrapping_add(b & 0x55)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcr6_round_trip() {
        for v in 0..64u8 {
            let enc = GCR6_ENCODE[v as usize];
            assert_eq!(GCR6_DECODE[enc as usize], v, "GCR code {:02X}", enc);
        }
    }

    #[test]
    fn test_gcr6_codes_have_msb_set() {
        for v in 0..64u8 {
            assert!(GCR6_ENCODE[v as usize] & 0x80 != 0);
        }
    }

    #[test]
    fn test_44_round_trip() {
        for v in 0..=255u8 {
            let (a, b) = encode_44(v);
            assert_eq!(decode_44(a, b), v);
        }
    }

    #[test]
    fn test_44_checksum_zeroes() {
        // An address field checksum is the XOR of the decoded bytes; four
        // identical bytes XOR with their own checksum to zero.
        let vals = [0xFE, 0x11, 0x0C];
        let chk = vals.iter().fold(0u8, |acc, v| acc ^ v);
        let all = [vals[0], vals[1], vals[2], chk];
        assert_eq!(all.iter().fold(0u8, |acc, v| acc ^ v), 0);
    }
}
