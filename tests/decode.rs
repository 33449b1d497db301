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

    tests/decode.rs

    Decoding scenarios driven through the disk-script compiler: scripts
    synthesize FM flux at the exact cell rate the FM decoder expects from
    the script engine's 25ns / 360 RPM timeline.
*/

use fluxconv::prelude::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn decode_script(src: &str, opts: &CoreOptions) -> DecodedDisk {
    let mut raw = RawDisk::default();
    compile_script("test.diskscript", src, &mut raw).unwrap();
    decode_disk(&raw, opts)
}

fn fm_only() -> CoreOptions {
    CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    }
}

/// A full FM sector on track 0: IDAM for track 0, sector 1, 128 bytes of
/// complemented-0x00 payload, proper CRCs throughout.
const GOOD_SECTOR_SCRIPT: &str = r"
track 0 {
    repeat 10 : byte 0x00;
    crc_begin;
    special_byte 0xFE;
    bytes 0x00, 0x00, 0x01, 0x00;
    crc_end;
    repeat 17 : byte 0x00;
    crc_begin;
    special_byte 0xFB;
    repeat 128 : byte 0xFF;
    crc_end;
    repeat 8 : byte 0x00;
}
";

#[test]
fn test_fm_idam_recognition() {
    init();

    let mut disk = decode_script(GOOD_SECTOR_SCRIPT, &fm_only());

    let track = disk.track(0, 0);
    assert!(!track.sectors.is_empty(), "no FM sectors decoded");

    // both recorded revolutions decode to the same sector
    for sec in &track.sectors {
        assert_eq!(sec.index, 1);
        assert_eq!(sec.sector_size, 128);
        assert_eq!(sec.address_mark, 0xFB);
        assert_eq!(sec.recorded_address_crc, sec.computed_address_crc);
        assert_eq!(sec.recorded_crc, sec.computed_crc);
        assert!(sec.data.iter().all(|&b| b == 0));
        assert!(!sec.is_mfm);
        assert!((0.0..1.0).contains(&sec.position));
    }

    // sifting collapses the revolutions to a single instance
    let dst = disk.track_mut(0, 0);
    let sifted = sift_sectors(dst, 0);
    assert_eq!(sifted.len(), 1);
}

#[test]
fn test_fm_wrong_track_header_skipped() {
    init();

    // header claims track 5 while the flux lives on track 0
    let src = r"
track 0 {
    repeat 10 : byte 0x00;
    crc_begin;
    special_byte 0xFE;
    bytes 0x05, 0x00, 0x01, 0x00;
    crc_end;
    repeat 17 : byte 0x00;
    crc_begin;
    special_byte 0xFB;
    repeat 128 : byte 0xFF;
    crc_end;
}
";

    let disk = decode_script(src, &fm_only());
    assert!(disk.track(0, 0).sectors.is_empty());
}

#[test]
fn test_fm_bad_address_crc_placeholder() {
    init();

    // recorded address CRC bytes are garbage
    let src = r"
track 0 {
    repeat 10 : byte 0x00;
    special_byte 0xFE;
    bytes 0x00, 0x00, 0x02, 0x00, 0x12, 0x34;
    repeat 17 : byte 0x00;
}
";

    let disk = decode_script(src, &fm_only());
    let track = disk.track(0, 0);

    assert!(!track.sectors.is_empty());
    let sec = &track.sectors[0];

    assert_eq!(sec.index, 2);
    assert_eq!(sec.sector_size, 128);
    assert_eq!(sec.recorded_address_crc, 0x1234);
    assert_ne!(sec.recorded_address_crc, sec.computed_address_crc);
    // placeholder payload is zeroed, data CRCs untouched
    assert!(sec.data.iter().all(|&b| b == 0));
    assert_eq!(sec.recorded_crc, 0);
    assert_eq!(sec.computed_crc, 0);
}

#[test]
fn test_fm_size_code_uses_low_bits_only() {
    init();

    // size code 0x04 masks down to 0 (128 bytes); this aliasing is relied on
    // by period software
    let src = r"
track 0 {
    repeat 10 : byte 0x00;
    crc_begin;
    special_byte 0xFE;
    bytes 0x00, 0x00, 0x03, 0x04;
    crc_end;
    repeat 17 : byte 0x00;
    crc_begin;
    special_byte 0xFB;
    repeat 128 : byte 0xFF;
    crc_end;
}
";

    let disk = decode_script(src, &fm_only());
    let track = disk.track(0, 0);

    assert!(!track.sectors.is_empty());
    assert_eq!(track.sectors[0].sector_size, 128);
    assert_eq!(track.sectors[0].index, 3);
    assert!(track.sectors[0].recorded_crc == track.sectors[0].computed_crc);
}

#[test]
fn test_fm_dam_within_window_after_interleaved_idam() {
    init();

    // A second IDAM between the header and its DAM must not abort the DAM
    // search; some protection schemes interleave marks this way.
    let src = r"
track 0 {
    repeat 10 : byte 0x00;
    crc_begin;
    special_byte 0xFE;
    bytes 0x00, 0x00, 0x04, 0x00;
    crc_end;
    repeat 12 : byte 0x00;
    special_byte 0xFE;
    repeat 4 : byte 0x00;
    crc_begin;
    special_byte 0xFB;
    repeat 128 : byte 0xFF;
    crc_end;
}
";

    let disk = decode_script(src, &fm_only());
    let sectors: Vec<_> = disk.track(0, 0).sectors.iter().filter(|s| s.index == 4).collect();

    assert!(!sectors.is_empty());
    assert_eq!(sectors[0].recorded_crc, sectors[0].computed_crc);
}

#[test]
fn test_track_select_restricts_decoding() {
    init();

    let mut raw = RawDisk::default();
    let src = "track 0 { repeat 4 : byte 0x00; } track 1 { repeat 4 : byte 0x00; }";
    compile_script("t.diskscript", src, &mut raw).unwrap();

    let opts = CoreOptions {
        track_select: Some(1),
        ..fm_only()
    };

    // no sectors anywhere, but the restriction is observable through the
    // flux never being touched for other tracks; this mainly exercises the
    // dispatch path
    let disk = decode_disk(&raw, &opts);
    assert!(disk.track(0, 0).sectors.is_empty());
}
