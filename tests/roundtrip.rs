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

    tests/roundtrip.rs

    Encode-then-decode round trips across the supported layouts, plus
    encoder determinism and flux-level properties of the synthesized
    tracks.
*/

mod common;

use common::*;
use fluxconv::{encode::encode_track, prelude::*};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encode `src_disk`, decode it back, and compare the sifted result of each
/// populated track against the original sectors.
fn round_trip(src_disk: &mut DecodedDisk, opts: &CoreOptions, a2gcr: bool, tracks: u8, count: u8) {
    let raw_disk = encode_disk(src_disk, opts, a2gcr);
    let mut redecoded = decode_disk(&raw_disk, opts);

    for track in 0..tracks {
        let expected = sifted_by_index(src_disk, track, 0);
        let actual = sifted_by_index(&mut redecoded, track, 0);

        assert_eq!(actual.len(), count as usize, "track {} sector count", track);

        for (exp, act) in expected.iter().zip(actual.iter()) {
            assert_eq!(act.index, exp.index, "track {} sector index", track);
            assert_eq!(act.sector_size, exp.sector_size);
            assert_eq!(act.address_mark, exp.address_mark);
            assert_eq!(act.data, exp.data, "track {} sector {} payload", track, exp.index);
            assert!(act.is_good(), "track {} sector {} CRC", track, exp.index);
        }
    }
}

#[test]
fn test_fm_round_trip() {
    init();

    // Atari single density: 18 x 128-byte FM sectors per track.
    let mut disk = DecodedDisk {
        track_count: 2,
        ..DecodedDisk::default()
    };
    for track in 0..2 {
        fill_track(&mut disk, track, 0, 18, 128, false, 1);
    }

    let opts = CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    };

    round_trip(&mut disk, &opts, false, 2, 18);
}

#[test]
fn test_mfm_round_trip() {
    init();

    // Atari double density: 18 x 256-byte MFM sectors per track.
    let mut disk = DecodedDisk {
        track_count: 2,
        primary_sector_size: 256,
        ..DecodedDisk::default()
    };
    for track in 0..2 {
        fill_track(&mut disk, track, 0, 18, 256, true, 1);
    }

    let opts = CoreOptions {
        encodings: EncodingSelect::MFM,
        ..CoreOptions::default()
    };

    round_trip(&mut disk, &opts, false, 2, 18);
}

#[test]
fn test_pc_hd_round_trip() {
    init();

    // PC 1.44M: 18 x 512-byte MFM sectors at doubled bit rate.
    let mut disk = DecodedDisk {
        track_count: 2,
        track_step: 1,
        primary_sector_size: 512,
        primary_sectors_per_track: 18,
        ..DecodedDisk::default()
    };
    for track in 0..2 {
        fill_track(&mut disk, track, 0, 18, 512, true, 1);
    }

    let opts = CoreOptions {
        encodings: EncodingSelect::PC_MFM,
        high_density: true,
        geometry: DiskGeometry::new(80, 2).unwrap(),
        ..CoreOptions::default()
    };

    round_trip(&mut disk, &opts, false, 2, 18);
}

#[test]
fn test_amiga_content_round_trip() {
    init();

    // Amiga trackdisk content: 11 x 512-byte sectors numbered from 0. The
    // flux layout is generic MFM, so an 11-sector track only fits with a
    // slightly fast clock.
    let mut disk = DecodedDisk {
        track_count: 1,
        track_step: 1,
        primary_sector_size: 512,
        primary_sectors_per_track: 11,
        ..DecodedDisk::default()
    };
    fill_track(&mut disk, 0, 0, 11, 512, true, 0);

    let opts = CoreOptions {
        encodings: EncodingSelect::MFM,
        clock_period_adjust: 0.98,
        geometry: DiskGeometry::new(80, 2).unwrap(),
        ..CoreOptions::default()
    };

    round_trip(&mut disk, &opts, false, 1, 11);
}

#[test]
fn test_a2gcr_round_trip() {
    init();

    // Apple II DOS 3.3: 16 x 256-byte GCR sectors, volume byte 0xFE.
    let mut disk = DecodedDisk {
        track_count: 2,
        primary_sector_size: 256,
        primary_sectors_per_track: 16,
        ..DecodedDisk::default()
    };

    for track in 0..2u8 {
        let phys_track = track * disk.track_step;
        let dst = disk.track_mut(0, phys_track);
        for i in 0..16u8 {
            let mut sec = make_sector(i, 256, false, i as f32 / 16.0, 0x37);
            sec.address_mark = 0xFE; // volume byte
            sec.recorded_crc = 0;
            sec.computed_crc = 0;
            dst.sectors.push(sec);
        }
    }

    let opts = CoreOptions {
        encodings: EncodingSelect::A2_GCR,
        ..CoreOptions::default()
    };

    round_trip(&mut disk, &opts, true, 2, 16);
}

#[test]
fn test_encoder_determinism() {
    init();

    let mut disk = DecodedDisk {
        track_count: 1,
        ..DecodedDisk::default()
    };
    fill_track(&mut disk, 0, 0, 18, 128, false, 1);

    let opts = CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    };

    let first = encode_disk(&mut disk, &opts, false);
    let second = encode_disk(&mut disk, &opts, false);

    assert_eq!(first.track(0, 0).transitions, second.track(0, 0).transitions);
    assert_eq!(first.track(0, 0).index_times, second.track(0, 0).index_times);
    assert_eq!(first.track(0, 0).splice, second.track(0, 0).splice);
}

#[test]
fn test_encoded_track_shape() {
    init();

    let mut disk = DecodedDisk {
        track_count: 1,
        ..DecodedDisk::default()
    };
    fill_track(&mut disk, 0, 0, 18, 128, false, 1);

    let opts = CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    };
    let raw_disk = encode_disk(&mut disk, &opts, false);
    let track = raw_disk.track(0, 0);

    // six synthetic index marks at equal spacing (up to integer rounding)
    assert_eq!(track.index_times.len(), 6);
    for pair in track.index_times.windows(2) {
        assert!((pair[1] - pair[0]) as i64 - 33_333_333 <= 1);
        assert!((pair[1] - pair[0]) as i64 - 33_333_333 >= 0);
    }

    // transitions are time ordered
    for pair in track.transitions.windows(2) {
        assert!(pair[0] <= pair[1]);
    }

    // the splice window spans exactly the second revolution's length
    let (splice_start, splice_end) = track.splice.expect("splice points");
    assert_eq!(splice_end - splice_start, track.index_times[2] - track.index_times[1]);

    assert!(raw_disk.synthesized);
}

#[test]
fn test_mfm_precompensation_beyond_track_40() {
    init();

    let cell = 320u32;

    let mut inner = DecodedTrack::default();
    inner.sectors.push(make_sector(1, 256, true, 0.0, 0x5A));
    let mut outer = inner.clone();

    let mut low_track = RawTrack {
        phys_track: 10,
        ..RawTrack::default()
    };
    let mut high_track = RawTrack {
        phys_track: 50,
        ..RawTrack::default()
    };

    encode_track(&mut low_track, &mut outer, 10, 0, 1.0, false, false, false);
    encode_track(&mut high_track, &mut inner, 50, 0, 1.0, false, false, false);

    // without pre-comp every transition sits on a cell boundary
    assert!(low_track.transitions.iter().all(|t| t % cell == 0));

    // with pre-comp, crowded transitions shift by a sixteenth or an eighth
    // of a cell
    let mut residues: Vec<u32> = high_track.transitions.iter().map(|t| t % cell).collect();
    residues.sort_unstable();
    residues.dedup();

    assert!(residues.iter().all(|r| [0, cell / 16, cell / 8].contains(r)));
    assert!(residues.contains(&(cell / 16)));
    assert!(residues.contains(&(cell / 8)));
}

#[test]
fn test_fm_weak_sector_prefix_survives() {
    init();

    let mut disk = DecodedDisk {
        track_count: 1,
        ..DecodedDisk::default()
    };
    fill_track(&mut disk, 0, 0, 18, 128, false, 1);

    // mark sector 5 weak from byte 32 on
    let dst = disk.track_mut(0, 0);
    let weak_idx = dst.sectors.iter().position(|s| s.index == 5).unwrap();
    dst.sectors[weak_idx].weak_offset = Some(32);
    let weak_payload = dst.sectors[weak_idx].data.clone();

    let opts = CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    };

    let raw_disk = encode_disk(&mut disk, &opts, false);
    let mut redecoded = decode_disk(&raw_disk, &opts);

    let sectors = sifted_by_index(&mut redecoded, 0, 0);
    let sec = sectors.iter().find(|s| s.index == 5).expect("weak sector decoded");

    // the stable prefix reads back; the weak region garbles the CRC
    assert_eq!(&sec.data[..32], &weak_payload[..32]);
    assert_ne!(sec.recorded_crc, sec.computed_crc);

    // the other sectors are untouched
    assert_eq!(sectors.len(), 18);
    assert!(sectors.iter().filter(|s| s.index != 5).all(|s| s.is_good()));
}

#[test]
fn test_convert_wrappers() {
    init();

    let mut disk = DecodedDisk {
        track_count: 1,
        ..DecodedDisk::default()
    };
    fill_track(&mut disk, 0, 0, 18, 128, false, 1);

    let opts = CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    };

    let mut raw_disk = fluxconv::convert_decoded(&mut disk, &opts, false).unwrap();
    let redecoded = fluxconv::convert_raw(&mut raw_disk, &opts).unwrap();

    assert!(redecoded
        .track(0, 0)
        .sectors
        .iter()
        .any(|sec| sec.index == 1 && sec.is_good()));

    // invalid options are rejected up front
    let bad = CoreOptions {
        clock_period_adjust: 3.0,
        ..CoreOptions::default()
    };
    assert!(fluxconv::convert_decoded(&mut disk, &bad, false).is_err());
}

#[test]
fn test_splice_finder_annotates_raw_track() {
    init();

    let mut disk = DecodedDisk {
        track_count: 1,
        ..DecodedDisk::default()
    };
    fill_track(&mut disk, 0, 0, 18, 128, false, 1);

    let opts = CoreOptions {
        encodings: EncodingSelect::FM,
        ..CoreOptions::default()
    };

    let raw_disk = encode_disk(&mut disk, &opts, false);
    let decoded = decode_disk(&raw_disk, &opts);

    let mut annotated = raw_disk.clone();
    annotated.track_mut(0, 0).splice = None;
    find_splice_points(&mut annotated, &decoded);

    let (splice_start, splice_end) = annotated.track(0, 0).splice.expect("splice window");
    assert!(splice_end > splice_start);
    // the window spans close to one measured revolution
    let rev = annotated.track(0, 0).index_times[1] - annotated.track(0, 0).index_times[0];
    assert!(((splice_end - splice_start) as i64 - rev as i64).abs() <= 1);
}
