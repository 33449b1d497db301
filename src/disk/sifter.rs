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

//! The sector sifter: consolidate multiple revolutions of possibly corrupted
//! reads into the best single representation of each physical sector.
//!
//! Sectors are grouped by index, then split into position subgroups (copies
//! within 3% of a rotation are reads of the same physical sector; anything
//! further apart is a distinct *phantom* sector). Within a subgroup, reads
//! with matching CRCs displace those without; content disagreements among the
//! survivors resolve by majority vote, recording a weak-bit offset when the
//! disagreeing copies were all bad.

use crate::disk::DecodedTrack;

/// Position tolerance for two reads to count as the same physical sector.
const POSITION_TOLERANCE: f32 = 0.03;

/// Sift a track's sector multiset down to one entry per physical sector.
///
/// Returns indices into `track.sectors`, ordered by angular position. The
/// chosen sectors are updated in place: positions are averaged over their
/// subgroup and weak-bit offsets are recorded where detected.
pub fn sift_sectors(track: &mut DecodedTrack, track_num: u32) -> Vec<usize> {
    let mut result: Vec<usize> = Vec::new();
    let secs = &mut track.sectors;

    // group by sector index
    let mut by_index: Vec<usize> = (0..secs.len()).collect();
    by_index.sort_by_key(|&i| secs[i].index);

    let mut i = 0;
    while i < by_index.len() {
        let sector_num = secs[by_index[i]].index;

        let mut group: Vec<usize> = Vec::new();
        while i < by_index.len() && secs[by_index[i]].index == sector_num {
            group.push(by_index[i]);
            i += 1;
        }

        // sort the group by angular position
        group.sort_by(|&a, &b| secs[a].position.total_cmp(&secs[b].position));

        // walk off position subgroups
        let mut g = 0;
        let mut instance_count = 0u32;

        while g < group.len() {
            let first = group[g];
            let position0 = secs[first].position;
            let posend0 = secs[first].ending_position;

            let mut poserr_sum = 0.0f32;
            let mut posenderr_sum = 0.0f32;
            let mut mismatch = false;
            let mut subgroup: Vec<usize> = vec![first];

            let mut h = g + 1;
            while h < group.len() {
                // stop when the sector angle drifts past tolerance
                let mut poserr = secs[group[h]].position - position0;
                if poserr > 0.5 {
                    poserr -= 1.0;
                }
                if poserr.abs() > POSITION_TOLERANCE {
                    break;
                }
                poserr_sum += poserr;

                let mut posenderr = secs[group[h]].ending_position - posend0;
                if posenderr > 0.5 {
                    posenderr -= 1.0;
                }
                posenderr_sum += posenderr;

                subgroup.push(group[h]);

                if !secs[first].has_same_contents(&secs[group[h]]) {
                    mismatch = true;
                }
                h += 1;
            }

            // the full subgroup, before CRC filtering, feeds the weak scan
            let subgroup_all = subgroup.clone();

            // average angular position over the subgroup, wrap-aware
            let mut position0 = position0 + poserr_sum / subgroup.len() as f32;
            position0 -= position0.floor();

            let mut posend0 = posend0 + posenderr_sum / subgroup.len() as f32;
            posend0 -= posend0.floor();

            // if any member passed a CRC check, drop all members that didn't
            let mut crc_ok = true;
            let n1 = subgroup.len();

            if subgroup
                .iter()
                .any(|&s| secs[s].recorded_address_crc == secs[s].computed_address_crc)
            {
                subgroup.retain(|&s| secs[s].recorded_address_crc == secs[s].computed_address_crc);
            }
            else {
                crc_ok = false;
            }

            if subgroup.iter().any(|&s| secs[s].recorded_crc == secs[s].computed_crc) {
                subgroup.retain(|&s| secs[s].recorded_crc == secs[s].computed_crc);
            }
            else {
                crc_ok = false;
            }

            let n2 = subgroup.len();
            if n1 != n2 {
                log::warn!(
                    "Track {:2}, sector {:2}: {}/{} bad sector reads discarded at position {:.2}.",
                    track_num,
                    sector_num,
                    n1 - n2,
                    n1,
                    position0
                );
            }

            let mut best = subgroup[0];
            let mut clean_sift = true;

            if subgroup.len() > 1 && mismatch {
                // Multiple surviving reads disagree. Hash and count them,
                // then keep the most popular copy; ties go to the first seen,
                // which keeps results stable across identical captures.
                clean_sift = false;

                let mut buckets: Vec<(u32, usize, u32)> = Vec::new();
                for &s in &subgroup {
                    let hash = secs[s].content_hash();
                    match buckets
                        .iter_mut()
                        .find(|bucket| bucket.0 == hash && secs[bucket.1].has_same_contents(&secs[s]))
                    {
                        Some(bucket) => bucket.2 += 1,
                        None => buckets.push((hash, s, 1)),
                    }
                }

                if buckets.len() == 1 {
                    // the first read differed but the rest agree with it
                    clean_sift = true;
                }
                else {
                    let mut best_bucket = 0;
                    for (b, bucket) in buckets.iter().enumerate() {
                        if bucket.2 > buckets[best_bucket].2 {
                            best_bucket = b;
                        }
                    }
                    best = buckets[best_bucket].1;

                    if buckets[best_bucket].2 > 1 {
                        log::warn!(
                            "Track {:2}, sector {:2}: {} different sectors found at the same position {:.2} \
                             but different {} data. Keeping the most popular one.",
                            track_num,
                            sector_num,
                            n2,
                            position0,
                            if crc_ok { "good" } else { "bad" }
                        );
                    }
                    else if crc_ok {
                        log::warn!(
                            "Track {:2}, sector {:2}: {} different sectors found at the same position {:.2} \
                             but different good data. Keeping one of them.",
                            track_num,
                            sector_num,
                            n2,
                            position0
                        );
                    }
                    else {
                        // All copies are bad and none repeats: record how much
                        // of the payload agrees and mark the rest weak.
                        let mut max_match = secs[best].sector_size;

                        for &s in &subgroup_all {
                            if s == best {
                                continue;
                            }

                            let limit = max_match.min(secs[s].data.len());
                            let mut diff_at = limit;
                            for k in 0..limit {
                                if secs[s].data[k] != secs[best].data[k] {
                                    diff_at = k;
                                    break;
                                }
                            }
                            max_match = diff_at;
                        }

                        secs[best].weak_offset = Some(max_match);

                        log::warn!(
                            "Track {:2}, sector {:2}: Multiple sectors found at the same position {:.2} \
                             but different bad data. Encoding weak sector at offset {}.",
                            track_num,
                            sector_num,
                            position0,
                            max_match
                        );
                    }
                }
            }

            if clean_sift && !crc_ok {
                // A weak sector with stable data is unlikely from flux, but
                // decoded ingress (e.g. ATX) can carry one in.
                if let Some(offset) = secs[best].weak_offset {
                    log::warn!(
                        "Track {:2}, sector {:2}: Weak sector detected at position {:.2}, offset {}.",
                        track_num,
                        sector_num,
                        position0,
                        offset
                    );
                }
                else {
                    log::warn!(
                        "Track {:2}, sector {:2}: Stable CRC error detected at position {:.2}.",
                        track_num,
                        sector_num,
                        position0
                    );
                }
            }

            // snap the winner to the subgroup's mean position
            secs[best].position = position0;
            secs[best].ending_position = posend0;

            result.push(best);
            instance_count += 1;

            g = h;
        }

        if instance_count > 1 {
            log::warn!(
                "Track {:2}, sector {:2}: {} phantom sector{} found.",
                track_num,
                sector_num,
                instance_count - 1,
                if instance_count > 2 { "s" } else { "" }
            );
        }
    }

    // final ordering is by angular position
    result.sort_by(|&a, &b| secs[a].position.total_cmp(&secs[b].position));

    result
}
