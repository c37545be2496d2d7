// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cross-joins a track's `stts`/`ctts`/`stsz`/`stsc`/`stco`/`edts` tables into a per-sample packet
//! list: decode time, presentation time, size, and file offset.

use crate::error::{self, Result};
use crate::model::{Packet, Track, TrackFragment, TrexEntry};

/// Builds the full packet list for `track`. `movie_time_scale` is `MovieInfo.time_scale`, needed
/// to rescale an edit list's leading empty-edit duration into the track's own time base.
pub fn build_packet_list(track: &Track, movie_time_scale: u32) -> Result<Vec<Packet>> {
    let stbl = &track.sample_table;
    let sample_count = stbl.stts.total_samples() as usize;

    let time_offset = edit_list_time_offset(track, movie_time_scale);
    let dts = decode_times(stbl.stts.sample_count.iter().copied().zip(stbl.stts.sample_delta.iter().copied()));

    let composition_offsets = stbl.ctts.as_ref().map(|ctts| {
        expand_runs(ctts.sample_count.iter().copied().zip(ctts.sample_offset.iter().copied()))
    });

    let mut packets = Vec::with_capacity(sample_count);
    for i in 0..sample_count {
        let pts = match &composition_offsets {
            Some(offsets) => dts[i] as i64 + offsets.get(i).copied().unwrap_or(0) + time_offset,
            None => dts[i] as i64,
        };
        packets.push(Packet { dts: dts[i], pts, size: 0, file_offset: 0, sample_description_index: 0 });
    }

    assign_sizes(&mut packets, track)?;
    assign_file_offsets(&mut packets, track)?;

    Ok(packets)
}

/// §4.9 step 1: entry 0 with `media_time == -1` is a leading empty edit whose duration (in movie
/// time units) must be rescaled into the track's time base before it offsets presentation time.
fn edit_list_time_offset(track: &Track, movie_time_scale: u32) -> i64 {
    let edts = match &track.edts {
        Some(e) => e,
        None => return 0,
    };

    let mut empty_duration = 0u64;
    let mut start_idx = 0;
    if let Some(first) = edts.entries.first() {
        if first.media_time == -1 {
            empty_duration = first.segment_duration;
            start_idx = 1;
        }
    }
    let start_time = edts.entries.get(start_idx).map(|e| e.media_time).unwrap_or(0);

    if movie_time_scale == 0 || (empty_duration == 0 && start_time == 0) {
        return 0;
    }

    let scaled_empty =
        (u128::from(empty_duration) * u128::from(track.time_scale) / u128::from(movie_time_scale)) as i64;
    start_time - scaled_empty
}

/// Expands `(sample_count, sample_delta)` run pairs into a running-sum DTS per sample; DTS[0] = 0.
fn decode_times(runs: impl Iterator<Item = (u32, u32)>) -> Vec<u64> {
    let mut dts = Vec::new();
    let mut running = 0u64;
    for (count, delta) in runs {
        for _ in 0..count {
            dts.push(running);
            running += u64::from(delta);
        }
    }
    dts
}

/// Expands `(sample_count, value)` run pairs into one value per sample (used for `ctts`).
fn expand_runs(runs: impl Iterator<Item = (u32, i64)>) -> Vec<i64> {
    let mut out = Vec::new();
    for (count, value) in runs {
        for _ in 0..count {
            out.push(value);
        }
    }
    out
}

fn assign_sizes(packets: &mut [Packet], track: &Track) -> Result<()> {
    for (i, packet) in packets.iter_mut().enumerate() {
        packet.size = track.sample_table.stsz.size_of(i).ok_or(error::Mp4Error::OutOfRange)?;
    }
    Ok(())
}

/// §4.9 step 5: walks `stsc` runs, assigning successive samples to successive chunks starting at
/// `stco.chunk_offset[chunk]` and incrementing by each sample's size as it's consumed.
fn assign_file_offsets(packets: &mut [Packet], track: &Track) -> Result<()> {
    let stbl = &track.sample_table;
    let entries = &stbl.stsc.entries;
    if entries.is_empty() {
        return if packets.is_empty() { Ok(()) } else { error::out_of_range() };
    }

    let chunk_count = stbl.stco.len() as u32;
    let mut sample_idx = 0usize;

    for (run_idx, entry) in entries.iter().enumerate() {
        let next_first_chunk = entries.get(run_idx + 1).map(|e| e.first_chunk).unwrap_or(chunk_count + 1);

        for chunk in entry.first_chunk..next_first_chunk {
            let mut offset = stbl.stco.get((chunk - 1) as usize).ok_or(error::Mp4Error::OutOfRange)?;

            for _ in 0..entry.samples_per_chunk {
                if sample_idx >= packets.len() {
                    return Ok(());
                }
                let packet = &mut packets[sample_idx];
                packet.file_offset = offset;
                packet.sample_description_index = entry.sample_description_index;
                offset += u64::from(packet.size);
                sample_idx += 1;
            }
        }
    }

    Ok(())
}

/// Builds the per-sample packet list for one track fragment, resolving each sample's
/// duration/size/flags by priority: the `trun` sample field, then the enclosing `tfhd`'s default,
/// then the `trex` entry for this track (§4.7's default-resolution order). `moof_offset` is the
/// absolute file position of the enclosing `moof` atom's first byte, used to resolve
/// `base_data_offset` when `tfhd` doesn't carry one explicitly.
pub fn build_fragment_packet_list(
    fragment: &TrackFragment,
    moof_offset: u64,
    trex: Option<&TrexEntry>,
) -> Result<Vec<Packet>> {
    let tfhd = &fragment.tfhd;
    let base_offset = tfhd.base_data_offset.unwrap_or(moof_offset);
    let mut dts = fragment.base_media_decode_time.unwrap_or(0);
    let mut running_offset = base_offset;
    let mut packets = Vec::new();

    for trun in &fragment.truns {
        if let Some(data_offset) = trun.data_offset {
            running_offset = (base_offset as i64 + i64::from(data_offset)) as u64;
        }

        for (idx, sample) in trun.samples.iter().enumerate() {
            let duration = resolve_default(
                sample.duration,
                tfhd.default_sample_duration,
                trex.map(|t| t.default_sample_duration),
                "sample duration",
            )?;
            let size = resolve_default(
                sample.size,
                tfhd.default_sample_size,
                trex.map(|t| t.default_sample_size),
                "sample size",
            )?;
            let _flags = resolve_sample_flags(
                sample.flags,
                idx,
                trun.first_sample_flags,
                tfhd.default_sample_flags,
                trex.map(|t| t.default_sample_flags),
            )?;

            let pts = match sample.composition_time_offset {
                Some(offset) => dts as i64 + offset,
                None => dts as i64,
            };

            packets.push(Packet {
                dts,
                pts,
                size,
                file_offset: running_offset,
                sample_description_index: tfhd.sample_description_index.unwrap_or(0),
            });

            running_offset += u64::from(size);
            dts += u64::from(duration);
        }
    }

    Ok(packets)
}

fn resolve_default(
    sample: Option<u32>,
    tfhd_default: Option<u32>,
    trex_default: Option<u32>,
    what: &'static str,
) -> Result<u32> {
    sample.or(tfhd_default).or(trex_default).ok_or(error::Mp4Error::AtomNotFound(what))
}

fn resolve_sample_flags(
    sample_flags: Option<u32>,
    idx: usize,
    first_sample_flags: Option<u32>,
    tfhd_default: Option<u32>,
    trex_default: Option<u32>,
) -> Result<u32> {
    if let Some(flags) = sample_flags {
        return Ok(flags);
    }
    if idx == 0 {
        if let Some(flags) = first_sample_flags {
            return Ok(flags);
        }
    }
    tfhd_default.or(trex_default).ok_or(error::Mp4Error::AtomNotFound("sample flags"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ChunkOffsetTable, SampleSizeTable, SampleTable, StscEntry, StscTable, SttsTable, Tfhd, TrunSample,
    };

    fn track_with_single_chunk(sizes: Vec<u32>) -> Track {
        let count = sizes.len() as u32;
        Track {
            time_scale: 1000,
            sample_table: SampleTable {
                stts: SttsTable { sample_count: vec![count], sample_delta: vec![1000] },
                stsz: SampleSizeTable::Variable(sizes),
                stsc: StscTable { entries: vec![StscEntry { first_chunk: 1, samples_per_chunk: count, sample_description_index: 1 }] },
                stco: ChunkOffsetTable::Stco(vec![100]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn dts_accumulates_stts_deltas() {
        let track = track_with_single_chunk(vec![10, 20, 30]);
        let packets = build_packet_list(&track, 1000).unwrap();
        assert_eq!(packets.iter().map(|p| p.dts).collect::<Vec<_>>(), vec![0, 1000, 2000]);
    }

    #[test]
    fn file_offsets_increment_by_size_within_a_chunk() {
        let track = track_with_single_chunk(vec![10, 20, 30]);
        let packets = build_packet_list(&track, 1000).unwrap();
        assert_eq!(packets[0].file_offset, 100);
        assert_eq!(packets[1].file_offset, 110);
        assert_eq!(packets[2].file_offset, 130);
    }

    #[test]
    fn without_ctts_pts_equals_dts() {
        let track = track_with_single_chunk(vec![10, 10]);
        let packets = build_packet_list(&track, 1000).unwrap();
        assert_eq!(packets[0].pts, packets[0].dts as i64);
        assert_eq!(packets[1].pts, packets[1].dts as i64);
    }

    #[test]
    fn fragment_sample_size_falls_back_to_tfhd_then_trex_default() {
        let fragment = TrackFragment {
            tfhd: Tfhd { track_id: 1, default_sample_size: Some(500), ..Default::default() },
            base_media_decode_time: Some(9216),
            truns: vec![Trun {
                data_offset: Some(136),
                samples: vec![
                    TrunSample { size: Some(500), ..Default::default() },
                    TrunSample { size: None, ..Default::default() },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let trex = TrexEntry { track_id: 1, default_sample_duration: 1024, ..Default::default() };

        let packets = build_fragment_packet_list(&fragment, 0, Some(&trex)).unwrap();
        assert_eq!(packets[0].size, 500);
        assert_eq!(packets[1].size, 500); // falls back to tfhd.default_sample_size
        assert_eq!(packets[0].dts, 9216);
        assert_eq!(packets[1].dts, 9216 + 1024); // duration resolved from trex
    }

    #[test]
    fn fragment_sample_with_no_duration_anywhere_errors() {
        let fragment = TrackFragment {
            tfhd: Tfhd { track_id: 1, ..Default::default() },
            truns: vec![Trun { samples: vec![TrunSample::default()], ..Default::default() }],
            ..Default::default()
        };
        assert!(build_fragment_packet_list(&fragment, 0, None).is_err());
    }
}
