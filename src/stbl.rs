// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample-table (`stbl`) children: `stts`, `ctts`, `cslg`, `stsc`, `stsz`/`stz2`, `stco`/`co64`,
//! `stss`, `stsh`, `sdtp`, `padb`, `stdp`, `subs`, `sbgp`, `sgpd`, `saio`, `saiz`, `senc`.

use log::debug;

use crate::atom::AtomReader;
use crate::cenc;
use crate::error::{self, Result};
use crate::fourcc;
use crate::model::*;

pub fn decode_stts(r: &mut AtomReader<'_>) -> Result<SttsTable> {
    let _ = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut sample_count = Vec::with_capacity(count as usize);
    let mut sample_delta = Vec::with_capacity(count as usize);
    for _ in 0..count {
        sample_count.push(r.read_be_u32()?);
        sample_delta.push(r.read_be_u32()?);
    }
    Ok(SttsTable { sample_count, sample_delta })
}

pub fn decode_ctts(r: &mut AtomReader<'_>) -> Result<CttsTable> {
    let (version, _flags) = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut sample_count = Vec::with_capacity(count as usize);
    let mut sample_offset = Vec::with_capacity(count as usize);
    for _ in 0..count {
        sample_count.push(r.read_be_u32()?);
        let offset = if version == 1 { i64::from(r.read_be_i32()?) } else { i64::from(r.read_be_u32()?) };
        sample_offset.push(offset);
    }
    Ok(CttsTable { sample_count, sample_offset })
}

pub fn decode_cslg(r: &mut AtomReader<'_>) -> Result<Cslg> {
    let (version, _flags) = r.read_version_flags()?;
    if version == 1 {
        Ok(Cslg {
            composition_to_dts_shift: r.read_be_i64()?,
            least_decode_to_display_delta: r.read_be_i64()?,
            greatest_decode_to_display_delta: r.read_be_i64()?,
            composition_start_time: r.read_be_i64()?,
            composition_end_time: r.read_be_i64()?,
        })
    } else {
        Ok(Cslg {
            composition_to_dts_shift: i64::from(r.read_be_i32()?),
            least_decode_to_display_delta: i64::from(r.read_be_i32()?),
            greatest_decode_to_display_delta: i64::from(r.read_be_i32()?),
            composition_start_time: i64::from(r.read_be_i32()?),
            composition_end_time: i64::from(r.read_be_i32()?),
        })
    }
}

pub fn decode_stsc(r: &mut AtomReader<'_>) -> Result<StscTable> {
    let _ = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    let mut last_first_chunk = 0u32;
    for i in 0..count {
        let entry = StscEntry {
            first_chunk: r.read_be_u32()?,
            samples_per_chunk: r.read_be_u32()?,
            sample_description_index: r.read_be_u32()?,
        };
        if i > 0 && entry.first_chunk <= last_first_chunk {
            return error::bad_atom("stsc.first_chunk must be strictly increasing");
        }
        last_first_chunk = entry.first_chunk;
        entries.push(entry);
    }
    Ok(StscTable { entries })
}

pub fn decode_stsz(r: &mut AtomReader<'_>) -> Result<SampleSizeTable> {
    let _ = r.read_version_flags()?;
    let sample_size = r.read_be_u32()?;
    let sample_count = r.read_be_u32()?;
    if sample_size != 0 {
        return Ok(SampleSizeTable::Constant { size: sample_size, count: sample_count });
    }
    let mut sizes = Vec::with_capacity(sample_count as usize);
    for _ in 0..sample_count {
        sizes.push(r.read_be_u32()?);
    }
    Ok(SampleSizeTable::Variable(sizes))
}

pub fn decode_stz2(r: &mut AtomReader<'_>) -> Result<SampleSizeTable> {
    let _ = r.read_version_flags()?;
    r.ignore_bytes(3)?; // reserved
    let field_size = r.read_u8()?;
    let sample_count = r.read_be_u32()?;

    let mut sizes = Vec::with_capacity(sample_count as usize);
    match field_size {
        16 => {
            for _ in 0..sample_count {
                sizes.push(u32::from(r.read_be_u16()?));
            }
        }
        8 => {
            for _ in 0..sample_count {
                sizes.push(u32::from(r.read_u8()?));
            }
        }
        4 => {
            let mut i = 0;
            while i < sample_count {
                let byte = r.read_u8()?;
                sizes.push(u32::from(byte >> 4));
                i += 1;
                if i < sample_count {
                    sizes.push(u32::from(byte & 0x0f));
                    i += 1;
                }
            }
        }
        _ => return error::bad_atom("stz2 field_size must be 4, 8 or 16"),
    }
    Ok(SampleSizeTable::Variable(sizes))
}

pub fn decode_stco(r: &mut AtomReader<'_>) -> Result<ChunkOffsetTable> {
    let _ = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut offsets = Vec::with_capacity(count as usize);
    let mut last = None;
    for _ in 0..count {
        let off = r.read_be_u32()?;
        if let Some(prev) = last {
            if off <= prev {
                return error::bad_atom("stco chunk offsets must be strictly ascending");
            }
        }
        last = Some(off);
        offsets.push(off);
    }
    Ok(ChunkOffsetTable::Stco(offsets))
}

pub fn decode_co64(r: &mut AtomReader<'_>) -> Result<ChunkOffsetTable> {
    let _ = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut offsets = Vec::with_capacity(count as usize);
    let mut last = None;
    for _ in 0..count {
        let off = r.read_be_u64()?;
        if let Some(prev) = last {
            if off <= prev {
                return error::bad_atom("co64 chunk offsets must be strictly ascending");
            }
        }
        last = Some(off);
        offsets.push(off);
    }
    Ok(ChunkOffsetTable::Co64(offsets))
}

/// Allocates exactly `entry_count` entries (the teacher's source is known to double-append here
/// in one revision; this reimplementation allocates and fills exactly once).
pub fn decode_stss(r: &mut AtomReader<'_>) -> Result<Vec<u32>> {
    let _ = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(r.read_be_u32()?);
    }
    Ok(entries)
}

pub fn decode_stsh(r: &mut AtomReader<'_>) -> Result<Vec<(u32, u32)>> {
    let _ = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push((r.read_be_u32()?, r.read_be_u32()?));
    }
    Ok(entries)
}

pub fn decode_sdtp(r: &mut AtomReader<'_>, sample_count: u32) -> Result<Vec<SampleDependency>> {
    let _ = r.read_version_flags()?;
    let mut entries = Vec::with_capacity(sample_count as usize);
    for _ in 0..sample_count {
        let b = r.read_u8()?;
        entries.push(SampleDependency {
            is_leading: (b >> 6) & 0x3,
            depends_on: (b >> 4) & 0x3,
            is_depended_on: (b >> 2) & 0x3,
            has_redundancy: b & 0x3,
        });
    }
    Ok(entries)
}

pub fn decode_subs(r: &mut AtomReader<'_>) -> Result<Vec<SubsSampleEntry>> {
    let (version, _flags) = r.read_version_flags()?;
    let entry_count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let sample_delta = r.read_be_u32()?;
        let subsample_count = r.read_be_u16()?;
        let mut subsamples = Vec::with_capacity(subsample_count as usize);
        for _ in 0..subsample_count {
            let bytes_clear = if version == 1 { r.read_be_u32()? } else { u32::from(r.read_be_u16()?) };
            let bytes_encrypted = r.read_be_u32()?;
            r.ignore_bytes(1 + 1 + 4)?; // subsample_priority, discardable, codec_specific_parameters
            subsamples.push(SubsampleEntry { bytes_clear, bytes_encrypted });
        }
        entries.push(SubsSampleEntry { sample_delta, subsamples });
    }
    Ok(entries)
}

pub fn decode_sbgp(r: &mut AtomReader<'_>) -> Result<SampleToGroup> {
    let (version, _flags) = r.read_version_flags()?;
    let grouping_type = r.read_fourcc()?;
    if version == 1 {
        r.ignore_bytes(4)?; // grouping_type_parameter
    }
    let count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(SampleGroupEntry { sample_count: r.read_be_u32()?, group_description_index: r.read_be_u32()? });
    }
    Ok(SampleToGroup { grouping_type, entries })
}

pub fn decode_sgpd(r: &mut AtomReader<'_>) -> Result<SampleGroupDescription> {
    let (grouping_type, seig_entries) = cenc::decode_seig_sgpd(r)?;
    Ok(SampleGroupDescription { grouping_type, seig_entries })
}

pub fn decode_saio(r: &mut AtomReader<'_>) -> Result<Saio> {
    let (version, flags) = r.read_version_flags()?;
    if flags & 0x1 != 0 {
        r.ignore_bytes(8)?; // aux_info_type + aux_info_type_parameter
    }
    let count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = if version == 1 { r.read_be_u64()? } else { u64::from(r.read_be_u32()?) };
        entries.push(SaioEntry { offset });
    }
    Ok(Saio { entries })
}

pub fn decode_saiz(r: &mut AtomReader<'_>) -> Result<Saiz> {
    let (_version, flags) = r.read_version_flags()?;
    if flags & 0x1 != 0 {
        r.ignore_bytes(8)?;
    }
    let default_sample_info_size = r.read_u8()?;
    let sample_count = r.read_be_u32()?;
    let sample_info_sizes = if default_sample_info_size == 0 {
        let mut sizes = Vec::with_capacity(sample_count as usize);
        for _ in 0..sample_count {
            sizes.push(r.read_u8()?);
        }
        sizes
    } else {
        Vec::new()
    };
    Ok(Saiz { default_sample_info_size, sample_info_sizes })
}

/// Decodes `senc`, resolving each sample's IV size per §4.8's priority order: the matching `seig`
/// group description entry (from `sbgp`/`sgpd`), else `tenc`'s default, else inference from the
/// remaining byte budget.
pub fn decode_senc(
    r: &mut AtomReader<'_>,
    default_iv_size: Option<u8>,
    sbgp: &[SampleToGroup],
    sgpd: &[SampleGroupDescription],
) -> Result<Senc> {
    let (_version, flags) = r.read_version_flags()?;
    let has_subsamples = flags & 0x2 != 0;
    let sample_count = r.read_be_u32()?;

    let overrides = cenc::resolve_seig_overrides(sbgp, sgpd, sample_count);
    let needs_fallback = overrides
        .iter()
        .any(|o| !matches!(o, Some(entry) if entry.per_sample_iv_size > 0));

    let fallback_iv_size = if needs_fallback {
        match default_iv_size {
            Some(size) if size > 0 => size,
            _ => {
                debug!("senc has no tenc default iv size; inferring from byte budget");
                cenc::infer_iv_size(r.remaining() as u64, sample_count, has_subsamples)?
            }
        }
    } else {
        0
    };

    let mut samples = Vec::with_capacity(sample_count as usize);
    for i in 0..sample_count as usize {
        let iv_size = overrides
            .get(i)
            .copied()
            .flatten()
            .map(|entry| entry.per_sample_iv_size)
            .filter(|size| *size > 0)
            .unwrap_or(fallback_iv_size);
        let (iv, subsamples) = cenc::read_senc_sample(r, iv_size, has_subsamples)?;
        samples.push(SencSample { iv, subsamples });
    }
    Ok(Senc { samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_reader(bytes: &'static [u8]) -> AtomReader<'static> {
        AtomReader::new(bytes)
    }

    #[test]
    fn stts_sums_to_sample_count() {
        let mut buf = vec![0, 0, 0, 0]; // version/flags
        buf.extend_from_slice(&2u32.to_be_bytes()); // entry_count
        buf.extend_from_slice(&50u32.to_be_bytes());
        buf.extend_from_slice(&1000u32.to_be_bytes());
        buf.extend_from_slice(&50u32.to_be_bytes());
        buf.extend_from_slice(&2000u32.to_be_bytes());
        let leaked: &'static [u8] = Box::leak(buf.into_boxed_slice());
        let mut r = atom_reader(leaked);
        let table = decode_stts(&mut r).unwrap();
        assert_eq!(table.total_samples(), 100);
    }

    #[test]
    fn stsc_rejects_non_increasing_first_chunk() {
        let mut buf = vec![0, 0, 0, 0];
        buf.extend_from_slice(&2u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes()); // first_chunk repeats => invalid
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes());
        let leaked: &'static [u8] = Box::leak(buf.into_boxed_slice());
        let mut r = atom_reader(leaked);
        assert!(decode_stsc(&mut r).is_err());
    }
}
