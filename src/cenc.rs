// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common Encryption (ISO/IEC 23001-7): `sinf`/`frma`/`schm`/`schi`/`tenc`, `pssh`, and the `seig`
//! sample-group override / `senc` IV-size inference procedure.

use log::debug;

use crate::atom::AtomReader;
use crate::error::{self, Result};
use crate::fourcc::{self, FourCc};
use crate::model::{
    CencSeigEntry, Pssh, ProtectionInfo, SampleGroupDescription, SampleToGroup, SubsampleEntry,
};

const CENC_SCHEMES: [FourCc; 4] =
    [FourCc::new(*b"cenc"), FourCc::new(*b"cbc1"), FourCc::new(*b"cens"), FourCc::new(*b"cbcs")];

/// Decodes `sinf` (found inside an `enca`/`encv` sample entry): `frma` → original format,
/// `schm` → scheme type/version, `schi/tenc` → track encryption defaults.
pub fn decode_sinf(r: &mut AtomReader<'_>) -> Result<ProtectionInfo> {
    let mut info = ProtectionInfo::default();
    let mut saw_frma = false;
    let mut saw_tenc = false;

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::FRMA => {
                info.data_format = sub.read_fourcc()?;
                saw_frma = true;
            }
            fourcc::SCHM => {
                let (_version, flags) = sub.read_version_flags()?;
                info.scheme_type = sub.read_fourcc()?;
                info.scheme_version = sub.read_be_u32()?;
                if flags & 0x1 != 0 {
                    debug!("sinf.schm carries a scheme_uri; dropping (not retained)");
                }
                if !CENC_SCHEMES.contains(&info.scheme_type) {
                    return error::unsupported_encryption_scheme();
                }
            }
            fourcc::SCHI => {
                if let Some(mut tenc) = sub.find_sub_atom(fourcc::TENC)? {
                    decode_tenc(&mut tenc, &mut info)?;
                    saw_tenc = true;
                }
            }
            _ => debug!("skipping unrecognized sinf child {:?}", header.kind),
        }
    }

    if !saw_frma {
        return error::atom_not_found("frma");
    }
    if !saw_tenc {
        return error::atom_not_found("tenc");
    }

    Ok(info)
}

fn decode_tenc(r: &mut AtomReader<'_>, info: &mut ProtectionInfo) -> Result<()> {
    let (version, _flags) = r.read_version_flags()?;
    info.tenc_version = version;

    r.ignore_bytes(1)?; // reserved

    if version == 0 {
        r.ignore_bytes(1)?; // reserved
    } else {
        let nibbles = r.read_u8()?;
        info.default_crypt_byte_block = nibbles >> 4;
        info.default_skip_byte_block = nibbles & 0x0f;
    }

    info.default_is_protected = r.read_u8()?;
    info.default_per_sample_iv_size = r.read_u8()?;
    let mut kid = [0u8; 16];
    kid.copy_from_slice(&r.read_boxed_slice(16)?);
    info.default_kid = kid;

    if info.default_is_protected == 1 && info.default_per_sample_iv_size == 0 {
        let iv_size = r.read_u8()? as usize;
        info.default_constant_iv = Some(r.read_boxed_slice(iv_size)?.into_vec());
    }

    Ok(())
}

/// Decodes `pssh`: version (from flags), system_id, optional key ids (version > 0), then data.
pub fn decode_pssh(r: &mut AtomReader<'_>) -> Result<Pssh> {
    let (version, _flags) = r.read_version_flags()?;
    let mut system_id = [0u8; 16];
    system_id.copy_from_slice(&r.read_boxed_slice(16)?);

    let mut key_ids = Vec::new();
    if version > 0 {
        let count = r.read_be_u32()?;
        for _ in 0..count {
            let mut kid = [0u8; 16];
            kid.copy_from_slice(&r.read_boxed_slice(16)?);
            key_ids.push(kid);
        }
    }

    let data_size = r.read_be_u32()? as usize;
    let data = r.read_boxed_slice(data_size)?.into_vec();

    Ok(Pssh { system_id, key_ids, data })
}

/// Decodes `sgpd` for grouping type `"seig"`; other grouping types are tolerated but not decoded
/// (per §4.5, `UnsupportedSampleGroupType` degrades to "dropped", not fatal at this level).
pub fn decode_seig_sgpd(r: &mut AtomReader<'_>) -> Result<(FourCc, Vec<CencSeigEntry>)> {
    let (version, _flags) = r.read_version_flags()?;
    let grouping_type = r.read_fourcc()?;

    let default_length = if version == 1 { r.read_be_u32()? } else { 0 };
    let entry_count = r.read_be_u32()?;

    if grouping_type != FourCc::from_str("seig") {
        debug!("sgpd grouping type {grouping_type:?} is not seig; leaving entries undecoded");
        return Ok((grouping_type, Vec::new()));
    }

    let mut entries = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        if version == 1 && default_length == 0 {
            let len = r.read_be_u32()?;
            if len < 20 {
                return error::invalid_sample_group_length();
            }
        }
        entries.push(decode_seig_entry(r)?);
    }

    Ok((grouping_type, entries))
}

fn decode_seig_entry(r: &mut AtomReader<'_>) -> Result<CencSeigEntry> {
    r.ignore_bytes(1)?; // reserved
    let nibbles = r.read_u8()?;
    let crypt_byte_block = nibbles >> 4;
    let skip_byte_block = nibbles & 0x0f;
    let is_protected = r.read_u8()?;
    let per_sample_iv_size = r.read_u8()?;
    let mut kid = [0u8; 16];
    kid.copy_from_slice(&r.read_boxed_slice(16)?);

    let constant_iv = if is_protected == 1 && per_sample_iv_size == 0 {
        let iv_size = r.read_u8()? as usize;
        Some(r.read_boxed_slice(iv_size)?.into_vec())
    } else {
        None
    };

    Ok(CencSeigEntry { crypt_byte_block, skip_byte_block, is_protected, per_sample_iv_size, kid, constant_iv })
}

/// Expands `sbgp`'s run-length `(sample_count, group_description_index)` entries for grouping
/// type `"seig"` into one `CencSeigEntry` reference per sample, `None` where no run covers the
/// sample or it maps to group index 0 ("not a member of this group"; §4.5).
pub fn resolve_seig_overrides<'a>(
    sbgp: &[SampleToGroup],
    sgpd: &'a [SampleGroupDescription],
    sample_count: u32,
) -> Vec<Option<&'a CencSeigEntry>> {
    let seig = FourCc::from_str("seig");
    let mut overrides = vec![None; sample_count as usize];

    let Some(sgpd) = sgpd.iter().find(|g| g.grouping_type == seig) else { return overrides };
    let Some(sbgp) = sbgp.iter().find(|g| g.grouping_type == seig) else { return overrides };

    let mut sample = 0usize;
    for run in &sbgp.entries {
        for _ in 0..run.sample_count {
            if sample >= overrides.len() {
                return overrides;
            }
            if run.group_description_index != 0 {
                let index = run.group_description_index as usize;
                overrides[sample] = sgpd.seig_entries.get(index - 1);
            }
            sample += 1;
        }
    }
    overrides
}

/// Infers the per-sample IV size for a `senc` body when neither a `seig` group description nor
/// `tenc.default_per_sample_iv_size` resolves it (§4.8).
///
/// `body_remaining` is the number of bytes left in the `senc` atom after its 8-byte
/// version/flags + sample_count header. `has_subsamples` reflects bit `0x000002` of `senc.flags`.
pub fn infer_iv_size(body_remaining: u64, sample_count: u32, has_subsamples: bool) -> Result<u8> {
    if sample_count == 0 {
        return error::invalid_iv_size();
    }

    if !has_subsamples {
        if body_remaining % u64::from(sample_count) != 0 {
            return error::invalid_iv_size();
        }
        let candidate = body_remaining / u64::from(sample_count);
        if candidate == 8 || candidate == 16 {
            return Ok(candidate as u8);
        }
        return error::invalid_iv_size();
    }

    for candidate in [8u64, 16u64] {
        let ivs_total = candidate * u64::from(sample_count);
        if body_remaining < ivs_total {
            continue;
        }
        let residual = body_remaining - ivs_total;
        // Per sample: 2-byte subsample_count + N * (2-byte clear + 4-byte encrypted) = N*6 + 2.
        // The subsample-count field itself is read once per sample, so the residual equation
        // is evaluated against the total subsample-count entries across all samples.
        if residual >= u64::from(sample_count) * 2 {
            let remaining_after_counts = residual - u64::from(sample_count) * 2;
            if remaining_after_counts % 6 == 0 {
                return Ok(candidate as u8);
            }
        }
    }

    error::invalid_iv_size()
}

/// Reads one `senc` sample's `{IV, optional subsample list}` given a resolved IV size.
pub fn read_senc_sample(r: &mut AtomReader<'_>, iv_size: u8, has_subsamples: bool) -> Result<(Vec<u8>, Vec<SubsampleEntry>)> {
    let iv = r.read_boxed_slice(iv_size as usize)?.into_vec();
    let mut subsamples = Vec::new();
    if has_subsamples {
        let count = r.read_be_u16()?;
        for _ in 0..count {
            let bytes_clear = u32::from(r.read_be_u16()?);
            let bytes_encrypted = r.read_be_u32()?;
            subsamples.push(SubsampleEntry { bytes_clear, bytes_encrypted });
        }
    }
    Ok((iv, subsamples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_iv_size_without_subsamples() {
        // 4 samples, 32 bytes remaining => 8-byte IVs.
        assert_eq!(infer_iv_size(32, 4, false).unwrap(), 8);
    }

    #[test]
    fn resolve_seig_overrides_follows_sbgp_run_into_sgpd_entries() {
        let sbgp = vec![SampleToGroup {
            grouping_type: FourCc::from_str("seig"),
            entries: vec![
                crate::model::SampleGroupEntry { sample_count: 2, group_description_index: 0 },
                crate::model::SampleGroupEntry { sample_count: 2, group_description_index: 1 },
            ],
        }];
        let sgpd = vec![SampleGroupDescription {
            grouping_type: FourCc::from_str("seig"),
            seig_entries: vec![CencSeigEntry {
                crypt_byte_block: 0,
                skip_byte_block: 0,
                is_protected: 1,
                per_sample_iv_size: 16,
                kid: [0xAA; 16],
                constant_iv: None,
            }],
        }];

        let overrides = resolve_seig_overrides(&sbgp, &sgpd, 4);
        assert!(overrides[0].is_none());
        assert!(overrides[1].is_none());
        assert_eq!(overrides[2].unwrap().per_sample_iv_size, 16);
        assert_eq!(overrides[3].unwrap().per_sample_iv_size, 16);
    }

    #[test]
    fn rejects_iv_size_that_matches_neither_8_nor_16() {
        assert!(infer_iv_size(40, 4, false).is_err());
    }
}
