// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `moof` and its descendants: `mfhd`, `traf`/`tfhd`/`tfdt`/`trun`, plus fragment-scoped
//! `saio`/`saiz`/`sbgp`/`sgpd`/`senc`.

use log::{debug, warn};

use crate::atom::AtomReader;
use crate::error::{self, Result};
use crate::fourcc;
use crate::model::{MovieFragment, Tfhd, TrackFragment, Trun, TrunSample};
use crate::stbl;

const TFHD_BASE_DATA_OFFSET_PRESENT: u32 = 0x000001;
const TFHD_SAMPLE_DESCRIPTION_INDEX_PRESENT: u32 = 0x000002;
const TFHD_DEFAULT_SAMPLE_DURATION_PRESENT: u32 = 0x000008;
const TFHD_DEFAULT_SAMPLE_SIZE_PRESENT: u32 = 0x000010;
const TFHD_DEFAULT_SAMPLE_FLAGS_PRESENT: u32 = 0x000020;
const TFHD_DURATION_IS_EMPTY: u32 = 0x010000;
const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x020000;

const TRUN_DATA_OFFSET_PRESENT: u32 = 0x000001;
const TRUN_FIRST_SAMPLE_FLAGS_PRESENT: u32 = 0x000004;
const TRUN_SAMPLE_DURATION_PRESENT: u32 = 0x000100;
const TRUN_SAMPLE_SIZE_PRESENT: u32 = 0x000200;
const TRUN_SAMPLE_FLAGS_PRESENT: u32 = 0x000400;
const TRUN_SAMPLE_COMPOSITION_TIME_OFFSETS_PRESENT: u32 = 0x000800;

/// `default_iv_size_for` resolves a track's `tenc.default_per_sample_iv_size` by `track_id`, so a
/// fragment-scoped `senc` need not fall back to byte-budget inference whenever the owning track's
/// encryption defaults are already known. A matching `seig` group override takes priority over
/// that default; it's resolved separately, per §4.8, from this `traf`'s own `sbgp`/`sgpd` (see
/// `decode_traf`). When `permissive` is set, a `BadAtom` while decoding one `traf` degrades to
/// dropping that track fragment (logged at `warn`) instead of failing the whole `moof`.
pub fn decode_moof(
    r: &mut AtomReader<'_>,
    default_iv_size_for: &dyn Fn(u32) -> Option<u8>,
    permissive: bool,
) -> Result<MovieFragment> {
    let mut movie_fragment = MovieFragment::default();

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::MFHD => {
                let _ = sub.read_version_flags()?;
                movie_fragment.sequence_number = sub.read_be_u32()?;
            }
            fourcc::TRAF => match decode_traf(&mut sub, default_iv_size_for, permissive) {
                Ok(traf) => movie_fragment.fragments.push(traf),
                Err(error::Mp4Error::BadAtom(msg)) if permissive => {
                    warn!("dropping malformed traf: {msg}");
                }
                Err(e) => return Err(e),
            },
            _ => debug!("skipping unrecognized moof child {:?}", header.kind),
        }
    }

    Ok(movie_fragment)
}

fn decode_traf(
    r: &mut AtomReader<'_>,
    default_iv_size_for: &dyn Fn(u32) -> Option<u8>,
    permissive: bool,
) -> Result<TrackFragment> {
    let mut fragment = TrackFragment::default();
    let mut saw_tfhd = false;

    // tfhd carries the track_id senc's IV-size resolution needs; a forward scan finds it
    // regardless of where it falls among traf's children (mirrors stbl's stsd pre-scan).
    let default_iv_size = match r.find_sub_atom(fourcc::TFHD)? {
        Some(mut tfhd) => default_iv_size_for(decode_tfhd(&mut tfhd)?.track_id),
        None => None,
    };

    // senc's IV-size resolution also wants this traf's own sbgp/sgpd (a fragment-scoped seig
    // override takes precedence over the track-level tenc default), which file order does not
    // guarantee precede senc; locate it now and decode it after the walk below.
    let senc_reader = r.find_sub_atom(fourcc::SENC)?;

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::TFHD => {
                fragment.tfhd = decode_tfhd(&mut sub)?;
                saw_tfhd = true;
            }
            fourcc::TFDT => {
                let (version, _flags) = sub.read_version_flags()?;
                fragment.base_media_decode_time =
                    Some(if version == 1 { sub.read_be_u64()? } else { u64::from(sub.read_be_u32()?) });
            }
            fourcc::TRUN => {
                if let Some(trun) = permissive_child(permissive, "trun", decode_trun(&mut sub))? {
                    fragment.truns.push(trun);
                }
            }
            fourcc::SBGP => {
                if let Some(sbgp) = permissive_child(permissive, "sbgp", stbl::decode_sbgp(&mut sub))? {
                    fragment.sbgp.push(sbgp);
                }
            }
            fourcc::SGPD => {
                if let Some(sgpd) = permissive_child(permissive, "sgpd", stbl::decode_sgpd(&mut sub))? {
                    fragment.sgpd.push(sgpd);
                }
            }
            fourcc::SAIO => {
                fragment.saio = permissive_child(permissive, "saio", stbl::decode_saio(&mut sub))?;
            }
            fourcc::SAIZ => {
                fragment.saiz = permissive_child(permissive, "saiz", stbl::decode_saiz(&mut sub))?;
            }
            fourcc::SENC => {} // handled after the loop, once sbgp/sgpd are known
            _ => {}
        }
    }

    if !saw_tfhd {
        return error::atom_not_found("tfhd");
    }

    if let Some(mut senc_sub) = senc_reader {
        fragment.senc = permissive_child(
            permissive,
            "senc",
            stbl::decode_senc(&mut senc_sub, default_iv_size, &fragment.sbgp, &fragment.sgpd),
        )?;
    }

    Ok(fragment)
}

/// Decodes a single `traf` child, degrading a `BadAtom` to "drop this child" (logged at `warn`)
/// instead of failing the whole `traf` when `permissive` is set.
fn permissive_child<T>(permissive: bool, what: &'static str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(error::Mp4Error::BadAtom(msg)) if permissive => {
            warn!("dropping malformed {what}: {msg}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Independent `if`s per present-flag bit, each contributing its field regardless of which other
/// bits are set — ISO/IEC 14496-12 §8.8.7 requires every present field to be read, not just the
/// first one a flag check happens to match.
fn decode_tfhd(r: &mut AtomReader<'_>) -> Result<Tfhd> {
    let (_version, flags) = r.read_version_flags()?;
    let track_id = r.read_be_u32()?;

    let mut tfhd = Tfhd {
        track_id,
        duration_is_empty: flags & TFHD_DURATION_IS_EMPTY != 0,
        default_base_is_moof: flags & TFHD_DEFAULT_BASE_IS_MOOF != 0,
        ..Default::default()
    };

    if flags & TFHD_BASE_DATA_OFFSET_PRESENT != 0 {
        tfhd.base_data_offset = Some(r.read_be_u64()?);
    }
    if flags & TFHD_SAMPLE_DESCRIPTION_INDEX_PRESENT != 0 {
        tfhd.sample_description_index = Some(r.read_be_u32()?);
    }
    if flags & TFHD_DEFAULT_SAMPLE_DURATION_PRESENT != 0 {
        tfhd.default_sample_duration = Some(r.read_be_u32()?);
    }
    if flags & TFHD_DEFAULT_SAMPLE_SIZE_PRESENT != 0 {
        tfhd.default_sample_size = Some(r.read_be_u32()?);
    }
    if flags & TFHD_DEFAULT_SAMPLE_FLAGS_PRESENT != 0 {
        tfhd.default_sample_flags = Some(r.read_be_u32()?);
    }

    Ok(tfhd)
}

fn decode_trun(r: &mut AtomReader<'_>) -> Result<Trun> {
    let (version, flags) = r.read_version_flags()?;
    let sample_count = r.read_be_u32()?;

    let mut trun = Trun::default();
    if flags & TRUN_DATA_OFFSET_PRESENT != 0 {
        trun.data_offset = Some(r.read_be_i32()?);
    }
    if flags & TRUN_FIRST_SAMPLE_FLAGS_PRESENT != 0 {
        trun.first_sample_flags = Some(r.read_be_u32()?);
    }

    trun.samples.reserve(sample_count as usize);
    for _ in 0..sample_count {
        let mut sample = TrunSample::default();
        if flags & TRUN_SAMPLE_DURATION_PRESENT != 0 {
            sample.duration = Some(r.read_be_u32()?);
        }
        if flags & TRUN_SAMPLE_SIZE_PRESENT != 0 {
            sample.size = Some(r.read_be_u32()?);
        }
        if flags & TRUN_SAMPLE_FLAGS_PRESENT != 0 {
            sample.flags = Some(r.read_be_u32()?);
        }
        if flags & TRUN_SAMPLE_COMPOSITION_TIME_OFFSETS_PRESENT != 0 {
            let offset =
                if version == 1 { i64::from(r.read_be_i32()?) } else { i64::from(r.read_be_u32()?) };
            sample.composition_time_offset = Some(offset);
        }
        trun.samples.push(sample);
    }

    Ok(trun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_word(version: u8, flags: u32) -> [u8; 4] {
        let word = (u32::from(version) << 24) | (flags & 0x00ff_ffff);
        word.to_be_bytes()
    }

    #[test]
    fn tfhd_independent_flags_all_read() {
        // base_data_offset_present | default_sample_duration_present | default_sample_size_present
        let flags = TFHD_BASE_DATA_OFFSET_PRESENT
            | TFHD_DEFAULT_SAMPLE_DURATION_PRESENT
            | TFHD_DEFAULT_SAMPLE_SIZE_PRESENT;
        let mut buf = header_word(0, flags).to_vec();
        buf.extend_from_slice(&7u32.to_be_bytes()); // track_id
        buf.extend_from_slice(&1234u64.to_be_bytes()); // base_data_offset
        buf.extend_from_slice(&1024u32.to_be_bytes()); // default_sample_duration
        buf.extend_from_slice(&500u32.to_be_bytes()); // default_sample_size

        let mut r = AtomReader::new(&buf);
        let tfhd = decode_tfhd(&mut r).unwrap();
        assert_eq!(tfhd.track_id, 7);
        assert_eq!(tfhd.base_data_offset, Some(1234));
        assert_eq!(tfhd.default_sample_duration, Some(1024));
        assert_eq!(tfhd.default_sample_size, Some(500));
        assert_eq!(tfhd.default_sample_flags, None);
    }

    #[test]
    fn trun_decodes_signed_composition_offsets_for_version_one() {
        let flags = TRUN_DATA_OFFSET_PRESENT | TRUN_SAMPLE_SIZE_PRESENT | TRUN_SAMPLE_COMPOSITION_TIME_OFFSETS_PRESENT;
        let mut buf = header_word(1, flags).to_vec();
        buf.extend_from_slice(&2u32.to_be_bytes()); // sample_count
        buf.extend_from_slice(&136i32.to_be_bytes()); // data_offset
        buf.extend_from_slice(&500u32.to_be_bytes()); // sample 0 size
        buf.extend_from_slice(&1024i32.to_be_bytes()); // sample 0 composition offset
        buf.extend_from_slice(&480u32.to_be_bytes()); // sample 1 size
        buf.extend_from_slice(&(-512i32).to_be_bytes()); // sample 1 composition offset

        let mut r = AtomReader::new(&buf);
        let trun = decode_trun(&mut r).unwrap();
        assert_eq!(trun.data_offset, Some(136));
        assert_eq!(trun.samples[0].composition_time_offset, Some(1024));
        assert_eq!(trun.samples[1].composition_time_offset, Some(-512));
    }
}
