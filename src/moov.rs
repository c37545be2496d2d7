// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `moov` and its descendants: `mvhd`, `mvex`/`trex`/`mehd`, and the `trak` subtree (`tkhd`,
//! `edts`/`elst`, `mdia`/`mdhd`/`hdlr`/`elng`, `minf`/`stbl`).

use log::{debug, warn};

use crate::atom::AtomReader;
use crate::cenc;
use crate::error::{self, Result};
use crate::fourcc::{self, FourCc};
use crate::fp::{FpI16, FpU16};
use crate::model::*;
use crate::sample_entry;
use crate::stbl;

/// Decodes `ftyp`/`styp`: major brand, minor version, then as many compatible-brand FourCCs as
/// remain in the body.
pub fn decode_ftyp(r: &mut AtomReader<'_>) -> Result<Ftyp> {
    let major_brand = Some(r.read_fourcc()?);
    let minor_version = r.read_be_u32()?;
    let mut compatible_brands = Vec::with_capacity(r.remaining() / 4);
    while r.remaining() >= 4 {
        compatible_brands.push(r.read_fourcc()?);
    }
    Ok(Ftyp { major_brand, minor_version, compatible_brands })
}

/// Decodes `moov`'s direct children into a fresh [`MovieInfo`]. When `permissive` is set, a
/// `BadAtom` while decoding one `trak` degrades to dropping that track (logged at `warn`) instead
/// of failing the whole `moov`.
pub fn decode_moov(r: &mut AtomReader<'_>, permissive: bool) -> Result<MovieInfo> {
    let mut info = MovieInfo { top_level_kind: "moov", ..Default::default() };

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::MVHD => decode_mvhd(&mut sub, &mut info)?,
            fourcc::MVEX => decode_mvex(&mut sub, &mut info)?,
            fourcc::TRAK => match decode_trak(&mut sub, permissive) {
                Ok(track) => info.tracks.push(track),
                Err(error::Mp4Error::BadAtom(msg)) if permissive => {
                    warn!("dropping malformed trak: {msg}");
                }
                Err(e) => return Err(e),
            },
            fourcc::PSSH => info.pssh.push(cenc::decode_pssh(&mut sub)?),
            _ => debug!("skipping unrecognized moov child {:?}", header.kind),
        }
    }

    if info.has_fragments && info.trex.len() != info.tracks.len() {
        warn!("mvex.trex count ({}) does not match trak count ({})", info.trex.len(), info.tracks.len());
    }

    Ok(info)
}

fn decode_mvhd(r: &mut AtomReader<'_>, info: &mut MovieInfo) -> Result<()> {
    let (version, _flags) = r.read_version_flags()?;

    let (creation_time, modification_time, time_scale, duration) = if version == 1 {
        (r.read_be_u64()?, r.read_be_u64()?, r.read_be_u32()?, r.read_be_u64()?)
    } else {
        (u64::from(r.read_be_u32()?), u64::from(r.read_be_u32()?), r.read_be_u32()?, u64::from(r.read_be_u32()?))
    };

    // Reserved-and-matrix region: rate(4) + volume(2) + reserved(10) + matrix(36) + predefined(24)
    // = 70 bytes, skipped verbatim (the QuickTime geometry transform is out of this crate's scope).
    r.ignore_bytes(70)?;
    // next_track_id
    r.ignore_bytes(4)?;

    info.creation_time = creation_time;
    info.modification_time = modification_time;
    info.time_scale = time_scale;
    info.duration = duration;
    Ok(())
}

fn decode_mvex(r: &mut AtomReader<'_>, info: &mut MovieInfo) -> Result<()> {
    info.has_fragments = true;
    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::TREX => info.trex.push(decode_trex(&mut sub)?),
            fourcc::MEHD => {
                let (version, _flags) = sub.read_version_flags()?;
                let _fragment_duration =
                    if version == 1 { sub.read_be_u64()? } else { u64::from(sub.read_be_u32()?) };
            }
            _ => {}
        }
    }
    Ok(())
}

fn decode_trex(r: &mut AtomReader<'_>) -> Result<TrexEntry> {
    let _ = r.read_version_flags()?;
    Ok(TrexEntry {
        track_id: r.read_be_u32()?,
        default_sample_description_index: r.read_be_u32()?,
        default_sample_duration: r.read_be_u32()?,
        default_sample_size: r.read_be_u32()?,
        default_sample_flags: r.read_be_u32()?,
    })
}

fn decode_trak(r: &mut AtomReader<'_>, permissive: bool) -> Result<Track> {
    let mut track = Track { enabled: true, in_movie: true, ..Default::default() };
    let mut mdia_done = false;

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::TKHD => decode_tkhd(&mut sub, &mut track)?,
            fourcc::EDTS => track.edts = Some(decode_edts(&mut sub)?),
            fourcc::MDIA => {
                decode_mdia(&mut sub, &mut track, permissive)?;
                mdia_done = true;
            }
            _ => {}
        }
    }

    if !mdia_done {
        return error::atom_not_found("mdia");
    }

    Ok(track)
}

fn decode_tkhd(r: &mut AtomReader<'_>, track: &mut Track) -> Result<()> {
    let (version, flags) = r.read_version_flags()?;

    track.enabled = flags & 0x1 != 0;
    track.in_movie = flags & 0x2 != 0;
    track.in_preview = flags & 0x4 != 0;
    track.size_is_aspect_ratio = flags & 0x8 != 0;

    let (creation_time, modification_time, track_id, duration) = if version == 1 {
        let ct = r.read_be_u64()?;
        let mt = r.read_be_u64()?;
        let id = r.read_be_u32()?;
        r.ignore_bytes(4)?; // reserved
        let dur = r.read_be_u64()?;
        (ct, mt, id, dur)
    } else {
        let ct = u64::from(r.read_be_u32()?);
        let mt = u64::from(r.read_be_u32()?);
        let id = r.read_be_u32()?;
        r.ignore_bytes(4)?; // reserved
        let dur = u64::from(r.read_be_u32()?);
        (ct, mt, id, dur)
    };

    r.ignore_bytes(8)?; // reserved[2]
    r.ignore_bytes(2)?; // layer
    r.ignore_bytes(2)?; // alternate_group
    r.ignore_bytes(2)?; // volume
    r.ignore_bytes(2)?; // reserved
    r.ignore_bytes(36)?; // matrix
    let width = FpU16::parse_raw(r.read_be_u32()?);
    let height = FpU16::parse_raw(r.read_be_u32()?);

    track.creation_time = creation_time;
    track.modification_time = modification_time;
    track.track_id = track_id;
    track.duration = duration;
    track.tkhd_width = width;
    track.tkhd_height = height;
    Ok(())
}

fn decode_edts(r: &mut AtomReader<'_>) -> Result<EditList> {
    let mut elst = r.find_sub_atom(fourcc::ELST)?.ok_or(crate::error::Mp4Error::AtomNotFound("elst"))?;
    decode_elst(&mut elst)
}

fn decode_elst(r: &mut AtomReader<'_>) -> Result<EditList> {
    let (version, _flags) = r.read_version_flags()?;
    let count = r.read_be_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (segment_duration, media_time) = if version == 1 {
            (r.read_be_u64()?, r.read_be_i64()?)
        } else {
            (u64::from(r.read_be_u32()?), i64::from(r.read_be_i32()?))
        };
        let rate_integer = r.read_be_i16()?;
        let rate_fraction = r.read_be_u16()?;
        entries.push(EditListEntry {
            segment_duration,
            media_time,
            media_rate: FpI16::from_parts(rate_integer, rate_fraction),
        });
    }
    Ok(EditList { entries })
}

fn decode_mdia(r: &mut AtomReader<'_>, track: &mut Track, permissive: bool) -> Result<()> {
    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::MDHD => decode_mdhd(&mut sub, track)?,
            fourcc::HDLR => decode_hdlr(&mut sub, track)?,
            fourcc::ELNG => {
                let _ = sub.read_version_flags()?;
                let bytes = sub.read_to_end()?;
                let text = std::str::from_utf8(bytes).unwrap_or("").trim_end_matches('\0');
                track.extended_language = Some(text.to_string());
            }
            fourcc::MINF => decode_minf(&mut sub, track, permissive)?,
            _ => {}
        }
    }
    Ok(())
}

fn decode_mdhd(r: &mut AtomReader<'_>, track: &mut Track) -> Result<()> {
    let (version, _flags) = r.read_version_flags()?;
    let (_creation_time, _modification_time, time_scale, duration) = if version == 1 {
        (r.read_be_u64()?, r.read_be_u64()?, r.read_be_u32()?, r.read_be_u64()?)
    } else {
        (u64::from(r.read_be_u32()?), u64::from(r.read_be_u32()?), r.read_be_u32()?, u64::from(r.read_be_u32()?))
    };

    let packed = r.read_be_u16()?;
    if packed & 0x8000 != 0 {
        warn!("mdhd reserved bit 15 is nonzero; using low 15 bits anyway");
    }
    let language = packed & 0x7fff;
    r.ignore_bytes(2)?; // pre_defined

    track.time_scale = time_scale;
    track.duration = duration;
    track.language = language;
    Ok(())
}

fn decode_hdlr(r: &mut AtomReader<'_>, track: &mut Track) -> Result<()> {
    let _ = r.read_version_flags()?;
    r.ignore_bytes(4)?; // pre_defined
    let handler_type = r.read_fourcc()?;
    r.ignore_bytes(12)?; // reserved[3]
    // name is the remainder of the body; not retained (no consumer needs it).

    track.kind = match handler_type {
        k if k == FourCc::from_str("vide") => TrackKind::Video,
        k if k == FourCc::from_str("soun") => TrackKind::Audio,
        k if k == FourCc::from_str("subt") => TrackKind::Subtitle,
        _ => TrackKind::Unknown,
    };
    Ok(())
}

fn decode_minf(r: &mut AtomReader<'_>, track: &mut Track, permissive: bool) -> Result<()> {
    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::STBL => decode_stbl(&mut sub, track, permissive)?,
            // Media-info-header variants carry no data this crate's model surfaces.
            k if k == fourcc::VMHD || k == fourcc::SMHD || k == fourcc::HMHD || k == fourcc::NMHD => {}
            _ => {}
        }
    }
    Ok(())
}

/// Decodes a single sample-table child, degrading a `BadAtom` to "drop this child" (logged at
/// `warn`) instead of failing the whole `stbl` when `permissive` is set.
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

fn decode_stbl(r: &mut AtomReader<'_>, track: &mut Track, permissive: bool) -> Result<()> {
    let mut table = SampleTable::default();
    let mut sample_count = 0u32;

    // stsd must be decoded before sdtp/subs because they're shaped by the sample count, but
    // file order is not guaranteed; a forward scan locates it first without disturbing the
    // sequential walk below (within the bound allowed by §5: one bounded forward scan).
    if let Some(mut stsd) = r.find_sub_atom(fourcc::STSD)? {
        decode_stsd(&mut stsd, track)?;
    }

    // senc's IV-size resolution depends on sbgp/sgpd, which file order does not guarantee come
    // first; locate senc now and decode it after the walk below has populated both.
    let senc_reader = r.find_sub_atom(fourcc::SENC)?;

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::STSD => {} // already handled above
            fourcc::SENC => {} // handled after the loop, once sbgp/sgpd are known
            fourcc::STTS => {
                if let Some(stts) = permissive_child(permissive, "stts", stbl::decode_stts(&mut sub))? {
                    sample_count = stts.total_samples() as u32;
                    table.stts = stts;
                }
            }
            fourcc::CTTS => {
                table.ctts = permissive_child(permissive, "ctts", stbl::decode_ctts(&mut sub))?;
            }
            fourcc::CSLG => {
                table.cslg = permissive_child(permissive, "cslg", stbl::decode_cslg(&mut sub))?;
            }
            fourcc::STSC => {
                if let Some(stsc) = permissive_child(permissive, "stsc", stbl::decode_stsc(&mut sub))? {
                    table.stsc = stsc;
                }
            }
            fourcc::STSZ => {
                if let Some(stsz) = permissive_child(permissive, "stsz", stbl::decode_stsz(&mut sub))? {
                    table.stsz = stsz;
                }
            }
            fourcc::STZ2 => {
                if let Some(stsz) = permissive_child(permissive, "stz2", stbl::decode_stz2(&mut sub))? {
                    table.stsz = stsz;
                }
            }
            fourcc::STCO => {
                if let Some(stco) = permissive_child(permissive, "stco", stbl::decode_stco(&mut sub))? {
                    table.stco = stco;
                }
            }
            fourcc::CO64 => {
                if let Some(stco) = permissive_child(permissive, "co64", stbl::decode_co64(&mut sub))? {
                    table.stco = stco;
                }
            }
            fourcc::STSS => {
                table.stss = permissive_child(permissive, "stss", stbl::decode_stss(&mut sub))?;
            }
            fourcc::STSH => {
                if let Some(stsh) = permissive_child(permissive, "stsh", stbl::decode_stsh(&mut sub))? {
                    table.stsh = stsh;
                }
            }
            fourcc::SDTP => {
                if let Some(sdtp) =
                    permissive_child(permissive, "sdtp", stbl::decode_sdtp(&mut sub, sample_count))?
                {
                    table.sdtp = sdtp;
                }
            }
            fourcc::SUBS => {
                if let Some(subs) = permissive_child(permissive, "subs", stbl::decode_subs(&mut sub))? {
                    table.subs = subs;
                }
            }
            fourcc::SBGP => {
                if let Some(sbgp) = permissive_child(permissive, "sbgp", stbl::decode_sbgp(&mut sub))? {
                    table.sbgp.push(sbgp);
                }
            }
            fourcc::SGPD => {
                if let Some(sgpd) = permissive_child(permissive, "sgpd", stbl::decode_sgpd(&mut sub))? {
                    table.sgpd.push(sgpd);
                }
            }
            fourcc::SAIO if track.encrypted => {
                table.saio = permissive_child(permissive, "saio", stbl::decode_saio(&mut sub))?;
            }
            fourcc::SAIZ if track.encrypted => {
                table.saiz = permissive_child(permissive, "saiz", stbl::decode_saiz(&mut sub))?;
            }
            _ => {}
        }
    }

    if let Some(mut senc_sub) = senc_reader {
        let default_iv_size = track.protection.first().map(|p| p.default_per_sample_iv_size);
        table.senc = permissive_child(
            permissive,
            "senc",
            stbl::decode_senc(&mut senc_sub, default_iv_size, &table.sbgp, &table.sgpd),
        )?;
    }

    track.sample_table = table;
    Ok(())
}

fn decode_stsd(r: &mut AtomReader<'_>, track: &mut Track) -> Result<()> {
    let (kind, mut entry_reader) = sample_entry::first_sample_entry(r)?;

    match track.kind {
        TrackKind::Audio => {
            match sample_entry::decode_audio_sample_entry(kind, &mut entry_reader) {
                Ok((entry, protection)) => {
                    track.channel_count = entry.channel_count;
                    track.sample_rate = entry.sample_rate;
                    track.sample_size = entry.sample_size;
                    apply_protection(track, kind, protection);
                    track.audio_entry = Some(entry);
                }
                Err(crate::error::Mp4Error::UnsupportedSampleEntry(msg)) => {
                    warn!("dropping unsupported audio sample entry: {msg}");
                }
                Err(e) => return Err(e),
            }
        }
        TrackKind::Video => {
            match sample_entry::decode_video_sample_entry(kind, &mut entry_reader) {
                Ok((entry, protection)) => {
                    track.width = entry.width;
                    track.height = entry.height;
                    apply_protection(track, kind, protection);
                    track.video_entry = Some(entry);
                }
                Err(crate::error::Mp4Error::UnsupportedSampleEntry(msg)) => {
                    warn!("dropping unsupported video sample entry: {msg}");
                }
                Err(e) => return Err(e),
            }
        }
        _ => {
            track.format = kind;
        }
    }
    Ok(())
}

fn apply_protection(track: &mut Track, entry_kind: FourCc, protection: Option<ProtectionInfo>) {
    match protection {
        Some(p) => {
            track.encrypted = true;
            track.format = p.data_format;
            track.protection.push(p);
        }
        None => track.format = entry_kind,
    }
}
