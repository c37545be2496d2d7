// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `stsd` iteration; audio/video sample-entry dispatch; codec-configuration and protection
//! sub-boxes.

pub mod codec;

use log::debug;

use crate::atom::AtomReader;
use crate::cenc;
use crate::error::{self, Result};
use crate::fourcc::{self, FourCc};
use crate::model::{AudioSampleEntry, CleanAperture, ColourInfo, PixelAspectRatio, ProtectionInfo, VideoSampleEntry};

/// ES_Descriptor object type indication → normalized codec FourCC (abridged to the audio/video
/// object types ISOBMFF actually carries through `esds`; see ISO/IEC 14496-1 Table 5).
fn codec_from_object_type_indication(obj_type: u8) -> FourCc {
    match obj_type {
        0x40 | 0x66 | 0x67 | 0x68 => fourcc::MP4A, // MPEG-4/MPEG-2 AAC variants
        0x69 | 0x6b => FourCc::from_str("mp3 "),
        0xa5 => fourcc::AC_3,
        0xa6 => fourcc::EC_3,
        0xa9 => FourCc::from_str("dtsc"),
        0x20 => FourCc::from_str("mp4v"),
        0x21 => fourcc::AVC1,
        0x23 => fourcc::HEV1,
        _ => FourCc::from_str("unkn"),
    }
}

/// Result of decoding one `esds` atom: the DecoderSpecificInfo raw body plus, when it was AAC, a
/// parsed `AudioCodecConfig`.
struct EsdsResult {
    raw: Vec<u8>,
    codec: FourCc,
    parsed: Option<codec::AudioCodecConfig>,
}

fn decode_esds(r: &mut AtomReader<'_>) -> Result<EsdsResult> {
    let _ = r.read_version_flags()?;
    let body = r.read_to_end()?;
    let mut scoped = AtomReader::new(body);

    let (_tag, _len) = read_descriptor_header(&mut scoped)?;
    let _es_id = scoped.read_be_u16()?;
    let es_flags = scoped.read_u8()?;
    if es_flags & 0x80 != 0 {
        scoped.ignore_bytes(2)?;
    }
    if es_flags & 0x40 != 0 {
        let url_len = scoped.read_u8()?;
        scoped.ignore_bytes(u64::from(url_len))?;
    }
    if es_flags & 0x20 != 0 {
        scoped.ignore_bytes(2)?;
    }

    let (dc_tag, _dc_len) = read_descriptor_header(&mut scoped)?;
    if dc_tag != 0x04 {
        return error::bad_atom("esds missing DecoderConfigDescriptor");
    }
    let object_type_indication = scoped.read_u8()?;
    scoped.ignore_bytes(1 + 3 + 4 + 4)?; // streamType/upstream/reserved, bufferSizeDB, max/avg bitrate

    let mut raw = Vec::new();
    let mut parsed = None;

    while scoped.remaining() > 2 {
        let (tag, len) = read_descriptor_header(&mut scoped)?;
        if tag == 0x05 {
            raw = scoped.read_boxed_slice(len as usize)?.into_vec();
            if object_type_indication == 0x40 || object_type_indication == 0x66 || object_type_indication == 0x67 {
                parsed = codec::decode_aac_specific_config(&raw).ok();
            }
        } else {
            scoped.ignore_bytes(len)?;
        }
    }

    Ok(EsdsResult { raw, codec: codec_from_object_type_indication(object_type_indication), parsed: parsed.map(codec::AudioCodecConfig::Aac) })
}

/// Reads an ISO/IEC 14496-1 object descriptor header: a tag byte followed by a 1-4 byte
/// variable-length size (MSB of each byte is a continuation flag).
fn read_descriptor_header(r: &mut AtomReader<'_>) -> Result<(u8, u64)> {
    let tag = r.read_u8()?;
    let mut size = 0u64;
    for _ in 0..4 {
        let b = r.read_u8()?;
        size = (size << 7) | u64::from(b & 0x7f);
        if b & 0x80 == 0 {
            break;
        }
    }
    Ok((tag, size))
}

fn read_colr(r: &mut AtomReader<'_>) -> Result<ColourInfo> {
    let colour_type = r.read_fourcc()?;
    if colour_type == FourCc::from_str("nclx") {
        let colour_primaries = Some(r.read_be_u16()?);
        let transfer_characteristics = Some(r.read_be_u16()?);
        let matrix_coefficients = Some(r.read_be_u16()?);
        let flag_byte = r.read_u8()?;
        Ok(ColourInfo {
            colour_type,
            colour_primaries,
            transfer_characteristics,
            matrix_coefficients,
            full_range: flag_byte & 0x80 != 0,
            icc_profile: Vec::new(),
        })
    } else {
        Ok(ColourInfo { colour_type, icc_profile: r.read_to_end()?.to_vec(), ..Default::default() })
    }
}

fn read_pasp(r: &mut AtomReader<'_>) -> Result<PixelAspectRatio> {
    Ok(PixelAspectRatio { h_spacing: r.read_be_u32()?, v_spacing: r.read_be_u32()? })
}

fn read_clap(r: &mut AtomReader<'_>) -> Result<CleanAperture> {
    Ok(CleanAperture {
        width_n: r.read_be_i32()?,
        width_d: r.read_be_i32()?,
        height_n: r.read_be_i32()?,
        height_d: r.read_be_i32()?,
        horiz_offset_n: r.read_be_i32()?,
        horiz_offset_d: r.read_be_i32()?,
        vert_offset_n: r.read_be_i32()?,
        vert_offset_d: r.read_be_i32()?,
    })
}

/// Decodes `stsd`'s version/flags + entry_count header and returns the single sample entry's
/// header and body reader (§4.5: entry_count must be exactly 1 for this crate's purposes, which
/// only needs the first decoded entry per track).
pub fn first_sample_entry<'a>(r: &mut AtomReader<'a>) -> Result<(FourCc, AtomReader<'a>)> {
    let (_version, _flags) = r.read_version_flags()?;
    let entry_count = r.read_be_u32()?;
    if entry_count == 0 {
        return error::bad_atom("stsd entry_count must be > 0");
    }
    let (header, reader) = r.next_sub_atom()?.ok_or(crate::error::Mp4Error::BadAtom("stsd missing sample entry"))?;
    Ok((header.kind, reader))
}

/// Audio sample-entry reserved/version/channel/rate header per §4.6's QuickTime-discriminated
/// layout, followed by dispatch over remaining sub-atoms.
pub fn decode_audio_sample_entry(
    kind: FourCc,
    r: &mut AtomReader<'_>,
) -> Result<(AudioSampleEntry, Option<ProtectionInfo>)> {
    r.ignore_bytes(6)?; // reserved
    let _data_reference_index = r.read_be_u16()?;

    let version = r.read_be_u16()?;
    let mut entry = AudioSampleEntry { quicktime_version: version, ..Default::default() };

    match version {
        0 | 1 => {
            entry.channel_count = r.read_be_u16()?;
            entry.sample_size = r.read_be_u16()?;
            r.ignore_bytes(4)?; // compression_id + packet_size
            let rate_hi = r.read_be_u16()?;
            let sample_rate = if rate_hi == 0 {
                f64::from(r.read_be_u16()?)
            } else {
                r.ignore_bytes(2)?;
                f64::from(rate_hi)
            };
            entry.sample_rate = sample_rate;
            if version == 1 {
                r.ignore_bytes(4 * 4)?; // samples_per_packet, bytes_per_packet, bytes_per_frame, bytes_per_sample
            }
        }
        2 => {
            r.ignore_bytes(16)?;
            entry.sample_rate = r.read_be_f64()?.round();
            entry.channel_count = r.read_be_u32()? as u16;
            r.ignore_bytes(4)?;
            entry.sample_size = r.read_be_u32()? as u16; // const_bits_per_channel
            let _flags = r.read_be_u32()?;
            r.ignore_bytes(8)?; // bytes_per_packet, lpcm_frames_per_packet
        }
        _ => return error::unsupported_sample_entry("unsupported audio sample entry quicktime version"),
    }

    let mut protection = None;

    if kind == fourcc::ENCA {
        let sinf = r
            .find_sub_atom(fourcc::SINF)?
            .ok_or(crate::error::Mp4Error::AtomNotFound("sinf"))?;
        let mut sinf = sinf;
        protection = Some(cenc::decode_sinf(&mut sinf)?);
    }

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::ESDS => {
                let result = decode_esds(&mut sub)?;
                entry.descriptor_raw.insert(header.kind, result.raw);
                if let Some(parsed) = result.parsed {
                    entry.descriptor.insert(header.kind, parsed);
                }
                let _ = result.codec;
            }
            fourcc::DOPS => {
                let raw = codec::opus_ident_header(sub.peek(sub.remaining())?);
                let parsed = codec::decode_opus_config(&mut sub)?;
                entry.descriptor_raw.insert(header.kind, raw);
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Opus(parsed));
            }
            fourcc::DFLA => {
                let body = sub.peek(sub.remaining())?.to_vec();
                let parsed = codec::decode_flac_config(&mut sub)?;
                entry.descriptor_raw.insert(header.kind, codec::flac_stream_marker(&body));
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Flac(parsed));
            }
            fourcc::ALAC => {
                let body = sub.peek(sub.remaining())?.to_vec();
                let parsed = codec::decode_alac_config(&mut sub)?;
                entry.descriptor_raw.insert(header.kind, body);
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Alac(parsed));
            }
            fourcc::DAC3 => {
                let body = sub.read_to_end()?.to_vec();
                let parsed = codec::decode_ac3_config(&body)?;
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Ac3(parsed));
                entry.descriptor_raw.insert(header.kind, body);
            }
            fourcc::DEC3 => {
                let body = sub.read_to_end()?.to_vec();
                let parsed = codec::decode_eac3_config(&body)?;
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Eac3(parsed));
                entry.descriptor_raw.insert(header.kind, body);
            }
            fourcc::DDTS => {
                let body = sub.peek(sub.remaining())?.to_vec();
                let parsed = codec::decode_dts_config(&mut sub)?;
                entry.descriptor_raw.insert(header.kind, body);
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Dts(parsed));
            }
            fourcc::DAC4 => {
                let body = sub.read_to_end()?.to_vec();
                let parsed = codec::decode_ac4_config(&body)?;
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::Ac4(parsed));
                entry.descriptor_raw.insert(header.kind, body);
            }
            fourcc::DMLP => {
                let body = sub.peek(sub.remaining())?.to_vec();
                let parsed = codec::decode_truehd_config(&mut sub)?;
                entry.descriptor_raw.insert(header.kind, body);
                entry.descriptor.insert(header.kind, codec::AudioCodecConfig::TrueHd(parsed));
            }
            _ => debug!("skipping unrecognized audio sample-entry child {:?}", header.kind),
        }
    }

    Ok((entry, protection))
}

/// Video sample-entry header per §4.6, followed by codec-configuration/protection dispatch.
pub fn decode_video_sample_entry(
    kind: FourCc,
    r: &mut AtomReader<'_>,
) -> Result<(VideoSampleEntry, Option<ProtectionInfo>)> {
    r.ignore_bytes(6)?; // reserved
    let _data_reference_index = r.read_be_u16()?;
    r.ignore_bytes(16)?; // reserved
    let width = r.read_be_u16()?;
    let height = r.read_be_u16()?;
    r.ignore_bytes(46)?; // horiz/vert resolution, reserved, frame_count, compressorname[32]
    let depth = r.read_be_u16()?;
    r.ignore_bytes(2)?; // pre_defined

    let mut entry = VideoSampleEntry { width, height, depth, ..Default::default() };
    let mut protection = None;

    if kind == fourcc::ENCV {
        let sinf = r
            .find_sub_atom(fourcc::SINF)?
            .ok_or(crate::error::Mp4Error::AtomNotFound("sinf"))?;
        let mut sinf = sinf;
        protection = Some(cenc::decode_sinf(&mut sinf)?);
    }

    let effective_kind = protection.as_ref().map(|p| p.data_format).unwrap_or(kind);

    while let Some((header, mut sub)) = r.next_sub_atom()? {
        match header.kind {
            fourcc::AVCC
                if effective_kind == fourcc::AVC1
                    || effective_kind == fourcc::AVC3
                    || kind == fourcc::ENCV =>
            {
                let body = sub.peek(sub.remaining())?.to_vec();
                let parsed = codec::decode_avcc(&mut sub)?;
                entry.config_raw.insert(header.kind, body);
                entry.config.insert(header.kind, codec::VideoCodecConfig::Avc(parsed));
            }
            fourcc::HVCC => {
                let body = sub.read_to_end()?.to_vec();
                let parsed = codec::decode_hvcc(&body)?;
                entry.config.insert(header.kind, codec::VideoCodecConfig::Hevc(parsed));
                entry.config_raw.insert(header.kind, body);
            }
            fourcc::AV1C => {
                let body = sub.read_to_end()?.to_vec();
                let parsed = codec::decode_av1c(&body)?;
                entry.config.insert(header.kind, codec::VideoCodecConfig::Av1(parsed));
                entry.config_raw.insert(header.kind, body);
            }
            fourcc::VPCC => {
                let body = sub.peek(sub.remaining())?.to_vec();
                let parsed = codec::decode_vpcc(&mut sub)?;
                entry.config_raw.insert(header.kind, body);
                entry.config.insert(header.kind, codec::VideoCodecConfig::Vpx(parsed));
            }
            fourcc::DVCC | fourcc::DVVC => {
                let body = sub.read_to_end()?.to_vec();
                let parsed = codec::decode_dovi_config(&body)?;
                entry.config.insert(header.kind, codec::VideoCodecConfig::DolbyVision(parsed));
                entry.config_raw.insert(header.kind, body);
            }
            fourcc::COLR => entry.colour = Some(read_colr(&mut sub)?),
            fourcc::PASP => entry.pixel_aspect = Some(read_pasp(&mut sub)?),
            fourcc::CLAP => entry.clean_aperture = Some(read_clap(&mut sub)?),
            _ => debug!("skipping unrecognized video sample-entry child {:?}", header.kind),
        }
    }

    Ok((entry, protection))
}
