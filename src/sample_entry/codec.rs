// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Codec-configuration records (`esds`, `dOps`, `dfLa`, `alac`, `dac3`/`dec3`, `ddts`, `dac4`,
//! `dmlp`, `avcC`, `hvcC`, `av1C`, `vpcC`, `dvcC`/`dvvC`).

use crate::atom::AtomReader;
use crate::bitreader::BitReader;
use crate::error::{self, Result};

// ---------------------------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum AudioCodecConfig {
    Aac(AacConfig),
    Opus(OpusConfig),
    Flac(FlacConfig),
    Alac(AlacConfig),
    Ac3(Ac3Config),
    Eac3(Eac3Config),
    Dts(DtsConfig),
    Ac4(Ac4Config),
    TrueHd(TrueHdConfig),
}

#[derive(Debug, Clone, Default)]
pub struct AacConfig {
    pub object_type_indication: u8,
    pub audio_object_type: u8,
    pub frequency_index: u8,
    pub sample_rate: u32,
    pub channel_configuration: u8,
    pub channel_count: u8,
    pub sbr_present: bool,
    pub ps_present: bool,
    pub extension_sample_rate: Option<u32>,
}

const AAC_SAMPLE_RATES: [u32; 13] =
    [96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350];

/// Channel counts for the 16 defined `channelConfiguration` values (ISO/IEC 14496-3 Table 1.19),
/// 0 meaning "derive from `program_config_element`".
const AAC_CHANNEL_COUNTS: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 8];

fn read_sampling_frequency(r: &mut BitReader<'_>) -> (u8, u32) {
    let idx = r.read_bits(4) as u8;
    if idx == 0x0f {
        let explicit = r.read_bits(24) as u32;
        (idx, explicit)
    } else {
        (idx, AAC_SAMPLE_RATES.get(idx as usize).copied().unwrap_or(0))
    }
}

/// Parses `program_config_element` (ISO/IEC 14496-3 §1.A.4.2.2) far enough to total the channel
/// count across front/side/back/LFE channel element groups.
fn read_program_config_element_channel_count(r: &mut BitReader<'_>) -> u8 {
    r.ignore_bits(4); // element_instance_tag
    r.ignore_bits(2); // object_type
    let (_, _) = read_sampling_frequency(r);
    let num_front = r.read_bits(4) as u8;
    let num_side = r.read_bits(4) as u8;
    let num_back = r.read_bits(4) as u8;
    let num_lfe = r.read_bits(2) as u8;
    let num_assoc_data = r.read_bits(3) as u8;
    let num_valid_cc = r.read_bits(4) as u8;

    let mono_mixdown = r.read_bool();
    if mono_mixdown {
        r.ignore_bits(4);
    }
    let stereo_mixdown = r.read_bool();
    if stereo_mixdown {
        r.ignore_bits(4);
    }
    let matrix_mixdown = r.read_bool();
    if matrix_mixdown {
        r.ignore_bits(2);
        r.ignore_bits(1);
    }

    let mut count = 0u32;
    for _ in 0..num_front {
        let is_cpe = r.read_bool();
        r.ignore_bits(4);
        count += if is_cpe { 2 } else { 1 };
    }
    for _ in 0..num_side {
        let is_cpe = r.read_bool();
        r.ignore_bits(4);
        count += if is_cpe { 2 } else { 1 };
    }
    for _ in 0..num_back {
        let is_cpe = r.read_bool();
        r.ignore_bits(4);
        count += if is_cpe { 2 } else { 1 };
    }
    for _ in 0..num_lfe {
        r.ignore_bits(4);
        count += 1;
    }
    for _ in 0..num_assoc_data {
        r.ignore_bits(4);
    }
    for _ in 0..num_valid_cc {
        r.ignore_bits(1);
        r.ignore_bits(4);
    }
    r.realign();
    let comment_len = r.read_bits(8);
    r.ignore_bits((comment_len * 8) as u32);

    count.min(u8::MAX as u32) as u8
}

/// Parses an `AudioSpecificConfig` (the `esds` DecoderSpecificInfo payload) per §4.6's table.
pub fn decode_aac_specific_config(data: &[u8]) -> Result<AacConfig> {
    let mut r = BitReader::new(data);

    let mut audio_object_type = r.read_bits(5) as u8;
    if audio_object_type == 31 {
        audio_object_type = 32 + r.read_bits(6) as u8;
    }

    let (frequency_index, mut sample_rate) = read_sampling_frequency(&mut r);
    let mut channel_configuration = r.read_bits(4) as u8;

    let mut sbr_present = false;
    let mut ps_present = false;
    let mut extension_sample_rate = None;

    if audio_object_type == 5 || audio_object_type == 29 {
        sbr_present = true;
        if audio_object_type == 29 {
            ps_present = true;
        }
        let (_, ext_rate) = read_sampling_frequency(&mut r);
        extension_sample_rate = Some(ext_rate);
        audio_object_type = r.read_bits(5) as u8;
        if audio_object_type == 31 {
            audio_object_type = 32 + r.read_bits(6) as u8;
        }
        if audio_object_type == 22 {
            channel_configuration = r.read_bits(4) as u8;
        }
    }

    let channel_count = if channel_configuration == 0 {
        read_program_config_element_channel_count(&mut r)
    } else {
        AAC_CHANNEL_COUNTS.get(channel_configuration as usize).copied().unwrap_or(0)
    };

    // SBR doubles the effective output sample rate relative to the core decoder's rate.
    if sbr_present {
        sample_rate = extension_sample_rate.unwrap_or(sample_rate);
    }

    r.err()?;

    Ok(AacConfig {
        object_type_indication: 0x40,
        audio_object_type,
        frequency_index,
        sample_rate,
        channel_configuration,
        channel_count,
        sbr_present,
        ps_present,
        extension_sample_rate,
    })
}

#[derive(Debug, Clone, Default)]
pub struct OpusConfig {
    pub version: u8,
    pub output_channel_count: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
    pub output_gain: i16,
    pub channel_mapping_family: u8,
    pub stream_count: u8,
    pub coupled_count: u8,
    pub channel_mapping: Vec<u8>,
}

pub fn decode_opus_config(r: &mut AtomReader<'_>) -> Result<OpusConfig> {
    let version = r.read_u8()?;
    let output_channel_count = r.read_u8()?;
    let pre_skip = r.read_be_u16()?;
    let input_sample_rate = r.read_be_u32()?;
    let output_gain = r.read_be_i16()?;
    let channel_mapping_family = r.read_u8()?;

    let (stream_count, coupled_count, channel_mapping) = if channel_mapping_family != 0 {
        let stream_count = r.read_u8()?;
        let coupled_count = r.read_u8()?;
        let mut mapping = Vec::with_capacity(output_channel_count as usize);
        for _ in 0..output_channel_count {
            mapping.push(r.read_u8()?);
        }
        (stream_count, coupled_count, mapping)
    } else {
        (1, if output_channel_count == 2 { 1 } else { 0 }, Vec::new())
    };

    Ok(OpusConfig {
        version,
        output_channel_count,
        pre_skip,
        input_sample_rate,
        output_gain,
        channel_mapping_family,
        stream_count,
        coupled_count,
        channel_mapping,
    })
}

/// Builds the RFC 7845 `OpusHead` identification header ("OpusHead" prefix over the raw body).
pub fn opus_ident_header(raw_body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + raw_body.len());
    out.extend_from_slice(b"OpusHead");
    out.extend_from_slice(raw_body);
    out
}

#[derive(Debug, Clone, Default)]
pub struct FlacConfig {
    pub sample_rate: u32,
    pub channel_count: u8,
    pub bits_per_sample: u8,
}

pub fn decode_flac_config(r: &mut AtomReader<'_>) -> Result<FlacConfig> {
    let (version, flags) = r.read_version_flags()?;
    if version != 0 || flags != 0 {
        return error::bad_atom("dfLa version/flags must be zero");
    }
    let block_header = r.read_be_u32()?;
    let block_type = (block_header >> 24) & 0x7f;
    let block_len = block_header & 0x00ff_ffff;
    if block_type != 0 || block_len != 34 {
        return error::bad_atom("dfLa first metadata block must be STREAMINFO of length 34");
    }
    // min/max blocksize (2x u16), min/max framesize (2x u24)
    r.ignore_bytes(2 + 2 + 3 + 3)?;
    let packed = r.read_be_u32()?;
    let sample_rate = packed >> 12;
    let channel_count = (((packed >> 9) & 0x7) + 1) as u8;
    let bits_per_sample = (((packed >> 4) & 0x1f) + 1) as u8;
    Ok(FlacConfig { sample_rate, channel_count, bits_per_sample })
}

/// Prefixes the raw body with the `fLaC` marker, as FLAC-in-ISOBMFF external demuxers expect.
pub fn flac_stream_marker(raw_body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + raw_body.len());
    out.extend_from_slice(b"fLaC");
    out.extend_from_slice(raw_body);
    out
}

#[derive(Debug, Clone, Default)]
pub struct AlacConfig {
    pub frame_length: u32,
    pub compatible_version: u8,
    pub bit_depth: u8,
    pub pb: u8,
    pub mb: u8,
    pub kb: u8,
    pub num_channels: u8,
    pub max_run: u16,
    pub max_frame_bytes: u32,
    pub avg_bit_rate: u32,
    pub sample_rate: u32,
}

pub fn decode_alac_config(r: &mut AtomReader<'_>) -> Result<AlacConfig> {
    let _ = r.read_version_flags()?;
    Ok(AlacConfig {
        frame_length: r.read_be_u32()?,
        compatible_version: r.read_u8()?,
        bit_depth: r.read_u8()?,
        pb: r.read_u8()?,
        mb: r.read_u8()?,
        kb: r.read_u8()?,
        num_channels: r.read_u8()?,
        max_run: r.read_be_u16()?,
        max_frame_bytes: r.read_be_u32()?,
        avg_bit_rate: r.read_be_u32()?,
        sample_rate: r.read_be_u32()?,
    })
}

const AC3_SAMPLE_RATES: [u32; 3] = [48000, 44100, 32000];
const AC3_ACMOD_CHANNELS: [u8; 8] = [2, 1, 2, 3, 3, 4, 4, 5];

#[derive(Debug, Clone, Default)]
pub struct Ac3Config {
    pub sample_rate: u32,
    pub bsid: u8,
    pub bit_rate_code: u8,
    pub acmod: u8,
    pub channel_count: u8,
    pub lfe_on: bool,
}

pub fn decode_ac3_config(data: &[u8]) -> Result<Ac3Config> {
    let mut r = BitReader::new(data);
    let fscod = r.read_bits(2) as usize;
    let bsid = r.read_bits(5) as u8;
    let bsmod = r.read_bits(3) as u8;
    let acmod = r.read_bits(3) as u8;
    let _ = bsmod;
    // One or two LFE-presence tests depending on acmod, per ETSI TS 102 366 Annex F.
    if (acmod & 0x1) != 0 && acmod != 1 {
        r.ignore_bits(2); // cmixlev
    }
    if (acmod & 0x4) != 0 {
        r.ignore_bits(2); // surmixlev
    }
    if acmod == 2 {
        r.ignore_bits(2); // dsurmod
    }
    let lfe_on = r.read_bool();
    let bit_rate_code = r.read_bits(5) as u8;
    r.err()?;

    let sample_rate = AC3_SAMPLE_RATES.get(fscod).copied().unwrap_or(0);
    let channel_count = AC3_ACMOD_CHANNELS.get(acmod as usize).copied().unwrap_or(0)
        + u8::from(lfe_on);

    Ok(Ac3Config { sample_rate, bsid, bit_rate_code, acmod, channel_count, lfe_on })
}

#[derive(Debug, Clone, Default)]
pub struct Eac3Config {
    pub base: Ac3Config,
    pub num_dep_sub: u8,
    pub chan_loc: u16,
}

pub fn decode_eac3_config(data: &[u8]) -> Result<Eac3Config> {
    let mut r = BitReader::new(data);
    let _data_rate = r.read_bits(13);
    let num_ind_sub = r.read_bits(3) as u8;

    let mut first = None;
    for _ in 0..=num_ind_sub {
        let fscod = r.read_bits(2) as usize;
        let bsid = r.read_bits(5) as u8;
        r.ignore_bits(1); // reserved
        r.ignore_bits(1); // asvc
        let acmod = r.read_bits(3) as u8;
        let lfe_on = r.read_bool();
        r.ignore_bits(3); // reserved

        let num_dep_sub = r.read_bits(4) as u8;
        let chan_loc = if num_dep_sub > 0 { r.read_bits(9) as u16 } else { r.ignore_bits(1); 0 };

        if first.is_none() {
            let channel_count = AC3_ACMOD_CHANNELS.get(acmod as usize).copied().unwrap_or(0)
                + u8::from(lfe_on);
            first = Some(Eac3Config {
                base: Ac3Config {
                    sample_rate: AC3_SAMPLE_RATES.get(fscod).copied().unwrap_or(0),
                    bsid,
                    bit_rate_code: 0,
                    acmod,
                    channel_count,
                    lfe_on,
                },
                num_dep_sub,
                chan_loc,
            });
        }
    }
    r.err()?;
    first.ok_or(crate::error::Mp4Error::BadAtom("dec3 has no independent substream"))
}

const DTS_FRAME_DURATIONS: [u32; 4] = [512, 1024, 2048, 4096];

#[derive(Debug, Clone, Default)]
pub struct DtsConfig {
    pub sampling_rate: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
    pub pcm_sample_depth: u8,
    pub frame_duration: u32,
    pub stream_construction: u16,
    pub core_layout: u8,
    pub core_size: u16,
    pub stereo_downmix: bool,
    pub representation_type: u8,
    pub channel_layout: u16,
}

pub fn decode_dts_config(r: &mut AtomReader<'_>) -> Result<DtsConfig> {
    let sampling_rate = r.read_be_u32()?;
    let max_bitrate = r.read_be_u32()?;
    let avg_bitrate = r.read_be_u32()?;
    let pcm_sample_depth = r.read_u8()?;

    let rest = r.read_to_end()?;
    let mut br = BitReader::new(rest);
    let frame_duration_code = br.read_bits(2) as usize;
    let stream_construction = br.read_bits(5) as u16;
    let stereo_downmix = br.read_bool();
    let core_layout = br.read_bits(6) as u8;
    let core_size = br.read_bits(14) as u16;
    br.ignore_bits(1); // reserved
    let representation_type = br.read_bits(3) as u8;
    let channel_layout = br.read_bits(16) as u16;
    br.err()?;

    Ok(DtsConfig {
        sampling_rate,
        max_bitrate,
        avg_bitrate,
        pcm_sample_depth,
        frame_duration: DTS_FRAME_DURATIONS.get(frame_duration_code).copied().unwrap_or(0),
        stream_construction,
        core_layout,
        core_size,
        stereo_downmix,
        representation_type,
        channel_layout,
    })
}

#[derive(Debug, Clone, Default)]
pub struct Ac4Config {
    pub sample_rate: u32,
    pub bitstream_version: u8,
}

pub fn decode_ac4_config(data: &[u8]) -> Result<Ac4Config> {
    let mut r = BitReader::new(data);
    let _ac4_dsi_version = r.read_bits(3);
    let bitstream_version = r.read_bits(7) as u8;
    let fs_index = r.read_bool();
    r.err()?;
    Ok(Ac4Config { sample_rate: if fs_index { 48000 } else { 44100 }, bitstream_version })
}

#[derive(Debug, Clone, Default)]
pub struct TrueHdConfig {
    pub format_info: u32,
    pub peak_data_rate: u16,
}

pub fn decode_truehd_config(r: &mut AtomReader<'_>) -> Result<TrueHdConfig> {
    let format_info = r.read_be_u32()?;
    let word = r.read_be_u16()?;
    let peak_data_rate = word >> 1; // 15 bits, 1 reserved bit follows
    Ok(TrueHdConfig { format_info, peak_data_rate })
}

// ---------------------------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum VideoCodecConfig {
    Avc(AvcConfig),
    Hevc(HevcConfig),
    Av1(Av1Config),
    Vpx(VpxConfig),
    DolbyVision(DolbyVisionConfig),
}

#[derive(Debug, Clone, Default)]
pub struct AvcConfig {
    pub configuration_version: u8,
    pub profile: u8,
    pub compatibility: u8,
    pub level: u8,
    pub length_size_minus_one: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

pub fn decode_avcc(r: &mut AtomReader<'_>) -> Result<AvcConfig> {
    let configuration_version = r.read_u8()?;
    let profile = r.read_u8()?;
    let compatibility = r.read_u8()?;
    let level = r.read_u8()?;

    let length_byte = r.read_u8()?;
    let length_size_minus_one = length_byte & 0x3;
    if length_size_minus_one == 2 {
        return error::bad_atom("avcC LengthSizeMinusOne == 2 is reserved/invalid");
    }

    let num_sps = r.read_u8()? & 0x1f;
    let mut sps = Vec::with_capacity(num_sps as usize);
    for _ in 0..num_sps {
        let len = r.read_be_u16()? as usize;
        sps.push(r.read_boxed_slice(len)?.into_vec());
    }

    let num_pps = r.read_u8()?;
    let mut pps = Vec::with_capacity(num_pps as usize);
    for _ in 0..num_pps {
        let len = r.read_be_u16()? as usize;
        pps.push(r.read_boxed_slice(len)?.into_vec());
    }

    Ok(AvcConfig { configuration_version, profile, compatibility, level, length_size_minus_one, sps, pps })
}

#[derive(Debug, Clone, Default)]
pub struct HevcNalArray {
    pub array_completeness: bool,
    pub nal_unit_type: u8,
    pub nalus: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct HevcConfig {
    pub general_profile_space: u8,
    pub general_tier_flag: bool,
    pub general_profile_idc: u8,
    pub general_profile_compatibility_flags: u32,
    pub general_constraint_indicator_flags: u64,
    pub general_level_idc: u8,
    pub min_spatial_segmentation_idc: u16,
    pub parallelism_type: u8,
    pub chroma_format_idc: u8,
    pub bit_depth_luma_minus8: u8,
    pub bit_depth_chroma_minus8: u8,
    pub avg_frame_rate: u16,
    pub constant_frame_rate: u8,
    pub num_temporal_layers: u8,
    pub temporal_id_nested: bool,
    pub length_size_minus_one: u8,
    pub arrays: Vec<HevcNalArray>,
}

pub fn decode_hvcc(data: &[u8]) -> Result<HevcConfig> {
    let mut r = BitReader::new(data);

    r.ignore_bits(8); // configurationVersion
    let general_profile_space = r.read_bits(2) as u8;
    let general_tier_flag = r.read_bool();
    let general_profile_idc = r.read_bits(5) as u8;
    let general_profile_compatibility_flags = r.read_bits(32) as u32;
    let general_constraint_indicator_flags = r.read_bits(48);
    let general_level_idc = r.read_bits(8) as u8;
    r.ignore_bits(4); // reserved
    let min_spatial_segmentation_idc = r.read_bits(12) as u16;
    r.ignore_bits(6); // reserved
    let parallelism_type = r.read_bits(2) as u8;
    r.ignore_bits(6); // reserved
    let chroma_format_idc = r.read_bits(2) as u8;
    r.ignore_bits(5); // reserved
    let bit_depth_luma_minus8 = r.read_bits(3) as u8;
    r.ignore_bits(5); // reserved
    let bit_depth_chroma_minus8 = r.read_bits(3) as u8;
    let avg_frame_rate = r.read_bits(16) as u16;
    let constant_frame_rate = r.read_bits(2) as u8;
    let num_temporal_layers = r.read_bits(3) as u8;
    let temporal_id_nested = r.read_bool();
    let length_size_minus_one = r.read_bits(2) as u8;
    let num_of_arrays = r.read_bits(8) as u8;

    let mut arrays = Vec::with_capacity(num_of_arrays as usize);
    for _ in 0..num_of_arrays {
        let array_completeness = r.read_bool();
        r.ignore_bits(1); // reserved
        let nal_unit_type = r.read_bits(6) as u8;
        let num_nalus = r.read_bits(16) as u16;
        let mut nalus = Vec::with_capacity(num_nalus as usize);
        for _ in 0..num_nalus {
            let len = r.read_bits(16) as usize;
            let mut buf = Vec::with_capacity(len);
            for _ in 0..len {
                buf.push(r.read_u8());
            }
            nalus.push(buf);
        }
        arrays.push(HevcNalArray { array_completeness, nal_unit_type, nalus });
    }

    r.err()?;

    Ok(HevcConfig {
        general_profile_space,
        general_tier_flag,
        general_profile_idc,
        general_profile_compatibility_flags,
        general_constraint_indicator_flags,
        general_level_idc,
        min_spatial_segmentation_idc,
        parallelism_type,
        chroma_format_idc,
        bit_depth_luma_minus8,
        bit_depth_chroma_minus8,
        avg_frame_rate,
        constant_frame_rate,
        num_temporal_layers,
        temporal_id_nested,
        length_size_minus_one,
        arrays,
    })
}

#[derive(Debug, Clone, Default)]
pub struct Av1Config {
    pub seq_profile: u8,
    pub seq_level_idx_0: u8,
    pub seq_tier_0: bool,
    pub high_bitdepth: bool,
    pub twelve_bit: bool,
    pub monochrome: bool,
    pub chroma_subsampling_x: bool,
    pub chroma_subsampling_y: bool,
    pub chroma_sample_position: u8,
    pub initial_presentation_delay: Option<u8>,
}

pub fn decode_av1c(data: &[u8]) -> Result<Av1Config> {
    let mut r = BitReader::new(data);
    let marker = r.read_bool();
    let version = r.read_bits(7) as u8;
    if !marker || version != 1 {
        return error::bad_atom("av1C marker/version fields invalid");
    }
    let seq_profile = r.read_bits(3) as u8;
    let seq_level_idx_0 = r.read_bits(5) as u8;
    let seq_tier_0 = r.read_bool();
    let high_bitdepth = r.read_bool();
    let twelve_bit = r.read_bool();
    let monochrome = r.read_bool();
    let chroma_subsampling_x = r.read_bool();
    let chroma_subsampling_y = r.read_bool();
    let chroma_sample_position = r.read_bits(2) as u8;
    r.ignore_bits(3); // reserved
    let delay_present = r.read_bool();
    let initial_presentation_delay = if delay_present { Some(r.read_bits(4) as u8 + 1) } else {
        r.ignore_bits(4);
        None
    };
    r.err()?;

    Ok(Av1Config {
        seq_profile,
        seq_level_idx_0,
        seq_tier_0,
        high_bitdepth,
        twelve_bit,
        monochrome,
        chroma_subsampling_x,
        chroma_subsampling_y,
        chroma_sample_position,
        initial_presentation_delay,
    })
}

#[derive(Debug, Clone, Default)]
pub struct VpxConfig {
    pub profile: u8,
    pub level: u8,
    pub bit_depth: u8,
    pub chroma_subsampling: u8,
    pub video_full_range_flag: bool,
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
    pub codec_initialization_data: Vec<u8>,
}

pub fn decode_vpcc(r: &mut AtomReader<'_>) -> Result<VpxConfig> {
    let profile = r.read_u8()?;
    let level = r.read_u8()?;
    let packed = r.read_u8()?;
    let bit_depth = packed >> 4;
    let chroma_subsampling = (packed >> 1) & 0x7;
    let video_full_range_flag = packed & 0x1 != 0;
    let colour_primaries = r.read_u8()?;
    let transfer_characteristics = r.read_u8()?;
    let matrix_coefficients = r.read_u8()?;
    let codec_init_len = r.read_be_u16()? as usize;
    let codec_initialization_data = r.read_boxed_slice(codec_init_len)?.into_vec();

    Ok(VpxConfig {
        profile,
        level,
        bit_depth,
        chroma_subsampling,
        video_full_range_flag,
        colour_primaries,
        transfer_characteristics,
        matrix_coefficients,
        codec_initialization_data,
    })
}

#[derive(Debug, Clone, Default)]
pub struct DolbyVisionConfig {
    pub dv_version_major: u8,
    pub dv_version_minor: u8,
    pub dv_profile: u8,
    pub dv_level: u8,
    pub rpu_present: bool,
    pub el_present: bool,
    pub bl_present: bool,
    pub dv_bl_signal_compatibility_id: u8,
}

pub fn decode_dovi_config(data: &[u8]) -> Result<DolbyVisionConfig> {
    let mut r = BitReader::new(data);
    let dv_version_major = r.read_bits(8) as u8;
    let dv_version_minor = r.read_bits(8) as u8;
    let dv_profile = r.read_bits(7) as u8;
    let dv_level = r.read_bits(6) as u8;
    let rpu_present = r.read_bool();
    let el_present = r.read_bool();
    let bl_present = r.read_bool();
    let dv_bl_signal_compatibility_id = r.read_bits(4) as u8;
    r.err()?;

    Ok(DolbyVisionConfig {
        dv_version_major,
        dv_version_minor,
        dv_profile,
        dv_level,
        rpu_present,
        el_present,
        bl_present,
        dv_bl_signal_compatibility_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aac_lc_stereo_48k() {
        // audio_object_type=2 (LC), frequency_index=3 (48000), channel_configuration=2 (stereo).
        let cfg = decode_aac_specific_config(&[0b0001_0011, 0b1000_0000]).unwrap();
        assert_eq!(cfg.audio_object_type, 2);
        assert_eq!(cfg.sample_rate, 48000);
        assert_eq!(cfg.channel_count, 2);
    }

    #[test]
    fn ac3_channel_count_from_acmod() {
        // fscod=0(48000), bsid=8, bsmod=0, acmod=2(stereo), no extra mix fields for acmod==2,
        // dsurmod 2 bits, lfeon=0, bit_rate_code arbitrary.
        let cfg = decode_ac3_config(&[0b0000_1000, 0b0101_0000]).unwrap();
        assert_eq!(cfg.sample_rate, 48000);
        assert_eq!(cfg.acmod, 2);
    }

    #[test]
    fn avcc_rejects_reserved_length_size() {
        let buf = [1u8, 0x64, 0x00, 0x1f, 0x02, 0x00];
        let reader = AtomReader::new(&buf);
        let mut r = reader;
        assert!(decode_avcc(&mut r).is_err());
    }
}
