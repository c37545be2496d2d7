// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The structured description of a movie this crate produces (see data model).

use std::collections::HashMap;

use crate::fourcc::FourCc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
    Subtitle,
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct Ftyp {
    pub major_brand: Option<FourCc>,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCc>,
}

impl Ftyp {
    pub fn is_quicktime(&self) -> bool {
        self.compatible_brands.iter().any(|b| *b == FourCc::from_str("qt  "))
    }
}

#[derive(Debug, Clone)]
pub struct EditListEntry {
    pub segment_duration: u64,
    pub media_time: i64,
    pub media_rate: crate::fp::FpI16,
}

#[derive(Debug, Clone, Default)]
pub struct EditList {
    pub entries: Vec<EditListEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct SttsTable {
    pub sample_count: Vec<u32>,
    pub sample_delta: Vec<u32>,
}

impl SttsTable {
    pub fn total_samples(&self) -> u64 {
        self.sample_count.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn total_duration(&self) -> u64 {
        self.sample_count.iter().zip(&self.sample_delta).map(|(&c, &d)| u64::from(c) * u64::from(d)).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CttsTable {
    pub sample_count: Vec<u32>,
    pub sample_offset: Vec<i64>,
}

impl CttsTable {
    pub fn total_samples(&self) -> u64 {
        self.sample_count.iter().map(|&c| u64::from(c)).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cslg {
    pub composition_to_dts_shift: i64,
    pub least_decode_to_display_delta: i64,
    pub greatest_decode_to_display_delta: i64,
    pub composition_start_time: i64,
    pub composition_end_time: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct StscEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

#[derive(Debug, Clone, Default)]
pub struct StscTable {
    pub entries: Vec<StscEntry>,
}

#[derive(Debug, Clone)]
pub enum SampleSizeTable {
    Constant { size: u32, count: u32 },
    Variable(Vec<u32>),
}

impl Default for SampleSizeTable {
    fn default() -> Self {
        SampleSizeTable::Constant { size: 0, count: 0 }
    }
}

impl SampleSizeTable {
    pub fn sample_count(&self) -> u32 {
        match self {
            SampleSizeTable::Constant { count, .. } => *count,
            SampleSizeTable::Variable(v) => v.len() as u32,
        }
    }

    pub fn size_of(&self, index: usize) -> Option<u32> {
        match self {
            SampleSizeTable::Constant { size, count } => {
                if (index as u32) < *count {
                    Some(*size)
                } else {
                    None
                }
            }
            SampleSizeTable::Variable(v) => v.get(index).copied(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ChunkOffsetTable {
    Stco(Vec<u32>),
    Co64(Vec<u64>),
}

impl Default for ChunkOffsetTable {
    fn default() -> Self {
        ChunkOffsetTable::Stco(Vec::new())
    }
}

impl ChunkOffsetTable {
    pub fn get(&self, idx: usize) -> Option<u64> {
        match self {
            ChunkOffsetTable::Stco(v) => v.get(idx).map(|&o| u64::from(o)),
            ChunkOffsetTable::Co64(v) => v.get(idx).copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChunkOffsetTable::Stco(v) => v.len(),
            ChunkOffsetTable::Co64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SampleDependency {
    pub is_leading: u8,
    pub depends_on: u8,
    pub is_depended_on: u8,
    pub has_redundancy: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct SubsampleEntry {
    pub bytes_clear: u32,
    pub bytes_encrypted: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SubsSampleEntry {
    pub sample_delta: u32,
    pub subsamples: Vec<SubsampleEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct SampleGroupEntry {
    pub sample_count: u32,
    pub group_description_index: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SampleToGroup {
    pub grouping_type: FourCc,
    pub entries: Vec<SampleGroupEntry>,
}

#[derive(Debug, Clone)]
pub struct CencSeigEntry {
    pub crypt_byte_block: u8,
    pub skip_byte_block: u8,
    pub is_protected: u8,
    pub per_sample_iv_size: u8,
    pub kid: [u8; 16],
    pub constant_iv: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct SampleGroupDescription {
    pub grouping_type: FourCc,
    pub seig_entries: Vec<CencSeigEntry>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaioEntry {
    pub offset: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Saio {
    pub entries: Vec<SaioEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Saiz {
    pub default_sample_info_size: u8,
    pub sample_info_sizes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct SencSample {
    pub iv: Vec<u8>,
    pub subsamples: Vec<SubsampleEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Senc {
    pub samples: Vec<SencSample>,
}

#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    pub stts: SttsTable,
    pub ctts: Option<CttsTable>,
    pub cslg: Option<Cslg>,
    pub stsc: StscTable,
    pub stsz: SampleSizeTable,
    pub stco: ChunkOffsetTable,
    pub stss: Option<Vec<u32>>,
    pub stsh: Vec<(u32, u32)>,
    pub sdtp: Vec<SampleDependency>,
    pub subs: Vec<SubsSampleEntry>,
    pub sbgp: Vec<SampleToGroup>,
    pub sgpd: Vec<SampleGroupDescription>,
    pub saio: Option<Saio>,
    pub saiz: Option<Saiz>,
    pub senc: Option<Senc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectionInfo {
    pub data_format: FourCc,
    pub scheme_type: FourCc,
    pub scheme_version: u32,
    pub tenc_version: u8,
    pub default_crypt_byte_block: u8,
    pub default_skip_byte_block: u8,
    pub default_is_protected: u8,
    pub default_per_sample_iv_size: u8,
    pub default_kid: [u8; 16],
    pub default_constant_iv: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct Pssh {
    pub system_id: [u8; 16],
    pub key_ids: Vec<[u8; 16]>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct AudioSampleEntry {
    pub channel_count: u16,
    pub sample_size: u16,
    pub sample_rate: f64,
    pub quicktime_version: u16,
    pub descriptor_raw: HashMap<FourCc, Vec<u8>>,
    pub descriptor: HashMap<FourCc, crate::sample_entry::codec::AudioCodecConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct ColourInfo {
    pub colour_type: FourCc,
    pub colour_primaries: Option<u16>,
    pub transfer_characteristics: Option<u16>,
    pub matrix_coefficients: Option<u16>,
    pub full_range: bool,
    pub icc_profile: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PixelAspectRatio {
    pub h_spacing: u32,
    pub v_spacing: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanAperture {
    pub width_n: i32,
    pub width_d: i32,
    pub height_n: i32,
    pub height_d: i32,
    pub horiz_offset_n: i32,
    pub horiz_offset_d: i32,
    pub vert_offset_n: i32,
    pub vert_offset_d: i32,
}

#[derive(Debug, Clone, Default)]
pub struct VideoSampleEntry {
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub colour: Option<ColourInfo>,
    pub pixel_aspect: Option<PixelAspectRatio>,
    pub clean_aperture: Option<CleanAperture>,
    pub config_raw: HashMap<FourCc, Vec<u8>>,
    pub config: HashMap<FourCc, crate::sample_entry::codec::VideoCodecConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct Track {
    pub track_id: u32,
    pub kind: TrackKind,
    pub enabled: bool,
    pub in_movie: bool,
    pub in_preview: bool,
    pub size_is_aspect_ratio: bool,
    pub creation_time: u64,
    pub modification_time: u64,
    pub duration: u64,
    pub time_scale: u32,
    pub language: u16,
    pub extended_language: Option<String>,
    pub tkhd_width: crate::fp::FpU16,
    pub tkhd_height: crate::fp::FpU16,
    pub channel_count: u16,
    pub sample_rate: f64,
    pub sample_size: u16,
    pub width: u16,
    pub height: u16,
    pub format: FourCc,
    pub encrypted: bool,
    pub protection: Vec<ProtectionInfo>,
    pub audio_entry: Option<AudioSampleEntry>,
    pub video_entry: Option<VideoSampleEntry>,
    pub edts: Option<EditList>,
    pub sample_table: SampleTable,
}

impl Default for TrackKind {
    fn default() -> Self {
        TrackKind::Unknown
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrexEntry {
    pub track_id: u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct SidxReference {
    pub reference_type: bool,
    pub referenced_size: u32,
    pub subsegment_duration: u32,
    pub starts_with_sap: bool,
    pub sap_type: u8,
    pub sap_delta_time: u32,
}

#[derive(Debug, Clone)]
pub struct Sidx {
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u64,
    pub references: Vec<SidxReference>,
}

#[derive(Debug, Clone, Copy)]
pub struct SsixRange {
    pub level: u8,
    pub range_size: u32,
}

#[derive(Debug, Clone)]
pub struct Ssix {
    pub subsegments: Vec<Vec<SsixRange>>,
}

#[derive(Debug, Clone, Default)]
pub struct MovieInfo {
    pub top_level_kind: &'static str,
    pub ftyp: Ftyp,
    pub creation_time: u64,
    pub modification_time: u64,
    pub time_scale: u32,
    pub duration: u64,
    pub tracks: Vec<Track>,
    pub trex: Vec<TrexEntry>,
    pub pssh: Vec<Pssh>,
    pub sidx: Vec<Sidx>,
    #[allow(clippy::type_complexity)]
    pub ssix: Vec<Ssix>,
    pub has_fragments: bool,
}

impl MovieInfo {
    pub fn trex_for(&self, track_id: u32) -> Option<&TrexEntry> {
        self.trex.iter().find(|t| t.track_id == track_id)
    }

    pub fn track_by_id(&self, track_id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.track_id == track_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrunSample {
    pub duration: Option<u32>,
    pub size: Option<u32>,
    pub flags: Option<u32>,
    pub composition_time_offset: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct Trun {
    pub data_offset: Option<i32>,
    pub first_sample_flags: Option<u32>,
    pub samples: Vec<TrunSample>,
}

#[derive(Debug, Clone, Default)]
pub struct Tfhd {
    pub track_id: u32,
    pub base_data_offset: Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration: Option<u32>,
    pub default_sample_size: Option<u32>,
    pub default_sample_flags: Option<u32>,
    pub duration_is_empty: bool,
    pub default_base_is_moof: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrackFragment {
    pub tfhd: Tfhd,
    pub base_media_decode_time: Option<u64>,
    pub truns: Vec<Trun>,
    pub saio: Option<Saio>,
    pub saiz: Option<Saiz>,
    pub sbgp: Vec<SampleToGroup>,
    pub sgpd: Vec<SampleGroupDescription>,
    pub senc: Option<Senc>,
}

#[derive(Debug, Clone, Default)]
pub struct MovieFragment {
    pub sequence_number: u32,
    pub fragments: Vec<TrackFragment>,
}

/// One entry of a track's packet list: where a sample lives and when it is decoded/presented.
#[derive(Debug, Clone, Copy, Default)]
pub struct Packet {
    pub dts: u64,
    pub pts: i64,
    pub size: u32,
    pub file_offset: u64,
    pub sample_description_index: u32,
}
