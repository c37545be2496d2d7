//! End-to-end scenarios exercising the public decode surface: an unfragmented single-track AVC
//! file, a fragmented CMAF segment, a CENC-protected AAC track, `senc` IV-size inference, an Opus
//! sample entry, and an edit-list presentation-time offset.

use std::io::Cursor;

use isomp4_core::atom::AtomReader;
use isomp4_core::fourcc::{self, FourCc};
use isomp4_core::model::*;
use isomp4_core::packet;
use isomp4_core::sample_entry;
use isomp4_core::sample_entry::codec::AudioCodecConfig;
use isomp4_core::stbl;
use isomp4_core::{fragment, parse, ParseOptions};

/// Wraps `body` in a box header: 32-bit big-endian size, then `kind`.
fn bx(kind: &[u8; 4], body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&((8 + body.len()) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend(body);
    out
}

fn descriptor(tag: u8, content: Vec<u8>) -> Vec<u8> {
    assert!(content.len() < 0x80, "test descriptor too large for one-byte length");
    let mut out = vec![tag, content.len() as u8];
    out.extend(content);
    out
}

fn concat(parts: Vec<Vec<u8>>) -> Vec<u8> {
    parts.into_iter().flatten().collect()
}

/// S1: an unfragmented single-track AVC file. `ftyp` + `moov{mvhd, trak{tkhd, mdia{mdhd, hdlr,
/// minf/stbl{stsd/avc1/avcC, stts, stsc, stsz, stco}}}}` + `mdat`.
#[test]
fn unfragmented_avc_track_builds_a_complete_packet_list() {
    let ftyp = bx(
        b"ftyp",
        concat(vec![
            b"isom".to_vec(),
            0x200u32.to_be_bytes().to_vec(),
            b"isom".to_vec(),
            b"iso2".to_vec(),
            b"avc1".to_vec(),
            b"mp41".to_vec(),
        ]),
    );

    let mvhd_body = concat(vec![
        vec![0, 0, 0, 0],                  // version/flags
        0u32.to_be_bytes().to_vec(),       // creation_time
        0u32.to_be_bytes().to_vec(),       // modification_time
        600u32.to_be_bytes().to_vec(),     // time_scale
        60000u32.to_be_bytes().to_vec(),   // duration
        0x0001_0000u32.to_be_bytes().to_vec(), // rate
        vec![0x01, 0x00],                  // volume
        vec![0; 10],                       // reserved
        vec![0; 36],                       // matrix
        vec![0; 24],                       // pre_defined
        2u32.to_be_bytes().to_vec(),       // next_track_id
    ]);
    let mvhd = bx(b"mvhd", mvhd_body);

    let tkhd_body = concat(vec![
        vec![0, 0, 0, 0x7],                // version/flags: enabled|in_movie|in_preview
        0u32.to_be_bytes().to_vec(),       // creation_time
        0u32.to_be_bytes().to_vec(),       // modification_time
        1u32.to_be_bytes().to_vec(),       // track_id
        vec![0; 4],                        // reserved
        60000u32.to_be_bytes().to_vec(),   // duration
        vec![0; 8],                        // reserved[2]
        vec![0; 2],                        // layer
        vec![0; 2],                        // alternate_group
        vec![0; 2],                        // volume
        vec![0; 2],                        // reserved
        vec![0; 36],                       // matrix
        (1280u32 << 16).to_be_bytes().to_vec(), // width
        (720u32 << 16).to_be_bytes().to_vec(),  // height
    ]);
    let tkhd = bx(b"tkhd", tkhd_body);

    let mdhd_body = concat(vec![
        vec![0, 0, 0, 0],                   // version/flags
        0u32.to_be_bytes().to_vec(),        // creation_time
        0u32.to_be_bytes().to_vec(),        // modification_time
        30000u32.to_be_bytes().to_vec(),    // time_scale
        3_000_000u32.to_be_bytes().to_vec(),// duration
        0u16.to_be_bytes().to_vec(),        // language + pad
        vec![0; 2],                         // pre_defined
    ]);
    let mdhd = bx(b"mdhd", mdhd_body);

    let hdlr_body = concat(vec![
        vec![0, 0, 0, 0], // version/flags
        vec![0; 4],       // pre_defined
        b"vide".to_vec(), // handler_type
        vec![0; 12],      // reserved[3]
    ]);
    let hdlr = bx(b"hdlr", hdlr_body);

    let sps = vec![0x67, 0x64, 0x00, 0x1f];
    let pps = vec![0x68, 0xce];
    let avcc_body = concat(vec![
        vec![1],       // configuration_version
        vec![0x64],    // profile
        vec![0x00],    // compatibility
        vec![0x1f],    // level
        vec![0xff],    // length_size_minus_one = 3, reserved bits set
        vec![0xe1],    // num_sps = 1, reserved bits set
        (sps.len() as u16).to_be_bytes().to_vec(),
        sps,
        vec![1], // num_pps
        (pps.len() as u16).to_be_bytes().to_vec(),
        pps,
    ]);
    let avcc = bx(b"avcC", avcc_body);

    let avc1_body = concat(vec![
        vec![0; 6],                    // reserved
        1u16.to_be_bytes().to_vec(),   // data_reference_index
        vec![0; 16],                   // reserved
        1280u16.to_be_bytes().to_vec(),// width
        720u16.to_be_bytes().to_vec(), // height
        0x0048_0000u32.to_be_bytes().to_vec(), // horiz resolution
        0x0048_0000u32.to_be_bytes().to_vec(), // vert resolution
        vec![0; 4],                    // reserved
        1u16.to_be_bytes().to_vec(),   // frame_count
        vec![0; 32],                   // compressorname
        0x0018u16.to_be_bytes().to_vec(), // depth
        0xffffu16.to_be_bytes().to_vec(), // pre_defined
        avcc,
    ]);
    let avc1 = bx(b"avc1", avc1_body);

    let stsd_body = concat(vec![vec![0, 0, 0, 0], 1u32.to_be_bytes().to_vec(), avc1]);
    let stsd = bx(b"stsd", stsd_body);

    let stts_body = concat(vec![
        vec![0, 0, 0, 0],
        1u32.to_be_bytes().to_vec(),
        100u32.to_be_bytes().to_vec(),
        30000u32.to_be_bytes().to_vec(),
    ]);
    let stts = bx(b"stts", stts_body);

    let stsc_body = concat(vec![
        vec![0, 0, 0, 0],
        1u32.to_be_bytes().to_vec(),
        1u32.to_be_bytes().to_vec(),  // first_chunk
        10u32.to_be_bytes().to_vec(), // samples_per_chunk
        1u32.to_be_bytes().to_vec(),  // sample_description_index
    ]);
    let stsc = bx(b"stsc", stsc_body);

    let stsz_body =
        concat(vec![vec![0, 0, 0, 0], 1000u32.to_be_bytes().to_vec(), 100u32.to_be_bytes().to_vec()]);
    let stsz = bx(b"stsz", stsz_body);

    let chunk_offsets: Vec<u32> = (0..10).map(|i| 2000 + i * 10000).collect();
    let mut stco_body = concat(vec![vec![0, 0, 0, 0], 10u32.to_be_bytes().to_vec()]);
    for off in &chunk_offsets {
        stco_body.extend(off.to_be_bytes());
    }
    let stco = bx(b"stco", stco_body);

    let stbl = bx(b"stbl", concat(vec![stsd, stts, stsc, stsz, stco]));

    let vmhd_body = concat(vec![vec![0, 0, 0, 1], vec![0; 2], vec![0; 6]]);
    let vmhd = bx(b"vmhd", vmhd_body);
    let minf = bx(b"minf", concat(vec![vmhd, stbl]));

    let mdia = bx(b"mdia", concat(vec![mdhd, hdlr, minf]));
    let trak = bx(b"trak", concat(vec![tkhd, mdia]));
    let moov = bx(b"moov", concat(vec![mvhd, trak]));
    let mdat = bx(b"mdat", vec![0u8; 16]);

    let file = concat(vec![ftyp, moov, mdat]);
    let output = parse(Cursor::new(file), &ParseOptions::default()).unwrap();

    let movie = output.movie.expect("moov should decode");
    assert_eq!(movie.time_scale, 600);
    assert_eq!(movie.tracks.len(), 1);

    let track = &movie.tracks[0];
    assert_eq!(track.track_id, 1);
    assert_eq!(track.kind, TrackKind::Video);
    assert_eq!(track.width, 1280);
    assert_eq!(track.height, 720);
    assert_eq!(track.format, fourcc::AVC1);
    assert!(!track.encrypted);

    let avc = match track.video_entry.as_ref().unwrap().config.get(&fourcc::AVCC) {
        Some(isomp4_core::sample_entry::codec::VideoCodecConfig::Avc(cfg)) => cfg,
        other => panic!("expected an AVC config, got {other:?}"),
    };
    assert_eq!(avc.sps.len(), 1);
    assert_eq!(avc.pps.len(), 1);

    let packets = packet::build_packet_list(track, movie.time_scale).unwrap();
    assert_eq!(packets.len(), 100);
    for (k, p) in packets.iter().enumerate() {
        assert_eq!(p.dts, k as u64 * 30000);
        assert_eq!(p.pts, p.dts as i64);
        assert_eq!(p.size, 1000);
        assert_eq!(p.file_offset, u64::from(chunk_offsets[k / 10]) + (k % 10) as u64 * 1000);
    }
}

/// S2: a fragmented CMAF-style `traf`: `tfhd` defaults for duration/size, `tfdt` base decode time,
/// and a `trun` that supplies per-sample sizes and composition-time offsets but leaves duration to
/// the `tfhd` default. Exercises the trun → tfhd → trex resolution order end to end.
#[test]
fn fragment_traf_resolves_defaults_and_builds_packets() {
    let mfhd = bx(b"mfhd", concat(vec![vec![0, 0, 0, 0], 42u32.to_be_bytes().to_vec()]));

    // default_sample_duration_present | default_sample_size_present
    let tfhd_flags: u32 = 0x8 | 0x10;
    let tfhd_body = concat(vec![
        vec![0, (tfhd_flags >> 16) as u8, (tfhd_flags >> 8) as u8, tfhd_flags as u8],
        1u32.to_be_bytes().to_vec(), // track_id
        1024u32.to_be_bytes().to_vec(), // default_sample_duration
        500u32.to_be_bytes().to_vec(),  // default_sample_size
    ]);
    let tfhd = bx(b"tfhd", tfhd_body);

    let tfdt_body = concat(vec![vec![1, 0, 0, 0], 9216u64.to_be_bytes().to_vec()]);
    let tfdt = bx(b"tfdt", tfdt_body);

    // data_offset_present | sample_size_present | sample_composition_time_offsets_present
    let trun_flags: u32 = 0x1 | 0x200 | 0x800;
    let samples: [(u32, i32); 3] = [(500, 0), (480, 1024), (520, -512)];
    let mut trun_body = concat(vec![
        vec![1, (trun_flags >> 16) as u8, (trun_flags >> 8) as u8, trun_flags as u8],
        (samples.len() as u32).to_be_bytes().to_vec(),
        136i32.to_be_bytes().to_vec(), // data_offset
    ]);
    for (size, offset) in samples {
        trun_body.extend(size.to_be_bytes());
        trun_body.extend(offset.to_be_bytes());
    }
    let trun = bx(b"trun", trun_body);

    let traf = bx(b"traf", concat(vec![tfhd, tfdt, trun]));
    let moof_body = concat(vec![mfhd, traf]);

    let mut r = AtomReader::new(&moof_body);
    let movie_fragment = fragment::decode_moof(&mut r, &|_| None, false).unwrap();
    assert_eq!(movie_fragment.sequence_number, 42);
    assert_eq!(movie_fragment.fragments.len(), 1);

    let frag = &movie_fragment.fragments[0];
    let packets = packet::build_fragment_packet_list(frag, 0, None).unwrap();
    assert_eq!(packets.len(), 3);

    assert_eq!((packets[0].dts, packets[0].pts, packets[0].size), (9216, 9216, 500));
    assert_eq!((packets[1].dts, packets[1].pts, packets[1].size), (10240, 11264, 480));
    assert_eq!((packets[2].dts, packets[2].pts, packets[2].size), (11264, 10752, 520));

    assert_eq!(packets[0].file_offset, 136);
    assert_eq!(packets[1].file_offset, 136 + 500);
    assert_eq!(packets[2].file_offset, 136 + 500 + 480);
}

/// S3: a CENC-protected AAC track — an `enca` sample entry wrapping `esds` (AAC-LC, 48 kHz,
/// stereo) and `sinf{frma("mp4a"), schm("cenc"), schi/tenc(iv_size=8, kid=0xAA*16)}`.
#[test]
fn cenc_protected_aac_sample_entry_decodes_codec_and_protection() {
    // AudioSpecificConfig: audio_object_type=2 (LC), frequency_index=3 (48000), channel_config=2.
    let dsi = descriptor(0x05, vec![0b0001_0011, 0b1000_0000]);
    let mut dcd_content = vec![0x40, 0x15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    dcd_content.extend(dsi);
    let dcd = descriptor(0x04, dcd_content);
    let mut esd_content = vec![0, 0, 0x00];
    esd_content.extend(dcd);
    let esd = descriptor(0x03, esd_content);
    let mut esds_body = vec![0, 0, 0, 0];
    esds_body.extend(esd);
    let esds = bx(b"esds", esds_body);

    let frma = bx(b"frma", b"mp4a".to_vec());
    let schm_body = concat(vec![vec![0, 0, 0, 0], b"cenc".to_vec(), 0x0001_0000u32.to_be_bytes().to_vec()]);
    let schm = bx(b"schm", schm_body);
    let tenc_body = concat(vec![
        vec![0, 0, 0, 0], // version/flags (version 0)
        vec![0],          // reserved
        vec![0],          // reserved
        vec![1],          // default_is_protected
        vec![8],          // default_per_sample_iv_size
        vec![0xAAu8; 16], // default_kid
    ]);
    let tenc = bx(b"tenc", tenc_body);
    let schi = bx(b"schi", tenc);
    let sinf = bx(b"sinf", concat(vec![frma, schm, schi]));

    let audio_header = concat(vec![
        vec![0; 6],                   // reserved
        1u16.to_be_bytes().to_vec(),  // data_reference_index
        0u16.to_be_bytes().to_vec(),  // version
        2u16.to_be_bytes().to_vec(),  // channel_count
        16u16.to_be_bytes().to_vec(), // sample_size
        vec![0; 4],                   // compression_id + packet_size
        48000u16.to_be_bytes().to_vec(), // sample_rate (integer part)
        0u16.to_be_bytes().to_vec(),  // sample_rate (fraction, unused)
    ]);
    let enca_body = concat(vec![audio_header, esds, sinf]);

    let mut r = AtomReader::new(&enca_body);
    let (entry, protection) = sample_entry::decode_audio_sample_entry(fourcc::ENCA, &mut r).unwrap();

    assert_eq!(entry.channel_count, 2);
    assert_eq!(entry.sample_rate, 48000.0);

    let protection = protection.expect("enca must carry protection info");
    assert_eq!(protection.data_format, fourcc::MP4A);
    assert_eq!(protection.scheme_type, FourCc::from_str("cenc"));
    assert_eq!(protection.default_per_sample_iv_size, 8);
    assert_eq!(protection.default_kid, [0xAAu8; 16]);

    match entry.descriptor.get(&fourcc::ESDS) {
        Some(AudioCodecConfig::Aac(cfg)) => {
            assert_eq!(cfg.sample_rate, 48000);
            assert_eq!(cfg.channel_count, 2);
        }
        other => panic!("expected an AAC config, got {other:?}"),
    }
}

/// S4: `senc` with no `seig`/`tenc` default available infers the per-sample IV size from the byte
/// budget (32 bytes / 4 samples = 8-byte IVs, no subsample lists).
#[test]
fn senc_infers_iv_size_from_byte_budget() {
    let mut body = concat(vec![vec![0, 0, 0, 0], 4u32.to_be_bytes().to_vec()]);
    for i in 0..4u8 {
        body.extend(vec![i; 8]); // one 8-byte IV per sample
    }

    let mut r = AtomReader::new(&body);
    let senc = stbl::decode_senc(&mut r, None, &[], &[]).unwrap();

    assert_eq!(senc.samples.len(), 4);
    for (i, sample) in senc.samples.iter().enumerate() {
        assert_eq!(sample.iv, vec![i as u8; 8]);
        assert!(sample.subsamples.is_empty());
    }
}

/// A `seig` sample-group override (16-byte IVs) takes priority over a `tenc` default of 8 for the
/// samples its `sbgp` run covers; the remaining sample falls back to the `tenc` default.
#[test]
fn senc_prefers_seig_group_override_over_tenc_default() {
    let sbgp = vec![SampleToGroup {
        grouping_type: FourCc::from_str("seig"),
        entries: vec![
            SampleGroupEntry { sample_count: 2, group_description_index: 1 },
            SampleGroupEntry { sample_count: 1, group_description_index: 0 },
        ],
    }];
    let sgpd = vec![SampleGroupDescription {
        grouping_type: FourCc::from_str("seig"),
        seig_entries: vec![CencSeigEntry {
            crypt_byte_block: 0,
            skip_byte_block: 0,
            is_protected: 1,
            per_sample_iv_size: 16,
            kid: [0xBB; 16],
            constant_iv: None,
        }],
    }];

    let mut body = concat(vec![vec![0, 0, 0, 0], 3u32.to_be_bytes().to_vec()]);
    body.extend(vec![0xAA; 16]); // sample 0: seig override, 16-byte IV
    body.extend(vec![0xBB; 16]); // sample 1: seig override, 16-byte IV
    body.extend(vec![0xCC; 8]); // sample 2: not covered by the run, falls to tenc default

    let mut r = AtomReader::new(&body);
    let senc = stbl::decode_senc(&mut r, Some(8), &sbgp, &sgpd).unwrap();

    assert_eq!(senc.samples.len(), 3);
    assert_eq!(senc.samples[0].iv, vec![0xAA; 16]);
    assert_eq!(senc.samples[1].iv, vec![0xBB; 16]);
    assert_eq!(senc.samples[2].iv, vec![0xCC; 8]);
}

/// S5: an Opus sample entry — `dOps` is 19 bytes on the wire (8-byte box header + an 11-byte
/// identification body with `channel_mapping_family == 0`, so no stream/coupled-count tail).
#[test]
fn opus_sample_entry_decodes_config_and_raw_ident_header() {
    let dops_body = concat(vec![
        vec![0],                          // version
        vec![2],                          // output_channel_count
        312u16.to_be_bytes().to_vec(),    // pre_skip
        48000u32.to_be_bytes().to_vec(),  // input_sample_rate
        0i16.to_be_bytes().to_vec(),      // output_gain
        vec![0],                          // channel_mapping_family
    ]);
    assert_eq!(dops_body.len(), 11);
    let dops = bx(b"dOps", dops_body);
    assert_eq!(dops.len(), 19);

    let audio_header = concat(vec![
        vec![0; 6],
        1u16.to_be_bytes().to_vec(),
        0u16.to_be_bytes().to_vec(),
        2u16.to_be_bytes().to_vec(),  // channel_count
        16u16.to_be_bytes().to_vec(),
        vec![0; 4],
        48000u16.to_be_bytes().to_vec(), // sample_rate
        0u16.to_be_bytes().to_vec(),
    ]);
    let opus_body = concat(vec![audio_header, dops]);

    let mut r = AtomReader::new(&opus_body);
    let (entry, protection) = sample_entry::decode_audio_sample_entry(fourcc::OPUS, &mut r).unwrap();

    assert!(protection.is_none());
    assert_eq!(entry.channel_count, 2);
    assert_eq!(entry.sample_rate, 48000.0);

    match entry.descriptor.get(&fourcc::DOPS) {
        Some(AudioCodecConfig::Opus(cfg)) => {
            assert_eq!(cfg.output_channel_count, 2);
            assert_eq!(cfg.pre_skip, 312);
            assert_eq!(cfg.input_sample_rate, 48000);
        }
        other => panic!("expected an Opus config, got {other:?}"),
    }

    let raw = entry.descriptor_raw.get(&fourcc::DOPS).expect("raw dOps body retained");
    assert!(raw.starts_with(b"OpusHead"));
}

/// S6: a leading empty edit plus a media-time offset. With movie `time_scale = 1000` and track
/// `time_scale = 48000`, the edit list's composition-time offset works out to
/// `512 - (1000 * 48000 / 1000) = -47488`.
#[test]
fn edit_list_leading_empty_edit_shifts_presentation_time() {
    let track = Track {
        time_scale: 48000,
        edts: Some(EditList {
            entries: vec![
                EditListEntry { segment_duration: 1000, media_time: -1, media_rate: isomp4_core::fp::FpI16::from_parts(1, 0) },
                EditListEntry { segment_duration: 29000, media_time: 512, media_rate: isomp4_core::fp::FpI16::from_parts(1, 0) },
            ],
        }),
        sample_table: SampleTable {
            stts: SttsTable { sample_count: vec![1], sample_delta: vec![1000] },
            ctts: Some(CttsTable { sample_count: vec![1], sample_offset: vec![0] }),
            stsc: StscTable { entries: vec![StscEntry { first_chunk: 1, samples_per_chunk: 1, sample_description_index: 1 }] },
            stsz: SampleSizeTable::Constant { size: 10, count: 1 },
            stco: ChunkOffsetTable::Stco(vec![100]),
            ..Default::default()
        },
        ..Default::default()
    };

    let packets = packet::build_packet_list(&track, 1000).unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].dts, 0);
    assert_eq!(packets[0].pts, -47488);
}
