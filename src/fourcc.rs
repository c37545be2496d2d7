// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FourCC: a 32-bit big-endian tag equal to four ASCII bytes.

use std::fmt;

#[derive(Default, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FourCc {
    val: [u8; 4],
}

impl FourCc {
    pub const fn new(val: [u8; 4]) -> Self {
        Self { val }
    }

    pub const fn bytes(&self) -> [u8; 4] {
        self.val
    }

    /// Construct a FourCC from a 4-byte ASCII string literal known at call sites, e.g. `FourCc::from_str("moov")`.
    pub fn from_str(s: &str) -> Self {
        let b = s.as_bytes();
        let mut val = [0u8; 4];
        val[..b.len().min(4)].copy_from_slice(&b[..b.len().min(4)]);
        Self { val }
    }
}

impl From<u32> for FourCc {
    fn from(v: u32) -> Self {
        Self { val: v.to_be_bytes() }
    }
}

impl From<FourCc> for u32 {
    fn from(f: FourCc) -> Self {
        u32::from_be_bytes(f.val)
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.val) {
            Ok(name) if name.chars().all(|c| !c.is_control()) => f.write_str(name),
            _ => write!(f, "{:x?}", self.val),
        }
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

macro_rules! fourcc_consts {
    ($($name:ident => $lit:expr),* $(,)?) => {
        $(pub const $name: FourCc = FourCc::new(*$lit);)*
    };
}

fourcc_consts! {
    FTYP => b"ftyp", STYP => b"styp", MOOV => b"moov", MOOF => b"moof",
    MVHD => b"mvhd", MVEX => b"mvex", MEHD => b"mehd", TREX => b"trex",
    TRAK => b"trak", TKHD => b"tkhd", EDTS => b"edts", ELST => b"elst",
    MDIA => b"mdia", MDHD => b"mdhd", HDLR => b"hdlr", ELNG => b"elng",
    MINF => b"minf", STBL => b"stbl", VMHD => b"vmhd", SMHD => b"smhd",
    HMHD => b"hmhd", NMHD => b"nmhd", DINF => b"dinf",
    STSD => b"stsd", STTS => b"stts", CTTS => b"ctts", CSLG => b"cslg",
    STSC => b"stsc", STSZ => b"stsz", STZ2 => b"stz2", STCO => b"stco",
    CO64 => b"co64", STSS => b"stss", STSH => b"stsh", SDTP => b"sdtp",
    PADB => b"padb", STDP => b"stdp", SBGP => b"sbgp", SGPD => b"sgpd",
    SUBS => b"subs", SAIO => b"saio", SAIZ => b"saiz", SENC => b"senc",
    MFHD => b"mfhd", TRAF => b"traf", TFHD => b"tfhd", TFDT => b"tfdt",
    TRUN => b"trun",
    SINF => b"sinf", FRMA => b"frma", SCHM => b"schm", SCHI => b"schi",
    TENC => b"tenc", PSSH => b"pssh",
    SIDX => b"sidx", SSIX => b"ssix", MDAT => b"mdat", FREE => b"free",
    SKIP => b"skip", PDIN => b"pdin", PRFT => b"prft", META => b"meta",
    MFRA => b"mfra",
    ESDS => b"esds", DOPS => b"dOps", DFLA => b"dfLa", ALAC => b"alac",
    DAC3 => b"dac3", DEC3 => b"dec3", DDTS => b"ddts", DAC4 => b"dac4",
    DMLP => b"dmlp",
    AVCC => b"avcC", HVCC => b"hvcC", AV1C => b"av1C", VPCC => b"vpcC",
    DVCC => b"dvcC", DVVC => b"dvvC", COLR => b"colr", PASP => b"pasp",
    CLAP => b"clap",
    ENCA => b"enca", ENCV => b"encv",
    MP4A => b"mp4a", OPUS => b"Opus", AC_3 => b"ac-3", EC_3 => b"ec-3",
    AVC1 => b"avc1", AVC3 => b"avc3", HEV1 => b"hev1", HVC1 => b"hvc1",
    VP08 => b"vp08", VP09 => b"vp09",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_prints_ascii() {
        assert_eq!(format!("{:?}", FourCc::from_str("moov")), "moov");
    }

    #[test]
    fn round_trips_through_u32() {
        let fourcc = FourCc::from_str("trak");
        let raw: u32 = fourcc.into();
        assert_eq!(FourCc::from(raw), fourcc);
    }
}
