// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `sidx` (segment index) and `ssix` (sub-segment index), ISO/IEC 14496-12 §8.16.3-4.

use log::debug;

use crate::atom::AtomReader;
use crate::error::Result;
use crate::model::{Sidx, SidxReference, Ssix, SsixRange};

pub fn decode_sidx(r: &mut AtomReader<'_>) -> Result<Sidx> {
    let (version, _flags) = r.read_version_flags()?;
    let reference_id = r.read_be_u32()?;
    let timescale = r.read_be_u32()?;

    let (earliest_presentation_time, first_offset) = if version == 0 {
        (u64::from(r.read_be_u32()?), u64::from(r.read_be_u32()?))
    } else {
        (r.read_be_u64()?, r.read_be_u64()?)
    };

    r.ignore_bytes(2)?; // reserved
    let reference_count = r.read_be_u16()?;

    let mut references = Vec::with_capacity(reference_count as usize);
    for _ in 0..reference_count {
        let packed = r.read_be_u32()?;
        let reference_type = packed & 0x8000_0000 != 0;
        let referenced_size = packed & 0x7fff_ffff;
        let subsegment_duration = r.read_be_u32()?;
        let packed2 = r.read_be_u32()?;
        if reference_type {
            debug!("sidx reference points at another sidx rather than media");
        }
        references.push(SidxReference {
            reference_type,
            referenced_size,
            subsegment_duration,
            starts_with_sap: packed2 & 0x8000_0000 != 0,
            sap_type: ((packed2 >> 28) & 0x7) as u8,
            sap_delta_time: packed2 & 0x0fff_ffff,
        });
    }

    Ok(Sidx { reference_id, timescale, earliest_presentation_time, first_offset, references })
}

pub fn decode_ssix(r: &mut AtomReader<'_>) -> Result<Ssix> {
    let _ = r.read_version_flags()?;
    let subsegment_count = r.read_be_u32()?;

    let mut subsegments = Vec::with_capacity(subsegment_count as usize);
    for _ in 0..subsegment_count {
        let ranges_count = r.read_be_u32()?;
        let mut ranges = Vec::with_capacity(ranges_count as usize);
        for _ in 0..ranges_count {
            let packed = r.read_be_u32()?;
            ranges.push(SsixRange { level: (packed >> 24) as u8, range_size: packed & 0x00ff_ffff });
        }
        subsegments.push(ranges);
    }

    Ok(Ssix { subsegments })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_one_reference() {
        let mut buf = vec![0, 0, 0, 0]; // version/flags
        buf.extend_from_slice(&7u32.to_be_bytes()); // reference_id
        buf.extend_from_slice(&1000u32.to_be_bytes()); // timescale
        buf.extend_from_slice(&0u32.to_be_bytes()); // earliest_presentation_time
        buf.extend_from_slice(&0u32.to_be_bytes()); // first_offset
        buf.extend_from_slice(&[0, 0]); // reserved
        buf.extend_from_slice(&1u16.to_be_bytes()); // reference_count
        buf.extend_from_slice(&0x8000_1234u32.to_be_bytes()); // reference_type=1, referenced_size
        buf.extend_from_slice(&5000u32.to_be_bytes()); // subsegment_duration
        buf.extend_from_slice(&0x9000_0000u32.to_be_bytes()); // starts_with_sap=1, sap_type=1, delta=0

        let mut r = AtomReader::new(&buf);
        let sidx = decode_sidx(&mut r).unwrap();
        assert_eq!(sidx.reference_id, 7);
        assert_eq!(sidx.references.len(), 1);
        assert!(sidx.references[0].reference_type);
        assert_eq!(sidx.references[0].referenced_size, 0x1234);
        assert_eq!(sidx.references[0].sap_type, 1);
    }
}
