// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-point helpers used by timed/geometry fields (`mvhd`/`tkhd`/`elst`/`pasp` and friends).

/// An unsigned 16.16-bit fixed point value.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FpU16(u32);

impl FpU16 {
    pub fn new(val: u16) -> Self {
        Self(u32::from(val) << 16)
    }

    pub fn parse_raw(val: u32) -> Self {
        Self(val)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<FpU16> for f64 {
    fn from(fp: FpU16) -> Self {
        f64::from(fp.0) / f64::from(1u32 << 16)
    }
}

/// A signed 16.16-bit fixed point value (used for `elst.media_rate`).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FpI16(i32);

impl FpI16 {
    pub fn parse_raw(val: i32) -> Self {
        Self(val)
    }

    /// Compose from the signed 16-bit integer part and unsigned 16-bit fraction, as `elst` stores
    /// `media_rate`: integer part and fraction are two separate fields on the wire.
    pub fn from_parts(integer: i16, fraction: u16) -> Self {
        Self((i32::from(integer) << 16) | i32::from(fraction))
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl From<FpI16> for f64 {
    fn from(fp: FpI16) -> Self {
        f64::from(fp.0) / f64::from(1i32 << 16)
    }
}

/// An unsigned 8.8-bit fixed point value.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FpU8(u16);

impl FpU8 {
    pub fn new(val: u8) -> Self {
        Self(u16::from(val) << 8)
    }

    pub fn parse_raw(val: u16) -> Self {
        Self(val)
    }
}

impl From<FpU8> for f64 {
    fn from(fp: FpU8) -> Self {
        f64::from(fp.0) / f64::from(1u16 << 8)
    }
}
