// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The closed error taxonomy used throughout the parser (see design notes on recovery policy).

use std::fmt;

/// All errors the parser can produce.
#[derive(Debug)]
pub enum Mp4Error {
    /// The buffer/source has fewer bytes than the current atom requires.
    NoEnoughData,
    /// An atom's declared size is inconsistent with its container, or a required field is
    /// truncated.
    BadAtom(&'static str),
    /// A cursor move would leave the body bounds.
    OutOfRange,
    /// An audio/video sample entry uses a variant this parser does not understand.
    UnsupportedSampleEntry(&'static str),
    /// `schm.scheme_type` is outside the CENC family.
    UnsupportedEncryptionScheme,
    /// `senc` IV size could not be resolved to 8 or 16 bytes.
    InvalidIVSize,
    /// `sbgp`/`sgpd` grouping type this parser does not decode.
    UnsupportedSampleGroupType,
    /// `sgpd` entry length disagrees with its declared default length.
    InvalidSampleGroupLength,
    /// A required nested atom is absent.
    AtomNotFound(&'static str),
    /// The stream has no recognizable top-level atom at its start.
    InvalidMP4Format,
    /// Wraps the underlying I/O error from the byte source.
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Mp4Error>;

impl fmt::Display for Mp4Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mp4Error::NoEnoughData => write!(f, "not enough data"),
            Mp4Error::BadAtom(msg) => write!(f, "bad atom: {msg}"),
            Mp4Error::OutOfRange => write!(f, "cursor move out of range"),
            Mp4Error::UnsupportedSampleEntry(msg) => write!(f, "unsupported sample entry: {msg}"),
            Mp4Error::UnsupportedEncryptionScheme => write!(f, "unsupported encryption scheme"),
            Mp4Error::InvalidIVSize => write!(f, "invalid iv size"),
            Mp4Error::UnsupportedSampleGroupType => write!(f, "unsupported sample group type"),
            Mp4Error::InvalidSampleGroupLength => write!(f, "invalid sample group description length"),
            Mp4Error::AtomNotFound(kind) => write!(f, "required atom not found: {kind}"),
            Mp4Error::InvalidMP4Format => write!(f, "not a recognizable mp4 stream"),
            Mp4Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Mp4Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Mp4Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Mp4Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Mp4Error::NoEnoughData,
            _ => Mp4Error::Io(err),
        }
    }
}

pub fn no_enough_data<T>() -> Result<T> {
    Err(Mp4Error::NoEnoughData)
}

pub fn bad_atom<T>(msg: &'static str) -> Result<T> {
    Err(Mp4Error::BadAtom(msg))
}

pub fn out_of_range<T>() -> Result<T> {
    Err(Mp4Error::OutOfRange)
}

pub fn unsupported_sample_entry<T>(msg: &'static str) -> Result<T> {
    Err(Mp4Error::UnsupportedSampleEntry(msg))
}

pub fn unsupported_encryption_scheme<T>() -> Result<T> {
    Err(Mp4Error::UnsupportedEncryptionScheme)
}

pub fn invalid_iv_size<T>() -> Result<T> {
    Err(Mp4Error::InvalidIVSize)
}

pub fn unsupported_sample_group_type<T>() -> Result<T> {
    Err(Mp4Error::UnsupportedSampleGroupType)
}

pub fn invalid_sample_group_length<T>() -> Result<T> {
    Err(Mp4Error::InvalidSampleGroupLength)
}

pub fn atom_not_found<T>(kind: &'static str) -> Result<T> {
    Err(Mp4Error::AtomNotFound(kind))
}

pub fn invalid_format<T>() -> Result<T> {
    Err(Mp4Error::InvalidMP4Format)
}
