// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A demultiplexing parser for ISOBMFF / fMP4, CMAF and DASH segment streams.
//!
//! This crate parses the *container* — tracks, sample tables, fragment metadata, codec
//! configuration records, and Common Encryption protection info — from a byte source. It does not
//! decode sample payloads; see [`toplevel::parse`] for the entry point and [`packet`] for turning
//! a decoded [`model::Track`] into a concrete per-sample packet list.

pub mod atom;
pub mod bitreader;
pub mod cenc;
pub mod error;
pub mod fourcc;
pub mod fp;
pub mod fragment;
pub mod model;
pub mod moov;
pub mod options;
pub mod packet;
pub mod sample_entry;
pub mod sidx;
pub mod stbl;
pub mod stream;
pub mod toplevel;

pub use error::{Mp4Error, Result};
pub use options::ParseOptions;
pub use toplevel::{parse, ParseOutput};
