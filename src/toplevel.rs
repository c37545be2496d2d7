// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The movie-scope state machine: walks a byte source atom by atom, classifies each top-level
//! atom, and dispatches to the decoder that owns it.

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::atom::AtomHeader;
use crate::error::{Mp4Error, Result};
use crate::fourcc;
use crate::fragment;
use crate::model::{MovieFragment, MovieInfo, Sidx, Ssix};
use crate::moov;
use crate::options::ParseOptions;
use crate::sidx;
use crate::stream::{self, StreamReader};

/// Everything a full top-level walk accumulates: at most one movie header, zero or more movie
/// fragments (one per `moof`), and the absolute file positions of every `mdat` body encountered
/// (sample payloads themselves are out of this crate's scope; a downstream facade combines these
/// with the sample index to locate bytes).
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub movie: Option<MovieInfo>,
    pub fragments: Vec<MovieFragment>,
    pub mdat_positions: Vec<u64>,
}

/// Walks `source` from its current position to end-of-stream, decoding every recognized
/// movie-scope atom. `ftyp`/`styp`, `sidx` and `ssix` encountered before a `moov` is decoded are
/// buffered and attached to the `MovieInfo` once one exists; if the stream never produces one,
/// they are logged and dropped rather than silently discarded without a trace.
pub fn parse<R: Read + Seek>(source: R, options: &ParseOptions) -> Result<ParseOutput> {
    let mut stream = StreamReader::new(source)?;
    let mut output = ParseOutput::default();

    let mut pending_ftyp = None;
    let mut pending_sidx: Vec<Sidx> = Vec::new();
    let mut pending_ssix: Vec<Ssix> = Vec::new();

    loop {
        let header = match stream.peek_header()? {
            Some(h) => h,
            None => break,
        };

        if header.body_size > options.max_atom_body_size {
            warn!("declared atom body for {:?} ({} bytes) exceeds the configured guard; skipping", header.kind, header.body_size);
            stream.skip_current_atom()?;
            continue;
        }

        match header.kind {
            fourcc::FTYP | fourcc::STYP => {
                let ftyp = decode_body(&mut stream, header, moov::decode_ftyp)?;
                if let Some(ftyp) = ftyp {
                    match &mut output.movie {
                        Some(movie) => movie.ftyp = ftyp,
                        None => pending_ftyp = Some(ftyp),
                    }
                }
            }
            fourcc::MOOV => {
                let permissive = options.permissive;
                if let Some(mut movie) =
                    decode_body(&mut stream, header, |r| moov::decode_moov(r, permissive))?
                {
                    if let Some(ftyp) = pending_ftyp.take() {
                        movie.ftyp = ftyp;
                    }
                    movie.sidx.append(&mut pending_sidx);
                    movie.ssix.append(&mut pending_ssix);
                    output.movie = Some(movie);
                }
            }
            fourcc::MOOF => {
                let iv_sizes: std::collections::HashMap<u32, u8> = output
                    .movie
                    .as_ref()
                    .map(|movie| {
                        movie
                            .tracks
                            .iter()
                            .filter_map(|t| t.protection.first().map(|p| (t.track_id, p.default_per_sample_iv_size)))
                            .collect()
                    })
                    .unwrap_or_default();
                let resolver = move |track_id: u32| iv_sizes.get(&track_id).copied();
                let permissive = options.permissive;
                let fragment =
                    decode_body(&mut stream, header, |r| fragment::decode_moof(r, &resolver, permissive))?;
                if let Some(fragment) = fragment {
                    output.fragments.push(fragment);
                }
            }
            fourcc::SIDX => {
                if let Some(decoded) = decode_body(&mut stream, header, sidx::decode_sidx)? {
                    match &mut output.movie {
                        Some(movie) => movie.sidx.push(decoded),
                        None => pending_sidx.push(decoded),
                    }
                }
            }
            fourcc::SSIX => {
                if let Some(decoded) = decode_body(&mut stream, header, sidx::decode_ssix)? {
                    match &mut output.movie {
                        Some(movie) => movie.ssix.push(decoded),
                        None => pending_ssix.push(decoded),
                    }
                }
            }
            fourcc::MDAT => {
                output.mdat_positions.push(stream.position() + u64::from(header.header_size));
                stream.skip_current_atom()?;
            }
            k if k == fourcc::FREE
                || k == fourcc::SKIP
                || k == fourcc::PDIN
                || k == fourcc::PRFT
                || k == fourcc::META
                || k == fourcc::MFRA =>
            {
                stream.skip_current_atom()?;
            }
            _ => {
                debug!("skipping unrecognized top-level atom {:?}", header.kind);
                stream.skip_current_atom()?;
            }
        }
    }

    if let Some(ftyp) = pending_ftyp {
        warn!("ftyp ({:?}) had no moov to attach to; dropping", ftyp.major_brand);
    }
    if !pending_sidx.is_empty() || !pending_ssix.is_empty() {
        warn!(
            "{} sidx and {} ssix entries had no moov to attach to; dropping",
            pending_sidx.len(),
            pending_ssix.len()
        );
    }

    Ok(output)
}

/// Materializes one top-level atom's body and runs `decode` over it. A `BadAtom` is logged and
/// treated as "skip to the next top-level atom" per the error taxonomy's recovery policy; any
/// other error aborts the walk.
fn decode_body<T>(
    stream: &mut StreamReader<impl Read + Seek>,
    expected: AtomHeader,
    decode: impl FnOnce(&mut crate::atom::AtomReader<'_>) -> Result<T>,
) -> Result<Option<T>> {
    let (header, body) = match stream.get_atom()? {
        Some(pair) => pair,
        None => return Ok(None),
    };
    debug_assert_eq!(header.kind, expected.kind);

    let mut reader = stream::reader_for(header, &body);
    match decode(&mut reader) {
        Ok(value) => Ok(Some(value)),
        Err(Mp4Error::BadAtom(msg)) => {
            warn!("dropping malformed top-level {:?}: {msg}", header.kind);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
