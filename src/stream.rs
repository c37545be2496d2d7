// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pulls whole atoms (header + body) from an external byte source.

use std::io::{Read, Seek, SeekFrom};

use crate::atom::{AtomHeader, AtomReader};
use crate::error::{self, Result};

/// Wraps a byte source supporting sequential read and absolute seek.
///
/// `peek_header` materializes only the 8 (or 16) header bytes; `get_atom` additionally reads the
/// body into an owned buffer. `skip_current_atom` advances past a peeked atom without ever
/// materializing its body — the only path `mdat` is allowed to take.
pub struct StreamReader<R> {
    inner: R,
    pos: u64,
    peeked: Option<(AtomHeader, u64)>,
}

impl<R: Read + Seek> StreamReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self { inner, pos, peeked: None })
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek_absolute(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        self.peeked = None;
        Ok(())
    }

    fn len_hint(&mut self) -> Result<Option<u64>> {
        let cur = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(cur))?;
        Ok(Some(end.saturating_sub(cur)))
    }

    /// Reads the atom header at the current position without advancing the logical position.
    /// Returns `Ok(None)` at end of stream.
    pub fn peek_header(&mut self) -> Result<Option<AtomHeader>> {
        if let Some((header, at)) = self.peeked {
            if at == self.pos {
                return Ok(Some(header));
            }
        }

        let mut small = [0u8; 8];
        let start = self.inner.stream_position()?;
        let n = read_up_to(&mut self.inner, &mut small)?;
        if n == 0 {
            return Ok(None);
        }
        if n < 8 {
            self.inner.seek(SeekFrom::Start(start))?;
            return error::no_enough_data();
        }

        let size32 = u32::from_be_bytes(small[0..4].try_into().unwrap());
        let header = if size32 == 1 {
            let mut rest = [0u8; 8];
            self.inner.read_exact(&mut rest)?;
            let mut buf = [0u8; 16];
            buf[..8].copy_from_slice(&small);
            buf[8..].copy_from_slice(&rest);
            AtomHeader::parse(&buf, None, true)?
        } else {
            let remaining = self.len_hint()?.map(|total| total);
            AtomHeader::parse(&small, remaining, true)?
        };

        self.inner.seek(SeekFrom::Start(start))?;
        self.peeked = Some((header, self.pos));
        Ok(Some(header))
    }

    /// Reads header + body into an owned buffer and returns an [`AtomReader`] over it.
    pub fn get_atom(&mut self) -> Result<Option<(AtomHeader, Vec<u8>)>> {
        let header = match self.peek_header()? {
            Some(h) => h,
            None => return Ok(None),
        };

        if header.body_size == u64::MAX {
            return error::bad_atom("cannot materialize an unbounded atom body");
        }

        let start = self.pos;
        self.inner.seek(SeekFrom::Start(start + u64::from(header.header_size)))?;

        let mut body = vec![0u8; header.body_size as usize];
        match self.inner.read_exact(&mut body) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.inner.seek(SeekFrom::Start(start))?;
                return error::no_enough_data();
            }
            Err(e) => return Err(e.into()),
        }

        self.pos = start + header.total_len();
        self.peeked = None;
        Ok(Some((header, body)))
    }

    /// Advances past the currently peeked atom without materializing its body.
    pub fn skip_current_atom(&mut self) -> Result<()> {
        let header = match self.peek_header()? {
            Some(h) => h,
            None => return Ok(()),
        };

        let new_pos = if header.body_size == u64::MAX {
            // size==0 sentinel: consume to end-of-stream.
            self.inner.seek(SeekFrom::End(0))?
        } else {
            self.pos + header.total_len()
        };

        self.inner.seek(SeekFrom::Start(new_pos))?;
        self.pos = new_pos;
        self.peeked = None;
        Ok(())
    }
}

fn read_up_to<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

/// Constructs an [`AtomReader`] over an owned body buffer returned by [`StreamReader::get_atom`].
pub fn reader_for<'a>(header: AtomHeader, body: &'a [u8]) -> AtomReader<'a> {
    AtomReader::with_header(body, header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn atom(kind: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((8 + body.len()) as u32).to_be_bytes());
        out.extend_from_slice(kind.as_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn peek_then_get_atom_roundtrips() {
        let buf = atom("free", &[1, 2, 3, 4]);
        let mut sr = StreamReader::new(Cursor::new(buf)).unwrap();
        let header = sr.peek_header().unwrap().unwrap();
        assert_eq!(header.body_size, 4);
        assert_eq!(sr.position(), 0);
        let (header2, body) = sr.get_atom().unwrap().unwrap();
        assert_eq!(header2.body_size, 4);
        assert_eq!(body, vec![1, 2, 3, 4]);
        assert_eq!(sr.position(), 12);
    }

    #[test]
    fn skip_current_atom_advances_without_materializing() {
        let mut buf = atom("free", &[0u8; 64]);
        buf.extend(atom("ftyp", &[9, 9]));
        let mut sr = StreamReader::new(Cursor::new(buf)).unwrap();
        sr.peek_header().unwrap();
        sr.skip_current_atom().unwrap();
        let header = sr.peek_header().unwrap().unwrap();
        assert_eq!(format!("{:?}", header.kind), "ftyp");
    }
}
