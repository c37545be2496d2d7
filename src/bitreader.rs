// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MSB-first bit extraction over a byte slice.
//!
//! Unlike the teacher's `io::BitReaderLtr` (which returns an `io::Result` per read), this reader
//! never bubbles an error to the caller mid-sequence: callers decoding bit-packed configuration
//! records (HEVC's `hvcC`, AV1's `av1C`, DTS's `ddts`) want to keep reading fields unconditionally
//! and only check for trouble once, at the end. Exhausted reads return zero and latch the first
//! error, which `err()` surfaces afterwards.

/// MSB-first bit reader with latched, sticky error semantics (see module docs).
pub struct BitReader<'a> {
    buf: &'a [u8],
    /// Bit position within `buf`, counted from the most significant bit of `buf[0]`.
    bit_pos: u64,
    exhausted: bool,
}

impl<'a> BitReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_pos: 0, exhausted: false }
    }

    /// Returns the latched error, if any read since construction ran past the end of the buffer.
    pub fn err(&self) -> crate::error::Result<()> {
        if self.exhausted {
            crate::error::no_enough_data()
        } else {
            Ok(())
        }
    }

    pub fn bits_left(&self) -> u64 {
        (self.buf.len() as u64 * 8).saturating_sub(self.bit_pos)
    }

    fn read_bit_raw(&mut self) -> u64 {
        let byte_idx = (self.bit_pos / 8) as usize;
        if byte_idx >= self.buf.len() {
            self.exhausted = true;
            return 0;
        }
        let bit_in_byte = 7 - (self.bit_pos % 8);
        self.bit_pos += 1;
        u64::from((self.buf[byte_idx] >> bit_in_byte) & 1)
    }

    /// Reads `n` bits (`0 <= n <= 64`) MSB-first and returns them right-aligned.
    pub fn read_bits(&mut self, n: u32) -> u64 {
        debug_assert!(n <= 64);
        let mut acc: u64 = 0;
        for _ in 0..n {
            acc = (acc << 1) | self.read_bit_raw();
        }
        acc
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_bits(1) != 0
    }

    pub fn read_u8(&mut self) -> u8 {
        self.read_bits(8) as u8
    }

    pub fn read_u16(&mut self) -> u16 {
        self.read_bits(16) as u16
    }

    pub fn read_u32(&mut self) -> u32 {
        self.read_bits(32) as u32
    }

    /// Skips `n` bits without materializing them.
    pub fn ignore_bits(&mut self, n: u32) {
        for _ in 0..n {
            self.read_bit_raw();
        }
    }

    /// Advances to the next byte boundary, discarding any partial byte.
    pub fn realign(&mut self) {
        self.bit_pos = (self.bit_pos + 7) & !7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_msb_first() {
        let mut r = BitReader::new(&[0b1010_0000]);
        assert_eq!(r.read_bits(1), 1);
        assert_eq!(r.read_bits(1), 0);
        assert_eq!(r.read_bits(1), 1);
        assert!(r.err().is_ok());
    }

    #[test]
    fn exhaustion_returns_zero_and_latches() {
        let mut r = BitReader::new(&[0xff]);
        let _ = r.read_bits(8);
        assert_eq!(r.read_bits(8), 0);
        assert!(r.err().is_err());
    }

    #[test]
    fn crosses_byte_boundary() {
        let mut r = BitReader::new(&[0b0000_0001, 0b1000_0000]);
        assert_eq!(r.read_bits(9), 0b0_0000_0011);
    }
}
