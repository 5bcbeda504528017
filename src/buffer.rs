// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use crate::error::{Error, Result};
use crate::protocol::BLOCK_SIZE;

/// Caller-owned byte store shared by both transfer directions.
///
/// The session never resizes it; all access goes through a cursor that is
/// checked against the capacity.
pub struct TransferBuffer<'a> {
    data: &'a mut [u8],
    cursor: usize,
}

impl<'a> TransferBuffer<'a> {
    pub fn new(data: &'a mut [u8]) -> Result<Self> {
        if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
            return Err(Error::BufferSize(data.len()));
        }
        Ok(TransferBuffer { data, cursor: 0 })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn block_count(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Write one byte at the cursor and advance it.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        let capacity = self.data.len();
        let slot = self
            .data
            .get_mut(self.cursor)
            .ok_or(Error::BufferOverflow { offset: self.cursor, capacity })?;
        *slot = byte;
        self.cursor += 1;
        Ok(())
    }

    pub fn rewind(&mut self, by: usize) -> Result<()> {
        self.cursor = self
            .cursor
            .checked_sub(by)
            .ok_or(Error::CursorUnderflow { cursor: self.cursor, by })?;
        Ok(())
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::BufferOverflow { offset: pos, capacity: self.data.len() });
        }
        self.cursor = pos;
        Ok(())
    }

    /// The 128 bytes starting at `offset`.
    pub fn block(&self, offset: usize) -> Result<&[u8]> {
        self.data
            .get(offset..offset + BLOCK_SIZE)
            .ok_or(Error::BufferOverflow { offset, capacity: self.data.len() })
    }

    /// Everything written so far.
    pub fn committed(&self) -> &[u8] {
        &self.data[..self.cursor]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_capacity() {
        let mut empty: [u8; 0] = [];
        assert!(matches!(TransferBuffer::new(&mut empty), Err(Error::BufferSize(0))));

        let mut odd = [0u8; 200];
        assert!(matches!(TransferBuffer::new(&mut odd), Err(Error::BufferSize(200))));

        let mut ok = [0u8; 256];
        let buffer = TransferBuffer::new(&mut ok).expect("256 is valid");
        assert_eq!(buffer.block_count(), 2);
        assert_eq!(buffer.remaining(), 256);
    }

    #[test]
    fn test_push_and_rewind() {
        let mut storage = [0u8; 128];
        let mut buffer = TransferBuffer::new(&mut storage).unwrap();

        for i in 0..128 {
            buffer.push(i as u8).unwrap();
        }
        assert_eq!(buffer.cursor(), 128);
        assert!(matches!(buffer.push(0xFF), Err(Error::BufferOverflow { offset: 128, capacity: 128 })));

        buffer.rewind(128).unwrap();
        assert_eq!(buffer.cursor(), 0);
        assert!(matches!(buffer.rewind(128), Err(Error::CursorUnderflow { cursor: 0, by: 128 })));
        assert_eq!(buffer.cursor(), 0);
    }

    #[test]
    fn test_block_and_committed() {
        let mut storage = [0u8; 256];
        let mut buffer = TransferBuffer::new(&mut storage).unwrap();
        for _ in 0..130 {
            buffer.push(0x42).unwrap();
        }
        assert_eq!(buffer.committed().len(), 130);
        assert_eq!(&buffer.block(128).unwrap()[..2], &[0x42, 0x42]);
        assert!(buffer.block(256).is_err());
        assert!(buffer.block(200).is_err());
    }

    #[test]
    fn test_seek_bounds() {
        let mut storage = [0u8; 128];
        let mut buffer = TransferBuffer::new(&mut storage).unwrap();
        buffer.seek(128).unwrap();
        assert_eq!(buffer.remaining(), 0);
        assert!(buffer.seek(129).is_err());
    }
}
