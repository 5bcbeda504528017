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

//! XMODEM-CRC protocol constants

/// Start of header - begins a 128-byte data block
pub const SOH: u8 = 0x01;

/// End of transmission - sender has no more blocks
pub const EOT: u8 = 0x04;

/// Acknowledge - receiver accepted the block
pub const ACK: u8 = 0x06;

/// Negative acknowledge - receiver rejected the block, resend it
pub const NAK: u8 = 0x15;

/// End of transmission block - alternative end marker, acknowledged once
pub const ETB: u8 = 0x17;

/// Cancel - defined by XMODEM, never produced or acted upon here
#[allow(dead_code)]
pub const CAN: u8 = 0x18;

/// Receiver requests a CRC-mode transfer
pub const CRC_REQUEST: u8 = b'C';

/// Padding used to fill the last block of a file
pub const SUB: u8 = 0x1A;

/// Payload bytes per block
pub const BLOCK_SIZE: usize = 128;

/// SOH + block# + ~block# + payload + CRC hi/lo
pub const FRAME_LEN: usize = 3 + BLOCK_SIZE + 2;

/// Silence events tolerated before the session aborts
pub const MAX_RETRY: u32 = 15;

/// Silence in milliseconds that counts as one timeout
pub const TIMEOUT_MS: u64 = 1000;

/// One's complement of a block number as carried in the frame header.
pub fn complement(block: u8) -> u8 {
    0xFF - block
}

/// A complete wire frame for `payload`, used to script the mock line.
#[cfg(test)]
pub fn encode_frame(block: u8, payload: &[u8]) -> Vec<u8> {
    assert_eq!(payload.len(), BLOCK_SIZE);
    let crc = crate::crc::crc16(payload);
    let mut frame = Vec::with_capacity(FRAME_LEN);
    frame.push(SOH);
    frame.push(block);
    frame.push(complement(block));
    frame.extend_from_slice(payload);
    frame.push((crc >> 8) as u8);
    frame.push(crc as u8);
    frame
}
