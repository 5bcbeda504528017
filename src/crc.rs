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

//! CRC-16 as used by XMODEM-CRC: polynomial 0x1021, MSB first, no
//! reflection, no final XOR. Every block starts from an accumulator of 0.

const POLY: u16 = 0x1021;

/// Fold one byte into a running CRC accumulator.
pub fn crc_update(acc: u16, byte: u8) -> u16 {
    let mut crc = acc ^ ((byte as u16) << 8);
    for _ in 0..8 {
        if crc & 0x8000 != 0 {
            crc = (crc << 1) ^ POLY;
        } else {
            crc <<= 1;
        }
    }
    crc
}

/// CRC of a whole slice, starting from 0.
#[cfg(test)]
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0, |acc, &b| crc_update(acc, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc_any::CRCu16;

    fn reference(data: &[u8]) -> u16 {
        let mut crc = CRCu16::crc16xmodem();
        crc.digest(data);
        crc.get_crc()
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn test_matches_reference() {
        let mut block = [0u8; 128];
        for (i, b) in block.iter_mut().enumerate() {
            *b = (i * 7 + 3) as u8;
        }
        assert_eq!(crc16(&block), reference(&block));

        let padding = [0x1Au8; 128];
        assert_eq!(crc16(&padding), reference(&padding));

        assert_eq!(crc16(b"Test data"), reference(b"Test data"));
    }

    #[test]
    fn test_split_updates_match_whole() {
        let data: Vec<u8> = (0..=255u8).collect();
        let (head, tail) = data.split_at(100);
        let partial = crc16(head);
        let resumed = tail.iter().fold(partial, |acc, &b| crc_update(acc, b));
        assert_eq!(resumed, crc16(&data));
    }

    #[test]
    fn test_appending_crc_yields_zero() {
        let block = [0xA5u8; 128];
        let crc = crc16(&block);
        let mut framed = block.to_vec();
        framed.push((crc >> 8) as u8);
        framed.push(crc as u8);
        assert_eq!(crc16(&framed), 0);
    }
}
