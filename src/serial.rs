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

use std::io::{Read, Write};
use std::time::Duration;
use serialport::{SerialPort as SerialPortTrait, DataBits, Parity, StopBits};

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Character-level transport needed by the XMODEM engine
pub trait SerialPort: Send {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()>;

    /// Non-blocking check for a pending input byte.
    fn byte_available(&mut self) -> std::io::Result<bool>;

    /// Only call after `byte_available` returned true.
    fn read_byte(&mut self) -> std::io::Result<u8>;

    /// Discard pending input, returning how many bytes were dropped.
    fn drain(&mut self) -> std::io::Result<usize> {
        let mut dropped = 0;
        while self.byte_available()? {
            self.read_byte()?;
            dropped += 1;
        }
        Ok(dropped)
    }
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(RealSerialPort { port })
    }
}

impl SerialPort for RealSerialPort {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.port.write_all(&[byte])?;
        self.port.flush()?;
        Ok(())
    }

    fn byte_available(&mut self) -> std::io::Result<bool> {
        let pending = self.port.bytes_to_read()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(pending > 0)
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf)?;
        Ok(buf[0])
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialPort {
    // Bytes to hand out, one per poll (None = nothing available on that poll)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            write_log: Vec::new(),
            expected_writes,
        }
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.write_log.push(byte);
        Ok(())
    }

    fn byte_available(&mut self) -> std::io::Result<bool> {
        match self.read_buffer.get(self.read_pos) {
            Some(Some(_)) => Ok(true),
            Some(None) => {
                // A silent poll consumes its marker
                self.read_pos += 1;
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        match self.read_buffer.get(self.read_pos) {
            Some(Some(byte)) => {
                self.read_pos += 1;
                Ok(*byte)
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            )),
        }
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {} bytes)",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\nExpected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );
    }
}

// ============================================================================
// In-process pipe for loopback testing
// ============================================================================

#[cfg(test)]
type Queue = std::sync::Arc<std::sync::Mutex<std::collections::VecDeque<u8>>>;

/// One end of a bidirectional in-memory line. Outgoing bytes can be
/// dropped or corrupted by index to simulate a noisy link.
#[cfg(test)]
pub struct PipeSerialPort {
    rx: Queue,
    tx: Queue,
    written: usize,
    lose: Vec<usize>,
    corrupt: Vec<(usize, u8)>,
}

#[cfg(test)]
impl PipeSerialPort {
    pub fn pair() -> (PipeSerialPort, PipeSerialPort) {
        let a: Queue = Default::default();
        let b: Queue = Default::default();
        let left = PipeSerialPort { rx: a.clone(), tx: b.clone(), written: 0, lose: Vec::new(), corrupt: Vec::new() };
        let right = PipeSerialPort { rx: b, tx: a, written: 0, lose: Vec::new(), corrupt: Vec::new() };
        (left, right)
    }

    /// Silently drop the n-th byte written through this end.
    pub fn losing(mut self, index: usize) -> Self {
        self.lose.push(index);
        self
    }

    /// XOR the n-th byte written through this end with `mask`.
    pub fn corrupting(mut self, index: usize, mask: u8) -> Self {
        self.corrupt.push((index, mask));
        self
    }
}

#[cfg(test)]
impl SerialPort for PipeSerialPort {
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        let index = self.written;
        self.written += 1;
        if self.lose.contains(&index) {
            return Ok(());
        }
        let mask = self.corrupt.iter()
            .find(|(i, _)| *i == index)
            .map_or(0, |(_, m)| *m);
        self.tx.lock().unwrap().push_back(byte ^ mask);
        Ok(())
    }

    fn byte_available(&mut self) -> std::io::Result<bool> {
        Ok(!self.rx.lock().unwrap().is_empty())
    }

    fn read_byte(&mut self) -> std::io::Result<u8> {
        self.rx.lock().unwrap().pop_front().ok_or_else(|| std::io::Error::new(
            std::io::ErrorKind::WouldBlock,
            "Pipe empty"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_silent_polls() {
        let mut port = MockSerialPort::new(vec![None, Some(0x43), None], vec![0x06]);
        assert!(!port.byte_available().unwrap());
        assert!(port.byte_available().unwrap());
        assert_eq!(port.read_byte().unwrap(), 0x43);
        assert!(!port.byte_available().unwrap());
        assert!(port.read_byte().is_err());
        port.write_byte(0x06).unwrap();
    }

    #[test]
    fn test_drain_discards_pending() {
        let mut port = MockSerialPort::new(vec![Some(1), Some(2), Some(3)], vec![]);
        assert_eq!(port.drain().unwrap(), 3);
        assert_eq!(port.drain().unwrap(), 0);
    }

    #[test]
    fn test_pipe_loss_and_corruption() {
        let (left, mut right) = PipeSerialPort::pair();
        let mut left = left.losing(1).corrupting(2, 0xFF);
        left.write_byte(0x10).unwrap();
        left.write_byte(0x20).unwrap();
        left.write_byte(0x30).unwrap();

        assert_eq!(right.read_byte().unwrap(), 0x10);
        assert_eq!(right.read_byte().unwrap(), 0x30 ^ 0xFF);
        assert!(!right.byte_available().unwrap());

        right.write_byte(0x06).unwrap();
        assert_eq!(left.read_byte().unwrap(), 0x06);
    }
}
