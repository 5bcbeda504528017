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

use log::{debug, error, info, trace, warn};
use crate::buffer::TransferBuffer;
use crate::crc::crc_update;
use crate::error::{Error, Result};
use crate::protocol::*;
use crate::retry::{Idle, RetryController};
use crate::serial::SerialPort;
use crate::timer::Timer;

// ============================================================================
// States
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Waiting for the receiver's `C`
    Idle,
    /// A block is out, waiting for ACK
    AwaitAck,
    End,
    Abort,
}

impl TxState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxState::End | TxState::Abort)
    }
}

// ============================================================================
// Sender
// ============================================================================

/// Upload side of a transfer: the device is the source and reacts to the
/// host's handshake and acknowledgements.
pub struct Sender<'a> {
    serial: Box<dyn SerialPort>,
    timer: Box<dyn Timer>,
    buffer: TransferBuffer<'a>,
    retry: RetryController,
    state: TxState,
    block: usize,
}

impl<'a> Sender<'a> {
    pub fn new(
        serial: Box<dyn SerialPort>,
        timer: Box<dyn Timer>,
        buffer: TransferBuffer<'a>,
        retry: RetryController,
    ) -> Self {
        Sender {
            serial,
            timer,
            buffer,
            retry,
            state: TxState::Idle,
            block: 1,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Index of the block currently in flight, starting at 1.
    pub fn block(&self) -> usize {
        self.block
    }

    pub fn start(&mut self) {
        self.block = 1;
        self.retry.start(self.timer.as_mut());
        self.state = TxState::Idle;
        info!("Waiting for receiver, {} blocks to send", self.buffer.block_count());
    }

    /// Emit one complete frame for `block` (1-based).
    pub fn send_block(&mut self, block: usize) -> Result<()> {
        let mut offset = BLOCK_SIZE * block.saturating_sub(1);
        if offset >= self.buffer.capacity() {
            warn!("Block {} lies past the buffer, sending from offset 0", block);
            offset = 0;
        }

        let number = block as u8;
        self.send(SOH)?;
        self.send(number)?;
        self.send(complement(number))?;

        let mut crc = 0;
        for &byte in self.buffer.block(offset)? {
            crc = crc_update(crc, byte);
            self.serial.write_byte(byte).map_err(|e| self.io_error(e))?;
        }
        trace!("Block {}: CRC 0x{:04X}", block, crc);

        self.send((crc >> 8) as u8)?;
        self.send(crc as u8)?;
        debug!("Sent: block {} ({} bytes from offset {})", block, FRAME_LEN, offset);
        Ok(())
    }

    /// One iteration of the upload loop.
    pub fn poll(&mut self) -> Result<TxState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        if !self.serial.byte_available().map_err(|e| self.io_error(e))? {
            if self.retry.on_idle(self.timer.as_mut()) == Idle::Exhausted {
                error!("Retry limit reached after {} timeouts, aborting upload", self.retry.retries());
                self.state = TxState::Abort;
            }
            return Ok(self.state);
        }

        let byte = self.serial.read_byte().map_err(|e| self.io_error(e))?;
        self.retry.on_byte(self.timer.as_mut());

        match byte {
            CRC_REQUEST => {
                debug!("Received: 'C'");
                self.block = 1;
            }
            ACK => {
                debug!("Received: ACK");
                self.block += 1;
                if self.block > self.buffer.block_count() {
                    self.send(EOT)?;
                    info!("All blocks acknowledged");
                    self.state = TxState::End;
                    return Ok(self.state);
                }
            }
            other => {
                debug!("Received: 0x{:02X}, resending block {}", other, self.block);
            }
        }

        self.send_block(self.block)?;
        self.state = TxState::AwaitAck;
        Ok(self.state)
    }

    /// Run a complete upload of every block in the buffer.
    pub fn run(&mut self) -> Result<()> {
        self.start();
        while !self.poll()?.is_terminal() {}

        match self.state {
            TxState::End => Ok(()),
            _ => Err(Error::Aborted),
        }
    }

    fn send(&mut self, byte: u8) -> Result<()> {
        self.serial.write_byte(byte).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, e: std::io::Error) -> Error {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {:?})", e, self.state)
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
