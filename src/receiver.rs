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
pub enum RxState {
    /// Between blocks: expecting SOH, EOT or ETB
    Await,
    /// Expecting the block number
    Block,
    /// Expecting the complemented block number
    Block2,
    /// Collecting the 128 payload bytes
    Run,
    /// Expecting the CRC high octet
    Crc1,
    /// Expecting the CRC low octet
    Crc2,
    Abort,
    End,
}

impl RxState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RxState::Abort | RxState::End)
    }
}

// ============================================================================
// Receiver
// ============================================================================

/// Download side of a transfer: the device is the sink and drives
/// retransmission through ACK/NAK and the `C` handshake.
pub struct Receiver<'a> {
    serial: Box<dyn SerialPort>,
    timer: Box<dyn Timer>,
    buffer: TransferBuffer<'a>,
    retry: RetryController,
    state: RxState,
    block: u8,
    received: usize,
    crc: u16,
    crc_recv: u16,
    last_committed: u8,
    duplicate: bool,
}

impl<'a> Receiver<'a> {
    pub fn new(
        serial: Box<dyn SerialPort>,
        timer: Box<dyn Timer>,
        buffer: TransferBuffer<'a>,
        retry: RetryController,
    ) -> Self {
        Receiver {
            serial,
            timer,
            buffer,
            retry,
            state: RxState::Await,
            block: 0,
            received: 0,
            crc: 0,
            crc_recv: 0,
            last_committed: 0,
            duplicate: false,
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn last_committed(&self) -> u8 {
        self.last_committed
    }

    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// Payload accepted so far.
    pub fn committed(&self) -> &[u8] {
        self.buffer.committed()
    }

    /// Reset the session and request a CRC-mode transfer.
    pub fn start(&mut self) -> Result<()> {
        self.buffer.seek(0)?;
        self.last_committed = 0;
        self.duplicate = false;
        self.retry.start(self.timer.as_mut());
        self.state = RxState::Await;
        self.send(CRC_REQUEST)?;
        info!("Waiting for sender");
        Ok(())
    }

    /// One iteration of the download loop.
    pub fn poll(&mut self) -> Result<RxState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        if !self.serial.byte_available().map_err(|e| self.io_error(e))? {
            match self.retry.on_idle(self.timer.as_mut()) {
                Idle::Waiting => {}
                Idle::Expired => self.send(CRC_REQUEST)?,
                Idle::Exhausted => {
                    error!("Retry limit reached after {} timeouts, aborting download", self.retry.retries());
                    self.state = RxState::Abort;
                }
            }
            return Ok(self.state);
        }

        let byte = self.serial.read_byte().map_err(|e| self.io_error(e))?;
        let next = self.handle_byte(byte)?;
        self.retry.on_byte(self.timer.as_mut());
        Ok(next)
    }

    /// Run a complete download, returning the number of bytes committed.
    pub fn run(&mut self) -> Result<usize> {
        self.start()?;
        while !self.poll()?.is_terminal() {}

        let dropped = self.serial.drain().map_err(|e| self.io_error(e))?;
        if dropped > 0 {
            debug!("Discarded {} trailing bytes", dropped);
        }

        match self.state {
            RxState::End => Ok(self.buffer.cursor()),
            _ => Err(Error::Aborted),
        }
    }

    /// Advance the state machine by one inbound byte.
    pub fn handle_byte(&mut self, byte: u8) -> Result<RxState> {
        let next = match self.state {
            RxState::Await => match byte {
                SOH => {
                    trace!("Received: SOH");
                    self.received = 0;
                    self.crc = 0;
                    RxState::Block
                }
                EOT => {
                    debug!("Received: EOT (End of transmission)");
                    self.send(ACK)?;
                    self.send(ACK)?;
                    RxState::End
                }
                ETB => {
                    debug!("Received: ETB");
                    self.send(ACK)?;
                    RxState::End
                }
                other => {
                    error!("Unexpected byte 0x{:02X} between blocks", other);
                    RxState::Abort
                }
            },
            RxState::Block => {
                self.block = byte;
                RxState::Block2
            }
            RxState::Block2 => self.check_header(byte),
            RxState::Run => {
                self.crc = crc_update(self.crc, byte);
                match self.buffer.push(byte) {
                    Ok(()) => {
                        self.received += 1;
                        if self.received == BLOCK_SIZE {
                            RxState::Crc1
                        } else {
                            RxState::Run
                        }
                    }
                    Err(e) => {
                        error!("Block {}: {}", self.block, e);
                        RxState::Abort
                    }
                }
            }
            RxState::Crc1 => {
                self.crc_recv = (byte as u16) << 8;
                RxState::Crc2
            }
            RxState::Crc2 => {
                self.crc_recv |= byte as u16;
                self.verify_block()?
            }
            RxState::Abort => RxState::Abort,
            RxState::End => RxState::End,
        };

        self.state = next;
        Ok(next)
    }

    fn check_header(&mut self, byte: u8) -> RxState {
        if byte != complement(self.block) {
            error!("Block number 0x{:02X} does not match complement 0x{:02X}", self.block, byte);
            return RxState::Abort;
        }

        self.duplicate = self.block == self.last_committed;
        if self.duplicate {
            warn!("Block {} sent twice, overwriting", self.block);
            if let Err(e) = self.buffer.rewind(BLOCK_SIZE) {
                error!("Block {}: {}", self.block, e);
                return RxState::Abort;
            }
        } else if self.buffer.remaining() < BLOCK_SIZE {
            error!("Block {} does not fit, buffer full at {} bytes", self.block, self.buffer.capacity());
            return RxState::Abort;
        }

        RxState::Run
    }

    fn verify_block(&mut self) -> Result<RxState> {
        trace!("Block {}: CRC 0x{:04X}, expected 0x{:04X}", self.block, self.crc_recv, self.crc);

        if self.crc_recv == self.crc {
            self.send(ACK)?;
            self.last_committed = self.block;
            debug!("Block {} committed", self.block);
            return Ok(RxState::Await);
        }

        warn!("Block {}: CRC mismatch", self.block);
        self.send(NAK)?;
        // A duplicate already moved the cursor back before its payload
        if !self.duplicate {
            self.buffer.rewind(BLOCK_SIZE)?;
        }
        Ok(RxState::Await)
    }

    fn send(&mut self, byte: u8) -> Result<()> {
        self.serial.write_byte(byte).map_err(|e| self.io_error(e))?;
        debug!("Sent: 0x{:02X}", byte);
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
