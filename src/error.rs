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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Buffer size {0} is not a positive multiple of 128")]
    BufferSize(usize),

    #[error("Cannot rewind cursor {cursor} by {by} bytes")]
    CursorUnderflow { cursor: usize, by: usize },

    #[error("Offset {offset} is outside a {capacity} byte buffer")]
    BufferOverflow { offset: usize, capacity: usize },

    #[error("Transfer aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, Error>;
