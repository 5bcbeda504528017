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

// XMODEM-CRC file transfer
mod buffer;
mod crc;
mod error;
mod protocol;
mod receiver;
mod retry;
mod sender;
mod serial;
mod timer;

use clap::{Parser, Subcommand};
use serialport::{DataBits, Parity, StopBits};
use log::debug;
use std::path::{Path, PathBuf};
use buffer::TransferBuffer;
use error::Result;
use protocol::{BLOCK_SIZE, SUB};
use receiver::Receiver;
use retry::{RetryController, RetryPolicy};
use sender::Sender;
use serial::RealSerialPort;
use timer::StdTimer;

#[derive(Parser)]
#[command(name = "xmodem-crc")]
#[command(about = "XMODEM-CRC file transfer over a serial line", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name="BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name="BITS")]
    stop_bits: u8,

    /// How timeouts count toward the retry limit (total or consecutive)
    #[arg(long, default_value = "total", value_name = "POLICY")]
    retry_policy: String,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a file
    Send {
        /// File to send
        file: PathBuf,
    },
    /// Receive a file
    Receive {
        /// Where to save the received data
        file: PathBuf,

        /// Largest transfer accepted, in 128-byte blocks
        #[arg(long, default_value = "8192", value_name = "N")]
        max_blocks: usize,

        /// Remove trailing SUB (0x1A) padding before saving
        #[arg(long)]
        strip_padding: bool,
    },
}

fn parse_data_bits(bits: u8) -> std::result::Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> std::result::Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> std::result::Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn parse_retry_policy(policy: &str) -> std::result::Result<RetryPolicy, String> {
    match policy.to_lowercase().as_str() {
        "total" => Ok(RetryPolicy::Total),
        "consecutive" => Ok(RetryPolicy::Consecutive),
        _ => Err(format!("Invalid retry policy: {}. Must be 'total' or 'consecutive'", policy)),
    }
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

fn exit_with(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, e);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let data_bits = parse_data_bits(cli.data_bits).unwrap_or_else(|e| exit_with("Error", e));
    let parity = parse_parity(&cli.parity).unwrap_or_else(|e| exit_with("Error", e));
    let stop_bits = parse_stop_bits(cli.stop_bits).unwrap_or_else(|e| exit_with("Error", e));
    let policy = parse_retry_policy(&cli.retry_policy).unwrap_or_else(|e| exit_with("Error", e));

    println!("Opening serial port: {}", cli.port);
    println!("Settings: {} baud, {:?}, {:?}, {:?}", cli.baud, data_bits, parity, stop_bits);

    let serial_port = RealSerialPort::open(&cli.port, cli.baud, data_bits, parity, stop_bits)
        .unwrap_or_else(|e| exit_with("Failed to open serial port", e));

    match cli.command {
        Commands::Send { file } => {
            println!("\nSending file: {}", file.display());
            if let Err(e) = send_file(serial_port, file, policy) {
                exit_with("Send failed", e);
            }
            println!("\nFile sent successfully!");
        }
        Commands::Receive { file, max_blocks, strip_padding: strip } => {
            println!("\nReceiving to: {}", file.display());
            match receive_file(serial_port, &file, max_blocks, strip, policy) {
                Ok(len) => println!("\nReceived {} bytes successfully!", len),
                Err(e) => exit_with("Receive failed", e),
            }
        }
    }
}

/// Pad `data` with SUB to a whole number of blocks; an empty file still
/// occupies one block.
fn pad_to_blocks(mut data: Vec<u8>) -> Vec<u8> {
    let blocks = data.len().div_ceil(BLOCK_SIZE).max(1);
    data.resize(blocks * BLOCK_SIZE, SUB);
    data
}

fn strip_padding(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != SUB).map_or(0, |i| i + 1);
    &data[..end]
}

fn send_file(serial_port: RealSerialPort, file: PathBuf, policy: RetryPolicy) -> Result<()> {
    let mut data = pad_to_blocks(std::fs::read(&file)?);
    let buffer = TransferBuffer::new(&mut data)?;

    let mut sender = Sender::new(
        Box::new(serial_port),
        Box::new(StdTimer::new()),
        buffer,
        RetryController::new(policy),
    );
    let outcome = sender.run();
    debug!("Upload finished in state {:?} at block {}", sender.state(), sender.block());
    outcome
}

fn receive_file(
    serial_port: RealSerialPort,
    file: &Path,
    max_blocks: usize,
    strip: bool,
    policy: RetryPolicy,
) -> Result<usize> {
    let mut data = vec![0u8; max_blocks * BLOCK_SIZE];
    let buffer = TransferBuffer::new(&mut data)?;

    let mut receiver = Receiver::new(
        Box::new(serial_port),
        Box::new(StdTimer::new()),
        buffer,
        RetryController::new(policy),
    );
    let outcome = receiver.run();
    debug!(
        "Download finished in state {:?}, last block {}, {} bytes",
        receiver.state(),
        receiver.last_committed(),
        receiver.cursor()
    );
    outcome?;

    let received = if strip { strip_padding(receiver.committed()) } else { receiver.committed() };
    std::fs::write(file, received)?;
    Ok(received.len())
}

// ============================================================================
// Tests
// ============================================================================
