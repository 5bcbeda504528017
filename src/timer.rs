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

use std::time::Instant;

/// Millisecond tick source driving the protocol timeouts.
pub trait Timer: Send {
    /// Milliseconds since the last reset.
    fn elapsed_ms(&mut self) -> u64;

    fn reset(&mut self);
}

pub struct StdTimer {
    start: Instant,
}

impl StdTimer {
    pub fn new() -> Self {
        StdTimer { start: Instant::now() }
    }
}

impl Default for StdTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for StdTimer {
    fn elapsed_ms(&mut self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn reset(&mut self) {
        self.start = Instant::now();
    }
}

// ============================================================================
// Mock Timer for Testing
// ============================================================================

/// Deterministic timer: every read advances the clock by `step_ms`.
#[cfg(test)]
pub struct MockTimer {
    elapsed: u64,
    step_ms: u64,
    resets: usize,
}

#[cfg(test)]
impl MockTimer {
    pub fn new(step_ms: u64) -> Self {
        MockTimer { elapsed: 0, step_ms, resets: 0 }
    }
}

#[cfg(test)]
impl Timer for MockTimer {
    fn elapsed_ms(&mut self) -> u64 {
        self.elapsed += self.step_ms;
        self.elapsed
    }

    fn reset(&mut self) {
        self.elapsed = 0;
        self.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_timer_reset() {
        let mut timer = StdTimer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.elapsed_ms() >= 5);
        timer.reset();
        assert!(timer.elapsed_ms() < 1000);
    }

    #[test]
    fn test_mock_timer_steps() {
        let mut timer = MockTimer::new(400);
        assert_eq!(timer.elapsed_ms(), 400);
        assert_eq!(timer.elapsed_ms(), 800);
        timer.reset();
        assert_eq!(timer.resets, 1);
        assert_eq!(timer.elapsed_ms(), 400);
    }
}
