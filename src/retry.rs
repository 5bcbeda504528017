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

use log::warn;
use crate::protocol::{MAX_RETRY, TIMEOUT_MS};
use crate::timer::Timer;

/// How silence events are counted against the retry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Every timeout in the session counts, even with traffic in between.
    #[default]
    Total,
    /// Only an unbroken run of timeouts counts; any received byte clears it.
    Consecutive,
}

/// Outcome of an idle poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idle {
    /// Still inside the timeout window.
    Waiting,
    /// The window elapsed; one retry was consumed and the timer restarted.
    Expired,
    /// The retry ceiling was exceeded.
    Exhausted,
}

pub struct RetryController {
    policy: RetryPolicy,
    max_retry: u32,
    timeout_ms: u64,
    retries: u32,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_limits(policy, MAX_RETRY, TIMEOUT_MS)
    }

    pub fn with_limits(policy: RetryPolicy, max_retry: u32, timeout_ms: u64) -> Self {
        RetryController { policy, max_retry, timeout_ms, retries: 0 }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Clear the counter and restart the timeout window.
    pub fn start(&mut self, timer: &mut dyn Timer) {
        self.retries = 0;
        timer.reset();
    }

    pub fn on_idle(&mut self, timer: &mut dyn Timer) -> Idle {
        if timer.elapsed_ms() <= self.timeout_ms {
            return Idle::Waiting;
        }

        self.retries += 1;
        if self.retries > self.max_retry {
            return Idle::Exhausted;
        }

        warn!("Timeout, retry {} of {}", self.retries, self.max_retry);
        timer.reset();
        Idle::Expired
    }

    pub fn on_byte(&mut self, timer: &mut dyn Timer) {
        timer.reset();
        if self.policy == RetryPolicy::Consecutive {
            self.retries = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::MockTimer;

    #[test]
    fn test_waits_inside_window() {
        let mut timer = MockTimer::new(250);
        let mut retry = RetryController::new(RetryPolicy::Total);
        retry.start(&mut timer);

        for _ in 0..4 {
            assert_eq!(retry.on_idle(&mut timer), Idle::Waiting);
        }
        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        assert_eq!(retry.retries(), 1);
        // Expiry restarts the window
        assert_eq!(retry.on_idle(&mut timer), Idle::Waiting);
    }

    #[test]
    fn test_exhausts_after_ceiling() {
        let mut timer = MockTimer::new(TIMEOUT_MS + 1);
        let mut retry = RetryController::new(RetryPolicy::Total);
        retry.start(&mut timer);

        for i in 1..=MAX_RETRY {
            assert_eq!(retry.on_idle(&mut timer), Idle::Expired, "timeout {}", i);
        }
        assert_eq!(retry.on_idle(&mut timer), Idle::Exhausted);
    }

    #[test]
    fn test_total_policy_keeps_count_across_traffic() {
        let mut timer = MockTimer::new(11);
        let mut retry = RetryController::with_limits(RetryPolicy::Total, 2, 10);
        retry.start(&mut timer);

        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        retry.on_byte(&mut timer);
        assert_eq!(retry.retries(), 2);
        assert_eq!(retry.on_idle(&mut timer), Idle::Exhausted);
    }

    #[test]
    fn test_consecutive_policy_clears_on_byte() {
        let mut timer = MockTimer::new(11);
        let mut retry = RetryController::with_limits(RetryPolicy::Consecutive, 2, 10);
        retry.start(&mut timer);

        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        retry.on_byte(&mut timer);
        assert_eq!(retry.retries(), 0);
        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        assert_eq!(retry.on_idle(&mut timer), Idle::Expired);
        assert_eq!(retry.on_idle(&mut timer), Idle::Exhausted);
    }
}
