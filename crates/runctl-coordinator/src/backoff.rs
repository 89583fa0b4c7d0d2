// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-rolled exponential backoff for `CSA.launch` retries. There is no
//! backoff crate in play elsewhere in this codebase, so this follows the
//! same plain `tokio::time::sleep` loop shape used by the worker-queue
//! polling and timer-rearm paths this coordinator is modeled on.

use std::time::Duration;

pub(crate) struct Backoff {
    next_delay: Duration,
    budget_remaining: Duration,
}

impl Backoff {
    pub(crate) fn new(initial_delay: Duration, budget: Duration) -> Self {
        Self { next_delay: initial_delay, budget_remaining: budget }
    }

    /// Sleep for the next backoff interval and account it against the
    /// remaining budget. Returns `false` once the budget is exhausted,
    /// meaning the caller should stop retrying.
    pub(crate) async fn wait(&mut self) -> bool {
        if self.budget_remaining.is_zero() {
            return false;
        }
        let delay = self.next_delay.min(self.budget_remaining);
        tokio::time::sleep(delay).await;
        self.budget_remaining = self.budget_remaining.saturating_sub(delay);
        self.next_delay = self.next_delay.saturating_mul(2);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_stops_once_budget_is_exhausted() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(25));
        assert!(backoff.wait().await); // consumes 10ms, 15ms left
        assert!(backoff.wait().await); // wants 20ms, capped to 15ms, 0ms left
        assert!(!backoff.wait().await); // budget exhausted
    }
}
