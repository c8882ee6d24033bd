// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Timing configuration for security protocol instances.
//!
//! All durations are in dispatcher ticks. The Wi-SUN stack ticks its
//! security protocols every 100 ms.

/// Milliseconds per timer tick
pub const SEC_PROT_TIMER_TICK_MS: u32 = 100;

/// Lifetime of a security protocol instance (30 minutes)
pub const SEC_TOTAL_TIMEOUT: u16 = 30 * 60 * 10;

/// Cleanup window after the Initial-Key exchange has finished
pub const KEY_SEC_FINISHED_TIMEOUT: u16 = 1;

/// Per-instance timer configuration handed to protocol constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecProtConfig {
    /// Ticks an instance may live before it is timed out
    pub total_timeout_ticks: u16,
    /// Ticks between `finished_ind` and the final `finished`
    pub finished_timeout_ticks: u16,
}

impl SecProtConfig {
    /// Create the default configuration
    pub const fn new() -> Self {
        Self {
            total_timeout_ticks: SEC_TOTAL_TIMEOUT,
            finished_timeout_ticks: KEY_SEC_FINISHED_TIMEOUT,
        }
    }

    /// Override the instance lifetime
    #[must_use]
    pub const fn with_total_timeout(mut self, ticks: u16) -> Self {
        self.total_timeout_ticks = ticks;
        self
    }

    /// Override the post-finish cleanup window (at least one tick)
    #[must_use]
    pub const fn with_finished_timeout(mut self, ticks: u16) -> Self {
        self.finished_timeout_ticks = if ticks == 0 { 1 } else { ticks };
        self
    }
}

impl Default for SecProtConfig {
    fn default() -> Self {
        Self::new()
    }
}
