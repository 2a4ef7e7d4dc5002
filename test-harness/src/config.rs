// Licensed under the Apache-2.0 license

use acs_drivers::{Verbosity, WdTimeoutType};

/// Watchdog timeout per class, in microseconds
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WdTimeouts {
    pub low_us: u32,
    pub medium_us: u32,
    pub high_us: u32,
    pub crypto_us: u32,
}

impl Default for WdTimeouts {
    fn default() -> Self {
        Self {
            low_us: 1_000_000,
            medium_us: 5_000_000,
            high_us: 10_000_000,
            crypto_us: 20_000_000,
        }
    }
}

impl WdTimeouts {
    pub fn us(&self, timeout: WdTimeoutType) -> u32 {
        match timeout {
            WdTimeoutType::Low => self.low_us,
            WdTimeoutType::Medium => self.medium_us,
            WdTimeoutType::High => self.high_us,
            WdTimeoutType::Crypto => self.crypto_us,
        }
    }
}

/// Platform settings the harness runs with
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HarnessConfig {
    pub verbosity: Verbosity,
    /// Isolation level the platform provides (1..=3)
    pub isolation_level: u8,
    pub wd_timeouts: WdTimeouts,
    pub wd_ticks_per_us: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Test,
            isolation_level: 1,
            wd_timeouts: WdTimeouts::default(),
            wd_ticks_per_us: 1,
        }
    }
}
