/*++

Licensed under the Apache-2.0 license.

File Name:

    watchdog.rs

Abstract:

    File contains the hardware watchdog API.

--*/

use acs_error::AcsResult;

bitflags::bitflags! {
    /// Watchdog status bits
    pub struct WatchdogStatus : u32 {
        /// Timer is counting
        const ENABLED = 0x01;
        /// Timer reached zero
        const EXPIRED = 0x02;
    }
}

/// Timeout class a test declares for itself
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WdTimeoutType {
    Low,
    Medium,
    High,
    /// Cryptographic operations that need the longest bound
    Crypto,
}

/// Hardware watchdog that resets the device on expiry
pub trait Watchdog {
    /// Program the timer
    ///
    /// # Arguments
    ///
    /// * `time_us` - Timeout in microseconds
    /// * `ticks_per_us` - Timer ticks per microsecond
    fn init(&mut self, time_us: u32, ticks_per_us: u32) -> AcsResult<()>;

    /// Start counting
    fn enable(&mut self) -> AcsResult<()>;

    /// Stop counting
    fn disable(&mut self) -> AcsResult<()>;

    /// Current status
    fn status(&self) -> WatchdogStatus;
}
