/*++

Licensed under the Apache-2.0 license.

File Name:

    reset.rs

Abstract:

    File contains reset related API

--*/

/// Reset Reason
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ResetReason {
    /// Power-on or first start of a run
    ColdReset,

    /// Reset requested by software
    SoftwareReset,

    /// Watchdog expired
    WatchdogReset,
}

/// Whole-device reset service
///
/// Neither call returns; execution restarts from the harness entry point.
pub trait SystemReset {
    /// Reset the device immediately
    fn system_reset(&mut self) -> !;

    /// Spin until the armed watchdog resets the device
    fn wait_for_reset(&mut self) -> !;
}
