/*++

Licensed under the Apache-2.0 license.

File Name:

    reset.rs

Abstract:

    File contains the emulated reset controller. A reset unwinds the stack
    back to the device boot loop.

--*/

use acs_drivers::{ResetReason, SystemReset};

use crate::watchdog::EmuWatchdog;

/// Unwind payload asking the device to reboot
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResetRequest {
    pub reason: ResetReason,
}

impl ResetRequest {
    /// Abandon the current boot
    pub fn raise(reason: ResetReason) -> ! {
        std::panic::resume_unwind(Box::new(Self { reason }))
    }
}

/// Reset controller wired to the device watchdog
#[derive(Clone)]
pub struct EmuReset {
    watchdog: EmuWatchdog,
}

impl EmuReset {
    pub fn new(watchdog: EmuWatchdog) -> Self {
        Self { watchdog }
    }
}

impl SystemReset for EmuReset {
    fn system_reset(&mut self) -> ! {
        ResetRequest::raise(ResetReason::SoftwareReset)
    }

    /// Hang until the watchdog bites.
    ///
    /// A hang with the watchdog stopped would never end on hardware. The
    /// emulator reports it as a fault of the code under test.
    fn wait_for_reset(&mut self) -> ! {
        if !self.watchdog.is_enabled() {
            panic!("device hung with the watchdog stopped");
        }
        self.watchdog.expire();
        ResetRequest::raise(ResetReason::WatchdogReset)
    }
}
