/*++

Licensed under the Apache-2.0 license.

File Name:

    watchdog.rs

Abstract:

    File contains the emulated watchdog timer.

--*/

use std::cell::RefCell;
use std::rc::Rc;

use acs_drivers::{Watchdog, WatchdogStatus};
use acs_error::{AcsError, AcsResult};

/// Emulated watchdog.
///
/// Time does not advance on the host; a hang with the timer running is
/// what makes it expire (see `EmuReset::wait_for_reset`).
#[derive(Clone)]
pub struct EmuWatchdog {
    wdt: Rc<RefCell<WatchdogImpl>>,
}

impl EmuWatchdog {
    pub fn new() -> Self {
        Self {
            wdt: Rc::new(RefCell::new(WatchdogImpl::default())),
        }
    }

    /// Programmed timeout in timer ticks
    pub fn timeout_ticks(&self) -> u64 {
        self.wdt.borrow().timeout_ticks
    }

    pub fn is_enabled(&self) -> bool {
        self.wdt.borrow().enabled
    }

    /// Number of times the timer was programmed
    pub fn init_count(&self) -> u32 {
        self.wdt.borrow().init_count
    }

    /// Make `init` fail until cleared
    pub fn set_init_fault(&self, fail: bool) {
        self.wdt.borrow_mut().fail_init = fail;
    }

    /// Count down to zero. The timer stops and the device must reset.
    pub fn expire(&self) {
        let mut wdt = self.wdt.borrow_mut();
        wdt.enabled = false;
        wdt.expired = true;
    }

    /// Return the timer to its power-on state
    pub fn power_on_reset(&self) {
        let mut wdt = self.wdt.borrow_mut();
        wdt.enabled = false;
        wdt.expired = false;
        wdt.timeout_ticks = 0;
    }
}

impl Default for EmuWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog for EmuWatchdog {
    fn init(&mut self, time_us: u32, ticks_per_us: u32) -> AcsResult<()> {
        let mut wdt = self.wdt.borrow_mut();
        if wdt.fail_init {
            return Err(AcsError::WATCHDOG_INIT_FAILED);
        }
        wdt.timeout_ticks = u64::from(time_us) * u64::from(ticks_per_us);
        wdt.expired = false;
        wdt.init_count += 1;
        Ok(())
    }

    fn enable(&mut self) -> AcsResult<()> {
        let mut wdt = self.wdt.borrow_mut();
        if wdt.timeout_ticks == 0 {
            return Err(AcsError::WATCHDOG_ENABLE_FAILED);
        }
        wdt.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> AcsResult<()> {
        self.wdt.borrow_mut().enabled = false;
        Ok(())
    }

    fn status(&self) -> WatchdogStatus {
        let wdt = self.wdt.borrow();
        let mut status = WatchdogStatus::empty();
        status.set(WatchdogStatus::ENABLED, wdt.enabled);
        status.set(WatchdogStatus::EXPIRED, wdt.expired);
        status
    }
}

#[derive(Default)]
struct WatchdogImpl {
    timeout_ticks: u64,
    enabled: bool,
    expired: bool,
    init_count: u32,
    fail_init: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_and_disarm() {
        let mut wdt = EmuWatchdog::new();
        assert_eq!(wdt.init(1_000_000, 2).ok(), Some(()));
        assert_eq!(wdt.timeout_ticks(), 2_000_000);
        assert_eq!(wdt.enable().ok(), Some(()));
        assert_eq!(wdt.status(), WatchdogStatus::ENABLED);
        assert_eq!(wdt.disable().ok(), Some(()));
        assert!(wdt.status().is_empty());
    }

    #[test]
    fn test_enable_unprogrammed() {
        let mut wdt = EmuWatchdog::new();
        assert_eq!(wdt.enable(), Err(AcsError::WATCHDOG_ENABLE_FAILED));
    }

    #[test]
    fn test_expire() {
        let mut wdt = EmuWatchdog::new();
        wdt.init(10, 1).unwrap();
        wdt.enable().unwrap();
        wdt.clone().expire();
        assert_eq!(wdt.status(), WatchdogStatus::EXPIRED);

        wdt.power_on_reset();
        assert!(wdt.status().is_empty());
        assert_eq!(wdt.timeout_ticks(), 0);
    }

    #[test]
    fn test_init_fault() {
        let mut wdt = EmuWatchdog::new();
        wdt.set_init_fault(true);
        assert_eq!(wdt.init(10, 1), Err(AcsError::WATCHDOG_INIT_FAILED));
        assert_eq!(wdt.init_count(), 0);
    }
}
