/*++

Licensed under the Apache-2.0 license.

File Name:

    device.rs

Abstract:

    File contains the emulated device: the boot loop that restarts the
    harness after every reset and the platform handed to each boot.

--*/

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};

use acs_drivers::{vprintln, ResetReason, SecureCall, Verbosity};
use acs_test_harness::{
    harness_entry, Catalog, FarDispatcher, HarnessConfig, HarnessEnv, RunOutcome, ServerTest,
    TestEnablement,
};

use crate::nvmem::EmuNvMem;
use crate::partition::EmuSecurePartition;
use crate::reset::{EmuReset, ResetRequest};
use crate::watchdog::EmuWatchdog;

/// Boots allowed before the device is declared stuck in a reset loop
pub const DEFAULT_MAX_BOOTS: u32 = 64;

/// The device kept rebooting without finishing
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootLimitExceeded(pub u32);

/// Peripherals visible to one boot
#[derive(Clone)]
pub struct EmuPlatform {
    pub nvmem: EmuNvMem,
    pub watchdog: EmuWatchdog,
    pub reset: EmuReset,
}

impl EmuPlatform {
    fn new(nvmem: EmuNvMem) -> Self {
        let watchdog = EmuWatchdog::new();
        Self {
            nvmem,
            reset: EmuReset::new(watchdog.clone()),
            watchdog,
        }
    }

    /// Run the harness entry point once on this platform.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Tests to run
    /// * `server_tests` - Far-side blocks; `None` builds a platform
    ///   without a far context
    /// * `enablement` - Platform predicate for each test
    /// * `config` - Harness settings
    pub fn run_harness<'c>(
        &mut self,
        catalog: Catalog<'c>,
        server_tests: Option<&'c [ServerTest<'c>]>,
        enablement: &'c dyn TestEnablement,
        config: &'c HarnessConfig,
    ) -> RunOutcome {
        let mut nvmem = self.nvmem.clone();
        let mut watchdog = self.watchdog.clone();
        let mut reset = self.reset.clone();
        let mut far_nvmem = self.nvmem.clone();
        let mut far_reset = self.reset.clone();

        let mut partition = None;
        if let Some(tests) = server_tests {
            partition = Some(EmuSecurePartition::new(FarDispatcher::new(
                &mut far_nvmem,
                &mut far_reset,
                tests,
            )));
        }
        let secure_call = partition
            .as_mut()
            .map(|partition| partition as &mut dyn SecureCall);

        let env = HarnessEnv {
            nvmem: &mut nvmem,
            watchdog: &mut watchdog,
            reset: &mut reset,
            secure_call,
            enablement,
        };
        harness_entry(env, catalog, config)
    }
}

/// Emulated device that reboots into the same code after each reset
pub struct EmuDevice {
    platform: EmuPlatform,
    boots: u32,
    max_boots: u32,
    resets: Vec<ResetReason>,
}

impl EmuDevice {
    /// Create a device with erased storage
    pub fn new() -> Self {
        Self::with_nvmem(EmuNvMem::default())
    }

    /// Create a device over existing storage
    pub fn with_nvmem(nvmem: EmuNvMem) -> Self {
        Self {
            platform: EmuPlatform::new(nvmem),
            boots: 0,
            max_boots: DEFAULT_MAX_BOOTS,
            resets: Vec::new(),
        }
    }

    pub fn set_max_boots(&mut self, max_boots: u32) {
        self.max_boots = max_boots;
    }

    pub fn nvmem(&self) -> &EmuNvMem {
        &self.platform.nvmem
    }

    pub fn watchdog(&self) -> &EmuWatchdog {
        &self.platform.watchdog
    }

    /// Boots since the device was created
    pub fn boots(&self) -> u32 {
        self.boots
    }

    /// Reason of every reset taken, oldest first
    pub fn resets(&self) -> &[ResetReason] {
        &self.resets
    }

    /// Power the device on and run `boot` until it returns.
    ///
    /// Every reset raised inside `boot` restarts it from the top with the
    /// peripherals in their power-on state. Storage keeps its contents.
    /// Any other panic is passed on to the caller.
    ///
    /// # Error
    ///
    /// * `BootLimitExceeded` - `boot` did not return within the boot limit
    pub fn run<T>(
        &mut self,
        mut boot: impl FnMut(&mut EmuPlatform) -> T,
    ) -> Result<T, BootLimitExceeded> {
        loop {
            if self.boots >= self.max_boots {
                return Err(BootLimitExceeded(self.boots));
            }
            self.boots += 1;
            self.platform.watchdog.power_on_reset();

            let platform = &mut self.platform;
            match catch_unwind(AssertUnwindSafe(|| boot(platform))) {
                Ok(val) => return Ok(val),
                Err(payload) => match payload.downcast_ref::<ResetRequest>() {
                    Some(request) => {
                        vprintln!(Verbosity::Info, "[emu] reset after boot {}", self.boots);
                        self.resets.push(request.reason);
                    }
                    None => resume_unwind(payload),
                },
            }
        }
    }

    /// Run the harness until it reaches standby.
    pub fn run_harness<'c>(
        &mut self,
        catalog: Catalog<'c>,
        server_tests: Option<&'c [ServerTest<'c>]>,
        enablement: &'c dyn TestEnablement,
        config: &'c HarnessConfig,
    ) -> Result<RunOutcome, BootLimitExceeded> {
        self.run(|platform| platform.run_harness(catalog, server_tests, enablement, config))
    }
}

impl Default for EmuDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acs_drivers::SystemReset;

    #[test]
    fn test_boot_without_reset() {
        let mut device = EmuDevice::new();
        assert_eq!(device.run(|_| 7), Ok(7));
        assert_eq!(device.boots(), 1);
        assert!(device.resets().is_empty());
    }

    #[test]
    fn test_reboot_keeps_storage() {
        let mut device = EmuDevice::new();
        let result = device.run(|platform| {
            let mut nvmem = platform.nvmem.clone();
            let mut seen = [0u8; 1];
            acs_drivers::NvMem::read(&mut nvmem, 0, &mut seen).unwrap();
            if seen[0] == 0xFF {
                acs_drivers::NvMem::write(&mut nvmem, 0, &[1]).unwrap();
                platform.reset.system_reset();
            }
            seen[0]
        });
        assert_eq!(result, Ok(1));
        assert_eq!(device.boots(), 2);
        assert_eq!(device.resets(), &[ResetReason::SoftwareReset]);
    }

    #[test]
    fn test_boot_limit() {
        let mut device = EmuDevice::new();
        device.set_max_boots(3);
        let result: Result<(), _> = device.run(|platform| platform.reset.system_reset());
        assert_eq!(result, Err(BootLimitExceeded(3)));
        assert_eq!(device.resets().len(), 3);
    }

    #[test]
    #[should_panic(expected = "watchdog stopped")]
    fn test_hang_without_watchdog_propagates() {
        let mut device = EmuDevice::new();
        let _: Result<(), _> = device.run(|platform| platform.reset.wait_for_reset());
    }
}
