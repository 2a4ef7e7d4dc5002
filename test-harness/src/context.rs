/*++

Licensed under the Apache-2.0 license.

File Name:

    context.rs

Abstract:

    File contains the handle a running test uses to reach the ledger,
    the watchdog and the far context.

--*/

use acs_drivers::{
    vprintln, NvMem, SecureCall, SystemReset, Verbosity, Watchdog, WdTimeoutType,
};
use acs_error::{AcsError, AcsResult};
use ufmt::uDebug;

use crate::boot::{BootState, ExpectedReset, Resumption};
use crate::catalog::{TestEntry, TestId};
use crate::check;
use crate::config::HarnessConfig;
use crate::env::HarnessEnv;
use crate::handshake::{self, FAR_CLIENT_SID, FAR_SERVER_SID};
use crate::ledger::{Ledger, ScratchSlot};
use crate::result::{CheckTrail, CheckpointResult, TestError, TestResult, Verdict};

/// Program and start the watchdog for a timeout class
pub(crate) fn arm_watchdog(
    watchdog: &mut dyn Watchdog,
    config: &HarnessConfig,
    timeout: WdTimeoutType,
) -> AcsResult<()> {
    watchdog
        .init(config.wd_timeouts.us(timeout), config.wd_ticks_per_us)
        .map_err(|_| AcsError::WATCHDOG_INIT_FAILED)?;
    watchdog
        .enable()
        .map_err(|_| AcsError::WATCHDOG_ENABLE_FAILED)
}

pub struct TestContext<'a> {
    nvmem: &'a mut dyn NvMem,
    watchdog: &'a mut dyn Watchdog,
    reset: &'a mut dyn SystemReset,
    secure_call: Option<&'a mut dyn SecureCall>,
    config: &'a HarnessConfig,
    test: TestId,
    resumption: Resumption,
    trail: CheckTrail,
}

impl<'a> TestContext<'a> {
    pub(crate) fn new(
        env: &'a mut HarnessEnv<'_>,
        config: &'a HarnessConfig,
        test: TestId,
        resumption: Resumption,
    ) -> Self {
        Self {
            nvmem: &mut *env.nvmem,
            watchdog: &mut *env.watchdog,
            reset: &mut *env.reset,
            secure_call: env
                .secure_call
                .as_deref_mut()
                .map(|call| call as &mut dyn SecureCall),
            config,
            test,
            resumption,
            trail: CheckTrail::default(),
        }
    }

    pub fn test_id(&self) -> TestId {
        self.test
    }

    /// How this invocation was entered
    pub fn resumption(&self) -> Resumption {
        self.resumption
    }

    pub fn config(&self) -> &HarnessConfig {
        self.config
    }

    pub fn check_trail(&self) -> &CheckTrail {
        &self.trail
    }

    pub fn ledger(&mut self) -> Ledger<'_> {
        Ledger::new(&mut *self.nvmem)
    }

    pub fn boot_state(&mut self) -> AcsResult<Option<BootState>> {
        self.ledger().boot_state()
    }

    pub fn set_boot_state(&mut self, state: BootState) -> AcsResult<()> {
        self.ledger().set_boot_state(state)
    }

    /// Announce a deliberate reset. Must immediately precede the risky step.
    pub fn expect_reset(&mut self, reset: ExpectedReset) -> AcsResult<()> {
        self.set_boot_state(BootState::Expected(reset))
    }

    /// The announced reset did not happen.
    ///
    /// Leaves `ExpectedButFailed` behind so an unrelated reset before the
    /// dispatcher records the test still counts it as failed.
    pub fn expected_reset_missed(&mut self) -> TestError {
        if let Err(err) = self.set_boot_state(BootState::ExpectedButFailed) {
            return TestError::SimError(err);
        }
        TestError::Fail(AcsError::TEST_RESET_NOT_REACHED)
    }

    pub fn scratch(&mut self, slot: ScratchSlot) -> AcsResult<u32> {
        self.ledger().scratch(slot)
    }

    pub fn set_scratch(&mut self, slot: ScratchSlot, val: u32) -> AcsResult<()> {
        self.ledger().set_scratch(slot, val)
    }

    /// Re-arm the watchdog with another timeout class
    pub fn reprogram_watchdog(&mut self, timeout: WdTimeoutType) -> AcsResult<()> {
        self.watchdog
            .disable()
            .map_err(|_| AcsError::WATCHDOG_DISABLE_FAILED)?;
        arm_watchdog(&mut *self.watchdog, self.config, timeout)
    }

    pub fn system_reset(&mut self) -> ! {
        self.reset.system_reset()
    }

    /// Block until the watchdog fires
    pub fn wait_for_reset(&mut self) -> ! {
        self.reset.wait_for_reset()
    }

    pub fn secure_call(&mut self) -> AcsResult<&mut dyn SecureCall> {
        match self.secure_call.as_deref_mut() {
            Some(call) => Ok(call as &mut dyn SecureCall),
            None => Err(AcsError::HANDSHAKE_CONNECTION_FAILED),
        }
    }

    pub fn assert_eq<T>(&mut self, checkpoint: u32, actual: T, expected: T) -> AcsResult<()>
    where
        T: PartialEq + uDebug,
    {
        check::eq(&mut self.trail, checkpoint, actual, expected)
    }

    /// Pass if `actual` matches either expected value
    pub fn assert_dual<T>(
        &mut self,
        checkpoint: u32,
        actual: T,
        expected: T,
        alternative: T,
    ) -> AcsResult<()>
    where
        T: PartialEq + uDebug,
    {
        check::dual(&mut self.trail, checkpoint, actual, expected, alternative)
    }

    pub fn assert_ne<T>(&mut self, checkpoint: u32, actual: T, unexpected: T) -> AcsResult<()>
    where
        T: PartialEq + uDebug,
    {
        check::ne(&mut self.trail, checkpoint, actual, unexpected)
    }

    pub fn assert_range<T>(&mut self, checkpoint: u32, actual: T, min: T, max: T) -> AcsResult<()>
    where
        T: PartialOrd + uDebug,
    {
        check::range(&mut self.trail, checkpoint, actual, min, max)
    }

    pub fn assert_memcmp(&mut self, checkpoint: u32, actual: &[u8], expected: &[u8]) -> AcsResult<()> {
        check::memcmp(&mut self.trail, checkpoint, actual, expected)
    }

    fn credit(&mut self, check: u32) {
        vprintln!(Verbosity::Debug, "[Check {}] PASSED", check);
        self.trail.push(CheckpointResult {
            num: check,
            verdict: Verdict::Pass,
        });
    }

    /// First block to run, crediting the blocks a resumption skips
    fn first_block(&mut self) -> u32 {
        match self.resumption {
            Resumption::Fresh | Resumption::Continue { .. } => 1,
            Resumption::AtBlock { start } => {
                for check in 1..start {
                    self.credit(check);
                }
                start
            }
            Resumption::AfterContextReset { block, .. } => {
                self.credit(block);
                block.saturating_add(1)
            }
        }
    }

    /// Run a test's check blocks in order, block 1 first.
    ///
    /// Before each block its number is persisted so a reset inside it can
    /// be resumed. With `server_handshake` every block is paired with the
    /// far-side block of the same number. The first block that fails or
    /// skips ends the run.
    pub fn execute_client_blocks(
        &mut self,
        blocks: &[&dyn TestEntry],
        server_handshake: bool,
    ) -> TestResult {
        let test_num = self.test.number() as u8;
        let mut block_num = self.first_block();
        while let Some(block) = block_num
            .checked_sub(1)
            .and_then(|index| blocks.get(index as usize))
        {
            let handle = if server_handshake {
                let handle = handshake::execute(
                    self.secure_call()?,
                    FAR_SERVER_SID,
                    test_num,
                    block_num as u8,
                )?;
                vprintln!(Verbosity::Debug, "[Check {}] START", block_num);
                Some(handle)
            } else {
                None
            };

            self.set_scratch(ScratchSlot::Slot2, block_num)?;
            let local = block.run(self);

            let result = match handle {
                Some(handle) => {
                    let far = handshake::return_result(self.secure_call()?, handle);
                    local.and(far)
                }
                None => local,
            };
            if server_handshake {
                match result {
                    Ok(()) => vprintln!(Verbosity::Debug, "[Check {}] PASSED", block_num),
                    Err(TestError::Skip(_)) => {
                        vprintln!(Verbosity::Debug, "[Check {}] SKIPPED", block_num)
                    }
                    Err(_) => vprintln!(Verbosity::Debug, "[Check {}] FAILED", block_num),
                }
            }
            result?;
            block_num += 1;
        }
        Ok(())
    }

    /// Run a test that lives entirely in the far context.
    ///
    /// After a reset announced from the far side the test resumes at the
    /// block following the one recorded in scratch slot 1, or at block 2
    /// or 3 for `ReenterTest` and `OnSecondCheck`.
    pub fn switch_to_far_client(&mut self) -> TestResult {
        let test_num = self.test.number() as u8;
        let start = self.first_block();
        let handle = handshake::execute(
            self.secure_call()?,
            FAR_CLIENT_SID,
            test_num,
            start as u8,
        )?;
        handshake::return_result(self.secure_call()?, handle)
    }
}
