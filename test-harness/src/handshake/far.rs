/*++

Licensed under the Apache-2.0 license.

File Name:

    far.rs

Abstract:

    File contains the far-side dispatcher that serves handshake calls.

--*/

use acs_drivers::{NvMem, SystemReset};
use acs_error::{AcsError, AcsResult};
use smlang::statemachine;
use ufmt::uDebug;

use super::{encode_result, Action, HandshakeWord, FAR_CLIENT_SID, FAR_SERVER_SID};
use crate::boot::{BootState, ExpectedReset};
use crate::check;
use crate::ledger::{Ledger, ScratchSlot};
use crate::result::{CheckTrail, TestError, TestResult};

/// Which far-side dispatcher a connection is for
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FarService {
    /// Run the one server block matching a local client block
    Server,
    /// Run a far client test from the requested block to its end
    Client,
}

impl FarService {
    pub fn from_sid(sid: u32) -> Option<Self> {
        match sid {
            FAR_SERVER_SID => Some(Self::Server),
            FAR_CLIENT_SID => Some(Self::Client),
            _ => None,
        }
    }
}

/// Code run on the far side for one check block
pub trait ServerBlock {
    fn run(&self, ctx: &mut FarTestContext<'_>) -> TestResult;
}

impl<F> ServerBlock for F
where
    F: Fn(&mut FarTestContext<'_>) -> TestResult,
{
    fn run(&self, ctx: &mut FarTestContext<'_>) -> TestResult {
        self(ctx)
    }
}

/// Far-side blocks of one test, block 1 first
pub struct ServerTest<'a> {
    pub test_num: u8,
    pub blocks: &'a [&'a dyn ServerBlock],
}

/// What a far-side block can reach
pub struct FarTestContext<'a> {
    nvmem: &'a mut dyn NvMem,
    reset: &'a mut dyn SystemReset,
    test_num: u8,
    block: u8,
    trail: CheckTrail,
}

impl FarTestContext<'_> {
    pub fn test_num(&self) -> u8 {
        self.test_num
    }

    pub fn block(&self) -> u8 {
        self.block
    }

    pub fn ledger(&mut self) -> Ledger<'_> {
        Ledger::new(&mut *self.nvmem)
    }

    /// Announce a reset raised from this side.
    ///
    /// `ContextB` resumes the local side after this block. `ReenterTest`
    /// and `OnSecondCheck` resume a far client at block 2 or 3.
    pub fn expect_reset(&mut self, reset: ExpectedReset) -> AcsResult<()> {
        self.ledger().set_boot_state(BootState::Expected(reset))
    }

    /// The announced reset did not happen
    pub fn expected_reset_missed(&mut self) -> TestError {
        if let Err(err) = self.ledger().set_boot_state(BootState::ExpectedButFailed) {
            return TestError::SimError(err);
        }
        TestError::Fail(AcsError::TEST_RESET_NOT_REACHED)
    }

    pub fn system_reset(&mut self) -> ! {
        self.reset.system_reset()
    }

    pub fn wait_for_reset(&mut self) -> ! {
        self.reset.wait_for_reset()
    }

    pub fn assert_eq<T>(&mut self, checkpoint: u32, actual: T, expected: T) -> AcsResult<()>
    where
        T: PartialEq + uDebug,
    {
        check::eq(&mut self.trail, checkpoint, actual, expected)
    }

    pub fn check_trail(&self) -> &CheckTrail {
        &self.trail
    }
}

statemachine! {
    transitions: {
        *Idle + Connect(FarService) / open = Connected,
        Connected + Execute(HandshakeWord) / run_block = ResultPending,
        ResultPending + ReturnResult = Connected,
        Connected + Disconnect / close = Idle,
        ResultPending + Disconnect / close = Idle
    }
}

/// State machine extended variables.
pub struct Context<'a> {
    nvmem: &'a mut dyn NvMem,
    reset: &'a mut dyn SystemReset,
    tests: &'a [ServerTest<'a>],
    /// Service of the open connection
    service: FarService,
    /// Encoded result of the last EXECUTE
    result: u32,
}

impl Context<'_> {
    fn run_blocks(&mut self, word: &HandshakeWord) -> TestResult {
        let no_block = TestError::Fail(AcsError::HANDSHAKE_NO_CONTINUATION);
        let test = self
            .tests
            .iter()
            .find(|t| t.test_num == word.test_num())
            .ok_or(no_block)?;
        let first = usize::from(word.block_num());
        if first == 0 || first > test.blocks.len() {
            return Err(no_block);
        }
        let last = match self.service {
            FarService::Server => first,
            FarService::Client => test.blocks.len(),
        };
        for (index, block) in test.blocks.iter().enumerate().take(last).skip(first - 1) {
            let block_num = (index + 1) as u8;
            // Lets the local side resume after this block if it resets here
            Ledger::new(&mut *self.nvmem).set_scratch(ScratchSlot::Slot1, u32::from(block_num))?;
            let mut ctx = FarTestContext {
                nvmem: &mut *self.nvmem,
                reset: &mut *self.reset,
                test_num: test.test_num,
                block: block_num,
                trail: CheckTrail::default(),
            };
            block.run(&mut ctx)?;
        }
        Ok(())
    }
}

impl StateMachineContext for Context<'_> {
    // actions
    fn open(&mut self, service: &FarService) {
        self.service = *service;
        self.result = 0;
    }

    fn run_block(&mut self, word: &HandshakeWord) {
        let result = self.run_blocks(word);
        self.result = encode_result(&result);
    }

    fn close(&mut self) {
        self.result = 0;
    }
}

/// Far-side end of the handshake
pub struct FarDispatcher<'a> {
    state_machine: StateMachine<Context<'a>>,
}

impl<'a> FarDispatcher<'a> {
    pub fn new(
        nvmem: &'a mut dyn NvMem,
        reset: &'a mut dyn SystemReset,
        tests: &'a [ServerTest<'a>],
    ) -> Self {
        Self {
            state_machine: StateMachine::new(Context {
                nvmem,
                reset,
                tests,
                service: FarService::Server,
                result: 0,
            }),
        }
    }

    /// Accept a connection. Refused while another connection is open.
    pub fn connect(&mut self, service: FarService) -> AcsResult<()> {
        self.state_machine
            .process_event(Events::Connect(service))
            .map(|_| ())
            .map_err(|_| AcsError::HANDSHAKE_CONNECTION_REFUSED)
    }

    /// Serve one call on the open connection
    pub fn handle(&mut self, input: &[u8], output: Option<&mut [u8]>) -> AcsResult<()> {
        let word = HandshakeWord::from_bytes(input)?;
        match word.action() {
            Action::Execute => self
                .state_machine
                .process_event(Events::Execute(word))
                .map(|_| ())
                .map_err(|_| AcsError::HANDSHAKE_NOT_CONNECTED),
            Action::ReturnResult => {
                self.state_machine
                    .process_event(Events::ReturnResult)
                    .map_err(|_| AcsError::HANDSHAKE_NOT_CONNECTED)?;
                let reply = self.state_machine.context().result.to_le_bytes();
                let output = output.ok_or(AcsError::HANDSHAKE_READ_FAILED)?;
                output
                    .get_mut(..reply.len())
                    .ok_or(AcsError::HANDSHAKE_READ_FAILED)?
                    .copy_from_slice(&reply);
                Ok(())
            }
            Action::Invalid(_) => Err(AcsError::HANDSHAKE_INVALID_ACTION),
        }
    }

    pub fn disconnect(&mut self) {
        let _ = self.state_machine.process_event(Events::Disconnect);
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state_machine.state(), States::Idle)
    }
}
