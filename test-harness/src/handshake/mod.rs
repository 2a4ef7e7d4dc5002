/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the request/response protocol used when a test spans
    two isolated execution contexts.

--*/

mod far;

pub use far::{FarDispatcher, FarService, FarTestContext, ServerBlock, ServerTest};

use acs_drivers::{vprintln, ConnectionHandle, HexWord, SecureCall, Verbosity};
use acs_error::{AcsError, AcsResult};
use bitfield::bitfield;

use crate::result::{TestError, TestResult};

/// Service id of the far-side dispatcher that runs one server block
pub const FAR_SERVER_SID: u32 = 0x0000_FA01;

/// Service id of the far-side dispatcher that runs a far client test
pub const FAR_CLIENT_SID: u32 = 0x0000_FA02;

pub const FAR_SERVICE_VERSION: u32 = 1;

/// Handshake action
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Action {
    /// Run the matching block and buffer its result
    Execute,
    /// Fetch the buffered result and release the connection
    ReturnResult,
    /// Anything else on the wire
    Invalid(u32),
}

impl From<u32> for Action {
    fn from(val: u32) -> Self {
        match val {
            1 => Self::Execute,
            2 => Self::ReturnResult,
            other => Self::Invalid(other),
        }
    }
}

impl From<Action> for u32 {
    fn from(action: Action) -> u32 {
        match action {
            Action::Execute => 1,
            Action::ReturnResult => 2,
            Action::Invalid(val) => val,
        }
    }
}

bitfield! {
    /// Control word carried as the sole payload of a handshake call
    #[derive(Clone, Copy, Eq, PartialEq)]
    pub struct HandshakeWord(u32);
    impl Debug;

    /// Test number inside its suite
    pub u8, test_num, set_test_num: 7, 0;

    /// Check block number
    pub u8, block_num, set_block_num: 15, 8;

    /// Requested action
    pub from into Action, action, set_action: 23, 16;
}

impl HandshakeWord {
    pub fn new(test_num: u8, block_num: u8, action: Action) -> Self {
        let mut word = Self(0);
        word.set_test_num(test_num);
        word.set_block_num(block_num);
        word.set_action(action);
        word
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> AcsResult<Self> {
        let word: [u8; 4] = bytes
            .try_into()
            .map_err(|_| AcsError::HANDSHAKE_READ_FAILED)?;
        Ok(Self(u32::from_le_bytes(word)))
    }
}

const RESULT_SKIP: u32 = 0x8000_0000;
const RESULT_SIM_ERROR: u32 = 0x4000_0000;
const RESULT_CODE_MASK: u32 = 0x3FFF_FFFF;

/// Encode a block result for the RETURN_RESULT reply
pub fn encode_result(result: &TestResult) -> u32 {
    match result {
        Ok(()) => 0,
        Err(TestError::Fail(err)) => u32::from(*err),
        Err(TestError::Skip(err)) => RESULT_SKIP | u32::from(*err),
        Err(TestError::SimError(err)) => RESULT_SIM_ERROR | u32::from(*err),
    }
}

pub fn decode_result(word: u32) -> TestResult {
    if word == 0 {
        return Ok(());
    }
    let err = AcsError::try_from(word & RESULT_CODE_MASK)
        .map_err(|_| TestError::Fail(AcsError::HANDSHAKE_READ_FAILED))?;
    Err(if word & RESULT_SKIP != 0 {
        TestError::Skip(err)
    } else if word & RESULT_SIM_ERROR != 0 {
        TestError::SimError(err)
    } else {
        TestError::Fail(err)
    })
}

/// Ask the far side to run `block_num` of `test_num`.
///
/// The connection stays open until `return_result` collects the result.
pub fn execute(
    call: &mut dyn SecureCall,
    sid: u32,
    test_num: u8,
    block_num: u8,
) -> AcsResult<ConnectionHandle> {
    let handle = call.connect(sid, FAR_SERVICE_VERSION).map_err(|err| {
        vprintln!(
            Verbosity::Error,
            "Could not connect SID. Status={}",
            HexWord(err.into())
        );
        AcsError::HANDSHAKE_CONNECTION_FAILED
    })?;
    let word = HandshakeWord::new(test_num, block_num, Action::Execute);
    match call.call(handle, &word.to_bytes(), None) {
        Ok(status) if status.is_success() => Ok(handle),
        _ => {
            vprintln!(Verbosity::Error, "Call to dispatch SF failed");
            call.close(handle);
            Err(AcsError::HANDSHAKE_CALL_FAILED)
        }
    }
}

/// Fetch the result buffered by the far side and close the connection
pub fn return_result(call: &mut dyn SecureCall, handle: ConnectionHandle) -> TestResult {
    let word = HandshakeWord::new(0, 0, Action::ReturnResult);
    let mut reply = [0u8; 4];
    let status = call.call(handle, &word.to_bytes(), Some(&mut reply[..]));
    call.close(handle);
    match status {
        Ok(status) if status.is_success() => decode_result(u32::from_le_bytes(reply)),
        _ => {
            vprintln!(Verbosity::Error, "Call to dispatch SF failed");
            Err(TestError::Fail(AcsError::HANDSHAKE_CALL_FAILED))
        }
    }
}
