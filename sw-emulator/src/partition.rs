/*++

Licensed under the Apache-2.0 license.

File Name:

    partition.rs

Abstract:

    File contains the emulated secure partition that carries handshake
    calls into the far-side dispatcher.

--*/

use acs_drivers::{CallStatus, ConnectionHandle, SecureCall};
use acs_error::{AcsError, AcsResult};
use acs_test_harness::handshake::FAR_SERVICE_VERSION;
use acs_test_harness::{FarDispatcher, FarService};

/// Status returned when the far side rejects a call
const STATUS_REJECTED: CallStatus = CallStatus(-1);

/// Far context reached through `SecureCall`
pub struct EmuSecurePartition<'a> {
    far: FarDispatcher<'a>,
    open: Option<ConnectionHandle>,
    next_handle: u32,
}

impl<'a> EmuSecurePartition<'a> {
    pub fn new(far: FarDispatcher<'a>) -> Self {
        Self {
            far,
            open: None,
            next_handle: 1,
        }
    }

    /// Handle of the open connection
    pub fn open_handle(&self) -> Option<ConnectionHandle> {
        self.open
    }
}

impl SecureCall for EmuSecurePartition<'_> {
    fn connect(&mut self, sid: u32, version: u32) -> AcsResult<ConnectionHandle> {
        let service = FarService::from_sid(sid).ok_or(AcsError::HANDSHAKE_CONNECTION_FAILED)?;
        if version != FAR_SERVICE_VERSION {
            return Err(AcsError::HANDSHAKE_CONNECTION_FAILED);
        }
        self.far.connect(service)?;
        let handle = ConnectionHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        self.open = Some(handle);
        Ok(handle)
    }

    fn call(
        &mut self,
        handle: ConnectionHandle,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> AcsResult<CallStatus> {
        if self.open != Some(handle) {
            return Err(AcsError::HANDSHAKE_NOT_CONNECTED);
        }
        match self.far.handle(input, output) {
            Ok(()) => Ok(CallStatus::SUCCESS),
            Err(_) => Ok(STATUS_REJECTED),
        }
    }

    fn close(&mut self, handle: ConnectionHandle) {
        if self.open == Some(handle) {
            self.far.disconnect();
            self.open = None;
        }
    }
}
