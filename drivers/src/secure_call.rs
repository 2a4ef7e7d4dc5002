/*++

Licensed under the Apache-2.0 license.

File Name:

    secure_call.rs

Abstract:

    File contains the synchronous cross-context call primitive.

--*/

use acs_error::AcsResult;

/// Handle to an open connection with a far-side service
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConnectionHandle(pub u32);

/// Raw status returned by a far-side service. Zero is success.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CallStatus(pub i32);

impl CallStatus {
    pub const SUCCESS: Self = Self(0);

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }
}

/// Synchronous request/response transport into a second isolated context
pub trait SecureCall {
    /// Open a connection to the service identified by `sid`
    fn connect(&mut self, sid: u32, version: u32) -> AcsResult<ConnectionHandle>;

    /// Send `input` and optionally receive a reply into `output`
    ///
    /// # Returns
    ///
    /// The service status. Transport failures are reported as `Err`.
    fn call(
        &mut self,
        handle: ConnectionHandle,
        input: &[u8],
        output: Option<&mut [u8]>,
    ) -> AcsResult<CallStatus>;

    /// Release the connection
    fn close(&mut self, handle: ConnectionHandle);
}
