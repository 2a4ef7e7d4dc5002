/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the harness for error handling

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Harness Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AcsError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: AcsError = AcsError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl AcsError {
    /// Create an error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get an AcsError from a u32 is to
    /// use `AcsError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("AcsError cannot be 0"),
        }
    }

    /// Component that raised the error (upper half-word of the code)
    pub const fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    define_error_constants![
        (NVMEM_READ_FAILED, 0x00010001, "Ledger storage read failed"),
        (NVMEM_WRITE_FAILED, 0x00010002, "Ledger storage write failed"),
        (
            NVMEM_OUT_OF_RANGE,
            0x00010003,
            "Ledger access outside the storage window"
        ),
        (WATCHDOG_INIT_FAILED, 0x00020001, "Watchdog init failed"),
        (WATCHDOG_ENABLE_FAILED, 0x00020002, "Watchdog enable failed"),
        (WATCHDOG_DISABLE_FAILED, 0x00020003, "Watchdog disable failed"),
        (
            HANDSHAKE_CONNECTION_FAILED,
            0x00030001,
            "Far-side connection could not be established"
        ),
        (
            HANDSHAKE_CALL_FAILED,
            0x00030002,
            "Far-side call returned an unexpected status"
        ),
        (
            HANDSHAKE_READ_FAILED,
            0x00030003,
            "Far-side message could not be read"
        ),
        (
            HANDSHAKE_INVALID_ACTION,
            0x00030004,
            "Handshake word carries an unknown action"
        ),
        (
            HANDSHAKE_NO_CONTINUATION,
            0x00030005,
            "Far side has no block for the requested test"
        ),
        (
            HANDSHAKE_CONNECTION_REFUSED,
            0x00030006,
            "Far side refused a connection while another is open"
        ),
        (
            HANDSHAKE_NOT_CONNECTED,
            0x00030007,
            "Handshake call without an open connection"
        ),
        (
            BOOT_UNEXPECTED_REBOOT,
            0x00040001,
            "Device restarted while the test had not declared a reset"
        ),
        (
            BOOT_EXPECTED_BUT_FAILED,
            0x00040002,
            "Declared reset path was never reached"
        ),
        (BOOT_INVALID_STATE, 0x00040003, "Unrecognized boot state"),
        (
            TEST_ASSERTION_FAILED,
            0x00050001,
            "Checkpoint value mismatch"
        ),
        (
            TEST_ISOLATION_LEVEL_NOT_SUPPORTED,
            0x00050002,
            "Platform isolation level is below the test requirement"
        ),
        (
            TEST_DISABLED_ON_PLATFORM,
            0x00050003,
            "Test disabled by the platform enablement predicate"
        ),
        (TEST_INIT_FAILED, 0x00050004, "Test setup failed"),
        (
            TEST_RESET_NOT_REACHED,
            0x00050005,
            "Test returned after requesting a reset"
        ),
        (CATALOG_TEST_NOT_FOUND, 0x00060001, "Test id is not in the catalog"),
        (RUN_TESTS_FAILED, 0x00070001, "At least one test failed"),
    ];
}

impl From<core::num::NonZeroU32> for crate::AcsError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::AcsError(val)
    }
}

impl From<AcsError> for core::num::NonZeroU32 {
    fn from(val: AcsError) -> Self {
        val.0
    }
}

impl From<AcsError> for u32 {
    fn from(val: AcsError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for AcsError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(AcsError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type AcsResult<T> = Result<T, AcsError>;
