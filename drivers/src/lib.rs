/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the platform collaborators consumed by the
    test harness.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod nvmem;
pub mod printer;
mod reset;
mod secure_call;
mod watchdog;

pub use acs_error::{AcsError, AcsResult};
pub use nvmem::NvMem;
pub use printer::{HexBytes, HexWord, Printer, Verbosity};
pub use reset::{ResetReason, SystemReset};
pub use secure_call::{CallStatus, ConnectionHandle, SecureCall};
pub use watchdog::{WatchdogStatus, WdTimeoutType, Watchdog};
