/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the host emulation of the harness platform.

--*/

mod device;
mod nvmem;
mod partition;
mod reset;
mod watchdog;

pub use device::{BootLimitExceeded, EmuDevice, EmuPlatform, DEFAULT_MAX_BOOTS};
pub use nvmem::{EmuNvMem, NVMEM_SIZE};
pub use partition::EmuSecurePartition;
pub use reset::{EmuReset, ResetRequest};
pub use watchdog::EmuWatchdog;
