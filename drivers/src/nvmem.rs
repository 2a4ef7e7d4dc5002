/*++

Licensed under the Apache-2.0 license.

File Name:

    nvmem.rs

Abstract:

    File contains the non-volatile memory access primitive.

--*/

use acs_error::AcsResult;

/// Non-volatile memory window backing the harness ledger.
///
/// Writes are only atomic at the granularity of a single call; a reset
/// between two calls may leave the first one applied and the second not.
pub trait NvMem {
    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset into the window
    /// * `buf` - Destination buffer
    ///
    /// # Returns
    ///
    /// `NVMEM_READ_FAILED` or `NVMEM_OUT_OF_RANGE` on failure
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> AcsResult<()>;

    /// Write `data` starting at `offset`
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset into the window
    /// * `data` - Bytes to persist
    ///
    /// # Returns
    ///
    /// `NVMEM_WRITE_FAILED` or `NVMEM_OUT_OF_RANGE` on failure
    fn write(&mut self, offset: u32, data: &[u8]) -> AcsResult<()>;
}
