/*++

Licensed under the Apache-2.0 license.

File Name:

    nvmem.rs

Abstract:

    File contains the emulated non-volatile memory that survives resets.

--*/

use std::cell::RefCell;
use std::rc::Rc;

use acs_drivers::{NvMem, ResetReason};
use acs_error::{AcsError, AcsResult};

use crate::reset::ResetRequest;

/// Default size of the emulated storage in bytes
pub const NVMEM_SIZE: usize = 0x100;

/// Erased cell value
const ERASED: u8 = 0xFF;

/// Emulated non-volatile memory.
///
/// Clones share the same cells, so every context of the device and the
/// test driving it see one storage that outlives each boot.
#[derive(Clone)]
pub struct EmuNvMem {
    nvmem: Rc<RefCell<NvMemImpl>>,
}

impl EmuNvMem {
    /// Create erased storage of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            nvmem: Rc::new(RefCell::new(NvMemImpl::new(size))),
        }
    }

    /// Create storage holding a saved image
    pub fn from_image(image: Vec<u8>) -> Self {
        let mut nvmem = NvMemImpl::new(0);
        nvmem.mem = image;
        Self {
            nvmem: Rc::new(RefCell::new(nvmem)),
        }
    }

    /// Return every cell to the erased state
    pub fn erase(&self) {
        self.nvmem.borrow_mut().mem.fill(ERASED);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Vec<u8> {
        self.nvmem.borrow().mem.clone()
    }

    /// Little-endian word at `offset`
    pub fn word(&self, offset: u32) -> Option<u32> {
        let nvmem = self.nvmem.borrow();
        let start = offset as usize;
        let bytes = nvmem.mem.get(start..start + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Fail every read until cleared
    pub fn set_read_fault(&self, fail: bool) {
        self.nvmem.borrow_mut().fail_reads = fail;
    }

    /// Fail every write touching `offset` until cleared
    pub fn set_write_fault(&self, offset: Option<u32>) {
        self.nvmem.borrow_mut().fail_writes_at = offset;
    }

    /// Let `writes` more writes land, then cut power on the next one.
    ///
    /// The interrupted write is not applied. The cut fires once.
    pub fn cut_power_after(&self, writes: u32) {
        self.nvmem.borrow_mut().power_cut_in = Some(writes);
    }

    /// Number of successful writes since creation
    pub fn write_count(&self) -> u64 {
        self.nvmem.borrow().writes
    }
}

impl Default for EmuNvMem {
    fn default() -> Self {
        Self::new(NVMEM_SIZE)
    }
}

impl NvMem for EmuNvMem {
    /// Read from storage
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset to read from
    /// * `buf` - Buffer to fill
    ///
    /// # Error
    ///
    /// * `AcsError::NVMEM_READ_FAILED` - Read fault injected
    /// * `AcsError::NVMEM_OUT_OF_RANGE` - Access beyond the storage
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> AcsResult<()> {
        let nvmem = self.nvmem.borrow();
        if nvmem.fail_reads {
            return Err(AcsError::NVMEM_READ_FAILED);
        }
        let src = nvmem.range(offset, buf.len())?;
        buf.copy_from_slice(&nvmem.mem[src]);
        Ok(())
    }

    /// Write to storage
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset to write to
    /// * `data` - Bytes to store
    ///
    /// # Error
    ///
    /// * `AcsError::NVMEM_WRITE_FAILED` - Write fault injected
    /// * `AcsError::NVMEM_OUT_OF_RANGE` - Access beyond the storage
    fn write(&mut self, offset: u32, data: &[u8]) -> AcsResult<()> {
        let cut = {
            let mut nvmem = self.nvmem.borrow_mut();
            let left = nvmem.power_cut_in;
            nvmem.power_cut_in = left.and_then(|n| n.checked_sub(1));
            left == Some(0)
        };
        if cut {
            ResetRequest::raise(ResetReason::ColdReset);
        }

        let mut nvmem = self.nvmem.borrow_mut();
        let dst = nvmem.range(offset, data.len())?;
        if let Some(fault) = nvmem.fail_writes_at {
            if dst.contains(&(fault as usize)) {
                return Err(AcsError::NVMEM_WRITE_FAILED);
            }
        }
        nvmem.mem[dst].copy_from_slice(data);
        nvmem.writes += 1;
        Ok(())
    }
}

struct NvMemImpl {
    mem: Vec<u8>,
    fail_reads: bool,
    fail_writes_at: Option<u32>,
    power_cut_in: Option<u32>,
    writes: u64,
}

impl NvMemImpl {
    fn new(size: usize) -> Self {
        Self {
            mem: vec![ERASED; size],
            fail_reads: false,
            fail_writes_at: None,
            power_cut_in: None,
            writes: 0,
        }
    }

    fn range(&self, offset: u32, len: usize) -> AcsResult<std::ops::Range<usize>> {
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.mem.len())
            .ok_or(AcsError::NVMEM_OUT_OF_RANGE)?;
        Ok(start..end)
    }
}
