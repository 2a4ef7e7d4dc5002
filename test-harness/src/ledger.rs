/*++

Licensed under the Apache-2.0 license.

File Name:

    ledger.rs

Abstract:

    File contains the fixed-offset persistent ledger that survives device
    resets.

--*/

use acs_drivers::NvMem;
use acs_error::{AcsError, AcsResult};
use core::mem::{offset_of, size_of};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::boot::BootState;
use crate::catalog::TestId;
use crate::result::Verdict;

/// Outcome counters of one run
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct TestCount {
    pub pass: u32,
    pub fail: u32,
    pub skip: u32,
    pub sim_error: u32,
}

impl TestCount {
    pub fn total(&self) -> u32 {
        self.pass
            .saturating_add(self.fail)
            .saturating_add(self.skip)
            .saturating_add(self.sim_error)
    }

    /// Count one more test with the given verdict
    pub fn bump(&mut self, verdict: Verdict) {
        let slot = match verdict {
            Verdict::Pass => &mut self.pass,
            Verdict::Fail => &mut self.fail,
            Verdict::Skip => &mut self.skip,
            Verdict::SimError => &mut self.sim_error,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Persisted layout. Every field is one word so a single field write is
/// atomic on the medium.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct LedgerImage {
    pub boot: u32,
    pub current: u32,
    pub previous: u32,
    pub counts: TestCount,
    pub scratch: [u32; SCRATCH_SLOTS],
}

pub const SCRATCH_SLOTS: usize = 2;
pub const LEDGER_SIZE: usize = size_of::<LedgerImage>();

const _: () = assert!(LEDGER_SIZE == 9 * size_of::<u32>());

impl LedgerImage {
    /// Values a fresh run starts from
    pub fn fresh() -> Self {
        Self {
            boot: BootState::Unknown.into(),
            current: TestId::INVALID.into(),
            previous: TestId::INVALID.into(),
            counts: TestCount::default(),
            scratch: [0; SCRATCH_SLOTS],
        }
    }
}

/// Scratch slots a test uses to remember progress finer than the boot state
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScratchSlot {
    /// Block reached on the far side of a handshake
    Slot1,
    /// Block reached on the local side
    Slot2,
}

impl ScratchSlot {
    fn index(self) -> usize {
        match self {
            Self::Slot1 => 0,
            Self::Slot2 => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LedgerField {
    BootState,
    CurrentTest,
    PreviousTest,
    PassCount,
    FailCount,
    SkipCount,
    SimErrorCount,
    Scratch(ScratchSlot),
}

impl LedgerField {
    /// Byte offset of the field inside the ledger window
    pub fn offset(self) -> u32 {
        let counts = offset_of!(LedgerImage, counts);
        let offset = match self {
            Self::BootState => offset_of!(LedgerImage, boot),
            Self::CurrentTest => offset_of!(LedgerImage, current),
            Self::PreviousTest => offset_of!(LedgerImage, previous),
            Self::PassCount => counts + offset_of!(TestCount, pass),
            Self::FailCount => counts + offset_of!(TestCount, fail),
            Self::SkipCount => counts + offset_of!(TestCount, skip),
            Self::SimErrorCount => counts + offset_of!(TestCount, sim_error),
            Self::Scratch(slot) => {
                offset_of!(LedgerImage, scratch) + slot.index() * size_of::<u32>()
            }
        };
        offset as u32
    }
}

/// Typed view over the ledger window of a non-volatile memory
pub struct Ledger<'a> {
    nvmem: &'a mut dyn NvMem,
    base: u32,
}

impl<'a> Ledger<'a> {
    /// Create a ledger at offset zero of `nvmem`
    pub fn new(nvmem: &'a mut dyn NvMem) -> Self {
        Self::with_base(nvmem, 0)
    }

    /// Create a ledger at `base` bytes into `nvmem`
    pub fn with_base(nvmem: &'a mut dyn NvMem, base: u32) -> Self {
        Self { nvmem, base }
    }

    fn addr(&self, offset: u32) -> AcsResult<u32> {
        self.base
            .checked_add(offset)
            .ok_or(AcsError::NVMEM_OUT_OF_RANGE)
    }

    /// Read one field
    pub fn read(&mut self, field: LedgerField) -> AcsResult<u32> {
        let mut word = [0u8; 4];
        let addr = self.addr(field.offset())?;
        self.nvmem.read(addr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Write one field
    pub fn write(&mut self, field: LedgerField, val: u32) -> AcsResult<()> {
        let addr = self.addr(field.offset())?;
        self.nvmem.write(addr, &val.to_le_bytes())
    }

    /// Read every field at once
    pub fn read_image(&mut self) -> AcsResult<LedgerImage> {
        let mut buf = [0u8; LEDGER_SIZE];
        let addr = self.addr(0)?;
        self.nvmem.read(addr, &mut buf)?;
        LedgerImage::read_from_bytes(&buf).map_err(|_| AcsError::NVMEM_READ_FAILED)
    }

    /// Default every field for a fresh run.
    ///
    /// The boot word is written last so an interrupted initialisation is
    /// detected again as a cold boot.
    pub fn initialize(&mut self) -> AcsResult<()> {
        let image = LedgerImage::fresh();
        let bytes = image.as_bytes();
        let boot_len = size_of::<u32>();
        let addr = self.addr(boot_len as u32)?;
        self.nvmem.write(addr, &bytes[boot_len..])?;
        self.write(LedgerField::BootState, image.boot)
    }

    pub fn boot_state(&mut self) -> AcsResult<Option<BootState>> {
        Ok(BootState::try_from(self.read(LedgerField::BootState)?).ok())
    }

    pub fn set_boot_state(&mut self, state: BootState) -> AcsResult<()> {
        self.write(LedgerField::BootState, state.into())
    }

    pub fn set_current(&mut self, id: TestId) -> AcsResult<()> {
        self.write(LedgerField::CurrentTest, id.into())
    }

    pub fn set_previous(&mut self, id: TestId) -> AcsResult<()> {
        self.write(LedgerField::PreviousTest, id.into())
    }

    pub fn scratch(&mut self, slot: ScratchSlot) -> AcsResult<u32> {
        self.read(LedgerField::Scratch(slot))
    }

    pub fn set_scratch(&mut self, slot: ScratchSlot, val: u32) -> AcsResult<()> {
        self.write(LedgerField::Scratch(slot), val)
    }

    pub fn counts(&mut self) -> AcsResult<TestCount> {
        Ok(self.read_image()?.counts)
    }

    /// Persist all four counters with one write
    pub fn set_counts(&mut self, counts: &TestCount) -> AcsResult<()> {
        let addr = self.addr(LedgerField::PassCount.offset())?;
        self.nvmem.write(addr, counts.as_bytes())
    }
}
