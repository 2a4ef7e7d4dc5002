/*++

Licensed under the Apache-2.0 license.

File Name:

    catalog.rs

Abstract:

    File contains the compiled, ordered list of tests and the platform
    enablement predicate.

--*/

use acs_drivers::WdTimeoutType;

use crate::context::TestContext;
use crate::result::TestResult;

/// Test identifier: `suite * 200 + number`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct TestId(u32);

impl TestId {
    pub const INVALID: Self = Self(0xFFFF_FFFF);
    pub const TESTS_PER_SUITE: u32 = 200;

    pub const fn new(suite: u32, number: u32) -> Self {
        Self(suite * Self::TESTS_PER_SUITE + number)
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn suite(&self) -> Option<Suite> {
        if !self.is_valid() {
            return None;
        }
        Suite::from_index(self.0 / Self::TESTS_PER_SUITE)
    }

    /// Sequence number inside the suite
    pub fn number(&self) -> u32 {
        self.0 % Self::TESTS_PER_SUITE
    }
}

impl From<u32> for TestId {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<TestId> for u32 {
    fn from(id: TestId) -> u32 {
        id.0
    }
}

/// Feature suites a catalog draws from
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Suite {
    Ipc,
    Crypto,
    ProtectedStorage,
    InternalTrustedStorage,
    InitialAttestation,
}

impl Suite {
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Ipc),
            1 => Some(Self::Crypto),
            2 => Some(Self::ProtectedStorage),
            3 => Some(Self::InternalTrustedStorage),
            4 => Some(Self::InitialAttestation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ipc => "IPC",
            Self::Crypto => "Crypto",
            Self::ProtectedStorage => "Protected Storage",
            Self::InternalTrustedStorage => "Internal Trusted Storage",
            Self::InitialAttestation => "Attestation",
        }
    }
}

/// Code run for a test
pub trait TestEntry {
    fn run(&self, ctx: &mut TestContext<'_>) -> TestResult;
}

impl<F> TestEntry for F
where
    F: Fn(&mut TestContext<'_>) -> TestResult,
{
    fn run(&self, ctx: &mut TestContext<'_>) -> TestResult {
        self(ctx)
    }
}

pub struct TestRecord<'a> {
    pub id: TestId,
    pub desc: &'static str,
    pub timeout: WdTimeoutType,
    /// Lowest platform isolation level the test is meaningful on
    pub isolation_level: u8,
    pub entry: &'a dyn TestEntry,
    /// Entered instead of `entry` when resuming after an announced reset
    pub continuation: Option<&'a dyn TestEntry>,
}

impl<'a> TestRecord<'a> {
    pub const fn new(id: TestId, desc: &'static str, entry: &'a dyn TestEntry) -> Self {
        Self {
            id,
            desc,
            timeout: WdTimeoutType::Low,
            isolation_level: 1,
            entry,
            continuation: None,
        }
    }

    pub const fn with_timeout(mut self, timeout: WdTimeoutType) -> Self {
        self.timeout = timeout;
        self
    }

    pub const fn with_isolation_level(mut self, level: u8) -> Self {
        self.isolation_level = level;
        self
    }

    pub const fn with_continuation(mut self, continuation: &'a dyn TestEntry) -> Self {
        self.continuation = Some(continuation);
        self
    }
}

/// Ordered, build-time fixed list of tests
#[derive(Clone, Copy)]
pub struct Catalog<'a> {
    records: &'a [TestRecord<'a>],
}

impl<'a> Catalog<'a> {
    pub const fn new(records: &'a [TestRecord<'a>]) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TestRecord<'a>> {
        self.records.iter()
    }

    pub fn find(&self, id: TestId) -> Option<&'a TestRecord<'a>> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Entry following `id`; the first entry when `id` is invalid.
    ///
    /// An id that is not in the catalog ends the run.
    pub fn next_after(&self, id: TestId) -> Option<&'a TestRecord<'a>> {
        if !id.is_valid() {
            return self.records.first();
        }
        let pos = self.records.iter().position(|r| r.id == id)?;
        self.records.get(pos + 1)
    }

    /// Suite named in the report title
    pub fn suite(&self) -> Option<Suite> {
        self.records.first().and_then(|r| r.id.suite())
    }
}

/// Platform predicate deciding whether a test may run
pub trait TestEnablement {
    fn is_enabled(&self, id: TestId) -> bool;
}

impl<F> TestEnablement for F
where
    F: Fn(TestId) -> bool,
{
    fn is_enabled(&self, id: TestId) -> bool {
        self(id)
    }
}

/// Every test enabled
pub struct AllEnabled;

impl TestEnablement for AllEnabled {
    fn is_enabled(&self, _id: TestId) -> bool {
        true
    }
}
