/*++

Licensed under the Apache-2.0 license.

File Name:

    result.rs

Abstract:

    File contains test outcome types.

--*/

use acs_error::AcsError;

/// Final classification of one test
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Verdict {
    Pass,
    Fail,
    Skip,
    SimError,
}

/// Why a test did not pass
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TestError {
    Fail(AcsError),
    Skip(AcsError),
    /// The harness itself could not carry out the test
    SimError(AcsError),
}

impl TestError {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Fail(_) => Verdict::Fail,
            Self::Skip(_) => Verdict::Skip,
            Self::SimError(_) => Verdict::SimError,
        }
    }

    pub fn code(&self) -> AcsError {
        match self {
            Self::Fail(err) | Self::Skip(err) | Self::SimError(err) => *err,
        }
    }
}

const COMPONENT_NVMEM: u16 = 0x0001;
const COMPONENT_WATCHDOG: u16 = 0x0002;

impl From<AcsError> for TestError {
    /// Storage and watchdog errors mean the harness failed, not the test.
    fn from(err: AcsError) -> Self {
        match err.component() {
            COMPONENT_NVMEM | COMPONENT_WATCHDOG => Self::SimError(err),
            _ => Self::Fail(err),
        }
    }
}

pub type TestResult = Result<(), TestError>;

/// Verdict for a finished test result
pub fn verdict_of(result: &TestResult) -> Verdict {
    match result {
        Ok(()) => Verdict::Pass,
        Err(err) => err.verdict(),
    }
}

/// One numbered assertion point. Diagnostic only, never persisted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CheckpointResult {
    pub num: u32,
    pub verdict: Verdict,
}

pub const CHECK_TRAIL_CAPACITY: usize = 32;

/// Checkpoints hit by the running test, oldest first
#[derive(Debug, Clone)]
pub struct CheckTrail {
    entries: [Option<CheckpointResult>; CHECK_TRAIL_CAPACITY],
    len: usize,
    dropped: u32,
}

impl Default for CheckTrail {
    fn default() -> Self {
        Self {
            entries: [None; CHECK_TRAIL_CAPACITY],
            len: 0,
            dropped: 0,
        }
    }
}

impl CheckTrail {
    pub fn push(&mut self, result: CheckpointResult) {
        match self.entries.get_mut(self.len) {
            Some(slot) => {
                *slot = Some(result);
                self.len += 1;
            }
            None => self.dropped = self.dropped.saturating_add(1),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckpointResult> {
        self.entries[..self.len].iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Checkpoints that did not fit
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn last_failure(&self) -> Option<u32> {
        self.iter()
            .filter(|c| c.verdict == Verdict::Fail)
            .last()
            .map(|c| c.num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            TestError::from(AcsError::NVMEM_WRITE_FAILED).verdict(),
            Verdict::SimError
        );
        assert_eq!(
            TestError::from(AcsError::WATCHDOG_ENABLE_FAILED).verdict(),
            Verdict::SimError
        );
        assert_eq!(
            TestError::from(AcsError::HANDSHAKE_CALL_FAILED).verdict(),
            Verdict::Fail
        );
        assert_eq!(
            TestError::from(AcsError::TEST_ASSERTION_FAILED).code(),
            AcsError::TEST_ASSERTION_FAILED
        );
    }

    #[test]
    fn test_verdict_of() {
        assert_eq!(verdict_of(&Ok(())), Verdict::Pass);
        assert_eq!(
            verdict_of(&Err(TestError::Skip(AcsError::TEST_DISABLED_ON_PLATFORM))),
            Verdict::Skip
        );
    }

    #[test]
    fn test_check_trail() {
        let mut trail = CheckTrail::default();
        assert!(trail.is_empty());
        for num in 1..=CHECK_TRAIL_CAPACITY as u32 + 2 {
            let verdict = if num == 5 { Verdict::Fail } else { Verdict::Pass };
            trail.push(CheckpointResult { num, verdict });
        }
        assert_eq!(trail.len(), CHECK_TRAIL_CAPACITY);
        assert_eq!(trail.dropped(), 2);
        assert_eq!(trail.last_failure(), Some(5));
        assert_eq!(trail.iter().next().map(|c| c.num), Some(1));
    }
}
