/*++

Licensed under the Apache-2.0 license.

File Name:

    boot.rs

Abstract:

    File contains the persisted boot state and the classifier that decides
    how to resume after a device start.

--*/

use acs_error::AcsError;

use crate::catalog::TestId;
use crate::ledger::{LedgerImage, ScratchSlot};
use crate::result::Verdict;

/// Reset a test announced before taking a risky step
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExpectedReset {
    /// Reset raised while the local side of a handshake was running
    ContextA,
    /// Reset raised while the far side of a handshake was running
    ContextB,
    /// Resume at check 2, crediting check 1
    ReenterTest,
    /// Resume the same entry from its own progress marker
    ContinueExecution,
    /// Resume at check 3, crediting checks 1 and 2
    OnSecondCheck,
}

/// Why the device is starting
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootState {
    /// Between tests; nothing is in flight
    Unknown,
    /// A test is running and has not announced a reset
    NotExpected,
    /// A test announced a reset
    Expected(ExpectedReset),
    /// A test announced a reset that never happened
    ExpectedButFailed,
}

// Persisted encodings. Erased (all ones) and zeroed storage decode to
// nothing, which marks a cold boot.
const BOOT_UNKNOWN: u32 = 0xB007_0001;
const BOOT_NOT_EXPECTED: u32 = 0xB007_0002;
const BOOT_EXPECTED_CONTEXT_A: u32 = 0xB007_0003;
const BOOT_EXPECTED_CONTEXT_B: u32 = 0xB007_0004;
const BOOT_EXPECTED_BUT_FAILED: u32 = 0xB007_0005;
const BOOT_EXPECTED_REENTER_TEST: u32 = 0xB007_0006;
const BOOT_EXPECTED_CONT_TEST_EXEC: u32 = 0xB007_0007;
const BOOT_EXPECTED_ON_SECOND_CHECK: u32 = 0xB007_0008;

impl From<BootState> for u32 {
    fn from(state: BootState) -> u32 {
        match state {
            BootState::Unknown => BOOT_UNKNOWN,
            BootState::NotExpected => BOOT_NOT_EXPECTED,
            BootState::Expected(ExpectedReset::ContextA) => BOOT_EXPECTED_CONTEXT_A,
            BootState::Expected(ExpectedReset::ContextB) => BOOT_EXPECTED_CONTEXT_B,
            BootState::Expected(ExpectedReset::ReenterTest) => BOOT_EXPECTED_REENTER_TEST,
            BootState::Expected(ExpectedReset::ContinueExecution) => BOOT_EXPECTED_CONT_TEST_EXEC,
            BootState::Expected(ExpectedReset::OnSecondCheck) => BOOT_EXPECTED_ON_SECOND_CHECK,
            BootState::ExpectedButFailed => BOOT_EXPECTED_BUT_FAILED,
        }
    }
}

impl TryFrom<u32> for BootState {
    type Error = AcsError;

    fn try_from(val: u32) -> Result<Self, AcsError> {
        Ok(match val {
            BOOT_UNKNOWN => Self::Unknown,
            BOOT_NOT_EXPECTED => Self::NotExpected,
            BOOT_EXPECTED_CONTEXT_A => Self::Expected(ExpectedReset::ContextA),
            BOOT_EXPECTED_CONTEXT_B => Self::Expected(ExpectedReset::ContextB),
            BOOT_EXPECTED_BUT_FAILED => Self::ExpectedButFailed,
            BOOT_EXPECTED_REENTER_TEST => Self::Expected(ExpectedReset::ReenterTest),
            BOOT_EXPECTED_CONT_TEST_EXEC => Self::Expected(ExpectedReset::ContinueExecution),
            BOOT_EXPECTED_ON_SECOND_CHECK => Self::Expected(ExpectedReset::OnSecondCheck),
            _ => return Err(AcsError::BOOT_INVALID_STATE),
        })
    }
}

/// Side of a handshake that was running when a reset was announced
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContextSide {
    Local,
    Far,
}

/// How a test entry is (re-)entered
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Resumption {
    /// First invocation in this run
    Fresh,
    /// Resume at check block `start`, crediting every earlier block
    AtBlock { start: u32 },
    /// A reset announced from one side of a handshake; resume after `block`
    AfterContextReset { side: ContextSide, block: u32 },
    /// Re-enter the entry; it decides from `marker` where it was
    Continue { marker: u32 },
}

impl Resumption {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Ledger fields the classifier looks at
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootSnapshot {
    pub boot: u32,
    pub current: TestId,
    pub previous: TestId,
    pub scratch: [u32; 2],
}

impl From<&LedgerImage> for BootSnapshot {
    fn from(image: &LedgerImage) -> Self {
        Self {
            boot: image.boot,
            current: TestId::from(image.current),
            previous: TestId::from(image.previous),
            scratch: image.scratch,
        }
    }
}

impl BootSnapshot {
    fn slot(&self, slot: ScratchSlot) -> u32 {
        match slot {
            ScratchSlot::Slot1 => self.scratch[0],
            ScratchSlot::Slot2 => self.scratch[1],
        }
    }
}

/// What the dispatcher does first after a device start
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    /// Storage holds no run; initialise the ledger and start from the top
    ColdStart,
    /// Run the test following `after`, or the first one if `after` is invalid
    Advance { after: TestId },
    /// Record `test` with `verdict` without running it again, then advance
    Record {
        test: TestId,
        verdict: Verdict,
        cause: AcsError,
    },
    /// Re-enter `test`
    Resume { test: TestId, resumption: Resumption },
}

/// Decide how to resume from the persisted state.
///
/// The function is pure: the same snapshot always yields the same decision.
pub fn classify(snapshot: &BootSnapshot) -> Decision {
    let state = match BootState::try_from(snapshot.boot) {
        Ok(state) => state,
        Err(_) => return Decision::ColdStart,
    };

    // Every state but Unknown refers to the test in "current". If it was
    // already recorded as "previous", the reset hit after recording and
    // before the boot word went back to Unknown.
    let in_flight = snapshot.current.is_valid() && snapshot.current != snapshot.previous;
    if state != BootState::Unknown && !in_flight {
        return Decision::Advance {
            after: snapshot.previous,
        };
    }

    let test = snapshot.current;
    match state {
        BootState::Unknown => Decision::Advance {
            after: snapshot.previous,
        },
        BootState::NotExpected => Decision::Record {
            test,
            verdict: Verdict::SimError,
            cause: AcsError::BOOT_UNEXPECTED_REBOOT,
        },
        BootState::ExpectedButFailed => Decision::Record {
            test,
            verdict: Verdict::Fail,
            cause: AcsError::BOOT_EXPECTED_BUT_FAILED,
        },
        BootState::Expected(reset) => Decision::Resume {
            test,
            resumption: match reset {
                ExpectedReset::ReenterTest => Resumption::AtBlock { start: 2 },
                ExpectedReset::OnSecondCheck => Resumption::AtBlock { start: 3 },
                ExpectedReset::ContinueExecution => Resumption::Continue {
                    marker: snapshot.slot(ScratchSlot::Slot2),
                },
                ExpectedReset::ContextA => Resumption::AfterContextReset {
                    side: ContextSide::Local,
                    block: snapshot.slot(ScratchSlot::Slot2),
                },
                ExpectedReset::ContextB => Resumption::AfterContextReset {
                    side: ContextSide::Far,
                    block: snapshot.slot(ScratchSlot::Slot1),
                },
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: BootState, current: TestId, previous: TestId) -> BootSnapshot {
        BootSnapshot {
            boot: state.into(),
            current,
            previous,
            scratch: [4, 2],
        }
    }

    const T1: TestId = TestId::new(0, 1);
    const T2: TestId = TestId::new(0, 2);

    #[test]
    fn test_encoding_round_trip() {
        let states = [
            BootState::Unknown,
            BootState::NotExpected,
            BootState::ExpectedButFailed,
            BootState::Expected(ExpectedReset::ContextA),
            BootState::Expected(ExpectedReset::ContextB),
            BootState::Expected(ExpectedReset::ReenterTest),
            BootState::Expected(ExpectedReset::ContinueExecution),
            BootState::Expected(ExpectedReset::OnSecondCheck),
        ];
        for state in states {
            assert_eq!(BootState::try_from(u32::from(state)), Ok(state));
        }
        assert_eq!(
            BootState::try_from(0xffff_ffff),
            Err(AcsError::BOOT_INVALID_STATE)
        );
        assert!(BootState::try_from(0).is_err());
    }

    #[test]
    fn test_cold_start() {
        let mut s = snapshot(BootState::Unknown, T1, T1);
        s.boot = 0xffff_ffff;
        assert_eq!(classify(&s), Decision::ColdStart);
        s.boot = 0;
        assert_eq!(classify(&s), Decision::ColdStart);
    }

    #[test]
    fn test_unknown_advances() {
        assert_eq!(
            classify(&snapshot(BootState::Unknown, T1, T1)),
            Decision::Advance { after: T1 }
        );
        assert_eq!(
            classify(&snapshot(BootState::Unknown, TestId::INVALID, TestId::INVALID)),
            Decision::Advance {
                after: TestId::INVALID
            }
        );
    }

    #[test]
    fn test_not_expected_is_sim_error() {
        assert_eq!(
            classify(&snapshot(BootState::NotExpected, T2, T1)),
            Decision::Record {
                test: T2,
                verdict: Verdict::SimError,
                cause: AcsError::BOOT_UNEXPECTED_REBOOT,
            }
        );
    }

    #[test]
    fn test_expected_but_failed_is_fail() {
        assert_eq!(
            classify(&snapshot(BootState::ExpectedButFailed, T2, T1)),
            Decision::Record {
                test: T2,
                verdict: Verdict::Fail,
                cause: AcsError::BOOT_EXPECTED_BUT_FAILED,
            }
        );
    }

    #[test]
    fn test_already_recorded_is_not_counted_twice() {
        assert_eq!(
            classify(&snapshot(BootState::NotExpected, T2, T2)),
            Decision::Advance { after: T2 }
        );
        assert_eq!(
            classify(&snapshot(
                BootState::Expected(ExpectedReset::OnSecondCheck),
                T2,
                T2
            )),
            Decision::Advance { after: T2 }
        );
    }

    #[test]
    fn test_invalid_current_advances() {
        assert_eq!(
            classify(&snapshot(BootState::NotExpected, TestId::INVALID, T1)),
            Decision::Advance { after: T1 }
        );
    }

    #[test]
    fn test_resumptions() {
        let cases = [
            (ExpectedReset::ReenterTest, Resumption::AtBlock { start: 2 }),
            (ExpectedReset::OnSecondCheck, Resumption::AtBlock { start: 3 }),
            (
                ExpectedReset::ContinueExecution,
                Resumption::Continue { marker: 2 },
            ),
            (
                ExpectedReset::ContextA,
                Resumption::AfterContextReset {
                    side: ContextSide::Local,
                    block: 2,
                },
            ),
            (
                ExpectedReset::ContextB,
                Resumption::AfterContextReset {
                    side: ContextSide::Far,
                    block: 4,
                },
            ),
        ];
        for (reset, resumption) in cases {
            assert_eq!(
                classify(&snapshot(BootState::Expected(reset), T2, T1)),
                Decision::Resume {
                    test: T2,
                    resumption
                }
            );
        }
    }

    #[test]
    fn test_classify_is_deterministic() {
        for boot in [0u32, 0xffff_ffff, BOOT_UNKNOWN, BOOT_NOT_EXPECTED]
            .into_iter()
            .chain(BOOT_EXPECTED_CONTEXT_A..=BOOT_EXPECTED_ON_SECOND_CHECK)
        {
            for scratch in [[0, 0], [1, 3], [7, 2]] {
                let s = BootSnapshot {
                    boot,
                    current: T2,
                    previous: T1,
                    scratch,
                };
                let again = s;
                assert_eq!(classify(&s), classify(&again));
            }
        }
    }
}
