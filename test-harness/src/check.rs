/*++

Licensed under the Apache-2.0 license.

File Name:

    check.rs

Abstract:

    File contains the numbered checkpoint assertions shared by the local
    and far test contexts.

--*/

use acs_drivers::{vprintln, Verbosity};
use acs_error::{AcsError, AcsResult};
use ufmt::uDebug;

use crate::result::{CheckTrail, CheckpointResult, Verdict};

fn record(trail: &mut CheckTrail, checkpoint: u32, ok: bool) -> AcsResult<()> {
    let verdict = if ok { Verdict::Pass } else { Verdict::Fail };
    trail.push(CheckpointResult {
        num: checkpoint,
        verdict,
    });
    if ok {
        Ok(())
    } else {
        vprintln!(Verbosity::Error, "\tFailed at Checkpoint: {}", checkpoint);
        Err(AcsError::TEST_ASSERTION_FAILED)
    }
}

pub(crate) fn eq<T>(trail: &mut CheckTrail, checkpoint: u32, actual: T, expected: T) -> AcsResult<()>
where
    T: PartialEq + uDebug,
{
    let ok = actual == expected;
    if !ok {
        vprintln!(Verbosity::Error, "\tActual: {:?}", actual);
        vprintln!(Verbosity::Error, "\tExpected: {:?}", expected);
    }
    record(trail, checkpoint, ok)
}

pub(crate) fn dual<T>(
    trail: &mut CheckTrail,
    checkpoint: u32,
    actual: T,
    expected: T,
    alternative: T,
) -> AcsResult<()>
where
    T: PartialEq + uDebug,
{
    let ok = actual == expected || actual == alternative;
    if !ok {
        vprintln!(Verbosity::Error, "\tActual: {:?}", actual);
        vprintln!(
            Verbosity::Error,
            "\tExpected: {:?} or {:?}",
            expected,
            alternative
        );
    }
    record(trail, checkpoint, ok)
}

pub(crate) fn ne<T>(trail: &mut CheckTrail, checkpoint: u32, actual: T, unexpected: T) -> AcsResult<()>
where
    T: PartialEq + uDebug,
{
    let ok = actual != unexpected;
    if !ok {
        vprintln!(Verbosity::Error, "\tUnexpected value: {:?}", actual);
    }
    record(trail, checkpoint, ok)
}

pub(crate) fn range<T>(trail: &mut CheckTrail, checkpoint: u32, actual: T, min: T, max: T) -> AcsResult<()>
where
    T: PartialOrd + uDebug,
{
    let ok = actual >= min && actual <= max;
    if !ok {
        vprintln!(
            Verbosity::Error,
            "\tValue {:?} outside [{:?}, {:?}]",
            actual,
            min,
            max
        );
    }
    record(trail, checkpoint, ok)
}

pub(crate) fn memcmp(trail: &mut CheckTrail, checkpoint: u32, actual: &[u8], expected: &[u8]) -> AcsResult<()> {
    record(trail, checkpoint, actual == expected)
}
