/*++

Licensed under the Apache-2.0 license.

File Name:

    report.rs

Abstract:

    File contains the end-of-run summary.

--*/

use acs_error::{AcsError, AcsResult};
use ufmt::{uDisplay, uWrite, uwriteln};

use crate::ledger::{Ledger, TestCount};

/// Summary of a finished run
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Report {
    title: &'static str,
    counts: TestCount,
}

impl Report {
    pub fn new(title: &'static str, counts: TestCount) -> Self {
        Self { title, counts }
    }

    /// Build the report from the persisted counters
    pub fn load(ledger: &mut Ledger, title: &'static str) -> AcsResult<Self> {
        Ok(Self::new(title, ledger.counts()?))
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn counts(&self) -> &TestCount {
        &self.counts
    }

    pub fn total(&self) -> u32 {
        self.counts.total()
    }

    /// Failure iff any test failed
    pub fn status(&self) -> AcsResult<()> {
        if self.counts.fail > 0 {
            Err(AcsError::RUN_TESTS_FAILED)
        } else {
            Ok(())
        }
    }
}

impl uDisplay for Report {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str("\n")?;
        uwriteln!(f, "************ {} Report **********", self.title)?;
        uwriteln!(f, "TOTAL TESTS     : {}", self.total())?;
        uwriteln!(f, "TOTAL PASSED    : {}", self.counts.pass)?;
        uwriteln!(f, "TOTAL SIM ERROR : {}", self.counts.sim_error)?;
        uwriteln!(f, "TOTAL FAILED    : {}", self.counts.fail)?;
        uwriteln!(f, "TOTAL SKIPPED   : {}", self.counts.skip)?;
        uwriteln!(f, "******************************************")
    }
}
