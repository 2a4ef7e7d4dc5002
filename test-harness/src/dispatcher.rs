/*++

Licensed under the Apache-2.0 license.

File Name:

    dispatcher.rs

Abstract:

    File contains the loop that drives the catalog and keeps the ledger
    in step with every test boundary.

--*/

use acs_drivers::{vprintln, HexWord, Verbosity};
use acs_error::{AcsError, AcsResult};

use crate::boot::{classify, BootSnapshot, BootState, Decision, Resumption};
use crate::catalog::{Catalog, Suite, TestId, TestRecord};
use crate::config::HarnessConfig;
use crate::context::{arm_watchdog, TestContext};
use crate::env::HarnessEnv;
use crate::ledger::{Ledger, LedgerImage, TestCount};
use crate::report::Report;
use crate::result::{verdict_of, TestError, TestResult, Verdict};

/// In-memory copy of the run bookkeeping.
///
/// Loaded from the ledger on start and written back at every test
/// boundary. When a write fails this copy stays authoritative for the
/// rest of the boot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RunState {
    pub boot: BootState,
    pub current: TestId,
    pub previous: TestId,
    pub counts: TestCount,
}

impl RunState {
    pub fn fresh() -> Self {
        Self::from(&LedgerImage::fresh())
    }
}

impl From<&LedgerImage> for RunState {
    fn from(image: &LedgerImage) -> Self {
        Self {
            boot: BootState::try_from(image.boot).unwrap_or(BootState::Unknown),
            current: TestId::from(image.current),
            previous: TestId::from(image.previous),
            counts: image.counts,
        }
    }
}

type Next<'a> = Option<(&'a TestRecord<'a>, Resumption)>;

pub struct Dispatcher<'a> {
    env: HarnessEnv<'a>,
    catalog: Catalog<'a>,
    config: &'a HarnessConfig,
    state: RunState,
    /// A ledger write failed this boot; the persisted counters are stale
    ledger_dirty: bool,
    /// Suite whose banner was printed last
    suite: Option<Suite>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(env: HarnessEnv<'a>, catalog: Catalog<'a>, config: &'a HarnessConfig) -> Self {
        Self {
            env,
            catalog,
            config,
            state: RunState::fresh(),
            ledger_dirty: false,
            suite: None,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn ledger(&mut self) -> Ledger<'_> {
        Ledger::new(&mut *self.env.nvmem)
    }

    /// Run every remaining test, in catalog order
    pub fn run(&mut self) -> RunState {
        let mut next = self.start();
        while let Some((record, resumption)) = next {
            let verdict = self.execute(record, resumption);
            self.finish(record.id, verdict);
            next = self.fresh_after(record.id);
        }
        self.state
    }

    /// Summary built from the persisted counters, or from the in-memory
    /// ones if the ledger cannot be read or missed a write this boot
    pub fn report(&mut self) -> Report {
        let title = self.catalog.suite().map_or("Harness", |suite| suite.name());
        let counts = self.state.counts;
        if self.ledger_dirty {
            vprintln!(Verbosity::Warn, "Ledger is stale, reporting from memory");
            return Report::new(title, counts);
        }
        Report::load(&mut self.ledger(), title).unwrap_or_else(|err| {
            vprintln!(
                Verbosity::Warn,
                "Ledger read failed: {}, reporting from memory",
                HexWord(err.into())
            );
            Report::new(title, counts)
        })
    }

    fn fresh_after(&self, id: TestId) -> Next<'a> {
        self.catalog
            .next_after(id)
            .map(|record| (record, Resumption::Fresh))
    }

    /// Classify the device start and pick the first test to run
    fn start(&mut self) -> Next<'a> {
        let image = match self.ledger().read_image() {
            Ok(image) => image,
            Err(err) => {
                vprintln!(
                    Verbosity::Error,
                    "Ledger read failed: {}, starting from the top",
                    HexWord(err.into())
                );
                LedgerImage::fresh()
            }
        };
        self.state = RunState::from(&image);
        let snapshot = BootSnapshot::from(&image);

        match classify(&snapshot) {
            Decision::ColdStart => {
                if let Err(err) = self.ledger().initialize() {
                    vprintln!(
                        Verbosity::Error,
                        "Ledger init failed: {}",
                        HexWord(err.into())
                    );
                    self.ledger_dirty = true;
                }
                self.state = RunState::fresh();
                self.fresh_after(TestId::INVALID)
            }
            Decision::Advance { after } => self.fresh_after(after),
            Decision::Record {
                test,
                verdict,
                cause,
            } => {
                if let Some(record) = self.catalog.find(test) {
                    self.header(record);
                }
                self.state.current = test;
                let result: TestResult = Err(match verdict {
                    Verdict::Fail => TestError::Fail(cause),
                    _ => TestError::SimError(cause),
                });
                print_result(&result);
                self.finish(test, verdict);
                self.fresh_after(test)
            }
            Decision::Resume { test, resumption } => match self.catalog.find(test) {
                Some(record) => Some((record, resumption)),
                None => {
                    vprintln!(
                        Verbosity::Error,
                        "Resumed test {} is not in the catalog: {}",
                        u32::from(test),
                        HexWord(AcsError::CATALOG_TEST_NOT_FOUND.into())
                    );
                    self.fresh_after(snapshot.previous)
                }
            },
        }
    }

    fn header(&mut self, record: &TestRecord) {
        if let Some(suite) = record.id.suite() {
            if self.suite != Some(suite) {
                vprintln!(Verbosity::Always, "\nRunning.. {} Suite", suite.name());
                vprintln!(Verbosity::Always, "******************************************");
                self.suite = Some(suite);
            }
        }
        vprintln!(
            Verbosity::Always,
            "\nTEST: {} | DESCRIPTION: {}",
            u32::from(record.id),
            record.desc
        );
    }

    /// Run one test and translate its outcome
    fn execute(&mut self, record: &TestRecord, resumption: Resumption) -> Verdict {
        self.header(record);
        self.state.current = record.id;
        if !resumption.is_fresh() {
            vprintln!(Verbosity::Debug, "Resuming after an expected reset");
        }

        let result = if !self.env.enablement.is_enabled(record.id) {
            self.skip(record.id, AcsError::TEST_DISABLED_ON_PLATFORM)
        } else if record.isolation_level > self.config.isolation_level {
            self.skip(record.id, AcsError::TEST_ISOLATION_LEVEL_NOT_SUPPORTED)
        } else {
            self.invoke(record, resumption)
        };

        print_result(&result);
        verdict_of(&result)
    }

    fn skip(&mut self, id: TestId, code: AcsError) -> TestResult {
        self.ledger().set_current(id)?;
        Err(TestError::Skip(code))
    }

    fn invoke(&mut self, record: &TestRecord, resumption: Resumption) -> TestResult {
        arm_watchdog(&mut *self.env.watchdog, self.config, record.timeout)?;

        // The poison value must be in place before any step that could reset
        if let Err(err) = self.prepare(record.id) {
            self.disarm();
            return Err(TestError::SimError(err));
        }

        let entry = match (resumption.is_fresh(), record.continuation) {
            (false, Some(continuation)) => continuation,
            _ => record.entry,
        };
        let result = {
            let mut ctx = TestContext::new(&mut self.env, self.config, record.id, resumption);
            entry.run(&mut ctx)
        };

        self.disarm();
        result
    }

    fn prepare(&mut self, id: TestId) -> AcsResult<()> {
        let mut ledger = self.ledger();
        ledger.set_current(id)?;
        ledger.set_boot_state(BootState::NotExpected)
    }

    fn disarm(&mut self) {
        if self.env.watchdog.disable().is_err() {
            vprintln!(Verbosity::Warn, "Watchdog disable failed");
        }
    }

    /// Count `verdict` for `id` and mark it as the last finished test
    fn finish(&mut self, id: TestId, verdict: Verdict) {
        let mut counts = self.state.counts;
        counts.bump(verdict);
        if let Err(err) = self.persist_finish(id, &counts) {
            vprintln!(
                Verbosity::Error,
                "\tLedger update failed: {}",
                HexWord(err.into())
            );
            self.ledger_dirty = true;
            if verdict != Verdict::SimError {
                counts = self.state.counts;
                counts.bump(Verdict::SimError);
                if let Err(err) = self.persist_finish(id, &counts) {
                    vprintln!(
                        Verbosity::Error,
                        "\tLedger update failed again: {}",
                        HexWord(err.into())
                    );
                }
            }
        }
        self.state.counts = counts;
        self.state.previous = id;
        self.state.boot = BootState::Unknown;
    }

    // Counters, then previous, then the boot word. A reset after the
    // previous id is written is recognised by the classifier and not
    // counted twice.
    fn persist_finish(&mut self, id: TestId, counts: &TestCount) -> AcsResult<()> {
        let mut ledger = self.ledger();
        ledger.set_counts(counts)?;
        ledger.set_previous(id)?;
        ledger.set_boot_state(BootState::Unknown)
    }
}

fn print_result(result: &TestResult) {
    match result {
        Ok(()) => vprintln!(Verbosity::Always, "TEST RESULT: PASSED"),
        Err(TestError::Fail(err)) => vprintln!(
            Verbosity::Always,
            "TEST RESULT: FAILED (Error Code={})",
            HexWord((*err).into())
        ),
        Err(TestError::Skip(err)) => vprintln!(
            Verbosity::Always,
            "TEST RESULT: SKIPPED (Skip Code={})",
            HexWord((*err).into())
        ),
        Err(TestError::SimError(err)) => vprintln!(
            Verbosity::Always,
            "TEST RESULT: SIM ERROR (Error Code={})",
            HexWord((*err).into())
        ),
    }
}
