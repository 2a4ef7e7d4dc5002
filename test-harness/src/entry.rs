// Licensed under the Apache-2.0 license

use acs_drivers::printer::set_verbosity;
use acs_drivers::{vprint, vprintln, Verbosity};
use acs_error::AcsResult;

use crate::catalog::Catalog;
use crate::config::HarnessConfig;
use crate::dispatcher::{Dispatcher, RunState};
use crate::env::HarnessEnv;
use crate::ledger::Ledger;
use crate::report::Report;

/// What one boot of the harness produced
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RunOutcome {
    pub state: RunState,
    pub report: Report,
}

impl RunOutcome {
    /// Failure iff any test failed
    pub fn status(&self) -> AcsResult<()> {
        self.report.status()
    }
}

/// Harness entry point, run on every device start.
///
/// Prints the banner on a fresh run, runs the remaining tests and the
/// report, then returns in place of entering standby.
pub fn harness_entry<'a>(
    mut env: HarnessEnv<'a>,
    catalog: Catalog<'a>,
    config: &'a HarnessConfig,
) -> RunOutcome {
    set_verbosity(config.verbosity);

    let fresh_run = !matches!(Ledger::new(&mut *env.nvmem).boot_state(), Ok(Some(_)));
    if fresh_run {
        vprintln!(
            Verbosity::Always,
            "\n***** Conformance Test Harness - Version {} *****",
            env!("CARGO_PKG_VERSION")
        );
    }

    let mut dispatcher = Dispatcher::new(env, catalog, config);
    let state = dispatcher.run();
    let report = dispatcher.report();
    vprint!(Verbosity::Always, "{}", report);
    vprintln!(Verbosity::Always, "\nEntering standby..");

    RunOutcome { state, report }
}
