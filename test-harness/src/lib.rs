/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the reboot-resilient test orchestration engine: the
    persistent ledger, the boot-state classifier, the catalog, the
    dispatcher loop, the cross-context handshake and the report.

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod boot;
mod catalog;
mod check;
mod config;
mod context;
mod dispatcher;
mod entry;
mod env;
pub mod handshake;
mod ledger;
mod report;
mod result;

pub use boot::{
    classify, BootSnapshot, BootState, ContextSide, Decision, ExpectedReset, Resumption,
};
pub use catalog::{AllEnabled, Catalog, Suite, TestEnablement, TestEntry, TestId, TestRecord};
pub use config::{HarnessConfig, WdTimeouts};
pub use context::TestContext;
pub use dispatcher::{Dispatcher, RunState};
pub use entry::{harness_entry, RunOutcome};
pub use env::HarnessEnv;
pub use handshake::{FarDispatcher, FarService, FarTestContext, ServerBlock, ServerTest};
pub use ledger::{
    Ledger, LedgerField, LedgerImage, ScratchSlot, TestCount, LEDGER_SIZE, SCRATCH_SLOTS,
};
pub use report::Report;
pub use result::{
    verdict_of, CheckTrail, CheckpointResult, TestError, TestResult, Verdict,
    CHECK_TRAIL_CAPACITY,
};
