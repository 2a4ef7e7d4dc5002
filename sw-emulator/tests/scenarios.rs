// Licensed under the Apache-2.0 license

use std::cell::RefCell;

use acs_drivers::{ResetReason, Verbosity};
use acs_emu::EmuDevice;
use acs_test_harness::{
    AllEnabled, BootState, Catalog, ExpectedReset, HarnessConfig, Resumption, ScratchSlot,
    TestContext, TestEntry, TestId, TestRecord, TestResult, Verdict,
};

thread_local! {
    static LOG: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
}

fn log(event: &'static str) {
    LOG.with(|l| l.borrow_mut().push(event));
}

fn take_log() -> Vec<&'static str> {
    LOG.with(|l| std::mem::take(&mut *l.borrow_mut()))
}

fn config() -> HarnessConfig {
    HarnessConfig {
        verbosity: Verbosity::Debug,
        ..Default::default()
    }
}

const T1: TestId = TestId::new(1, 1);
const T2: TestId = TestId::new(1, 2);
const T3: TestId = TestId::new(1, 3);

fn t1(ctx: &mut TestContext) -> TestResult {
    log("t1");
    ctx.assert_eq(1, 0x10u32, 0x10u32)?;
    Ok(())
}

fn t2(ctx: &mut TestContext) -> TestResult {
    log("t2");
    ctx.assert_ne(1, 1u8, 2u8)?;
    Ok(())
}

fn t3(ctx: &mut TestContext) -> TestResult {
    log("t3");
    ctx.assert_range(1, 5u32, 1u32, 10u32)?;
    Ok(())
}

fn hang(ctx: &mut TestContext) -> TestResult {
    log("hang");
    ctx.wait_for_reset()
}

fn unannounced_reset(ctx: &mut TestContext) -> TestResult {
    log("reset");
    ctx.system_reset()
}

#[test]
fn test_clean_run() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "second", &t2),
        TestRecord::new(T3, "third", &t3),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    assert_eq!(outcome.report.counts().pass, 3);
    assert_eq!(outcome.report.total(), 3);
    assert_eq!(outcome.status(), Ok(()));
    assert_eq!(take_log(), ["t1", "t2", "t3"]);
    assert_eq!(device.boots(), 1);
    assert_eq!(outcome.state.boot, BootState::Unknown);
    assert_eq!(outcome.state.previous, T3);

    let mut rendered = String::new();
    ufmt::uwrite!(&mut rendered, "{}", outcome.report).unwrap();
    assert!(rendered.contains("************ Crypto Report **********"));
    assert!(rendered.contains("TOTAL TESTS     : 3"));
    assert!(rendered.contains("TOTAL PASSED    : 3"));
    assert!(rendered.contains("TOTAL FAILED    : 0"));
}

#[test]
fn test_hang_is_recorded_as_sim_error() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "hangs", &hang),
        TestRecord::new(T3, "third", &t3),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!(counts.pass, 2);
    assert_eq!(counts.sim_error, 1);
    assert_eq!(counts.fail, 0);
    // The hung test is never entered again
    assert_eq!(take_log(), ["t1", "hang", "t3"]);
    assert_eq!(device.boots(), 2);
    assert_eq!(device.resets(), &[ResetReason::WatchdogReset]);
    // A sim error alone does not fail the run
    assert_eq!(outcome.status(), Ok(()));
}

#[test]
fn test_unannounced_reset_is_recorded_as_sim_error() {
    take_log();
    let records = [
        TestRecord::new(T1, "resets", &unannounced_reset),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    assert_eq!(outcome.report.counts().sim_error, 1);
    assert_eq!(outcome.report.counts().pass, 1);
    assert_eq!(take_log(), ["reset", "t2"]);
    assert_eq!(device.resets(), &[ResetReason::SoftwareReset]);
}

fn block_1(ctx: &mut TestContext) -> TestResult {
    log("block 1");
    ctx.assert_eq(1, true, true)?;
    Ok(())
}

fn block_2_resets(ctx: &mut TestContext) -> TestResult {
    log("block 2");
    ctx.expect_reset(ExpectedReset::OnSecondCheck)?;
    ctx.system_reset()
}

fn block_3_fails(ctx: &mut TestContext) -> TestResult {
    log("block 3");
    let credited: Vec<(u32, Verdict)> = ctx
        .check_trail()
        .iter()
        .map(|c| (c.num, c.verdict))
        .collect();
    assert_eq!(credited, [(1, Verdict::Pass), (2, Verdict::Pass)]);
    ctx.assert_eq(3, 7u32, 8u32)?;
    Ok(())
}

fn reset_on_second_check(ctx: &mut TestContext) -> TestResult {
    let blocks: [&dyn TestEntry; 3] = [&block_1, &block_2_resets, &block_3_fails];
    ctx.execute_client_blocks(&blocks, false)
}

#[test]
fn test_announced_reset_resumes_at_next_check() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "reset inside check 2", &reset_on_second_check),
        TestRecord::new(T3, "third", &t3),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!(counts.pass, 2);
    assert_eq!(counts.fail, 1);
    assert_eq!(counts.sim_error, 0);
    assert_eq!(
        take_log(),
        ["t1", "block 1", "block 2", "block 3", "t3"]
    );
    assert!(outcome.status().is_err());
}

fn announce_and_miss(ctx: &mut TestContext) -> TestResult {
    log("announce");
    ctx.expect_reset(ExpectedReset::ReenterTest)?;
    // The reset never came; the watchdog ends the hang
    ctx.expected_reset_missed();
    ctx.wait_for_reset()
}

#[test]
fn test_missed_reset_is_a_failure() {
    take_log();
    let records = [
        TestRecord::new(T1, "missed reset", &announce_and_miss),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    assert_eq!(outcome.report.counts().fail, 1);
    assert_eq!(outcome.report.counts().sim_error, 0);
    assert_eq!(outcome.report.counts().pass, 1);
    assert_eq!(take_log(), ["announce", "t2"]);
}

fn credited(ctx: &TestContext) -> Vec<(u32, Verdict)> {
    ctx.check_trail().iter().map(|c| (c.num, c.verdict)).collect()
}

fn reenter_block_1(ctx: &mut TestContext) -> TestResult {
    log("block 1");
    ctx.expect_reset(ExpectedReset::ReenterTest)?;
    ctx.system_reset()
}

fn reenter_block_2(ctx: &mut TestContext) -> TestResult {
    log("block 2");
    assert_eq!(credited(ctx), [(1, Verdict::Pass)]);
    let reentered = ctx.resumption() == Resumption::AtBlock { start: 2 };
    ctx.assert_eq(2, reentered, true)?;
    Ok(())
}

fn reenter_test(ctx: &mut TestContext) -> TestResult {
    let blocks: [&dyn TestEntry; 2] = [&reenter_block_1, &reenter_block_2];
    ctx.execute_client_blocks(&blocks, false)
}

#[test]
fn test_reenter_resumes_at_second_check() {
    take_log();
    let records = [
        TestRecord::new(T1, "reset inside check 1", &reenter_test),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!((counts.pass, counts.fail, counts.sim_error), (2, 0, 0));
    assert_eq!(take_log(), ["block 1", "block 2", "t2"]);
    assert_eq!(device.resets(), &[ResetReason::SoftwareReset]);
}

fn context_a_block_2(ctx: &mut TestContext) -> TestResult {
    log("block 2");
    ctx.expect_reset(ExpectedReset::ContextA)?;
    ctx.system_reset()
}

fn context_a_block_3(ctx: &mut TestContext) -> TestResult {
    log("block 3");
    // Only the block that reset is credited
    assert_eq!(credited(ctx), [(2, Verdict::Pass)]);
    ctx.assert_eq(3, true, true)?;
    Ok(())
}

fn context_a_test(ctx: &mut TestContext) -> TestResult {
    let blocks: [&dyn TestEntry; 3] = [&block_1, &context_a_block_2, &context_a_block_3];
    ctx.execute_client_blocks(&blocks, false)
}

#[test]
fn test_local_context_reset_resumes_after_block() {
    take_log();
    let records = [
        TestRecord::new(T1, "reset from block 2", &context_a_test),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!((counts.pass, counts.fail, counts.sim_error), (2, 0, 0));
    assert_eq!(take_log(), ["block 1", "block 2", "block 3", "t2"]);
    assert_eq!(device.boots(), 2);
}

const MARKER: u32 = 0xC0DE;

fn continue_entry(ctx: &mut TestContext) -> TestResult {
    log("entry");
    ctx.set_scratch(ScratchSlot::Slot2, MARKER)?;
    ctx.expect_reset(ExpectedReset::ContinueExecution)?;
    ctx.system_reset()
}

fn continue_after_reset(ctx: &mut TestContext) -> TestResult {
    log("continuation");
    let resumed = matches!(ctx.resumption(), Resumption::Continue { marker } if marker == MARKER);
    ctx.assert_eq(1, resumed, true)?;
    Ok(())
}

#[test]
fn test_continuation_after_reset() {
    take_log();
    let records = [
        TestRecord::new(T1, "continue", &continue_entry).with_continuation(&continue_after_reset),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    assert_eq!(outcome.report.counts().pass, 2);
    assert_eq!(take_log(), ["entry", "continuation", "t2"]);
    assert_eq!(device.resets(), &[ResetReason::SoftwareReset]);
}

#[test]
fn test_disabled_test_is_skipped() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "disabled", &t2),
        TestRecord::new(T3, "third", &t3),
    ];
    let config = config();
    let enablement = |id: TestId| id != T2;
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &enablement, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!((counts.pass, counts.skip, counts.fail), (2, 1, 0));
    assert_eq!(take_log(), ["t1", "t3"]);
    assert_eq!(outcome.status(), Ok(()));
}

#[test]
fn test_isolation_level_gate() {
    take_log();
    let records = [
        TestRecord::new(T1, "level 2", &t1).with_isolation_level(2),
        TestRecord::new(T2, "level 1", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    assert_eq!(outcome.report.counts().skip, 1);
    assert_eq!(take_log(), ["t2"]);
}

#[test]
fn test_power_cut_while_closing_a_test() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "second", &t2),
        TestRecord::new(T3, "third", &t3),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    // Ledger init takes two writes and T1 four more before its boot word
    // goes back to unknown.
    device.nvmem().cut_power_after(6);
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!((counts.pass, counts.sim_error), (3, 0));
    assert_eq!(take_log(), ["t1", "t2", "t3"]);
    assert_eq!(device.resets(), &[ResetReason::ColdReset]);
}

#[test]
fn test_storage_write_fault() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    // Current test id cannot be recorded, so no test may start
    device.nvmem().set_write_fault(Some(0x04));
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    assert_eq!(outcome.report.counts().sim_error, 2);
    assert_eq!(outcome.report.counts().pass, 0);
    assert!(take_log().is_empty());
    assert_eq!(device.boots(), 1);
}

#[test]
fn test_counter_write_fault_reports_from_memory() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    // The counters never reach storage, not even at init
    device.nvmem().set_write_fault(Some(0x0C));
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();

    let counts = outcome.report.counts();
    assert_eq!(
        (counts.pass, counts.fail, counts.skip, counts.sim_error),
        (0, 0, 0, 2)
    );
    assert_eq!(outcome.status(), Ok(()));
    assert_eq!(take_log(), ["t1", "t2"]);
    assert_eq!(device.boots(), 1);
}

#[test]
fn test_finished_run_is_not_repeated() {
    take_log();
    let records = [
        TestRecord::new(T1, "first", &t1),
        TestRecord::new(T2, "second", &t2),
    ];
    let config = config();
    let mut device = EmuDevice::new();
    device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();
    take_log();

    // Power cycle over the same storage
    let mut again = EmuDevice::with_nvmem(device.nvmem().clone());
    let outcome = again
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();
    assert!(take_log().is_empty());
    assert_eq!(outcome.report.counts().pass, 2);
}

#[test]
fn test_erased_storage_starts_over() {
    take_log();
    let records = [TestRecord::new(T1, "first", &t1)];
    let config = config();
    let mut device = EmuDevice::new();
    device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();
    device.nvmem().erase();
    let outcome = device
        .run_harness(Catalog::new(&records), None, &AllEnabled, &config)
        .unwrap();
    assert_eq!(outcome.report.counts().pass, 1);
    assert_eq!(take_log(), ["t1", "t1"]);
}
