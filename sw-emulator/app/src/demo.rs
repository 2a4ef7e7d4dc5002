/*++

Licensed under the Apache-2.0 license.

File Name:

    demo.rs

Abstract:

    File contains the demonstration tests run by the emulator binary.

--*/

use acs_drivers::WdTimeoutType;
use acs_test_harness::{
    ExpectedReset, FarTestContext, ScratchSlot, ServerBlock, TestContext, TestEntry, TestId,
    TestResult,
};

pub const IPC_CONNECT: TestId = TestId::new(0, 1);
pub const IPC_FAR_CLIENT: TestId = TestId::new(0, 2);
pub const CRYPTO_DIGEST: TestId = TestId::new(1, 1);
pub const CRYPTO_KEY_RESET: TestId = TestId::new(1, 2);
pub const CRYPTO_CONTINUE: TestId = TestId::new(1, 3);
pub const PS_ISOLATION: TestId = TestId::new(2, 1);
pub const ITS_HANG: TestId = TestId::new(3, 1);

const CONTINUE_MARKER: u32 = 0x5EED;

fn ipc_client_1(ctx: &mut TestContext) -> TestResult {
    ctx.assert_eq(1, ctx.test_id().number(), 1)?;
    Ok(())
}

fn ipc_client_2(ctx: &mut TestContext) -> TestResult {
    let request = [0x10u8, 0x20, 0x30];
    ctx.assert_memcmp(2, &request, &[0x10, 0x20, 0x30])?;
    Ok(())
}

pub fn ipc_connect(ctx: &mut TestContext) -> TestResult {
    let blocks: [&dyn TestEntry; 2] = [&ipc_client_1, &ipc_client_2];
    ctx.execute_client_blocks(&blocks, true)
}

fn ipc_server_1(ctx: &mut FarTestContext) -> TestResult {
    ctx.assert_eq(1, ctx.block(), 1)?;
    Ok(())
}

fn ipc_server_2(ctx: &mut FarTestContext) -> TestResult {
    ctx.assert_eq(2, ctx.test_num(), 1)?;
    Ok(())
}

pub fn ipc_far_client(ctx: &mut TestContext) -> TestResult {
    ctx.switch_to_far_client()
}

fn far_client_1(ctx: &mut FarTestContext) -> TestResult {
    ctx.assert_eq(1, ctx.block(), 1)?;
    Ok(())
}

/// Resets from the far side; the local side resumes at block 3
fn far_client_2(ctx: &mut FarTestContext) -> TestResult {
    ctx.expect_reset(ExpectedReset::ContextB)?;
    ctx.system_reset()
}

fn far_client_3(ctx: &mut FarTestContext) -> TestResult {
    ctx.assert_eq(3, ctx.block(), 3)?;
    Ok(())
}

pub fn ipc_server_blocks() -> [&'static dyn ServerBlock; 2] {
    [&ipc_server_1, &ipc_server_2]
}

pub fn far_client_blocks() -> [&'static dyn ServerBlock; 3] {
    [&far_client_1, &far_client_2, &far_client_3]
}

pub fn crypto_digest(ctx: &mut TestContext) -> TestResult {
    let digest = [0xBAu8, 0x78, 0x16, 0xBF];
    ctx.assert_memcmp(1, &digest, &[0xBA, 0x78, 0x16, 0xBF])?;
    ctx.assert_range(2, digest.len() as u32, 1, 64)?;
    Ok(())
}

fn key_block_1(ctx: &mut TestContext) -> TestResult {
    ctx.assert_ne(1, 0u32, 0xFFFF_FFFF)?;
    Ok(())
}

fn key_block_2(ctx: &mut TestContext) -> TestResult {
    ctx.expect_reset(ExpectedReset::OnSecondCheck)?;
    ctx.system_reset()
}

fn key_block_3(ctx: &mut TestContext) -> TestResult {
    ctx.assert_dual(3, 2u32, 1u32, 2u32)?;
    Ok(())
}

pub fn crypto_key_reset(ctx: &mut TestContext) -> TestResult {
    let blocks: [&dyn TestEntry; 3] = [&key_block_1, &key_block_2, &key_block_3];
    ctx.execute_client_blocks(&blocks, false)
}

pub fn crypto_continue(ctx: &mut TestContext) -> TestResult {
    ctx.set_scratch(ScratchSlot::Slot2, CONTINUE_MARKER)?;
    ctx.expect_reset(ExpectedReset::ContinueExecution)?;
    ctx.reprogram_watchdog(WdTimeoutType::Medium)?;
    ctx.system_reset()
}

pub fn crypto_continue_after_reset(ctx: &mut TestContext) -> TestResult {
    let marker = ctx.scratch(ScratchSlot::Slot2)?;
    ctx.assert_eq(1, marker, CONTINUE_MARKER)?;
    Ok(())
}

pub fn ps_isolation(ctx: &mut TestContext) -> TestResult {
    let level = ctx.config().isolation_level;
    ctx.assert_range(1, level, 3, 3)?;
    Ok(())
}

/// Never returns; the watchdog ends it
pub fn its_hang(ctx: &mut TestContext) -> TestResult {
    ctx.wait_for_reset()
}
