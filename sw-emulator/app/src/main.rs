/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the conformance harness emulator.

--*/

use acs_drivers::{Verbosity, WdTimeoutType};
use acs_emu::{EmuDevice, EmuNvMem};
use acs_test_harness::{Catalog, HarnessConfig, ServerTest, TestId, TestRecord};
use clap::{arg, value_parser};
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::exit;
mod demo;

fn load_nvmem(path: Option<&PathBuf>) -> io::Result<EmuNvMem> {
    match path {
        Some(path) if path.exists() => {
            let mut image = Vec::new();
            File::open(path)?.read_to_end(&mut image)?;
            Ok(EmuNvMem::from_image(image))
        }
        _ => Ok(EmuNvMem::default()),
    }
}

fn main() -> io::Result<()> {
    let args = clap::Command::new("acs-emu")
        .about("Conformance test harness emulator")
        .arg(
            arg!(--verbosity <LEVEL> "Print level (1 info .. 5 error, 9 always)")
                .required(false)
                .value_parser(value_parser!(u8)),
        )
        .arg(
            arg!(--isolation-level <LEVEL> "Isolation level of the platform")
                .required(false)
                .value_parser(value_parser!(u8).range(1..=3)),
        )
        .arg(
            arg!(--disable <ID> "Test id the platform does not support")
                .required(false)
                .multiple_occurrences(true)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(--nvmem <FILE> "Storage image kept across invocations")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--fail-storage <OFFSET> "Fail every storage write at this offset")
                .required(false)
                .value_parser(value_parser!(u32)),
        )
        .arg(arg!(--hang "Include a test that hangs until the watchdog resets"))
        .get_matches();

    let mut config = HarnessConfig::default();
    if let Some(level) = args.get_one::<u8>("verbosity") {
        match Verbosity::from_level(*level) {
            Some(verbosity) => config.verbosity = verbosity,
            None => {
                println!("Unknown verbosity {}", level);
                exit(-1);
            }
        }
    }
    if let Some(level) = args.get_one::<u8>("isolation-level") {
        config.isolation_level = *level;
    }
    let disabled: Vec<TestId> = args
        .get_many::<u32>("disable")
        .map(|ids| ids.map(|id| TestId::from(*id)).collect())
        .unwrap_or_default();
    let nvmem_path = args.get_one::<PathBuf>("nvmem");

    let nvmem = load_nvmem(nvmem_path)?;
    if let Some(offset) = args.get_one::<u32>("fail-storage") {
        nvmem.set_write_fault(Some(*offset));
    }

    let mut records = vec![
        TestRecord::new(demo::IPC_CONNECT, "Client and server blocks", &demo::ipc_connect),
        TestRecord::new(
            demo::IPC_FAR_CLIENT,
            "Far client test across a reset",
            &demo::ipc_far_client,
        ),
        TestRecord::new(demo::CRYPTO_DIGEST, "Digest compare", &demo::crypto_digest)
            .with_timeout(WdTimeoutType::Crypto),
        TestRecord::new(
            demo::CRYPTO_KEY_RESET,
            "Reset inside check 2",
            &demo::crypto_key_reset,
        ),
        TestRecord::new(
            demo::CRYPTO_CONTINUE,
            "Continue after reset",
            &demo::crypto_continue,
        )
        .with_continuation(&demo::crypto_continue_after_reset),
        TestRecord::new(
            demo::PS_ISOLATION,
            "Isolation level 3 only",
            &demo::ps_isolation,
        )
        .with_isolation_level(3),
    ];
    if args.contains_id("hang") {
        records.push(
            TestRecord::new(demo::ITS_HANG, "Hang", &demo::its_hang)
                .with_timeout(WdTimeoutType::High),
        );
    }

    let ipc_blocks = demo::ipc_server_blocks();
    let far_client_blocks = demo::far_client_blocks();
    let server_tests = [
        ServerTest {
            test_num: demo::IPC_CONNECT.number() as u8,
            blocks: &ipc_blocks,
        },
        ServerTest {
            test_num: demo::IPC_FAR_CLIENT.number() as u8,
            blocks: &far_client_blocks,
        },
    ];
    let enablement = |id: TestId| !disabled.contains(&id);

    let mut device = EmuDevice::with_nvmem(nvmem.clone());
    let outcome = device.run_harness(
        Catalog::new(&records),
        Some(&server_tests[..]),
        &enablement,
        &config,
    );

    if let Some(path) = nvmem_path {
        File::create(path)?.write_all(&nvmem.snapshot())?;
    }

    match outcome {
        Ok(outcome) => {
            println!("Device booted {} times", device.boots());
            if outcome.status().is_err() {
                exit(-1);
            }
        }
        Err(limit) => {
            println!("Device did not reach standby after {} boots", limit.0);
            exit(-1);
        }
    }

    Ok(())
}
