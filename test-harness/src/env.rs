// Licensed under the Apache-2.0 license

use acs_drivers::{NvMem, SecureCall, SystemReset, Watchdog};

use crate::catalog::TestEnablement;

/// Platform collaborators the harness drives
pub struct HarnessEnv<'a> {
    /// Storage backing the ledger
    pub nvmem: &'a mut dyn NvMem,

    pub watchdog: &'a mut dyn Watchdog,

    pub reset: &'a mut dyn SystemReset,

    /// Transport into the far context, if the platform has one
    pub secure_call: Option<&'a mut dyn SecureCall>,

    pub enablement: &'a dyn TestEnablement,
}
