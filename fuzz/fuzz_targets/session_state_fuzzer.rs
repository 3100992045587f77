//! Fuzz target for the client session against the scripted authority
//!
//! Applies arbitrary operation sequences (intents, lifecycle calls, time,
//! dropped connections, network outages) through the simulation driver.
//!
//! # Invariants
//!
//! - The standard invariant registry never reports a violation
//! - A quiet, open client mirrors the authority's farm

#![no_main]

use libfuzzer_sys::fuzz_target;
use meadow_core::SessionStatus;
use meadow_harness::{InvariantRegistry, Operation, ScriptedAuthority, SimDriver};

fuzz_target!(|ops: Vec<Operation>| {
    let mut driver =
        SimDriver::new(ScriptedAuthority::new()).with_invariants(InvariantRegistry::standard());
    driver.start();

    for op in ops.iter().take(256) {
        driver.apply(op);

        if driver.client().session().status() == SessionStatus::Open
            && !driver.live_transports().is_empty()
        {
            assert_eq!(driver.client().read(), driver.authority().farm(), "after {op:?}");
        }
    }

    assert!(driver.violations().is_empty(), "violations: {:?}", driver.violations());
});
