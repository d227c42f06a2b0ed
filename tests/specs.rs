// SPDX-License-Identifier: MIT

//! Workspace-level integration tests, one file per scenario, grouped by
//! the area of the system they exercise (mirrors the crate-level
//! `#[cfg(test)]` layout one level up).

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/scheduler"]
mod scheduler {
    #[path = "concurrency_bound.rs"]
    mod concurrency_bound;
    #[path = "crash_recovery.rs"]
    mod crash_recovery;
    #[path = "dedup.rs"]
    mod dedup;
}

#[path = "specs/ledger"]
mod ledger {
    #[path = "listing_order.rs"]
    mod listing_order;
}

#[path = "specs/content_address"]
mod content_address {
    #[path = "determinism.rs"]
    mod determinism;
}
