//! Bounded retry with a typed decision.
//!
//! Stale element references are transient: the page re-renders and the old
//! handle dies mid-read. The walker re-reads through this module instead of
//! retrying by recursion, so the bound and the still-stale-after-N outcome
//! are explicit.

mod policy;
mod run;

pub use policy::{RetryDecision, RetryPolicy};
pub use run::run_with_retry;
