//! Utility modules: caller-side retry and per-attempt timeout.

pub mod retry;
pub mod timeout;
