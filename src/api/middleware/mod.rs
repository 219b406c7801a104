//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Identity: reads forwarded caller headers into `CallerContext`
//! 2. Audit logger: runs after identity, so it can log the caller

pub mod audit;
pub mod identity;
