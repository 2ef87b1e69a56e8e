//! Resilience layer for store operations.
//!
//! This module provides retry logic with exponential backoff. Retries are
//! reserved for idempotent requests; callers decide which operations
//! qualify.

mod retry;

pub use retry::{RetryConfig, RetryPolicy};
