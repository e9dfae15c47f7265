//! Shared constants for core integration tests.

/// Table name every fake store answers to.
#[allow(dead_code)]
pub const TABLE: &str = "orders";

/// Partition key attribute used by in-memory fixtures.
#[allow(dead_code)]
pub const PARTITION_KEY: &str = "id";

/// Base backoff (ms) used by tests that assert on retry scheduling.
#[allow(dead_code)]
pub const BACKOFF_BASE_MS: u64 = 50;
