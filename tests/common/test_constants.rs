//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Hex digits returned by the scripted address lookup.
pub const ACCOUNT_HEX: &str = "abcde0";

/// Address derived from [`ACCOUNT_HEX`].
pub const ACCOUNT_ADDRESS: &str = "0xabcde0";

/// Publish output carrying the usual success markers.
pub const SUCCESSFUL_PUBLISH: &str =
    "{\n  \"Result\": {\n    \"transaction_hash\": \"0x5e1\",\n    \"success\": true\n  }\n}";
