//! # Edge-Link Test Suite
//!
//! Cross-crate tests driving the account-linking subsystem the way a
//! deployment does: through the public API, with real Ed25519 keys.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/            # criterion benchmarks (issue, codec, scan, validate)
//! └── src/integration/
//!     ├── flows.rs            # end-to-end scenarios and single-use rules
//!     ├── edge_protection.rs  # key material never crosses the boundary
//!     └── recording.rs        # link sinks and key rotation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ql-tests
//! cargo test -p ql-tests integration::flows
//! cargo bench -p ql-tests
//! ```

pub mod integration;
