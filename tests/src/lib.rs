//! # NXV Wallet Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # World: host + shared contracts, signers
//! └── integration/      # End-to-end wallet flows
//!     ├── wallet_flows.rs
//!     ├── deployment_flows.rs
//!     ├── batch_flows.rs
//!     ├── migration_flows.rs
//!     ├── delegated_signers.rs
//!     └── service_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p nxv-tests
//!
//! # One flow, with logs
//! RUST_LOG=nxv_wallet=debug cargo test -p nxv-tests integration::batch_flows
//!
//! # Benchmarks
//! cargo bench -p nxv-tests
//! ```

pub mod fixtures;
pub mod integration;
