//! Integration test suite for appup
//!
//! End-to-end tests of the update pipeline through the public library API,
//! plus tests of the `appup` binary itself.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `appup` binary (argument handling, exit codes, output)
//! - **upgrade**: Full update runs against a scripted release feed

mod cli;
mod upgrade;
