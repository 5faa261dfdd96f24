//! Integration test suite for deepcopy
//!
//! End-to-end clones against the in-memory CMS, the HTTP client against a
//! mock server, and the `deepcopy` binary itself.
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=transform=debug cargo test --test integration -- --nocapture
//! ```
//!
//! - **clone_scenarios**: successful clones of representative trees
//! - **failure_scenarios**: fetch, create and update failures, cancellation
//! - **http_client**: status mapping, retries and wire format over `wiremock`
//! - **properties**: invariants over random link graphs (`proptest`)
//! - **cli**: command-line smoke tests (`assert_cmd`)

mod failure_scenarios;
mod http_client;
mod properties;
