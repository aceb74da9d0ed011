// Library root: exposes the service modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod cache;
pub mod error;
pub mod feed;
pub mod generator;
pub mod ledger;
pub mod metrics;
pub mod services;
pub mod store;

// Process wiring used by the binary.
pub mod cli;
pub mod config;
pub mod logging;
