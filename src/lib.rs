pub mod chain;
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod sync;
pub mod ui;
pub mod wallets;
pub mod workflow;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
