// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod app;
pub mod config;
pub mod espn;
pub mod pool;
pub mod protocol;
pub mod stats;
pub mod ws_server;
