// Library root: exposes the gateway for the binary and integration tests.
// The binary entry point is src/main.rs.

pub mod backend;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod health;
pub mod http;
pub mod logger;
pub mod registry;
pub mod types;
