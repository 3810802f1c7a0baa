//! Application-wide error types.
//!
//! [`GatewayError`] is the dispatch taxonomy surfaced to callers of the
//! registry, chains and dispatchers.  [`AppError`] wraps everything that can
//! abort start-up or the server loop.

use thiserror::Error;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request text or message was empty. Maps to HTTP 400.
    #[error("input text must not be empty")]
    EmptyInput,

    /// Backend registered but not ready. Only ever a decline reason.
    #[error("backend not ready: {0}")]
    BackendUnready(String),

    /// Every link in the chain declined; the chain has no terminal strategy.
    #[error("no strategy succeeded for {0} chain")]
    NoStrategySucceeded(String),

    #[error("duplicate backend name: {0}")]
    DuplicateName(String),

    #[error("backend not found: {0}")]
    NotFound(String),

    /// Evaluation abandoned between strategies after the caller went away.
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
