//! Error types for the Kessler engine.
//!
//! All crates return `KesslerResult<T>` from fallible operations.
//!
//! Terminal conditions encountered during propagation (reentry, domain
//! exit, non-finite states) are *reported* through event vectors, never
//! raised as errors. Only boundary-level argument validation produces
//! an `Err`.

use thiserror::Error;

/// Unified error type for the Kessler engine.
#[derive(Debug, Error)]
pub enum KesslerError {
    /// An argument failed boundary validation (misshaped state vector,
    /// negative radius, non-finite configuration value, whitelist index
    /// out of range, ...). The message states the offending value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O operation failed (scenario files, report output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scenario file could not be parsed or described an
    /// inconsistent setup.
    #[error("Invalid scenario: {0}")]
    Scenario(String),
}

/// Convenience alias for `Result<T, KesslerError>`.
pub type KesslerResult<T> = Result<T, KesslerError>;
