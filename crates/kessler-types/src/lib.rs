//! # kessler-types
//!
//! Shared types, errors, and constants for the Kessler conjunction
//! screening engine.
//!
//! This crate has zero domain logic — it defines the vocabulary
//! that all other Kessler crates share.

pub mod constants;
pub mod error;
pub mod outcome;

pub use error::{KesslerError, KesslerResult};
pub use outcome::{StepOutcome, TerminalCode};
