//! Step outcomes and terminal-event codes.

use serde::{Deserialize, Serialize};

/// Outcome of a single superstep.
///
/// When several event kinds occur within the same superstep, the
/// reported outcome follows the precedence
/// `Collision > NonFiniteState > Reentry > Exit > Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The superstep completed without any event.
    Success,
    /// At least one particle-particle collision was detected.
    Collision,
    /// At least one particle crossed the reentry surface.
    Reentry,
    /// At least one particle exceeded the exit radius.
    Exit,
    /// At least one particle produced a non-finite state.
    NonFiniteState,
}

/// Why a particle stopped propagating within a superstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalCode {
    /// The trajectory crossed the reentry surface (sphere or
    /// triaxial ellipsoid).
    Reentry,
    /// The trajectory exceeded the exit radius.
    Exit,
    /// The state or its Taylor coefficients became non-finite.
    NonFinite,
}

impl TerminalCode {
    /// Maps the code onto the matching step outcome.
    pub fn outcome(self) -> StepOutcome {
        match self {
            TerminalCode::Reentry => StepOutcome::Reentry,
            TerminalCode::Exit => StepOutcome::Exit,
            TerminalCode::NonFinite => StepOutcome::NonFiniteState,
        }
    }
}
