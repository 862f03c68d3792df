//! Cable-specific error types.
//!
//! Core operations return [`CableResult`] so callers (and tests) can see why a
//! call was refused.  Nothing escapes the core, though: command wrappers and
//! systems hand every error to [`report`], which logs it and carries on.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cableworks::error::{report, CableError};
//!
//! fn some_command(world: &mut World) {
//!     report(pick_up(world, endpoint, holder, layer));
//! }
//! ```

use bevy::prelude::*;
use std::fmt;

/// Top-level error enum for cable and connector operations.
#[derive(Debug, Clone, PartialEq)]
pub enum CableError {
    /// An entity passed to an operation is missing or lacks the component the
    /// operation needs (the ECS equivalent of a null partner).
    InvalidArgument {
        /// Human-readable description of the rejected argument.
        context: &'static str,
    },

    /// A draggable endpoint could not find its adjacent chain point or spring.
    /// Only the follow phase is skipped; the pick-up or drop itself completes.
    InconsistentChainTopology {
        /// The endpoint whose chain is malformed.
        endpoint: Entity,
        /// What was missing.
        reason: &'static str,
    },

    /// The requested transition is already in effect (pick-up while lifted,
    /// drop while not lifted).  Expected from symmetric call patterns; never logged.
    RedundantTransition {
        /// Which transition was repeated.
        context: &'static str,
    },

    /// A chain part referenced by a cable was despawned behind its back.
    EntityNotFound {
        /// Human-readable description of where the lookup occurred.
        context: &'static str,
    },

    /// A configuration value is outside its safe operating range.
    InvalidConfig {
        /// Name of the field (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },
}

impl fmt::Display for CableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CableError::InvalidArgument { context } => {
                write!(f, "invalid argument: {}", context)
            }
            CableError::InconsistentChainTopology { endpoint, reason } => write!(
                f,
                "cable endpoint {:?} has an inconsistent chain: {}",
                endpoint, reason
            ),
            CableError::RedundantTransition { context } => {
                write!(f, "redundant transition: {}", context)
            }
            CableError::EntityNotFound { context } => {
                write!(f, "entity not found during '{}'", context)
            }
            CableError::InvalidConfig {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "config '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for CableError {}

/// Convenience alias: a `Result` using `CableError` as the error type.
pub type CableResult<T> = Result<T, CableError>;

impl CableError {
    /// Whether this error is worth a log line.  Redundant transitions are the
    /// normal echo of symmetric calls and stay silent.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, CableError::RedundantTransition { .. })
    }
}

/// Log a failed operation as a warning and swallow it.
///
/// Returns `true` when the operation succeeded.
pub fn report<T>(result: CableResult<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(err) => {
            if err.is_reportable() {
                warn!("[cable] {err}");
            }
            false
        }
    }
}

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error unless `value` is strictly positive and finite.
pub fn validate_positive(name: &'static str, value: f32) -> CableResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CableError::InvalidConfig {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}

/// Returns an error unless `min <= max`, both positive.
pub fn validate_period(min: f32, max: f32) -> CableResult<()> {
    validate_positive("mismatch_period_min", min)?;
    validate_positive("mismatch_period_max", max)?;
    if min > max {
        return Err(CableError::InvalidConfig {
            name: "mismatch_period_min",
            value: min,
            safe_range: "[0.0, mismatch_period_max]",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redundant_transitions_are_not_reportable() {
        let err = CableError::RedundantTransition { context: "drop" };
        assert!(!err.is_reportable());
        assert!(!report::<()>(Err(err)));
    }

    #[test]
    fn topology_errors_are_reportable() {
        let err = CableError::InconsistentChainTopology {
            endpoint: Entity::PLACEHOLDER,
            reason: "no adjacent point",
        };
        assert!(err.is_reportable());
        assert!(err.to_string().contains("no adjacent point"));
    }

    #[test]
    fn period_validation_rejects_inverted_range() {
        assert!(validate_period(0.6, 0.8).is_ok());
        assert!(validate_period(0.9, 0.8).is_err());
        assert!(validate_period(0.0, 0.8).is_err());
    }
}
