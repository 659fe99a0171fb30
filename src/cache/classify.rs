//! Artifact store error classification
//!
//! One policy decides, for both phases, whether a store failure aborts the
//! step, is logged as expected, or is downgraded to a warning.

use crate::cache::policy::Policy;
use crate::store::StoreError;
use std::fmt;

/// What kind of failure the store reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed key, path set or chunk size
    Validation,
    /// Another run already owns the key
    ReservationConflict,
    /// Anything without a definite meaning (network, IO, ...)
    Transient,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::ReservationConflict => write!(f, "reservation conflict"),
            Self::Transient => write!(f, "transient"),
        }
    }
}

/// Which orchestrator is handling the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Restore(Policy),
    Save,
}

/// What the orchestrator does with a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Abort the step
    Fatal,
    /// Expected outcome, log at info
    Benign,
    /// Log a warning and carry on
    Warn,
}

/// Map a store error to its class
pub fn classify(err: &StoreError) -> ErrorClass {
    match err {
        StoreError::Validation(_) => ErrorClass::Validation,
        StoreError::ReserveConflict(_) => ErrorClass::ReservationConflict,
        StoreError::NothingToSave
        | StoreError::Corrupt { .. }
        | StoreError::Io { .. }
        | StoreError::Unavailable(_) => ErrorClass::Transient,
    }
}

/// Decide how a class of failure is handled in a phase
pub fn decide(class: ErrorClass, phase: Phase) -> Disposition {
    match (class, phase) {
        (ErrorClass::Validation, _) => Disposition::Fatal,
        (ErrorClass::ReservationConflict, Phase::Save) => Disposition::Benign,
        (ErrorClass::Transient, Phase::Save) => Disposition::Warn,
        // a restore reserves nothing, so a conflict there is as unexpected as any failure
        (_, Phase::Restore(Policy::Required)) => Disposition::Fatal,
        (_, Phase::Restore(Policy::Optional)) => Disposition::Warn,
    }
}
