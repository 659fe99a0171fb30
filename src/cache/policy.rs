//! Required/optional policy for restores

use crate::inputs::{names, Inputs};
use std::fmt;

/// Whether a restore miss or store failure fails the step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Required,
    Optional,
}

impl Policy {
    /// Read the `required` input. Only the literal `false` opts out.
    pub fn from_inputs(inputs: &Inputs) -> Self {
        match inputs.get(names::REQUIRED).as_deref() {
            Some("false") => Self::Optional,
            _ => Self::Required,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "required"),
            Self::Optional => write!(f, "optional"),
        }
    }
}

/// Convenience for callers that only need the flag
pub fn is_cache_required(inputs: &Inputs) -> bool {
    Policy::from_inputs(inputs).is_required()
}
