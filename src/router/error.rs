//! Registration errors.

use thiserror::Error;

/// Why a route or group could not be registered.
///
/// Every variant is fatal to the registration call that produced it, and the
/// route table is left exactly as it was before the call. Bootstrap code
/// should treat any of these as fatal: a table that did not build as written
/// is not safe to serve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid path {path:?}: must be non-empty and start with '/'")]
    InvalidPath { path: String },

    #[error("segment {segment:?} in {path:?} has a '{marker}' marker but no name")]
    MissingName {
        path: String,
        segment: String,
        marker: char,
    },

    #[error("parameter {name:?} appears more than once in {path:?}")]
    DuplicateParamName { path: String, name: String },

    #[error("wildcard '*{name}' in {path:?} must be the last segment")]
    MisplacedWildcard { path: String, name: String },

    #[error("parameter ':{new}' in {path:?} conflicts with existing ':{existing}' at the same position")]
    ParamNameConflict {
        path: String,
        existing: String,
        new: String,
    },

    #[error("wildcard '*{new}' in {path:?} conflicts with existing '*{existing}' at the same position")]
    DuplicateWildcard {
        path: String,
        existing: String,
        new: String,
    },

    #[error("invalid group prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },
}

impl RouteError {
    /// Returns `true` when the pattern was well-formed on its own but clashed
    /// with a route already in the table.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ParamNameConflict { .. } | Self::DuplicateWildcard { .. }
        )
    }
}
