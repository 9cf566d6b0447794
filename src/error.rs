//! Error taxonomy for resource derivation
//!
//! The graph builder treats these four cases differently: structural
//! ineligibility (`PreconditionNotMet`) is skipped silently, everything
//! else aborts the run. Inheritance resolution itself never raises.

use thiserror::Error;

/// Errors raised while deriving resource descriptors from resolved
/// configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeriveError {
    /// A `Required` field never received a concrete value by the time a
    /// resource depending on it was built.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },

    /// The requested resource kind does not apply at this node (wrong
    /// node shape, or a required cross-reference is absent). The graph
    /// builder swallows this as "not applicable here".
    #[error("precondition not met: {reason}")]
    PreconditionNotMet { reason: String },

    /// A closed-set field holds a value outside its allowed set. Always
    /// a configuration-authoring mistake; never swallowed.
    #[error("invalid value {value:?} for {field} (allowed: {allowed})")]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        allowed: &'static str,
    },

    /// A polymorphic reference arrived in a shape the normalizer does
    /// not support in this position. Never swallowed.
    #[error("unsupported reference variant: {context}")]
    UnsupportedReferenceVariant { context: String },
}

impl DeriveError {
    /// Shorthand for a structural-ineligibility error.
    pub fn precondition(reason: impl Into<String>) -> Self {
        DeriveError::PreconditionNotMet {
            reason: reason.into(),
        }
    }

    /// True when the graph builder may skip the failed step silently.
    ///
    /// Only structural ineligibility qualifies; value-correctness errors
    /// always surface to the caller.
    pub fn is_skippable(&self) -> bool {
        matches!(self, DeriveError::PreconditionNotMet { .. })
    }
}
