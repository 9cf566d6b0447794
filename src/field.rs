//! Required/optional field slots for inheritable configuration
//!
//! Every schema field starts as `Required` (must resolve to a concrete
//! value before resource construction) or `Unset` (optional, silently
//! absent unless a schema default fills it). Inheritance copies concrete
//! values into pending slots and never overwrites a value that is
//! already set, which makes resolution idempotent by construction.

use crate::error::DeriveError;

/// A configuration field slot.
///
/// `Required` and `Unset` both mean "no concrete value yet"; they differ
/// only in what happens when the field is still pending at resource-build
/// time: a pending `Required` field is a hard error, a pending `Unset`
/// field is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Must hold a concrete value before any resource that reads it is
    /// built.
    Required,
    /// Optional; absent unless a schema default fills it.
    #[default]
    Unset,
    /// A concrete value. Never overwritten by inheritance.
    Set(T),
}

impl<T> Field<T> {
    /// The concrete value, if one has been set.
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            _ => None,
        }
    }

    /// True when the slot holds a concrete value.
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    /// True for both `Required` and `Unset`.
    pub fn is_pending(&self) -> bool {
        !self.is_set()
    }

    /// The concrete value, or `MissingRequiredField` naming the field.
    ///
    /// Called at resource-build time; resolution never calls this.
    pub fn require(&self, field: &'static str) -> Result<&T, DeriveError> {
        self.value()
            .ok_or(DeriveError::MissingRequiredField { field })
    }

    /// Fill a static default if the slot is still pending.
    pub fn or_insert(&mut self, default: T) {
        if self.is_pending() {
            *self = Field::Set(default);
        }
    }
}

impl<T: Clone> Field<T> {
    /// Copy the other slot's concrete value if this one is still pending.
    ///
    /// Never overwrites a concrete value and never raises; absorbing the
    /// same source twice is a no-op the second time.
    pub fn absorb(&mut self, other: &Field<T>) {
        if self.is_pending() {
            if let Field::Set(value) = other {
                *self = Field::Set(value.clone());
            }
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Set(value)
    }
}
