//! Write-side encoding and read-side change classification.

use crate::value::StoreValue;

/// What a write does to a store entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Encoded {
    /// Store this exact string.
    Set(String),
    /// Remove the entry.
    Remove,
}

impl Encoded {
    /// Returns the value an observer sees once this write has landed.
    #[must_use]
    pub fn into_value(self) -> Option<String> {
        match self {
            Encoded::Set(s) => Some(s),
            Encoded::Remove => None,
        }
    }

    /// Returns the value an observer sees once this write has landed.
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Encoded::Set(s) => Some(s),
            Encoded::Remove => None,
        }
    }

    /// Returns true for a removal.
    #[must_use]
    pub fn is_remove(&self) -> bool {
        matches!(self, Encoded::Remove)
    }
}

/// Encodes an optional caller value for the store.
///
/// `None` is the only input that produces [`Encoded::Remove`].
pub fn encode<V: StoreValue>(value: Option<V>) -> Encoded {
    match value {
        Some(v) => Encoded::Set(v.to_store_string()),
        None => Encoded::Remove,
    }
}

/// Returns true if a store reading differs from the last known value.
///
/// Absent and the empty string are different values.
#[inline]
#[must_use]
pub fn classify_change(old: Option<&str>, new: Option<&str>) -> bool {
    old != new
}
