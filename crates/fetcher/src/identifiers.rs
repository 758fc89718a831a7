//! Newtype identifiers.
//!
//! A [`CancellationKey`] correlates a cancel request with one logical in-flight
//! operation. Keys are opaque to the fetcher: callers may supply their own or let
//! the fetcher generate a random one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one logical in-flight operation in the
/// [`CancellationRegistry`](crate::CancellationRegistry).
///
/// A tokenized write uses a single key for both its token fetch and its write,
/// so one cancel aborts whichever phase is running.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancellationKey(String);

impl CancellationKey {
    /// Creates a key from a caller-chosen value, returning `None` if it is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() { None } else { Some(Self(v)) }
    }

    /// Generates a fresh random key.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the supplied key, or generates one when absent.
    pub fn or_generate(key: Option<Self>) -> Self {
        key.unwrap_or_else(Self::generate)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CancellationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert!(CancellationKey::new("").is_none());
        assert_eq!(CancellationKey::new("edit-1").unwrap().as_str(), "edit-1");
    }

    #[test]
    fn generated_keys_are_unique_uuids() {
        let a = CancellationKey::generate();
        let b = CancellationKey::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn or_generate_keeps_a_supplied_key() {
        let supplied = CancellationKey::new("mine").unwrap();
        assert_eq!(CancellationKey::or_generate(Some(supplied.clone())), supplied);
        assert!(!CancellationKey::or_generate(None).as_str().is_empty());
    }
}
