//! Secret string container with automatic memory zeroing.
//!
//! Passwords and API secrets are wrapped in `Zeroizing` so the buffer is
//! cleared on drop, and `Debug` never prints the value.

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

/// A string that is wiped from memory when dropped.
///
/// # Example
///
/// ```rust
/// use entries_exporter_core::config::Secret;
///
/// let secret = Secret::new("hunter2");
/// assert_eq!(secret.expose(), "hunter2");
/// assert_eq!(format!("{:?}", secret), "Secret(****)");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wraps a value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Returns the wrapped value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when no value (or only whitespace) was provided.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}
