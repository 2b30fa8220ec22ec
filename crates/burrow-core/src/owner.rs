use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque identifier of the user who owns a set of short URLs.
///
/// The identifier is resolved once at the request boundary and then passed
/// explicitly to every storage call that is scoped by ownership.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates an owner id, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CoreError::InvalidOwner("owner id cannot be blank".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_owner_is_rejected() {
        assert!(OwnerId::new("").is_err());
        assert!(OwnerId::new("   ").is_err());
        assert_eq!(OwnerId::new("u1").unwrap().as_str(), "u1");
    }
}
