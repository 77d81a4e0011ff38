//! Identifier types for gamify.
//!
//! `UserId` wraps a UUID issued by the auth provider. `TargetId` names the
//! thing an action was performed on (a card, a tool step, a post) and is the
//! middle component of the completion uniqueness key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a target identifier in bytes.
pub const MAX_TARGET_LEN: usize = 128;

/// Defines a UUID-based identifier type with serde, parsing and display support.
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier (primarily for testing).
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Return the bytes of the UUID (16 bytes).
            #[must_use]
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

uuid_id_type!(UserId, "A user identifier (UUID format).\n\nUser IDs come from the auth provider and are never minted by this service.");

/// The target of a credited action.
///
/// Targets are namespaced by action kind (`card/…`, `med/…`, `tool/…/…`,
/// `post/…`, `vote/…`) so two kinds can never collide on the same raw id.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetId(String);

impl TargetId {
    /// Validate and wrap a raw target string.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is empty, too long, or contains whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(IdError::EmptyTarget);
        }
        if raw.len() > MAX_TARGET_LEN {
            return Err(IdError::TargetTooLong { len: raw.len() });
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidTarget);
        }
        Ok(Self(raw))
    }

    /// Target for a learning card.
    ///
    /// # Errors
    ///
    /// Returns an error if the card id is not a valid target component.
    pub fn card(card_id: &str) -> Result<Self, IdError> {
        Self::component(card_id)?;
        Self::new(format!("card/{card_id}"))
    }

    /// Target for a medication check.
    ///
    /// # Errors
    ///
    /// Returns an error if the medication id is not a valid target component.
    pub fn medication(medication_id: &str) -> Result<Self, IdError> {
        Self::component(medication_id)?;
        Self::new(format!("med/{medication_id}"))
    }

    /// Target for one step of a tool tutorial.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool name is not a valid target component.
    pub fn tool_step(tool: &str, step: u32) -> Result<Self, IdError> {
        Self::component(tool)?;
        Self::new(format!("tool/{tool}/{step}"))
    }

    /// Target for a community post authored by the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the post id is not a valid target component.
    pub fn post(post_id: &str) -> Result<Self, IdError> {
        Self::component(post_id)?;
        Self::new(format!("post/{post_id}"))
    }

    /// Target for a vote cast by the user on a post.
    ///
    /// # Errors
    ///
    /// Returns an error if the post id is not a valid target component.
    pub fn vote(post_id: &str) -> Result<Self, IdError> {
        Self::component(post_id)?;
        Self::new(format!("vote/{post_id}"))
    }

    /// Return the target as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn component(raw: &str) -> Result<(), IdError> {
        if raw.is_empty() {
            return Err(IdError::EmptyTarget);
        }
        if raw.contains('/') {
            return Err(IdError::InvalidTarget);
        }
        Ok(())
    }
}

impl fmt::Debug for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetId({})", self.0)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TargetId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TargetId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetId> for String {
    fn from(id: TargetId) -> Self {
        id.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The target is empty.
    #[error("target id must not be empty")]
    EmptyTarget,

    /// The target exceeds `MAX_TARGET_LEN`.
    #[error("target id too long: {len} bytes")]
    TargetTooLong {
        /// Actual length in bytes.
        len: usize,
    },

    /// The target contains characters that are not allowed.
    #[error("target id contains invalid characters")]
    InvalidTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::generate();
        let parsed = UserId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn user_id_rejects_garbage() {
        assert_eq!(UserId::from_str("not-a-uuid"), Err(IdError::InvalidUuid));
    }

    #[test]
    fn targets_are_namespaced_by_kind() {
        assert_eq!(TargetId::card("abc").unwrap().as_str(), "card/abc");
        assert_eq!(TargetId::medication("m1").unwrap().as_str(), "med/m1");
        assert_eq!(TargetId::tool_step("canva", 3).unwrap().as_str(), "tool/canva/3");
        assert_eq!(TargetId::post("p1").unwrap().as_str(), "post/p1");
        assert_eq!(TargetId::vote("p1").unwrap().as_str(), "vote/p1");
        assert_ne!(TargetId::post("p1").unwrap(), TargetId::vote("p1").unwrap());
    }

    #[test]
    fn target_validation() {
        assert_eq!(TargetId::new(""), Err(IdError::EmptyTarget));
        assert_eq!(TargetId::new("a b"), Err(IdError::InvalidTarget));
        assert_eq!(TargetId::card("a/b"), Err(IdError::InvalidTarget));
        assert!(matches!(
            TargetId::new("x".repeat(MAX_TARGET_LEN + 1)),
            Err(IdError::TargetTooLong { .. })
        ));
    }

    #[test]
    fn target_id_serde_json() {
        let id = TargetId::card("c-42").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"card/c-42\"");
        let parsed: TargetId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
        assert!(serde_json::from_str::<TargetId>("\"\"").is_err());
    }
}
