//! Request models for the token server.

use common::types::DEFAULT_ROOM_NAME;
use serde::Deserialize;

/// Longest accepted room name, in characters.
pub const MAX_ROOM_NAME_CHARS: usize = 128;

/// Longest accepted user identity, in characters.
pub const MAX_IDENTITY_CHARS: usize = 128;

/// Query string of `GET /getToken`.
///
/// Both values are optional. Empty values behave as if absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenQuery {
    /// Room to join (default: "default-room").
    pub room: Option<String>,

    /// Participant identity (default: a generated guest identity).
    pub user: Option<String>,
}

impl TokenQuery {
    /// Validate field lengths.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self
            .room
            .as_deref()
            .is_some_and(|room| room.chars().count() > MAX_ROOM_NAME_CHARS)
        {
            return Err("room must be at most 128 characters");
        }

        if self
            .user
            .as_deref()
            .is_some_and(|user| user.chars().count() > MAX_IDENTITY_CHARS)
        {
            return Err("user must be at most 128 characters");
        }

        Ok(())
    }

    /// Requested room, or the default room.
    pub fn room_name(&self) -> &str {
        self.room
            .as_deref()
            .filter(|room| !room.is_empty())
            .unwrap_or(DEFAULT_ROOM_NAME)
    }

    /// Requested identity, if one was given.
    pub fn identity(&self) -> Option<&str> {
        self.user.as_deref().filter(|user| !user.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let query = TokenQuery::default();
        assert_eq!(query.room_name(), "default-room");
        assert_eq!(query.identity(), None);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_empty_values_behave_as_absent() {
        let query = TokenQuery {
            room: Some(String::new()),
            user: Some(String::new()),
        };
        assert_eq!(query.room_name(), "default-room");
        assert_eq!(query.identity(), None);
    }

    #[test]
    fn test_explicit_values_are_used() {
        let query = TokenQuery {
            room: Some("myroom".to_string()),
            user: Some("user1".to_string()),
        };
        assert_eq!(query.room_name(), "myroom");
        assert_eq!(query.identity(), Some("user1"));
    }

    #[test]
    fn test_validate_rejects_long_room() {
        let query = TokenQuery {
            room: Some("r".repeat(MAX_ROOM_NAME_CHARS + 1)),
            user: None,
        };
        assert_eq!(
            query.validate(),
            Err("room must be at most 128 characters")
        );
    }

    #[test]
    fn test_validate_rejects_long_user() {
        let query = TokenQuery {
            room: None,
            user: Some("u".repeat(MAX_IDENTITY_CHARS + 1)),
        };
        assert_eq!(
            query.validate(),
            Err("user must be at most 128 characters")
        );
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        let query = TokenQuery {
            room: Some("é".repeat(MAX_ROOM_NAME_CHARS)),
            user: None,
        };
        assert!(query.validate().is_ok());
    }
}
