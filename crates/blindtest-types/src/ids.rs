//! Typed key wrappers around the identifiers handed to us by the chat
//! platform.
//!
//! Chat platforms hand out opaque string identifiers (snowflakes, user
//! names, guild ids). Wrapping them keeps a player id from being passed
//! where a session id is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from anything string-like.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_key! {
    /// Identifier of a player (the chat author's platform id).
    PlayerId
}

define_key! {
    /// Identifier of a game session (typically one per guild or voice channel).
    SessionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_inner_string() {
        let id = PlayerId::new("1234");
        assert_eq!(id.to_string(), "1234");
        assert_eq!(id.as_str(), "1234");
    }

    #[test]
    fn serializes_transparently() {
        let id = SessionId::from("guild-7");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"guild-7\""));
    }
}
