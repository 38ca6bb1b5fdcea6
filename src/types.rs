//! NewType identifiers shared by the auth and catalog layers.
//!
//! Users and movies are both keyed by opaque strings; wrapping them keeps a
//! movie id from ever reaching a session lookup and vice versa.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a string NewType with the conversions the stores and handlers need.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Mint a fresh random identifier (simple UUID v4, no hyphens).
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype_string!(
    /// Identity of a registered user.
    ///
    /// This is the value carried in session tokens (`user_id` and `sub`) and
    /// the suffix of the revocation key `token:valid:<id>`. It never changes
    /// once the user exists.
    UserId
);

newtype_string!(
    /// Identifier of a movie in the catalog, as used in `/movies/{id}`.
    MovieId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display_matches_inner() {
        let id = UserId::new("42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_generated_ids_are_unique_hex() {
        let a = MovieId::generate();
        let b = MovieId::generate();

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_serde_transparent() {
        let id = UserId::new("abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc\"");

        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
