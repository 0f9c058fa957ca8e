//! Newtype wrappers for string identifiers, providing compile-time type safety.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Identifier naming an enricher in descriptors and provider scopes,
    /// e.g. `rigging.project-labels`.
    UnitId
);

string_newtype!(
    /// Full image reference as declared in the project configuration,
    /// e.g. `example/demo:1.0`.
    ImageName
);

impl ImageName {
    /// Repository part of the reference without registry host or tag.
    ///
    /// `registry.local:5000/team/demo:1.0` yields `demo`.
    pub fn simple_name(&self) -> &str {
        let without_digest = self.0.split('@').next().unwrap_or(&self.0);
        let last = without_digest.rsplit('/').next().unwrap_or(without_digest);
        last.split(':').next().unwrap_or(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_id_display_and_as_ref() {
        let id = UnitId::new("rigging.selectors");
        assert_eq!(id.to_string(), "rigging.selectors");
        assert_eq!(id.as_str(), "rigging.selectors");
        assert_eq!(AsRef::<str>::as_ref(&id), "rigging.selectors");
    }

    #[test]
    fn unit_id_serde_roundtrip() {
        let id = UnitId::new("com.x.Foo");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"com.x.Foo\"");
        let back: UnitId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn unit_id_compares_with_str() {
        let id = UnitId::from("com.x.Bar");
        assert_eq!(id, "com.x.Bar");
        assert_ne!(id, "com.x.Baz");
    }

    #[test]
    fn image_simple_name_strips_registry_and_tag() {
        assert_eq!(ImageName::new("example/demo:1.0").simple_name(), "demo");
        assert_eq!(
            ImageName::new("registry.local:5000/team/demo:1.0").simple_name(),
            "demo"
        );
        assert_eq!(ImageName::new("demo").simple_name(), "demo");
        assert_eq!(
            ImageName::new("team/demo@sha256:abcdef").simple_name(),
            "demo"
        );
    }
}
