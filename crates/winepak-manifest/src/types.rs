//! Newtype wrappers and Wine configuration tags used across the workspace.
//!
//! All newtypes serialize/deserialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
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

        impl PartialEq<String> for $name {
            fn eq(&self, other: &String) -> bool {
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
    /// Reverse-domain Flatpak application identifier (e.g. `org.winepak.my_app`).
    AppId
);

string_newtype!(
    /// Opaque token identifying one imported portable application in the registry.
    RecordId
);

/// Namespace prefix for all generated Flatpak application ids.
pub const APP_ID_PREFIX: &str = "org.winepak.";

impl AppId {
    /// Derive the Flatpak app id from a human-readable application name:
    /// lowercased, spaces replaced with underscores, prefixed with the
    /// `org.winepak.` namespace.
    pub fn derive(app_name: &str) -> Self {
        let slug = app_name.to_lowercase().replace(' ', "_");
        Self(format!("{APP_ID_PREFIX}{slug}"))
    }
}

/// Wine release channel to install into the package.
///
/// Unknown tags fall back to [`WineVersion::Stable`]; callers must not rely
/// on rejection of malformed values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WineVersion {
    #[default]
    Stable,
    Devel,
    Staging,
}

impl WineVersion {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "staging" => Self::Staging,
            "devel" => Self::Devel,
            _ => Self::Stable,
        }
    }
}

impl fmt::Display for WineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Devel => write!(f, "devel"),
            Self::Staging => write!(f, "staging"),
        }
    }
}

/// Target Wine architecture. Recorded for reproducibility; has no effect on
/// generated build commands today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WineArch {
    #[default]
    Win64,
    Win32,
}

impl WineArch {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "win32" => Self::Win32,
            _ => Self::Win64,
        }
    }
}

impl fmt::Display for WineArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win64 => write!(f, "win64"),
            Self::Win32 => write!(f, "win32"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_derivation() {
        assert_eq!(AppId::derive("My App").as_str(), "org.winepak.my_app");
        assert_eq!(AppId::derive("Notepad++").as_str(), "org.winepak.notepad++");
        assert_eq!(
            AppId::derive("Two  Spaces").as_str(),
            "org.winepak.two__spaces"
        );
    }

    #[test]
    fn app_id_serde_roundtrip() {
        let id = AppId::derive("Foo");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"org.winepak.foo\"");
        let back: AppId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn record_id_display_and_as_ref() {
        let id = RecordId::new("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(AsRef::<str>::as_ref(&id), "abc123");
    }

    #[test]
    fn wine_version_tags() {
        assert_eq!(WineVersion::from_tag("staging"), WineVersion::Staging);
        assert_eq!(WineVersion::from_tag("devel"), WineVersion::Devel);
        assert_eq!(WineVersion::from_tag("stable"), WineVersion::Stable);
    }

    #[test]
    fn wine_version_unknown_falls_back_to_stable() {
        assert_eq!(WineVersion::from_tag("unknown-tag"), WineVersion::Stable);
        assert_eq!(WineVersion::from_tag(""), WineVersion::Stable);
    }

    #[test]
    fn wine_arch_tags() {
        assert_eq!(WineArch::from_tag("win32"), WineArch::Win32);
        assert_eq!(WineArch::from_tag("win64"), WineArch::Win64);
        assert_eq!(WineArch::from_tag("sparc"), WineArch::Win64);
    }

    #[test]
    fn wine_version_display_matches_tag() {
        for tag in ["stable", "devel", "staging"] {
            assert_eq!(WineVersion::from_tag(tag).to_string(), tag);
        }
    }

    #[test]
    fn wine_arch_serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&WineArch::Win32).unwrap(),
            "\"win32\""
        );
        let back: WineArch = serde_json::from_str("\"win64\"").unwrap();
        assert_eq!(back, WineArch::Win64);
    }
}
