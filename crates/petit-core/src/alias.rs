use crate::error::AliasError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A validated alias: the lookup key of a shortened URL.
///
/// Aliases are trimmed of surrounding whitespace and must be a single,
/// non-empty path segment of at most 255 bytes without control characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alias(String);

const MAX_LENGTH: usize = 255;

impl Alias {
    /// Creates a new `Alias` after trimming and validating the input.
    pub fn new(alias: impl AsRef<str>) -> std::result::Result<Self, AliasError> {
        let alias = alias.as_ref().trim();
        Self::validate(alias)?;
        Ok(Self(alias.to_owned()))
    }

    /// Creates an `Alias` without validation.
    ///
    /// Use this only for aliases produced by trusted internal sources
    /// (e.g. generators that are guaranteed to produce valid output).
    /// Backends never rely on validation for their own safety.
    pub fn new_unchecked(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the alias as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the alias and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(alias: &str) -> std::result::Result<(), AliasError> {
        if alias.is_empty() {
            return Err(AliasError::Empty);
        }

        if alias.len() > MAX_LENGTH {
            return Err(AliasError::TooLong {
                max: MAX_LENGTH,
                actual: alias.len(),
            });
        }

        if alias == "." || alias == ".." {
            return Err(AliasError::InvalidCharacters(alias.to_owned()));
        }

        if alias
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(AliasError::InvalidCharacters(alias.to_owned()));
        }

        Ok(())
    }
}

impl Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Alias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Alias {
    type Error = AliasError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Alias {
    type Error = AliasError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Alias> for String {
    fn from(value: Alias) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_aliases() {
        assert!(Alias::new("a").is_ok());
        assert!(Alias::new("Abc-123_xyz").is_ok());
        assert!(Alias::new("CorrectHorseBattery").is_ok());
        assert!(Alias::new("a".repeat(255)).is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let alias = Alias::new("  example \n").unwrap();
        assert_eq!(alias.as_str(), "example");
    }

    #[test]
    fn empty() {
        assert!(matches!(Alias::new(""), Err(AliasError::Empty)));
        assert!(matches!(Alias::new("   "), Err(AliasError::Empty)));
    }

    #[test]
    fn too_long() {
        assert!(matches!(
            Alias::new("a".repeat(256)),
            Err(AliasError::TooLong { .. })
        ));
    }

    #[test]
    fn path_like_values_are_rejected() {
        assert!(Alias::new("../secret").is_err());
        assert!(Alias::new("abc/def").is_err());
        assert!(Alias::new("abc\\def").is_err());
        assert!(Alias::new("..").is_err());
        assert!(Alias::new(".").is_err());
        assert!(Alias::new("abc\0def").is_err());
    }

    #[test]
    fn display() {
        let alias = Alias::new("my-alias").unwrap();
        assert_eq!(alias.to_string(), "my-alias");
    }

    #[test]
    fn to_url() {
        let alias = Alias::new("abc123").unwrap();
        assert_eq!(alias.to_url("https://pet.it"), "https://pet.it/abc123");
        assert_eq!(alias.to_url("https://pet.it/"), "https://pet.it/abc123");
    }

    #[test]
    fn deserialize_validates() {
        let alias: Alias = serde_json::from_str("\"example\"").unwrap();
        assert_eq!(alias.as_str(), "example");
        assert!(serde_json::from_str::<Alias>("\"../etc\"").is_err());
    }
}
