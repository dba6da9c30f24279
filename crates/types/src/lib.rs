//! Validated primitive types shared across the CardCrafter crates.
//!
//! These wrappers check their invariants once, at construction or deserialisation, so the rest
//! of the code can take them at face value.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input exceeded the maximum allowed length
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    /// The input contained characters outside the allowed set
    #[error("Text contains invalid characters (only alphanumeric, '-', '_' allowed)")]
    InvalidCharacters,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a user as issued by the identity provider.
///
/// User ids are embedded in storage paths, so the accepted alphabet is deliberately narrow:
/// 1 to 128 ASCII characters from `[A-Za-z0-9_-]`. Unlike [`NonEmptyText`], the input is not
/// trimmed; surrounding whitespace is rejected as an invalid character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Maximum accepted length of a user id.
    pub const MAX_LEN: usize = 128;

    /// Validates `input` and wraps it.
    ///
    /// # Errors
    ///
    /// - [`TextError::Empty`] if `input` is empty,
    /// - [`TextError::TooLong`] if it is longer than [`UserId::MAX_LEN`],
    /// - [`TextError::InvalidCharacters`] for anything outside `[A-Za-z0-9_-]`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input.is_empty() {
            return Err(TextError::Empty);
        }
        if input.len() > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }
        let ok = input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));
        if !ok {
            return Err(TextError::InvalidCharacters);
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for UserId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserId::parse(s)
    }
}

impl serde::Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UserId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  What is 2 + 2?  ").unwrap();
        assert_eq!(text.as_str(), "What is 2 + 2?");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_blank() {
        let err = serde_json::from_str::<NonEmptyText>("\"   \"").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_user_id_accepts_provider_style_ids() {
        let id = UserId::parse("kP3xY9aQ1bZ7cV2dW8eR4fT6gH0j").unwrap();
        assert_eq!(id.to_string(), "kP3xY9aQ1bZ7cV2dW8eR4fT6gH0j");
        assert!(UserId::parse("user_01-abc").is_ok());
    }

    #[test]
    fn test_user_id_rejects_path_like_input() {
        assert_eq!(UserId::parse("../etc"), Err(TextError::InvalidCharacters));
        assert_eq!(UserId::parse("a/b"), Err(TextError::InvalidCharacters));
        assert_eq!(UserId::parse(" abc"), Err(TextError::InvalidCharacters));
        assert_eq!(UserId::parse(""), Err(TextError::Empty));
    }

    #[test]
    fn test_user_id_rejects_overlong_input() {
        let long = "a".repeat(UserId::MAX_LEN + 1);
        assert_eq!(
            UserId::parse(long),
            Err(TextError::TooLong { max: UserId::MAX_LEN })
        );
        assert!(UserId::parse("a".repeat(UserId::MAX_LEN)).is_ok());
    }
}
