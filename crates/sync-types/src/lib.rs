//! Validated value types shared by the clinic-sync crates.
//!
//! Every identifier that crosses a system boundary (CRM contact ids, clinical resource UUIDs,
//! configuration strings) is wrapped in a type that guarantees its basic shape once constructed,
//! so the workflow code never re-checks for empty or malformed values.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input is not a usable external identifier
    #[error("Invalid external identifier: {0}")]
    InvalidExternalId(String),
}

/// Text with at least one non-whitespace character, stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trims `input`; fails with [`TextError::Empty`] when nothing is left.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
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

/// Identifier assigned by the CRM to a contact.
///
/// The value is embedded in staged filenames and in clinical identifiers, where `_` and `-` act
/// as delimiters, so only ASCII letters and digits are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalId(String);

impl ExternalId {
    /// Parses an external identifier exactly as given.
    ///
    /// Surrounding whitespace is rejected like any other non-alphanumeric character; a filename
    /// segment such as `EXT- 47 ` is malformed, not a padded `47`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let value = input.as_ref();
        if value.is_empty() {
            return Err(TextError::Empty);
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(TextError::InvalidExternalId(value.to_owned()));
        }
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ExternalId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque UUID of a resource in the clinical records system.
///
/// The clinical system mixes RFC 4122 UUIDs with legacy concept ids
/// (`5089AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA`), so the only guarantee is non-empty text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ResourceUuid(NonEmptyText);

impl ResourceUuid {
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for ResourceUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResourceUuid {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
