// SPDX-License-Identifier: MPL-2.0
use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    Io(String),
    Config(String),
    Sanitize(SanitizeError),
}

/// Failures raised while stripping metadata from a single image.
///
/// The upload hook absorbs both variants: a failed sanitization leaves the
/// uploaded file exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    /// The input could not be read or parsed as an image of its declared type.
    Decode(String),

    /// The sanitized image could not be serialized or persisted.
    EncodeOrWrite(String),
}

impl SanitizeError {
    /// Short, stable label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            SanitizeError::Decode(_) => "decode",
            SanitizeError::EncodeOrWrite(_) => "encode_or_write",
        }
    }
}

impl fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizeError::Decode(msg) => write!(f, "Decode failed: {}", msg),
            SanitizeError::EncodeOrWrite(msg) => write!(f, "Encode or write failed: {}", msg),
        }
    }
}

impl std::error::Error for SanitizeError {}

/// Reasons an embedded ICC profile could not be captured.
///
/// Never escapes the sanitizer: both cases mean "no profile to restore".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileReadError {
    /// The image carries no colour profile.
    Missing,

    /// A profile block exists but its contents are not a usable ICC profile.
    Malformed(String),
}

impl fmt::Display for ProfileReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileReadError::Missing => write!(f, "No ICC profile present"),
            ProfileReadError::Malformed(msg) => write!(f, "Malformed ICC profile: {}", msg),
        }
    }
}

impl std::error::Error for ProfileReadError {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O Error: {}", e),
            Error::Config(e) => write!(f, "Config Error: {}", e),
            Error::Sanitize(e) => write!(f, "Sanitize Error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<SanitizeError> for Error {
    fn from(err: SanitizeError) -> Self {
        Error::Sanitize(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
