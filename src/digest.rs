//! Hash digests and password lengths: the two scalar identities every
//! campaign is keyed on.
//!
//! A [`HashDigest`] is opaque text normalized to lowercase. Nothing here
//! decodes it; the Guesser is the only component that cares what the bytes
//! mean.
use std::fmt;
use std::str::FromStr;

/// Width of a digest accepted from a hash input file (128-bit hex).
pub const DIGEST_WIDTH: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("empty hash")]
    Empty,
    #[error("hash contains whitespace: {0}")]
    Whitespace(String),
    #[error("invalid password length: {0:?}")]
    InvalidLength(String),
}

/// Lowercased, trimmed hash value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashDigest(String);

impl HashDigest {
    pub fn parse(raw: &str) -> Result<Self, DigestError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DigestError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DigestError::Whitespace(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// Accept a line from a hash input file. Only lines whose trimmed width
    /// equals [`DIGEST_WIDTH`] qualify; everything else is dropped.
    pub fn from_input_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.len() != DIGEST_WIDTH {
            return None;
        }
        Self::parse(trimmed).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HashDigest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for HashDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for HashDigest {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

/// Exact character length of the passwords a table covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PasswordLength(u32);

impl PasswordLength {
    pub fn new(n: u32) -> Option<Self> {
        (n > 0).then_some(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PasswordLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for PasswordLength {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(self.0)
    }
}

impl FromStr for PasswordLength {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| DigestError::InvalidLength(trimmed.to_string()))
    }
}
