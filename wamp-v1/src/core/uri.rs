use std::{
    fmt::Display,
    sync::LazyLock,
};

use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
    de::{
        Unexpected,
        Visitor,
    },
};
use thiserror::Error;

/// Error for an invalid URI.
#[derive(Debug, Error)]
#[error("invalid URI: {0:?}")]
pub struct InvalidUriError(pub String);

/// Validates an absolute or relative URI reference.
///
/// Only characters allowed by RFC 3986 are accepted, and every percent sign must start a valid
/// escape sequence.
pub fn validate_uri<S>(uri: S) -> Result<(), InvalidUriError>
where
    S: AsRef<str>,
{
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=]|%[0-9A-Fa-f]{2})+$").unwrap()
    });
    if !RE.is_match(uri.as_ref()) {
        return Err(InvalidUriError(uri.as_ref().to_owned()));
    }
    Ok(())
}

/// Checks if the string is a well-formed URI.
pub fn is_well_formed_uri<S>(uri: S) -> bool
where
    S: AsRef<str>,
{
    validate_uri(uri).is_ok()
}

/// A uniform resource identifier, used for identifying topics, procedures, and errors.
///
/// WAMP v1 allows both full URIs (`http://example.com/simple`) and relative references.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    /// Constructs a URI directly from a value known to be valid, skipping validation.
    pub(crate) fn from_known<S>(value: S) -> Self
    where
        S: Into<String>,
    {
        Self(value.into())
    }

    /// The URI for a standard error.
    pub(crate) fn wamp_error(component: &str) -> Self {
        Self::from_known(format!("wamp.error.{component}"))
    }

    /// The string representation of the URI.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Uri {
    type Error = InvalidUriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_uri(&value)?;
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Uri {
    type Error = InvalidUriError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        validate_uri(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl From<Uri> for String {
    fn from(value: Uri) -> Self {
        value.0
    }
}

struct UriVisitor;

impl<'de> Visitor<'de> for UriVisitor {
    type Value = Uri;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a URI")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Uri::try_from(v).map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for Uri {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(UriVisitor)
    }
}
