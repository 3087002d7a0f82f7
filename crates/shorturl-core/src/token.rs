use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The short identifier appended to the base URL to form a short link.
///
/// Tokens are opaque: no validation is applied and two different URLs may,
/// in theory, be handed the same randomly generated token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortToken(String);

impl ShortToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates the full short URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for ShortToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ShortToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ShortToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
