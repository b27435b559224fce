use crate::base62;
use crate::error::DecodeError;
use crate::link::LinkId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A validated short code: the public base62 form of a [`LinkId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortCode {
    code: String,
    id: LinkId,
}

impl ShortCode {
    /// Parses a short code received from outside.
    ///
    /// Fails if any character is outside the alphabet or the value
    /// does not fit in 64 bits.
    pub fn new(code: impl Into<String>) -> Result<Self, DecodeError> {
        let code = code.into();
        let id = LinkId::new(base62::decode(&code)?);
        Ok(Self { code, id })
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.code)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// The identifier this code decodes to.
    pub fn id(&self) -> LinkId {
        self.id
    }
}

impl From<LinkId> for ShortCode {
    fn from(id: LinkId) -> Self {
        Self {
            code: base62::encode(id.get()),
            id,
        }
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

impl Serialize for ShortCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.code.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Self::new(code).map_err(serde::de::Error::custom)
    }
}
