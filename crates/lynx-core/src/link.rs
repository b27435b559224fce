use crate::base62;
use crate::error::DecodeError;
use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// The internal 64-bit key of a link record.
///
/// `Display` prints the decimal value, which is what storage keys use.
/// The public form is the [`ShortCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(u64);

impl LinkId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Encodes the identifier into its public short code.
    pub fn short_code(self) -> ShortCode {
        ShortCode::from(self)
    }
}

impl From<u64> for LinkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LinkId {
    type Err = DecodeError;

    /// Parses a base62 short code, not a decimal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        base62::decode(s).map(Self)
    }
}

/// The fields supplied when a link is created.
///
/// `url`, `expire_at` and `once` never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    /// Destination of the redirect, validated upstream.
    pub url: String,
    /// The link must not resolve at or after this instant.
    pub expire_at: Timestamp,
    /// Whether the link may satisfy at most one redirect.
    pub once: bool,
}

/// A stored link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: LinkId,
    pub url: String,
    pub expire_at: Timestamp,
    pub once: bool,
    /// Number of successful redirects.
    pub visits: u64,
}

impl LinkRecord {
    /// Builds the record a fresh `create` produces.
    pub fn new(id: LinkId, link: NewLink) -> Self {
        Self {
            id,
            url: link.url,
            expire_at: link.expire_at,
            once: link.once,
            visits: 0,
        }
    }

    /// A link is logically gone once `now` reaches its expiration,
    /// whether or not the backend has purged it.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now >= self.expire_at
    }

    /// A single-use link that has already redirected once.
    pub fn is_consumed(&self) -> bool {
        self.once && self.visits > 0
    }
}
