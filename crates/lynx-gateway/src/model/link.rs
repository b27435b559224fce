use crate::error::AppError;
use jiff::Timestamp;
use lynx_core::expire::{format_expire, parse_expire};
use lynx_core::{LinkRecord, ShortCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Body of `POST /encode`.
///
/// Missing fields deserialize to their empty value so that validation,
/// not the JSON decoder, reports them.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodeRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub expire: String,
    #[serde(default)]
    pub once: bool,
}

/// An [`EncodeRequest`] that passed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLink {
    pub url: String,
    pub expire_at: Timestamp,
    pub once: bool,
}

impl EncodeRequest {
    /// Checks every field and reports all failures at once, e.g.
    /// `expire: invalid date; url: is required.`
    pub fn validate(self) -> Result<ValidatedLink, AppError> {
        let mut errors = BTreeMap::new();

        if self.url.is_empty() {
            errors.insert("url", "is required");
        } else if !is_web_url(&self.url) {
            errors.insert("url", "invalid url");
        }

        let expire_at = if self.expire.is_empty() {
            errors.insert("expire", "is required");
            None
        } else {
            match parse_expire(&self.expire) {
                Ok(expire_at) => Some(expire_at),
                Err(_) => {
                    errors.insert("expire", "invalid date");
                    None
                }
            }
        };

        match expire_at {
            Some(expire_at) if errors.is_empty() => Ok(ValidatedLink {
                url: self.url,
                expire_at,
                once: self.once,
            }),
            _ => Err(AppError::Validation(describe(&errors))),
        }
    }
}

fn describe(errors: &BTreeMap<&str, &str>) -> String {
    let joined = errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ");
    format!("{joined}.")
}

/// Absolute http(s) URL that can go verbatim into a `Location` header.
fn is_web_url(raw: &str) -> bool {
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub status: &'static str,
    pub url: String,
}

impl EncodeResponse {
    pub fn success(url: String) -> Self {
        Self {
            status: "success",
            url,
        }
    }
}

/// Body of `GET /info/{code}`.
#[derive(Debug, Serialize)]
pub struct LinkInfoResponse {
    pub id: String,
    pub url: String,
    pub visits: u64,
    pub expire: String,
    pub once: bool,
}

impl LinkInfoResponse {
    pub fn new(code: &ShortCode, record: LinkRecord) -> Self {
        Self {
            id: code.as_str().to_string(),
            url: record.url,
            visits: record.visits,
            expire: format_expire(record.expire_at),
            once: record.once,
        }
    }
}
