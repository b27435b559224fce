//! Core types and traits for the Lynx URL shortener.
//!
//! This crate provides the short code codec, the link record model and
//! the [`Repository`] contract shared by the storage backends and the
//! link service.

pub mod base62;
pub mod clock;
pub mod error;
pub mod expire;
pub mod link;
pub mod repository;
pub mod shortcode;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DecodeError, StorageError};
pub use link::{LinkId, LinkRecord, NewLink};
pub use repository::Repository;
pub use shortcode::ShortCode;
