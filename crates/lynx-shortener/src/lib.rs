//! Link lifecycle service.
//!
//! This crate allocates collision-free ids, enforces expiry and
//! single-use semantics on top of any [`lynx_core::Repository`], and
//! provides the id generators it draws candidates from.

pub mod error;
pub mod generator;
pub mod service;
pub mod shortener;

pub use error::{Result, ShortenerError};
pub use generator::random::RandomGenerator;
pub use generator::seq::SeqGenerator;
pub use generator::Generator;
pub use service::{LinkService, ServiceSettings};
pub use shortener::Shortener;
