//! Storage backends for link records.
//!
//! Both implement [`lynx_core::Repository`]: [`InMemoryRepository`] for
//! tests and single-process setups, [`RedisRepository`] for production.

pub mod memory;
pub mod redis;

pub use lynx_core::{Repository, StorageError};
pub use memory::InMemoryRepository;
pub use self::redis::{RedisRepository, RedisSettings};
