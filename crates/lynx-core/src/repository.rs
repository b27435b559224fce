use crate::error::Result;
use crate::link::{LinkId, LinkRecord, NewLink};
use async_trait::async_trait;

/// Keyed storage for link records.
///
/// Backends are chosen at startup and injected into the link service.
/// Expiry is enforced by the caller on every read; a backend may also
/// purge expired keys on its own, but nothing relies on that.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Checks whether a record occupies `id`, expired or not.
    async fn exists(&self, id: LinkId) -> Result<bool>;

    /// Writes a new record with zero visits.
    ///
    /// Returns `Err(Conflict)` if `id` is already occupied; the existing
    /// record is left untouched.
    async fn create(&self, id: LinkId, link: NewLink) -> Result<()>;

    /// Retrieves the record stored at `id`.
    /// Returns `None` if the id does not exist.
    async fn get(&self, id: LinkId) -> Result<Option<LinkRecord>>;

    /// Removes the record at `id` and returns what was stored.
    /// Returns `None` if the id does not exist.
    async fn delete(&self, id: LinkId) -> Result<Option<LinkRecord>>;

    /// Atomically adds one to the visit counter and returns the new count.
    ///
    /// Returns `None` without creating anything if the id does not exist.
    /// With `single_use` set, a record that already has a visit is left
    /// untouched and `None` is returned, so at most one caller ever
    /// counts a visit on it.
    async fn increment_visits(&self, id: LinkId, single_use: bool) -> Result<Option<u64>>;

    /// Releases backend resources. Later calls fail with `Unavailable`.
    async fn close(&self) -> Result<()>;
}
