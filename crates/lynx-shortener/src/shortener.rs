use crate::error::Result;
use async_trait::async_trait;
use jiff::Timestamp;
use lynx_core::{LinkId, LinkRecord};

/// The link lifecycle: create, inspect, follow and delete short links.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Stores a new link and returns its id.
    ///
    /// Fails with `Expired` if `expire_at` is not in the future.
    async fn allocate(&self, url: String, expire_at: Timestamp, once: bool) -> Result<LinkId>;

    /// Returns the record for an info query.
    ///
    /// Expired links are `NotFound`; consumed single-use links are still
    /// returned so their state can be reported.
    async fn resolve(&self, id: LinkId) -> Result<LinkRecord>;

    /// Follows a link: counts the visit and returns the destination URL.
    async fn redirect(&self, id: LinkId) -> Result<String>;

    /// Deletes a link and returns what was stored.
    async fn remove(&self, id: LinkId) -> Result<LinkRecord>;

    /// Releases the underlying storage.
    async fn close(&self) -> Result<()>;
}
