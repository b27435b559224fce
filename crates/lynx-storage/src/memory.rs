use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use lynx_core::error::Result;
use lynx_core::{LinkId, LinkRecord, NewLink, Repository, StorageError};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// In-memory implementation of the Repository trait using DashMap.
///
/// Every operation touches a single key under its shard lock, so
/// `create` and `increment_visits` are atomic per link.
///
/// Records are never purged on expiry; the link service checks
/// expiration on read.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<LinkId, LinkRecord>,
    closed: AtomicBool,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with records, keyed by their ids.
    pub fn with_records(records: impl IntoIterator<Item = LinkRecord>) -> Self {
        let repository = Self::new();
        for record in records {
            repository.storage.insert(record.id, record);
        }
        repository
    }

    /// Number of stored records, including expired ones.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Unavailable("repository is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn exists(&self, id: LinkId) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.storage.contains_key(&id))
    }

    async fn create(&self, id: LinkId, link: NewLink) -> Result<()> {
        self.ensure_open()?;
        match self.storage.entry(id) {
            Entry::Occupied(_) => Err(StorageError::Conflict(id)),
            Entry::Vacant(slot) => {
                slot.insert(LinkRecord::new(id, link));
                trace!(id = %id, "stored link in memory");
                Ok(())
            }
        }
    }

    async fn get(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        self.ensure_open()?;
        Ok(self.storage.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        self.ensure_open()?;
        Ok(self.storage.remove(&id).map(|(_, record)| record))
    }

    async fn increment_visits(&self, id: LinkId, single_use: bool) -> Result<Option<u64>> {
        self.ensure_open()?;
        let Some(mut entry) = self.storage.get_mut(&id) else {
            return Ok(None);
        };

        // checked under the shard lock, so concurrent callers see each other
        if single_use && entry.visits > 0 {
            trace!(id = %id, "single-use link already visited");
            return Ok(None);
        }

        entry.visits += 1;
        Ok(Some(entry.visits))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.storage.clear();
        trace!("closed in-memory repository");
        Ok(())
    }
}
