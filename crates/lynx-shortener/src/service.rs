use crate::error::{Result, ShortenerError};
use crate::generator::random::RandomGenerator;
use crate::generator::Generator;
use crate::shortener::Shortener;
use async_trait::async_trait;
use jiff::Timestamp;
use lynx_core::expire::truncate_to_second;
use lynx_core::{Clock, LinkId, LinkRecord, NewLink, Repository, StorageError, SystemClock};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct ServiceSettings {
    /// How many candidate ids `allocate` tries before giving up.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the [`Shortener`] trait.
///
/// This service wraps a [`Repository`], a [`Generator`] and a [`Clock`]
/// to handle:
/// - Collision-free id allocation with a bounded number of draws
/// - Expiration checks on every read
/// - Single-use consumption and visit counting on redirect
///
/// It keeps no mutable state of its own. Clones share the same
/// collaborators and can be handed to concurrent request handlers.
#[derive(Debug)]
pub struct LinkService<R, G = RandomGenerator, C = SystemClock> {
    repository: Arc<R>,
    generator: Arc<G>,
    clock: Arc<C>,
    settings: ServiceSettings,
}

impl<R, G, C> Clone for LinkService<R, G, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
            clock: Arc::clone(&self.clock),
            settings: self.settings,
        }
    }
}

impl<R: Repository> LinkService<R> {
    /// Creates a service with random ids, the system clock and default settings.
    pub fn new(repository: R) -> Self {
        Self::with_parts(
            repository,
            RandomGenerator::new(),
            SystemClock,
            ServiceSettings::default(),
        )
    }
}

impl<R: Repository, G: Generator, C: Clock> LinkService<R, G, C> {
    pub fn with_parts(repository: R, generator: G, clock: C, settings: ServiceSettings) -> Self {
        Self {
            repository: Arc::new(repository),
            generator: Arc::new(generator),
            clock: Arc::new(clock),
            settings,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn settings(&self) -> ServiceSettings {
        self.settings
    }

    /// Draws candidates until one can be created.
    ///
    /// The `exists` check skips obviously taken ids; the conditional
    /// `create` settles races with concurrent allocators.
    async fn store_with_fresh_id(&self, link: NewLink) -> Result<LinkId> {
        let max_attempts = self.settings.max_attempts;

        for attempt in 1..=max_attempts {
            let id = self.generator.generate();

            if self.repository.exists(id).await? {
                debug!(id = %id, attempt, "candidate id already taken");
                continue;
            }

            match self.repository.create(id, link.clone()).await {
                Ok(()) => {
                    debug!(id = %id, attempt, "allocated link");
                    return Ok(id);
                }
                Err(StorageError::Conflict(_)) => {
                    debug!(id = %id, attempt, "candidate id taken concurrently");
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!(attempts = max_attempts, "gave up looking for a free link id");
        Err(ShortenerError::Exhausted {
            attempts: max_attempts,
        })
    }
}

#[async_trait]
impl<R: Repository, G: Generator, C: Clock> Shortener for LinkService<R, G, C> {
    async fn allocate(&self, url: String, expire_at: Timestamp, once: bool) -> Result<LinkId> {
        // stored expirations have whole-second precision
        let expire_at = truncate_to_second(expire_at);
        let now = self.clock.now();
        if expire_at <= now {
            debug!(%expire_at, %now, "rejecting link that is already expired");
            return Err(ShortenerError::Expired(expire_at));
        }

        self.store_with_fresh_id(NewLink {
            url,
            expire_at,
            once,
        })
        .await
    }

    async fn resolve(&self, id: LinkId) -> Result<LinkRecord> {
        trace!(id = %id, "resolving link");

        let Some(record) = self.repository.get(id).await? else {
            trace!(id = %id, "link not found");
            return Err(ShortenerError::NotFound);
        };

        if record.is_expired_at(self.clock.now()) {
            debug!(id = %id, expire_at = %record.expire_at, "link has expired");
            return Err(ShortenerError::NotFound);
        }

        Ok(record)
    }

    async fn redirect(&self, id: LinkId) -> Result<String> {
        let record = self.resolve(id).await?;

        if record.is_consumed() {
            debug!(id = %id, "single-use link already consumed");
            return Err(ShortenerError::NotFound);
        }

        match self.repository.increment_visits(id, record.once).await {
            Ok(Some(visits)) => {
                debug!(id = %id, visits, "redirecting");
                Ok(record.url)
            }
            Ok(None) => {
                debug!(id = %id, "link vanished or was consumed before its visit was counted");
                Err(ShortenerError::NotFound)
            }
            Err(e) => {
                warn!(id = %id, error = %e, "failed to count visit, treating link as missing");
                Err(ShortenerError::NotFound)
            }
        }
    }

    async fn remove(&self, id: LinkId) -> Result<LinkRecord> {
        match self.repository.delete(id).await? {
            Some(record) => {
                debug!(id = %id, "removed link");
                Ok(record)
            }
            None => Err(ShortenerError::NotFound),
        }
    }

    async fn close(&self) -> Result<()> {
        self.repository.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::seq::SeqGenerator;
    use jiff::SignedDuration;
    use lynx_core::ManualClock;
    use lynx_storage::InMemoryRepository;
    use std::sync::atomic::{AtomicBool, Ordering};

    type TestService<R = InMemoryRepository> = LinkService<R, SeqGenerator, ManualClock>;

    fn start() -> Timestamp {
        "2030-01-01T00:00:00Z".parse().unwrap()
    }

    fn one_year() -> SignedDuration {
        SignedDuration::from_hours(24 * 365)
    }

    fn test_service() -> (TestService, ManualClock) {
        service_over(InMemoryRepository::new(), SeqGenerator::new())
    }

    fn service_over<R: Repository>(repo: R, generator: SeqGenerator) -> (TestService<R>, ManualClock) {
        let clock = ManualClock::new(start());
        let service = LinkService::with_parts(
            repo,
            generator,
            clock.clone(),
            ServiceSettings::default(),
        );
        (service, clock)
    }

    fn stored(id: u64, expire_at: Timestamp) -> LinkRecord {
        LinkRecord {
            id: LinkId::new(id),
            url: format!("https://taken{id}.com"),
            expire_at,
            once: false,
            visits: 0,
        }
    }

    /// Wraps the in-memory repository and injects failures.
    #[derive(Default)]
    struct FlakyRepository {
        inner: InMemoryRepository,
        hide_existing: AtomicBool,
        fail_reads: AtomicBool,
        fail_increments: AtomicBool,
    }

    #[async_trait]
    impl Repository for FlakyRepository {
        async fn exists(&self, id: LinkId) -> lynx_core::error::Result<bool> {
            if self.hide_existing.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.inner.exists(id).await
        }

        async fn create(&self, id: LinkId, link: NewLink) -> lynx_core::error::Result<()> {
            self.inner.create(id, link).await
        }

        async fn get(&self, id: LinkId) -> lynx_core::error::Result<Option<LinkRecord>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Timeout("get".to_string()));
            }
            self.inner.get(id).await
        }

        async fn delete(&self, id: LinkId) -> lynx_core::error::Result<Option<LinkRecord>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("delete".to_string()));
            }
            self.inner.delete(id).await
        }

        async fn increment_visits(
            &self,
            id: LinkId,
            single_use: bool,
        ) -> lynx_core::error::Result<Option<u64>> {
            if self.fail_increments.load(Ordering::SeqCst) {
                return Err(StorageError::Timeout("increment".to_string()));
            }
            self.inner.increment_visits(id, single_use).await
        }

        async fn close(&self) -> lynx_core::error::Result<()> {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn allocate_then_resolve() {
        let (service, clock) = test_service();
        let expire_at = clock.now() + one_year();

        let id = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap();

        let record = service.resolve(id).await.unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.url, "https://example.com");
        assert_eq!(record.expire_at, expire_at);
        assert!(!record.once);
        assert_eq!(record.visits, 0);
    }

    #[tokio::test]
    async fn allocate_truncates_to_whole_seconds() {
        let (service, clock) = test_service();
        let expire_at = clock.now() + one_year() + SignedDuration::from_millis(750);

        let id = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap();

        let record = service.resolve(id).await.unwrap();
        assert_eq!(record.expire_at, clock.now() + one_year());
    }

    #[tokio::test]
    async fn allocate_in_the_past_writes_nothing() {
        let (service, clock) = test_service();

        let err = service
            .allocate(
                "https://example.com".to_string(),
                clock.now() - SignedDuration::from_secs(1),
                false,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::Expired(_)));
        assert!(service.repository().is_empty());
    }

    #[tokio::test]
    async fn allocate_expiring_now_is_rejected() {
        let (service, clock) = test_service();

        let err = service
            .allocate("https://example.com".to_string(), clock.now(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::Expired(at) if at == clock.now()));
        assert!(service.repository().is_empty());
    }

    #[tokio::test]
    async fn sequential_allocations_get_distinct_ids() {
        let service = LinkService::new(InMemoryRepository::new());
        let expire_at = Timestamp::now() + one_year();

        let first = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap();
        let second = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(service.repository().len(), 2);
    }

    #[tokio::test]
    async fn allocate_skips_taken_ids() {
        let expire_at = start() + one_year();
        let repo = InMemoryRepository::with_records((0..3).map(|id| stored(id, expire_at)));
        let (service, _) = service_over(repo, SeqGenerator::new());

        let id = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap();

        assert_eq!(id, LinkId::new(3));
        assert_eq!(
            service.resolve(LinkId::new(0)).await.unwrap().url,
            "https://taken0.com"
        );
    }

    #[tokio::test]
    async fn allocate_retries_when_create_conflicts() {
        let expire_at = start() + one_year();
        let repo = FlakyRepository {
            inner: InMemoryRepository::with_records((0..2).map(|id| stored(id, expire_at))),
            ..Default::default()
        };
        // the `exists` check sees nothing, as if another allocator raced us
        repo.hide_existing.store(true, Ordering::SeqCst);
        let (service, _) = service_over(repo, SeqGenerator::new());

        let id = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap();

        assert_eq!(id, LinkId::new(2));
        assert_eq!(
            service.resolve(LinkId::new(1)).await.unwrap().url,
            "https://taken1.com"
        );
    }

    #[tokio::test]
    async fn allocate_gives_up_after_max_attempts() {
        let expire_at = start() + one_year();
        let repo = InMemoryRepository::with_records((0..3).map(|id| stored(id, expire_at)));
        let clock = ManualClock::new(start());
        let service = LinkService::with_parts(
            repo,
            SeqGenerator::new(),
            clock,
            ServiceSettings::builder().max_attempts(3).build(),
        );

        let err = service
            .allocate("https://example.com".to_string(), expire_at, false)
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::Exhausted { attempts: 3 }));
        assert_eq!(service.repository().len(), 3);
    }

    #[tokio::test]
    async fn resolve_unknown_id() {
        let (service, _) = test_service();

        let err = service.resolve(LinkId::new(99)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn resolve_expired_link_still_in_storage() {
        let (service, clock) = test_service();
        let id = service
            .allocate(
                "https://example.com".to_string(),
                clock.now() + SignedDuration::from_secs(60),
                false,
            )
            .await
            .unwrap();

        clock.advance(SignedDuration::from_secs(59));
        assert!(service.resolve(id).await.is_ok());

        clock.advance(SignedDuration::from_secs(1));
        assert!(service.resolve(id).await.unwrap_err().is_not_found());
        assert!(service.redirect(id).await.unwrap_err().is_not_found());

        // logically gone, physically present
        assert!(service.repository().exists(id).await.unwrap());
    }

    #[tokio::test]
    async fn single_use_redirects_once() {
        let (service, clock) = test_service();
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), true)
            .await
            .unwrap();

        assert_eq!(service.redirect(id).await.unwrap(), "https://example.com");
        assert!(service.redirect(id).await.unwrap_err().is_not_found());

        // info queries are not gated by consumption
        let record = service.resolve(id).await.unwrap();
        assert!(record.once);
        assert_eq!(record.visits, 1);
    }

    #[tokio::test]
    async fn reusable_link_counts_every_redirect() {
        let (service, clock) = test_service();
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), false)
            .await
            .unwrap();

        assert_eq!(service.redirect(id).await.unwrap(), "https://example.com");
        assert_eq!(service.redirect(id).await.unwrap(), "https://example.com");

        let record = service.resolve(id).await.unwrap();
        assert_eq!(record.visits, 2);
        assert!(!record.once);
    }

    #[tokio::test]
    async fn resolve_does_not_count_visits() {
        let (service, clock) = test_service();
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), true)
            .await
            .unwrap();

        service.resolve(id).await.unwrap();
        service.resolve(id).await.unwrap();

        assert_eq!(service.resolve(id).await.unwrap().visits, 0);
        assert!(service.redirect(id).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_redirects_consume_single_use_link_once() {
        let (service, clock) = test_service();
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), true)
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.redirect(id).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(url) => {
                    assert_eq!(url, "https://example.com");
                    successes += 1;
                }
                Err(err) => assert!(err.is_not_found()),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(service.resolve(id).await.unwrap().visits, 1);
    }

    /// Holds every `get` until two callers have arrived, so both
    /// redirects read the record before either counts a visit.
    struct LockstepRepository {
        inner: InMemoryRepository,
        reads: tokio::sync::Barrier,
    }

    #[async_trait]
    impl Repository for LockstepRepository {
        async fn exists(&self, id: LinkId) -> lynx_core::error::Result<bool> {
            self.inner.exists(id).await
        }

        async fn create(&self, id: LinkId, link: NewLink) -> lynx_core::error::Result<()> {
            self.inner.create(id, link).await
        }

        async fn get(&self, id: LinkId) -> lynx_core::error::Result<Option<LinkRecord>> {
            self.reads.wait().await;
            self.inner.get(id).await
        }

        async fn delete(&self, id: LinkId) -> lynx_core::error::Result<Option<LinkRecord>> {
            self.inner.delete(id).await
        }

        async fn increment_visits(
            &self,
            id: LinkId,
            single_use: bool,
        ) -> lynx_core::error::Result<Option<u64>> {
            self.inner.increment_visits(id, single_use).await
        }

        async fn close(&self) -> lynx_core::error::Result<()> {
            self.inner.close().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn racing_redirects_count_single_use_visit_once() {
        let repo = LockstepRepository {
            inner: InMemoryRepository::new(),
            reads: tokio::sync::Barrier::new(2),
        };
        let (service, clock) = service_over(repo, SeqGenerator::new());
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), true)
            .await
            .unwrap();

        let (first, second) = tokio::join!(service.redirect(id), service.redirect(id));

        assert_eq!(
            u8::from(first.is_ok()) + u8::from(second.is_ok()),
            1,
            "exactly one redirect wins: {first:?} {second:?}"
        );
        for result in [first, second] {
            if let Err(err) = result {
                assert!(err.is_not_found());
            }
        }

        // read past the barrier
        let record = service.repository().inner.get(id).await.unwrap().unwrap();
        assert_eq!(record.visits, 1);
    }

    #[tokio::test]
    async fn remove_returns_prior_record() {
        let (service, clock) = test_service();
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), false)
            .await
            .unwrap();
        service.redirect(id).await.unwrap();

        let removed = service.remove(id).await.unwrap();
        assert_eq!(removed.url, "https://example.com");
        assert_eq!(removed.visits, 1);

        assert!(service.resolve(id).await.unwrap_err().is_not_found());
        assert!(service.remove(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn storage_failures_are_not_not_found() {
        let repo = FlakyRepository::default();
        let (service, clock) = service_over(repo, SeqGenerator::new());
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), false)
            .await
            .unwrap();

        service.repository().fail_reads.store(true, Ordering::SeqCst);

        let err = service.resolve(id).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Timeout(_))));

        let err = service.redirect(id).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Timeout(_))));

        let err = service.remove(id).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn failed_visit_count_degrades_to_not_found() {
        let repo = FlakyRepository::default();
        let (service, clock) = service_over(repo, SeqGenerator::new());
        let id = service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), false)
            .await
            .unwrap();

        service
            .repository()
            .fail_increments
            .store(true, Ordering::SeqCst);

        assert!(service.redirect(id).await.unwrap_err().is_not_found());
        assert_eq!(service.resolve(id).await.unwrap().visits, 0);
    }

    #[tokio::test]
    async fn close_releases_repository() {
        let (service, clock) = test_service();
        service
            .allocate("https://example.com".to_string(), clock.now() + one_year(), false)
            .await
            .unwrap();

        service.close().await.unwrap();

        let err = service.resolve(LinkId::new(0)).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Unavailable(_))));
    }

    #[tokio::test]
    async fn documented_scenario() {
        let service = LinkService::new(InMemoryRepository::new());

        let id = service
            .allocate(
                "https://example.com".to_string(),
                Timestamp::now() + one_year(),
                false,
            )
            .await
            .unwrap();

        assert_eq!(service.redirect(id).await.unwrap(), "https://example.com");
        assert_eq!(service.redirect(id).await.unwrap(), "https://example.com");

        let record = service.resolve(id).await.unwrap();
        assert_eq!(record.visits, 2);
        assert!(!record.once);
    }
}
