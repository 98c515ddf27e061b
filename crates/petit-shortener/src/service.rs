use crate::error::ShortenerError;
use petit_core::{Alias, Delete, Provider, StorageError};
use petit_generator::Generator;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A request to shorten `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenParams {
    pub target: String,
    /// Caller-chosen alias. Generated when `None`.
    pub alias: Option<Alias>,
}

impl ShortenParams {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: Alias) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// Allocates aliases against a [`Provider`].
///
/// A caller-supplied alias that is taken fails with
/// [`ShortenerError::AliasConflict`]. Generated candidates are drawn until
/// one is stored; there is no bound on attempts, so a generator whose
/// space is exhausted makes [`shorten`](ShortenerService::shorten) spin.
#[derive(Debug)]
pub struct ShortenerService<P, G> {
    provider: Arc<P>,
    generator: Arc<G>,
}

impl<P, G> Clone for ShortenerService<P, G> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<P: Provider, G: Generator> ShortenerService<P, G> {
    pub fn new(provider: P, generator: G) -> Self {
        Self {
            provider: Arc::new(provider),
            generator: Arc::new(generator),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Stores `params.target` and returns the alias it was stored under.
    ///
    /// The target is trimmed and must not be empty. Infrastructure errors
    /// are returned as-is and never retried.
    pub async fn shorten(&self, params: ShortenParams) -> Result<Alias, ShortenerError> {
        let target = params.target.trim();
        if target.is_empty() {
            return Err(ShortenerError::EmptyTarget);
        }

        let alias = match params.alias {
            Some(alias) => self.reserve_custom(target, alias).await?,
            None => self.reserve_generated(target).await?,
        };

        info!(alias = %alias, "Shortened url");
        Ok(alias)
    }

    async fn reserve_custom(&self, target: &str, alias: Alias) -> Result<Alias, ShortenerError> {
        if self.provider.exists(&alias).await? {
            debug!(alias = %alias, "Requested alias is taken");
            return Err(ShortenerError::AliasConflict(alias.into_inner()));
        }

        match self.provider.store(target, &alias).await {
            Ok(()) => Ok(alias),
            Err(StorageError::AlreadyExists(_)) => {
                debug!(alias = %alias, "Requested alias was taken concurrently");
                Err(ShortenerError::AliasConflict(alias.into_inner()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn reserve_generated(&self, target: &str) -> Result<Alias, ShortenerError> {
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            let candidate: Alias = self.generator.generate().into();

            if self.provider.exists(&candidate).await? {
                trace!(alias = %candidate, attempts, "Generated alias collides, retrying");
                continue;
            }

            match self.provider.store(target, &candidate).await {
                Ok(()) => {
                    if attempts > 1 {
                        debug!(alias = %candidate, attempts, "Allocated alias after collisions");
                    }
                    return Ok(candidate);
                }
                Err(StorageError::AlreadyExists(_)) => {
                    trace!(alias = %candidate, attempts, "Lost race for generated alias, retrying");
                }
                Err(err) => {
                    warn!(alias = %candidate, error = %err, "Failed to store generated alias");
                    return Err(err.into());
                }
            }
        }
    }

    /// Returns the target stored for `alias`.
    pub async fn resolve(&self, alias: &Alias) -> Result<String, ShortenerError> {
        match self.provider.get(alias).await {
            Ok(target) => Ok(target),
            Err(StorageError::NotFound(alias)) => Err(ShortenerError::NotFound(alias)),
            Err(err) => Err(err.into()),
        }
    }
}

impl<P: Delete, G: Generator> ShortenerService<P, G> {
    /// Removes the record for `alias`. Returns `false` if there was none.
    pub async fn delete(&self, alias: &Alias) -> Result<bool, ShortenerError> {
        let deleted = self.provider.delete(alias).await?;
        debug!(alias = %alias, deleted, "Delete requested");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use petit_core::InfraError;
    use petit_generator::SeqGenerator;
    use petit_storage::{Backend, MemoryProvider, SnapshotObjectProvider};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn alias(value: &str) -> Alias {
        Alias::new(value).unwrap()
    }

    fn test_service() -> ShortenerService<MemoryProvider, SeqGenerator> {
        ShortenerService::new(MemoryProvider::new(), SeqGenerator::with_prefix("pt"))
    }

    /// Yields a fixed sequence of candidates, counting draws.
    struct ScriptedGenerator {
        candidates: Mutex<VecDeque<&'static str>>,
        draws: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(candidates: &[&'static str]) -> Self {
            Self {
                candidates: Mutex::new(candidates.iter().copied().collect()),
                draws: AtomicUsize::new(0),
            }
        }
    }

    impl Generator for ScriptedGenerator {
        type Output = Alias;

        fn generate(&self) -> Alias {
            self.draws.fetch_add(1, Ordering::SeqCst);
            let next = self
                .candidates
                .lock()
                .unwrap()
                .pop_front()
                .expect("generator script exhausted");
            Alias::new_unchecked(next)
        }
    }

    /// Reports every alias as free, then loses the store race for the
    /// first `races` calls.
    struct RacingProvider {
        inner: MemoryProvider,
        races: AtomicUsize,
    }

    #[async_trait]
    impl Provider for RacingProvider {
        async fn get(&self, alias: &Alias) -> petit_core::Result<String> {
            self.inner.get(alias).await
        }

        async fn exists(&self, _alias: &Alias) -> petit_core::Result<bool> {
            Ok(false)
        }

        async fn store(&self, target: &str, alias: &Alias) -> petit_core::Result<()> {
            if self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::AlreadyExists(alias.to_string()));
            }
            self.inner.store(target, alias).await
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl Provider for BrokenProvider {
        async fn get(&self, _alias: &Alias) -> petit_core::Result<String> {
            Err(InfraError::unavailable("connection refused").into())
        }

        async fn store(&self, _target: &str, _alias: &Alias) -> petit_core::Result<()> {
            Err(InfraError::unavailable("connection refused").into())
        }
    }

    #[tokio::test]
    async fn shorten_with_generated_alias() {
        let service = test_service();

        let first = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();
        let second = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();

        assert_eq!(first.as_str(), "pt000000");
        assert_eq!(second.as_str(), "pt000001");
        assert_eq!(
            service.resolve(&first).await.unwrap(),
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn shorten_with_custom_alias() {
        let service = test_service();

        let code = service
            .shorten(ShortenParams::new("https://example.com").with_alias(alias("my-alias")))
            .await
            .unwrap();

        assert_eq!(code.as_str(), "my-alias");
        assert_eq!(service.resolve(&code).await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn duplicate_custom_alias_fails_and_keeps_first_record() {
        let service = test_service();

        service
            .shorten(ShortenParams::new("https://example1.com").with_alias(alias("my-alias")))
            .await
            .unwrap();
        let err = service
            .shorten(ShortenParams::new("https://example2.com").with_alias(alias("my-alias")))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::AliasConflict(ref a) if a == "my-alias"));
        assert_eq!(
            service.resolve(&alias("my-alias")).await.unwrap(),
            "https://example1.com"
        );
    }

    #[tokio::test]
    async fn generated_collision_draws_next_candidate() {
        let generator = ScriptedGenerator::new(&["aa", "aa", "bb"]);
        let service = ShortenerService::new(MemoryProvider::new(), generator);

        let first = service
            .shorten(ShortenParams::new("https://one.example"))
            .await
            .unwrap();
        let second = service
            .shorten(ShortenParams::new("https://two.example"))
            .await
            .unwrap();

        assert_eq!(first.as_str(), "aa");
        assert_eq!(second.as_str(), "bb");
        assert_eq!(service.generator.draws.load(Ordering::SeqCst), 3);
        assert_eq!(service.resolve(&first).await.unwrap(), "https://one.example");
        assert_eq!(service.resolve(&second).await.unwrap(), "https://two.example");
    }

    #[tokio::test]
    async fn lost_store_race_on_generated_alias_retries() {
        let provider = RacingProvider {
            inner: MemoryProvider::new(),
            races: AtomicUsize::new(2),
        };
        let service = ShortenerService::new(provider, ScriptedGenerator::new(&["a", "b", "c"]));

        let code = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();

        assert_eq!(code.as_str(), "c");
        assert_eq!(service.generator.draws.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn lost_store_race_on_custom_alias_is_terminal() {
        let provider = RacingProvider {
            inner: MemoryProvider::new(),
            races: AtomicUsize::new(1),
        };
        let service = ShortenerService::new(provider, ScriptedGenerator::new(&[]));

        let err = service
            .shorten(ShortenParams::new("https://example.com").with_alias(alias("mine")))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::AliasConflict(_)));
        assert_eq!(service.generator.draws.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn infra_errors_are_not_retried() {
        let service = ShortenerService::new(BrokenProvider, ScriptedGenerator::new(&["a", "b"]));

        let err = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShortenerError::Storage(StorageError::Infra(_))));
        assert_eq!(service.generator.draws.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_target_is_rejected() {
        let service = test_service();

        let err = service
            .shorten(ShortenParams::new("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::EmptyTarget));
        assert!(service.provider().is_empty());
    }

    #[tokio::test]
    async fn target_is_trimmed() {
        let service = test_service();

        let code = service
            .shorten(ShortenParams::new("  https://example.com\n"))
            .await
            .unwrap();
        assert_eq!(service.resolve(&code).await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn resolve_nonexistent_alias() {
        let service = test_service();

        let err = service.resolve(&alias("nonexistent")).await.unwrap_err();
        assert!(matches!(err, ShortenerError::NotFound(ref a) if a == "nonexistent"));
    }

    #[tokio::test]
    async fn delete_on_removable_backend() {
        let store = Arc::new(object_store::memory::InMemory::new());
        let provider =
            SnapshotObjectProvider::open(store, &object_store::path::Path::from(""), "petit.json")
                .await
                .unwrap();
        let service = ShortenerService::new(provider, SeqGenerator::with_prefix("pt"));

        let code = service
            .shorten(ShortenParams::new("https://example.com"))
            .await
            .unwrap();
        assert!(service.delete(&code).await.unwrap());
        assert!(!service.delete(&code).await.unwrap());
        assert!(matches!(
            service.resolve(&code).await.unwrap_err(),
            ShortenerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_on_append_only_backend_is_a_storage_error() {
        let backend = Backend::open(&petit_storage::StorageConfig::Memory)
            .await
            .unwrap();
        let service = ShortenerService::new(backend, SeqGenerator::with_prefix("pt"));

        let err = service.delete(&alias("anything")).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Storage(StorageError::Infra(_))));
    }
}
