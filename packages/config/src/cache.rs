//! TTL cache over a [`ConfigSource`].
//!
//! The cache moves through three states:
//!
//! * **Empty**: nothing fetched yet. Reads try the source and fall back to
//!   the built-in default on failure.
//! * **Fresh**: the cached value is younger than its own
//!   `cacheTtlSeconds`. Reads return it without touching the source.
//! * **Stale**: the TTL has passed. Reads try the source and keep serving
//!   the old value on failure.
//!
//! Only one refresh runs at a time. A caller that finds a refresh in flight
//! is served the current value instead of waiting for it.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use civic_map_heatmap_models::WeightConfig;

use crate::clock::{Clock, SystemClock};
use crate::source::ConfigSource;
use crate::ConfigError;

/// Default bound on a single source fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No value has ever been fetched.
    Empty,
    /// The cached value is within its TTL.
    Fresh,
    /// The cached value has outlived its TTL.
    Stale,
}

struct CachedConfig {
    config: Arc<WeightConfig>,
    fetched_at: DateTime<Utc>,
}

impl CachedConfig {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(self.config.cache_ttl()).unwrap_or(TimeDelta::MAX);
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Caches the [`WeightConfig`] served by a [`ConfigSource`].
///
/// Build one per process at startup and share it (for example behind an
/// `Arc`). All methods take `&self`.
pub struct ConfigCache<S, C = SystemClock> {
    source: S,
    clock: C,
    fetch_timeout: Duration,
    fallback: Arc<WeightConfig>,
    cached: RwLock<Option<CachedConfig>>,
    refresh: tokio::sync::Mutex<()>,
}

impl<S: ConfigSource> ConfigCache<S> {
    /// Creates an empty cache over `source` using the wall clock.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock)
    }
}

impl<S: ConfigSource, C: Clock> ConfigCache<S, C> {
    /// Creates an empty cache over `source` using `clock` for freshness.
    #[must_use]
    pub fn with_clock(source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fallback: Arc::new(WeightConfig::default()),
            cached: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// Sets the bound on a single source fetch.
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Sets the config served while nothing has been fetched.
    #[must_use]
    pub fn with_fallback(mut self, fallback: WeightConfig) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// The underlying source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The clock used for freshness checks.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Current state, without refreshing.
    #[must_use]
    pub fn state(&self) -> CacheState {
        let now = self.clock.now();
        match &*self.read() {
            None => CacheState::Empty,
            Some(cached) if cached.is_fresh(now) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    /// The value a read would serve right now if the source failed: the
    /// cached value, or the fallback.
    #[must_use]
    pub fn current(&self) -> Arc<WeightConfig> {
        self.read()
            .as_ref()
            .map_or_else(|| Arc::clone(&self.fallback), |c| Arc::clone(&c.config))
    }

    /// Returns the configuration, refreshing it first if it is missing or
    /// stale.
    ///
    /// Never fails. Fetch errors and timeouts are logged at `warn` level and
    /// the previous value (or the fallback) is returned.
    pub async fn get_config(&self) -> Arc<WeightConfig> {
        if let Some(config) = self.fresh() {
            return config;
        }

        let Ok(_guard) = self.refresh.try_lock() else {
            log::debug!(
                "Config refresh from {} already in flight, serving current value",
                self.source.name()
            );
            return self.current();
        };

        // Another caller may have finished a refresh before we took the lock.
        if let Some(config) = self.fresh() {
            return config;
        }

        match self.fetch().await {
            Ok(config) => {
                let config = Arc::new(config);
                let fetched_at = self.clock.now();
                *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedConfig {
                    config: Arc::clone(&config),
                    fetched_at,
                });
                log::info!(
                    "Loaded weight config from {} (ttl {}s)",
                    self.source.name(),
                    config.cache_ttl_seconds
                );
                config
            }
            Err(e) => {
                let current = self.current();
                log::warn!(
                    "Failed to refresh weight config from {}: {e}; serving {} value",
                    self.source.name(),
                    if self.state() == CacheState::Empty {
                        "default"
                    } else {
                        "stale"
                    }
                );
                current
            }
        }
    }

    async fn fetch(&self) -> Result<WeightConfig, ConfigError> {
        let config = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| ConfigError::Timeout(self.fetch_timeout))??;
        Ok(config.validated()?)
    }

    fn fresh(&self) -> Option<Arc<WeightConfig>> {
        let now = self.clock.now();
        self.read()
            .as_ref()
            .filter(|cached| cached.is_fresh(now))
            .map(|cached| Arc::clone(&cached.config))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<CachedConfig>> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::clock::ManualClock;
    use crate::source::FileSource;

    /// Serves `config` or fails on demand, counting fetches.
    struct ScriptedSource {
        config: std::sync::Mutex<WeightConfig>,
        failing: AtomicBool,
        fetches: Arc<AtomicUsize>,
        delay: std::sync::Mutex<Option<Duration>>,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedSource {
        fn new(config: WeightConfig) -> Self {
            Self {
                config: std::sync::Mutex::new(config),
                failing: AtomicBool::new(false),
                fetches: Arc::new(AtomicUsize::new(0)),
                delay: std::sync::Mutex::new(None),
                gate: None,
            }
        }

        fn failing() -> Self {
            let source = Self::new(WeightConfig::default());
            source.failing.store(true, Ordering::SeqCst);
            source
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn set_config(&self, config: WeightConfig) {
            *self.config.lock().unwrap() = config;
        }

        fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }
    }

    #[async_trait]
    impl ConfigSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self) -> Result<WeightConfig, ConfigError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await.unwrap();
            }
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(ConfigError::Unavailable {
                    message: "store offline".to_string(),
                });
            }
            Ok(self.config.lock().unwrap().clone())
        }
    }

    fn config_with(base_weight: f64, ttl: u64) -> WeightConfig {
        WeightConfig {
            base_weight,
            cache_ttl_seconds: ttl,
            ..WeightConfig::default()
        }
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("civic_map_{}_{name}", std::process::id()))
    }

    #[tokio::test]
    async fn serves_cached_value_within_ttl() {
        let cache = ConfigCache::with_clock(
            ScriptedSource::new(config_with(2.0, 60)),
            ManualClock::default(),
        );
        assert_eq!(cache.state(), CacheState::Empty);

        let first = cache.get_config().await;
        assert!((first.base_weight - 2.0).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Fresh);

        cache.clock().advance(Duration::from_secs(59));
        cache.get_config().await;
        assert_eq!(cache.source().fetches(), 1);

        cache.clock().advance(Duration::from_secs(1));
        assert_eq!(cache.state(), CacheState::Stale);
        cache.source().set_config(config_with(3.0, 60));

        let refreshed = cache.get_config().await;
        assert_eq!(cache.source().fetches(), 2);
        assert!((refreshed.base_weight - 3.0).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Fresh);
    }

    #[tokio::test]
    async fn keeps_stale_value_when_refresh_fails() {
        let cache = ConfigCache::with_clock(
            ScriptedSource::new(config_with(2.0, 10)),
            ManualClock::default(),
        );
        cache.get_config().await;

        cache.source().failing.store(true, Ordering::SeqCst);
        cache.clock().advance(Duration::from_secs(11));

        let stale = cache.get_config().await;
        assert!((stale.base_weight - 2.0).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Stale);

        // Every read while stale retries.
        cache.get_config().await;
        assert_eq!(cache.source().fetches(), 3);

        cache.source().failing.store(false, Ordering::SeqCst);
        cache.source().set_config(config_with(5.0, 10));
        let recovered = cache.get_config().await;
        assert!((recovered.base_weight - 5.0).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Fresh);
    }

    #[tokio::test]
    async fn serves_default_until_first_successful_fetch() {
        let cache = ConfigCache::with_clock(ScriptedSource::failing(), ManualClock::default());

        for attempt in 1..=3 {
            let config = cache.get_config().await;
            assert_eq!(*config, WeightConfig::default());
            assert_eq!(cache.state(), CacheState::Empty);
            assert_eq!(cache.source().fetches(), attempt);
        }
    }

    #[tokio::test]
    async fn custom_fallback_is_served_while_empty() {
        let fallback = config_with(9.0, 300);
        let cache = ConfigCache::with_clock(ScriptedSource::failing(), ManualClock::default())
            .with_fallback(fallback.clone());
        assert_eq!(*cache.get_config().await, fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_to_default() {
        let source = ScriptedSource::new(config_with(2.0, 10));
        source.set_delay(Duration::from_secs(30));
        let cache = ConfigCache::with_clock(source, ManualClock::default())
            .with_fetch_timeout(Duration::from_secs(1));

        let config = cache.get_config().await;
        assert_eq!(*config, WeightConfig::default());
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.source().fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_refresh_times_out_to_stale_value() {
        let cache = ConfigCache::with_clock(
            ScriptedSource::new(config_with(2.0, 10)),
            ManualClock::default(),
        )
        .with_fetch_timeout(Duration::from_secs(1));
        cache.get_config().await;

        cache.clock().advance(Duration::from_secs(11));
        cache.source().set_config(config_with(7.0, 10));
        cache.source().set_delay(Duration::from_secs(30));

        let stale = cache.get_config().await;
        assert!((stale.base_weight - 2.0).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Stale);
        assert_eq!(cache.source().fetches(), 2);
    }

    #[tokio::test]
    async fn invalid_config_counts_as_failure() {
        let cache = ConfigCache::with_clock(
            ScriptedSource::new(WeightConfig {
                archived_weight_ratio: 2.0,
                ..WeightConfig::default()
            }),
            ManualClock::default(),
        );

        let config = cache.get_config().await;
        assert!((config.archived_weight_ratio - 0.25).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[tokio::test]
    async fn concurrent_reader_does_not_wait_for_refresh() {
        let gate = Arc::new(Semaphore::new(0));
        let mut source = ScriptedSource::new(config_with(4.0, 60));
        source.gate = Some(Arc::clone(&gate));
        let fetches = Arc::clone(&source.fetches);
        let cache = Arc::new(ConfigCache::with_clock(source, ManualClock::default()));

        let refreshing = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get_config().await }
        });
        while fetches.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let meanwhile = cache.get_config().await;
        assert_eq!(*meanwhile, WeightConfig::default());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        gate.add_permits(1);
        let fetched = refreshing.await.unwrap();
        assert!((fetched.base_weight - 4.0).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Fresh);
    }

    #[tokio::test]
    async fn file_source_fills_defaults_and_hot_reloads() {
        let path = temp_path("weights.json");
        std::fs::write(&path, r#"{ "baseWeight": 3.0, "cacheTtlSeconds": 30 }"#).unwrap();
        let cache = ConfigCache::with_clock(FileSource::new(&path), ManualClock::default());

        let config = cache.get_config().await;
        assert!((config.base_weight - 3.0).abs() < f64::EPSILON);
        assert_eq!(
            config.opacity_thresholds,
            WeightConfig::default().opacity_thresholds
        );

        std::fs::write(&path, r#"{ "baseWeight": 1.5, "cacheTtlSeconds": 30 }"#).unwrap();
        assert!((cache.get_config().await.base_weight - 3.0).abs() < f64::EPSILON);

        cache.clock().advance(Duration::from_secs(30));
        let reloaded = cache.get_config().await;
        std::fs::remove_file(&path).ok();

        assert!((reloaded.base_weight - 1.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn malformed_file_keeps_previous_value() {
        let path = temp_path("weights.toml");
        std::fs::write(&path, "baseWeight = 2.5\ncacheTtlSeconds = 5\n").unwrap();
        let cache = ConfigCache::with_clock(FileSource::new(&path), ManualClock::default());
        cache.get_config().await;

        std::fs::write(&path, "baseWeight = \"heavy\"\n").unwrap();
        cache.clock().advance(Duration::from_secs(6));
        let config = cache.get_config().await;
        std::fs::remove_file(&path).ok();

        assert!((config.base_weight - 2.5).abs() < f64::EPSILON);
        assert_eq!(cache.state(), CacheState::Stale);
    }
}
