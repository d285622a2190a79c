// Explicit per-session caching for provider queries.
//
// The league snapshot and player pool are fetched once per session and
// reused; invalidation is an explicit call at the collaborator boundary,
// never an implicit process-wide memo.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::espn::{League, LeagueProvider, Player, PoolQuery, ProviderError};

/// Maps a query key to its result and fetch time. Entries never expire on
/// their own; the owner decides when a new session starts.
#[derive(Debug, Clone)]
pub struct SessionCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
}

impl<K: Eq + Hash, V> SessionCache<K, V> {
    pub fn new() -> SessionCache<K, V> {
        SessionCache {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|(value, _)| value)
    }

    /// When the cached value for `key` was fetched, if present.
    pub fn fetched_at(&self, key: &K) -> Option<Instant> {
        self.entries.get(key).map(|(_, at)| *at)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Drop everything; the next reads re-fetch.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for SessionCache<K, V> {
    fn default() -> Self {
        SessionCache::new()
    }
}

// ---------------------------------------------------------------------------
// Caching provider wrapper
// ---------------------------------------------------------------------------

/// A [`LeagueProvider`] that memoizes the inner provider's results for the
/// lifetime of the session (or until [`CachedProvider::invalidate_all`]).
///
/// The locks are held across the inner fetch so concurrent callers of the
/// same query wait for one fetch instead of issuing duplicates.
pub struct CachedProvider<P> {
    inner: P,
    league: Mutex<SessionCache<(), League>>,
    pools: Mutex<SessionCache<PoolQuery, Vec<Player>>>,
}

impl<P> CachedProvider<P> {
    pub fn new(inner: P) -> CachedProvider<P> {
        CachedProvider {
            inner,
            league: Mutex::new(SessionCache::new()),
            pools: Mutex::new(SessionCache::new()),
        }
    }

    /// Start a fresh session: every cached result is dropped.
    pub async fn invalidate_all(&self) {
        self.league.lock().await.invalidate_all();
        self.pools.lock().await.invalidate_all();
    }
}

#[async_trait]
impl<P: LeagueProvider + Send + Sync> LeagueProvider for CachedProvider<P> {
    async fn fetch_league(&self) -> Result<League, ProviderError> {
        let mut cache = self.league.lock().await;
        if let Some(league) = cache.get(&()) {
            debug!("league snapshot served from session cache");
            return Ok(league.clone());
        }
        let league = self.inner.fetch_league().await?;
        cache.insert((), league.clone());
        Ok(league)
    }

    async fn player_pool(&self, query: &PoolQuery) -> Result<Vec<Player>, ProviderError> {
        let mut cache = self.pools.lock().await;
        if let Some(players) = cache.get(query) {
            debug!("player pool served from session cache");
            return Ok(players.clone());
        }
        let players = self.inner.player_pool(query).await?;
        cache.insert(query.clone(), players.clone());
        Ok(players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::espn::PoolSort;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn insert_then_get_round_trips() {
        let mut cache: SessionCache<String, u32> = SessionCache::new();
        assert!(cache.get(&"league".to_string()).is_none());

        cache.insert("league".to_string(), 7);
        assert_eq!(cache.get(&"league".to_string()), Some(&7));
        assert!(cache.fetched_at(&"league".to_string()).is_some());
    }

    #[test]
    fn reinsert_replaces_value_and_timestamp() {
        let mut cache: SessionCache<&str, u32> = SessionCache::new();
        cache.insert("pool", 1);
        let first = cache.fetched_at(&"pool").unwrap();
        cache.insert("pool", 2);
        assert_eq!(cache.get(&"pool"), Some(&2));
        assert!(cache.fetched_at(&"pool").unwrap() >= first);
    }

    #[test]
    fn invalidate_all_empties_the_cache() {
        let mut cache: SessionCache<&str, u32> = SessionCache::new();
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 2);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get(&"a").is_none());
    }

    /// Counts inner fetches so caching is observable.
    struct CountingProvider {
        league_calls: AtomicU32,
        pool_calls: AtomicU32,
    }

    impl CountingProvider {
        fn new() -> CountingProvider {
            CountingProvider {
                league_calls: AtomicU32::new(0),
                pool_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LeagueProvider for CountingProvider {
        async fn fetch_league(&self) -> Result<League, ProviderError> {
            self.league_calls.fetch_add(1, Ordering::SeqCst);
            Ok(League {
                id: 1,
                season: 2026,
                teams: Vec::new(),
            })
        }

        async fn player_pool(&self, query: &PoolQuery) -> Result<Vec<Player>, ProviderError> {
            self.pool_calls.fetch_add(1, Ordering::SeqCst);
            let _ = query;
            Ok(Vec::new())
        }
    }

    fn query(limit: usize) -> PoolQuery {
        PoolQuery {
            limit,
            sort: PoolSort::OwnershipPct,
            scoring_period: 1,
        }
    }

    #[tokio::test]
    async fn repeated_league_fetches_hit_the_inner_provider_once() {
        let provider = CachedProvider::new(CountingProvider::new());
        provider.fetch_league().await.unwrap();
        provider.fetch_league().await.unwrap();
        assert_eq!(provider.inner.league_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_pool_queries_are_cached_separately() {
        let provider = CachedProvider::new(CountingProvider::new());
        provider.player_pool(&query(100)).await.unwrap();
        provider.player_pool(&query(100)).await.unwrap();
        provider.player_pool(&query(200)).await.unwrap();
        assert_eq!(provider.inner.pool_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_all_forces_a_refetch() {
        let provider = CachedProvider::new(CountingProvider::new());
        provider.fetch_league().await.unwrap();
        provider.invalidate_all().await;
        provider.fetch_league().await.unwrap();
        assert_eq!(provider.inner.league_calls.load(Ordering::SeqCst), 2);
    }
}
