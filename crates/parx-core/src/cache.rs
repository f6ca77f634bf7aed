//! Partition-set cache.
//!
//! Maps cache-generated ids to materialized `PartitionSet`s so several plans
//! can reference one result without recomputing it. The cache is the only
//! owner of the sets; a `PartitionCacheEntry` is a weak handle (id, the
//! issuing cache, and the set it was issued for) and dropping it never
//! evicts. An entry only resolves to the exact set it was issued for, so an
//! id reissued after `remove`, eviction or `clear` never hands a stale entry
//! someone else's set.
//!
//! Retention: every set stays registered until `remove`/`clear`, unless the
//! cache was built with `CacheConfig::max_entries`, in which case `put`
//! evicts the oldest-inserted set once the cache is full.
//!
//! Id generation and insertion happen under one write lock, so concurrent
//! `put` calls never hand out the same id and a `get` never observes a
//! half-inserted set.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::partition::{Partition, PartitionSet};

/// Id generation attempts per `put` before reporting `CacheIdCollision`.
pub const MAX_ID_ATTEMPTS: usize = 16;

type IdSource = Box<dyn Fn() -> String + Send + Sync>;

fn uuid_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Counters for cache operations.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    removals: AtomicU64,
    id_collisions: AtomicU64,
}

impl CacheStats {
    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn removals(&self) -> u64 {
        self.removals.load(Ordering::Relaxed)
    }

    /// Generated ids that were already taken and had to be regenerated.
    pub fn id_collisions(&self) -> u64 {
        self.id_collisions.load(Ordering::Relaxed)
    }
}

struct CacheState<T> {
    sets: HashMap<String, Arc<PartitionSet<T>>>,
    /// Insertion order, oldest first; used for capacity eviction.
    order: VecDeque<String>,
}

struct CacheInner<T> {
    state: RwLock<CacheState<T>>,
    config: CacheConfig,
    stats: CacheStats,
    id_source: IdSource,
}

impl<T> CacheInner<T> {
    fn lookup(&self, id: &str) -> Result<Arc<PartitionSet<T>>> {
        self.lookup_where(id, |_| true)
    }

    /// Like `lookup`, but only a hit if the registered set is `expected`.
    fn lookup_exact(
        &self,
        id: &str,
        expected: &Weak<PartitionSet<T>>,
    ) -> Result<Arc<PartitionSet<T>>> {
        self.lookup_where(id, |set| std::ptr::eq(Arc::as_ptr(set), expected.as_ptr()))
    }

    fn lookup_where(
        &self,
        id: &str,
        accept: impl Fn(&Arc<PartitionSet<T>>) -> bool,
    ) -> Result<Arc<PartitionSet<T>>> {
        match self.state.read().sets.get(id) {
            Some(set) if accept(set) => {
                CacheStats::bump(&self.stats.hits);
                Ok(Arc::clone(set))
            }
            _ => {
                CacheStats::bump(&self.stats.misses);
                Err(Error::NotFound(id.to_string()))
            }
        }
    }
}

/// Registry of materialized partition sets, keyed by generated ids.
///
/// Cloning yields another handle to the same registry.
pub struct PartitionSetCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T: Partition> PartitionSetCache<T> {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// A `max_entries` of zero is accepted here but every `put` then fails
    /// with `Error::Config`; `RunnerConfig::validate` rejects it up front.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_id_source(config, uuid_id)
    }

    /// Cache drawing ids from `id_source` instead of random uuids.
    pub fn with_id_source(
        config: CacheConfig,
        id_source: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                state: RwLock::new(CacheState {
                    sets: HashMap::new(),
                    order: VecDeque::new(),
                }),
                config,
                stats: CacheStats::default(),
                id_source: Box::new(id_source),
            }),
        }
    }

    /// Register `partition_set` under a fresh id.
    pub fn put(&self, partition_set: PartitionSet<T>) -> Result<PartitionCacheEntry<T>> {
        self.put_shared(Arc::new(partition_set))
    }

    /// Register an already shared set under a fresh id.
    pub fn put_shared(
        &self,
        partition_set: Arc<PartitionSet<T>>,
    ) -> Result<PartitionCacheEntry<T>> {
        self.inner.config.validate()?;
        let mut state = self.inner.state.write();

        let mut id = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = (self.inner.id_source)();
            if state.sets.contains_key(&candidate) {
                CacheStats::bump(&self.inner.stats.id_collisions);
                continue;
            }
            id = Some(candidate);
            break;
        }
        let id = id.ok_or(Error::CacheIdCollision(MAX_ID_ATTEMPTS))?;

        if let Some(cap) = self.inner.config.max_entries {
            while state.sets.len() >= cap {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                if state.sets.remove(&oldest).is_some() {
                    CacheStats::bump(&self.inner.stats.evictions);
                }
            }
        }

        let entry = PartitionCacheEntry::new(id.clone(), &self.inner, &partition_set);
        state.sets.insert(id.clone(), partition_set);
        state.order.push_back(id);
        CacheStats::bump(&self.inner.stats.inserts);
        Ok(entry)
    }

    /// Rebuild a handle for a registered id.
    pub fn entry(&self, id: &str) -> Result<PartitionCacheEntry<T>> {
        let set = self.inner.lookup(id)?;
        Ok(PartitionCacheEntry::new(id.to_string(), &self.inner, &set))
    }
}

impl<T> PartitionSetCache<T> {
    /// The set registered under `id`, or `NotFound`.
    pub fn get(&self, id: &str) -> Result<Arc<PartitionSet<T>>> {
        self.inner.lookup(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.state.read().sets.contains_key(id)
    }

    /// Drop the mapping for `id`, returning the set it held.
    pub fn remove(&self, id: &str) -> Result<Arc<PartitionSet<T>>> {
        let mut state = self.inner.state.write();
        let set = state
            .sets
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        state.order.retain(|k| k != id);
        CacheStats::bump(&self.inner.stats.removals);
        Ok(set)
    }

    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        let n = state.sets.len() as u64;
        state.sets.clear();
        state.order.clear();
        self.inner.stats.removals.fetch_add(n, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.inner.state.read().order.iter().cloned().collect()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.inner.stats
    }
}

impl<T: Partition> Default for PartitionSetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PartitionSetCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for PartitionSetCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionSetCache")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Handle to a registered partition set.
///
/// Carries the id, weak references to the issuing cache and to the set, and
/// a metadata snapshot taken at registration. It does not keep the set alive.
pub struct PartitionCacheEntry<T> {
    id: String,
    cache: Weak<CacheInner<T>>,
    set: Weak<PartitionSet<T>>,
    num_partitions: usize,
    num_rows: usize,
    size_bytes: Option<usize>,
}

impl<T: Partition> PartitionCacheEntry<T> {
    fn new(id: String, cache: &Arc<CacheInner<T>>, set: &Arc<PartitionSet<T>>) -> Self {
        Self {
            id,
            cache: Arc::downgrade(cache),
            set: Arc::downgrade(set),
            num_partitions: set.num_partitions(),
            num_rows: set.num_rows(),
            size_bytes: set.size_bytes(),
        }
    }
}

impl<T> PartitionCacheEntry<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn size_bytes(&self) -> Option<usize> {
        self.size_bytes
    }

    /// Resolve the set through the issuing cache.
    ///
    /// Fails with `NotFound` once the set was removed or evicted, or the
    /// cache itself was torn down with its runner. It also fails if the id
    /// now names a different set.
    pub fn partition_set(&self) -> Result<Arc<PartitionSet<T>>> {
        let cache = self
            .cache
            .upgrade()
            .ok_or_else(|| Error::NotFound(self.id.clone()))?;
        cache.lookup_exact(&self.id, &self.set)
    }

    /// True if this entry was issued by `cache`.
    pub fn belongs_to(&self, cache: &PartitionSetCache<T>) -> bool {
        Weak::ptr_eq(&self.cache, &Arc::downgrade(&cache.inner))
    }
}

impl<T> Clone for PartitionCacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            cache: Weak::clone(&self.cache),
            set: Weak::clone(&self.set),
            num_partitions: self.num_partitions,
            num_rows: self.num_rows,
            size_bytes: self.size_bytes,
        }
    }
}

impl<T> PartialEq for PartitionCacheEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && Weak::ptr_eq(&self.cache, &other.cache)
            && Weak::ptr_eq(&self.set, &other.set)
    }
}

impl<T> Eq for PartitionCacheEntry<T> {}

impl<T> fmt::Debug for PartitionCacheEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionCacheEntry")
            .field("id", &self.id)
            .field("num_partitions", &self.num_partitions)
            .field("num_rows", &self.num_rows)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

impl<T> fmt::Display for PartitionCacheEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} partitions, {} rows)",
            self.id, self.num_partitions, self.num_rows
        )
    }
}
