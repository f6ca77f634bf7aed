//! Runner and cache configuration.
//!
//! Defaults are usable as-is; `from_env` layers `PARX_*` environment
//! variables on top, and the CLI layers its flags on top of that.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bound used by `run_iter` when the caller passes no buffer size.
pub const DEFAULT_RESULTS_BUFFER_SIZE: usize = 8;

/// Retries for `Recoverable` task failures before giving up.
pub const DEFAULT_MAX_TASK_RETRIES: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of registered partition sets. `None` retains every
    /// set for the runner's lifetime; `Some(n)` evicts oldest-first.
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(Error::Config(
                "cache max_entries must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Completed-but-unconsumed results a stream may hold.
    pub results_buffer_size: usize,
    /// Worker threads used to materialize partitions.
    pub num_workers: usize,
    pub max_task_retries: u32,
    pub cache: CacheConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            results_buffer_size: DEFAULT_RESULTS_BUFFER_SIZE,
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_task_retries: DEFAULT_MAX_TASK_RETRIES,
            cache: CacheConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by `PARX_RESULTS_BUFFER_SIZE`, `PARX_NUM_WORKERS`,
    /// `PARX_MAX_TASK_RETRIES` and `PARX_CACHE_MAX_ENTRIES`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = lookup("PARX_RESULTS_BUFFER_SIZE") {
            cfg.results_buffer_size = parse_var("PARX_RESULTS_BUFFER_SIZE", &v)?;
        }
        if let Some(v) = lookup("PARX_NUM_WORKERS") {
            cfg.num_workers = parse_var("PARX_NUM_WORKERS", &v)?;
        }
        if let Some(v) = lookup("PARX_MAX_TASK_RETRIES") {
            cfg.max_task_retries = parse_var("PARX_MAX_TASK_RETRIES", &v)?;
        }
        if let Some(v) = lookup("PARX_CACHE_MAX_ENTRIES") {
            cfg.cache.max_entries = Some(parse_var("PARX_CACHE_MAX_ENTRIES", &v)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_results_buffer_size(mut self, size: usize) -> Self {
        self.results_buffer_size = size;
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_max_task_retries(mut self, n: u32) -> Self {
        self.max_task_retries = n;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.results_buffer_size == 0 {
            return Err(Error::Config(
                "results buffer size must be at least 1".into(),
            ));
        }
        if self.num_workers == 0 {
            return Err(Error::Config("worker count must be at least 1".into()));
        }
        self.cache.validate()
    }
}

fn parse_var<V: std::str::FromStr>(key: &str, raw: &str) -> Result<V> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: cannot parse '{raw}'")))
}
