//! Cache configuration from defaults or environment variables

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::CacheError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Most positions kept in memory before LRU eviction
    pub max_memory_positions: usize,

    /// History length above which positions are loaded lazily by range
    pub lazy_load_threshold: usize,

    /// Entries not accessed for this long are expired
    pub ttl: Duration,

    /// Most loaded ranges tracked before the oldest are pruned
    pub max_loaded_ranges: usize,

    /// Row height of the virtualized history list, in pixels
    pub item_height: u32,

    /// Keep a compressed copy of each cached position
    pub compress_entries: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory_positions: 50,
            lazy_load_threshold: 100,
            ttl: Duration::from_secs(30 * 60),
            max_loaded_ranges: 10,
            item_height: 60,
            compress_entries: true,
        }
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, CacheError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CacheError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

impl CacheConfig {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Result<Self, CacheError> {
        let defaults = Self::default();

        let max_memory_positions =
            env_or("HISTORY_MAX_MEMORY_POSITIONS", defaults.max_memory_positions)?;
        let lazy_load_threshold =
            env_or("HISTORY_LAZY_LOAD_THRESHOLD", defaults.lazy_load_threshold)?;
        let ttl_secs = env_or("HISTORY_CACHE_TTL_SECS", defaults.ttl.as_secs())?;
        let max_loaded_ranges = env_or("HISTORY_MAX_LOADED_RANGES", defaults.max_loaded_ranges)?;
        let item_height = env_or("HISTORY_ITEM_HEIGHT", defaults.item_height)?;
        let compress_entries = env_or("HISTORY_COMPRESS_ENTRIES", defaults.compress_entries)?;

        let config = Self {
            max_memory_positions,
            lazy_load_threshold,
            ttl: Duration::from_secs(ttl_secs),
            max_loaded_ranges,
            item_height,
            compress_entries,
        };
        config.validate()?;

        info!(
            max_memory_positions = config.max_memory_positions,
            lazy_load_threshold = config.lazy_load_threshold,
            ttl_secs = config.ttl.as_secs(),
            "History cache config loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_memory_positions == 0 {
            return Err(CacheError::Config("max_memory_positions must be at least 1"));
        }
        if self.max_loaded_ranges == 0 {
            return Err(CacheError::Config("max_loaded_ranges must be at least 1"));
        }
        if self.item_height == 0 {
            return Err(CacheError::Config("item_height must be at least 1"));
        }
        Ok(())
    }
}
