//! Bounded in-memory cache over a position history.
//!
//! Entries are keyed by the board's share code, so adding the same position
//! twice refreshes one entry. Recency comes from the injected [`Clock`];
//! eviction is least-recently-used once `max_memory_positions` is exceeded.
//! Histories longer than `lazy_load_threshold` are loaded on demand by range.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use board_core::{compress, encode_position, Board, CompressedBlob};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::index::{PositionIndex, SearchHit, SimilarPosition};
use crate::lru::RecencyMap;
use crate::monitor::{PerformanceMonitor, TracingMonitor};
use crate::source::{LoadedRanges, Metadata, PositionSource};
use crate::virtualizer::VirtualList;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub id: String,
    pub position: Board,
    pub metadata: Metadata,
    pub last_accessed: DateTime<Utc>,
    pub compressed: Option<CompressedBlob>,
    pub history_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub cache_hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
    pub gc_runs: u64,
    pub last_gc_time: Option<DateTime<Utc>>,
    pub loaded_ranges: usize,
    pub compressed_bytes: usize,
    pub indexed_positions: usize,
    pub lazy_mode: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub expired: usize,
    pub ranges_pruned: usize,
    pub evicted: usize,
}

#[derive(Debug, Default)]
struct Stats {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    gc_runs: u64,
    last_gc_time: Option<DateTime<Utc>>,
}

pub struct HistoryCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    source: Box<dyn PositionSource>,
    monitor: Box<dyn PerformanceMonitor>,
    entries: RecencyMap<CacheEntry>,
    by_index: HashMap<usize, String>,
    loaded: LoadedRanges,
    index: PositionIndex,
    stats: Stats,
}

impl HistoryCache {
    pub fn new(
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        source: Box<dyn PositionSource>,
        monitor: Box<dyn PerformanceMonitor>,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        let loaded = LoadedRanges::new(config.max_loaded_ranges);
        Ok(Self {
            config,
            clock,
            source,
            monitor,
            entries: RecencyMap::new(),
            by_index: HashMap::new(),
            loaded,
            index: PositionIndex::new(),
            stats: Stats::default(),
        })
    }

    /// Default config, system clock and tracing monitor.
    pub fn with_source(source: impl PositionSource + 'static) -> Self {
        let config = CacheConfig::default();
        Self {
            loaded: LoadedRanges::new(config.max_loaded_ranges),
            config,
            clock: Arc::new(SystemClock),
            source: Box::new(source),
            monitor: Box::new(TracingMonitor::default()),
            entries: RecencyMap::new(),
            by_index: HashMap::new(),
            index: PositionIndex::new(),
            stats: Stats::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains(id)
    }

    pub fn history_len(&self) -> usize {
        self.source.len()
    }

    pub fn is_lazy(&self) -> bool {
        self.source.len() > self.config.lazy_load_threshold
    }

    fn insert_entry(
        &mut self,
        position: Board,
        metadata: Metadata,
        history_index: Option<usize>,
        now: DateTime<Utc>,
    ) -> String {
        let id = encode_position(&position);
        let history_index =
            history_index.or_else(|| self.entries.peek(&id).and_then(|e| e.history_index));
        if let Some(i) = history_index {
            self.by_index.insert(i, id.clone());
        }
        self.index.update(&id, &position, &metadata, history_index);

        let compressed = self.config.compress_entries.then(|| compress(&position));
        let entry = CacheEntry {
            id: id.clone(),
            position,
            metadata,
            last_accessed: now,
            compressed,
            history_index,
        };
        self.entries.insert(id.clone(), entry, now);
        id
    }

    /// Drop bookkeeping for a removed entry. Index entries without a history
    /// index cannot be reloaded, so they go too.
    fn forget(&mut self, id: &str) {
        self.by_index.retain(|_, v| v.as_str() != id);
        if self.index.get(id).is_some_and(|p| p.history_index.is_none()) {
            self.index.remove(id);
        }
    }

    /// Cache a position and return its id. May trigger eviction.
    pub fn add_to_memory_cache(&mut self, position: Board, metadata: Metadata) -> String {
        let started = Instant::now();
        let now = self.clock.now();
        let id = self.insert_entry(position, metadata, None, now);
        debug!(id = %id, size = self.entries.len(), "Cached position");

        if self.should_optimize_memory() {
            self.optimize_memory();
        }
        self.monitor.record("add_to_memory_cache", started.elapsed());
        id
    }

    /// Look up an entry, marking it most recently used.
    pub fn get_from_memory_cache(&mut self, id: &str) -> Option<&CacheEntry> {
        let started = Instant::now();
        let now = self.clock.now();
        let hit = match self.entries.touch(id, now) {
            Some(entry) => {
                entry.last_accessed = now;
                true
            }
            None => false,
        };
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        self.monitor.record("get_from_memory_cache", started.elapsed());
        if hit {
            self.entries.peek(id)
        } else {
            None
        }
    }

    pub fn should_optimize_memory(&self) -> bool {
        self.entries.len() > self.config.max_memory_positions
            || (self.is_lazy() && self.loaded.is_over_cap())
    }

    /// Evict down to capacity and, for lazy histories, prune loaded ranges.
    /// Returns the number of evicted entries.
    pub fn optimize_memory(&mut self) -> usize {
        let evicted = self.evict_lru_items();
        if self.is_lazy() {
            self.cleanup_loaded_ranges();
        }
        evicted
    }

    pub fn evict_lru_items(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.config.max_memory_positions {
            let Some((id, _)) = self.entries.pop_oldest() else {
                break;
            };
            self.forget(&id);
            evicted += 1;
        }
        if evicted > 0 {
            self.stats.evictions += evicted as u64;
            info!(evicted, size = self.entries.len(), "Evicted least recently used positions");
        }
        evicted
    }

    /// Drop entries not accessed within the TTL.
    pub fn cleanup_expired_cache(&mut self) -> usize {
        let Ok(ttl) = TimeDelta::from_std(self.config.ttl) else {
            return 0;
        };
        let Some(cutoff) = self.clock.now().checked_sub_signed(ttl) else {
            return 0;
        };

        let expired = self.entries.keys_accessed_before(cutoff);
        for id in &expired {
            self.entries.remove(id);
            self.forget(id);
        }
        if !expired.is_empty() {
            self.stats.expirations += expired.len() as u64;
            info!(expired = expired.len(), "Expired cached positions");
        }
        expired.len()
    }

    fn resident_at(&self, history_index: usize) -> Option<&str> {
        self.by_index
            .get(&history_index)
            .filter(|id| self.entries.contains(id))
            .map(String::as_str)
    }

    /// Load `start..end` (clamped to the history), fetching from the source
    /// unless every position is already resident.
    pub fn load_position_range(&mut self, start: usize, end: usize) -> Vec<CacheEntry> {
        let started = Instant::now();
        let end = end.min(self.source.len());
        if start >= end {
            return Vec::new();
        }
        let now = self.clock.now();

        let resident = self.loaded.covers(start, end)
            && (start..end).all(|i| self.resident_at(i).is_some());
        let ids: Vec<String> = if resident {
            (start..end)
                .filter_map(|i| self.resident_at(i).map(str::to_string))
                .collect()
        } else {
            let records = self.source.fetch(start, end);
            if records.len() != end - start {
                warn!(start, end, fetched = records.len(), "Short read from position history");
            }
            let ids: Vec<String> = records
                .into_iter()
                .enumerate()
                .map(|(offset, record)| {
                    self.insert_entry(record.position, record.metadata, Some(start + offset), now)
                })
                .collect();
            self.loaded.record(start, end);
            debug!(start, end, "Loaded position range");
            ids
        };

        let loaded: Vec<CacheEntry> = ids
            .iter()
            .filter_map(|id| {
                let entry = self.entries.touch(id, now)?;
                entry.last_accessed = now;
                Some(entry.clone())
            })
            .collect();

        if self.should_optimize_memory() {
            self.optimize_memory();
        }
        self.monitor.record("load_position_range", started.elapsed());
        loaded
    }

    pub fn load_position_at_index(&mut self, index: i64) -> Option<CacheEntry> {
        let index = usize::try_from(index).ok()?;
        if index >= self.source.len() {
            return None;
        }
        self.load_position_range(index, index + 1).into_iter().next()
    }

    /// Load the positions within `radius` of `center`. Returns how many were loaded.
    pub fn preload_adjacent_positions(&mut self, center: usize, radius: usize) -> usize {
        let start = center.saturating_sub(radius);
        let end = center.saturating_add(radius).saturating_add(1);
        self.load_position_range(start, end).len()
    }

    /// Load the whole history when it is short enough to hold in memory.
    /// Lazy histories load nothing up front.
    pub fn warm_up(&mut self) -> usize {
        if self.is_lazy() {
            return 0;
        }
        let end = self.source.len().min(self.config.max_memory_positions);
        self.load_position_range(0, end).len()
    }

    pub fn is_range_loaded(&self, start: usize, end: usize) -> bool {
        self.loaded.covers(start, end)
    }

    /// Forget ranges with no resident position, then the oldest past the cap.
    pub fn cleanup_loaded_ranges(&mut self) -> usize {
        let by_index = &self.by_index;
        let entries = &self.entries;
        let pruned = self.loaded.prune(|start, end| {
            (start..end).any(|i| by_index.get(&i).is_some_and(|id| entries.contains(id)))
        });
        if pruned > 0 {
            debug!(pruned, remaining = self.loaded.len(), "Pruned loaded ranges");
        }
        pruned
    }

    /// Index an arbitrary id. Cached positions are indexed automatically.
    pub fn update_position_index(&mut self, id: &str, position: &Board, metadata: &Metadata) {
        self.index.update(id, position, metadata, None);
    }

    pub fn search_positions(&self, query: &str) -> Vec<SearchHit> {
        let started = Instant::now();
        let hits = self.index.search(query);
        self.monitor.record("search_positions", started.elapsed());
        hits
    }

    pub fn find_similar_positions(&self, target: &Board, threshold: f64) -> Vec<SimilarPosition> {
        let started = Instant::now();
        let found = self.index.similar(target, threshold);
        self.monitor.record("find_similar_positions", started.elapsed());
        found
    }

    pub fn run_garbage_collection(&mut self) -> GcReport {
        let started = Instant::now();
        let report = GcReport {
            expired: self.cleanup_expired_cache(),
            ranges_pruned: self.cleanup_loaded_ranges(),
            evicted: self.evict_lru_items(),
        };
        self.stats.gc_runs += 1;
        self.stats.last_gc_time = Some(self.clock.now());
        info!(
            expired = report.expired,
            ranges_pruned = report.ranges_pruned,
            evicted = report.evicted,
            size = self.entries.len(),
            "Garbage collection complete"
        );
        self.monitor.record("run_garbage_collection", started.elapsed());
        report
    }

    pub fn metrics(&self) -> CacheMetrics {
        let lookups = self.stats.hits + self.stats.misses;
        let cache_hit_rate = if lookups == 0 {
            0.0
        } else {
            self.stats.hits as f64 / lookups as f64
        };
        CacheMetrics {
            size: self.entries.len(),
            capacity: self.config.max_memory_positions,
            hits: self.stats.hits,
            misses: self.stats.misses,
            cache_hit_rate,
            evictions: self.stats.evictions,
            expirations: self.stats.expirations,
            gc_runs: self.stats.gc_runs,
            last_gc_time: self.stats.last_gc_time,
            loaded_ranges: self.loaded.len(),
            compressed_bytes: self
                .entries
                .values()
                .filter_map(|e| e.compressed.as_ref())
                .map(|blob| blob.compressed_size)
                .sum(),
            indexed_positions: self.index.len(),
            lazy_mode: self.is_lazy(),
        }
    }

    /// A virtual list sized to the whole history.
    pub fn virtual_list(&self, container_height: u32) -> VirtualList {
        VirtualList::new(self.source.len(), self.config.item_height, container_height)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_index.clear();
        self.loaded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::monitor::NoopMonitor;
    use crate::source::InMemorySource;
    use board_core::{Color, Coord, Piece, PieceKind};
    use serde_json::json;
    use std::time::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// Distinct boards: a white rook walks the squares between two fixed kings.
    fn distinct_board(n: usize) -> Board {
        let kings = Board::empty()
            .with_piece(Coord::new(0, 0).unwrap(), Piece::new(PieceKind::King, Color::Black))
            .with_piece(Coord::new(4, 3).unwrap(), Piece::new(PieceKind::King, Color::White));
        let free: Vec<Coord> = Coord::all().filter(|c| kings.piece_at(*c).is_none()).collect();
        let kind = [PieceKind::Rook, PieceKind::Knight, PieceKind::Bishop][n / free.len() % 3];
        kings.with_piece(free[n % free.len()], Piece::new(kind, Color::White))
    }

    fn history(len: usize) -> InMemorySource {
        let mut source = InMemorySource::default();
        for i in 0..len {
            let mut meta = Metadata::new();
            meta.insert("name".to_string(), json!(format!("move {i}")));
            source.push(distinct_board(i), meta);
        }
        source
    }

    fn cache(config: CacheConfig, len: usize) -> (HistoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let cache = HistoryCache::new(
            config,
            clock.clone(),
            Box::new(history(len)),
            Box::new(NoopMonitor),
        )
        .unwrap();
        (cache, clock)
    }

    fn small() -> CacheConfig {
        CacheConfig {
            max_memory_positions: 3,
            lazy_load_threshold: 5,
            max_loaded_ranges: 2,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn test_same_position_shares_one_entry() {
        let (mut cache, _) = cache(small(), 0);
        let a = cache.add_to_memory_cache(distinct_board(0), Metadata::new());
        let b = cache.add_to_memory_cache(distinct_board(0), Metadata::new());
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(a, encode_position(&distinct_board(0)));
    }

    #[test]
    fn test_lru_eviction_respects_access() {
        let (mut cache, clock) = cache(small(), 0);
        let ids: Vec<String> = (0..3)
            .map(|i| {
                clock.advance(Duration::from_secs(1));
                cache.add_to_memory_cache(distinct_board(i), Metadata::new())
            })
            .collect();

        clock.advance(Duration::from_secs(1));
        assert!(cache.get_from_memory_cache(&ids[0]).is_some());
        cache.add_to_memory_cache(distinct_board(3), Metadata::new());

        assert_eq!(cache.len(), 3);
        assert!(cache.contains(&ids[0]));
        assert!(!cache.contains(&ids[1]));
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn test_get_counts_hits_and_misses() {
        let (mut cache, clock) = cache(small(), 0);
        let id = cache.add_to_memory_cache(distinct_board(0), Metadata::new());
        clock.advance(Duration::from_secs(5));
        let entry = cache.get_from_memory_cache(&id).unwrap();
        assert_eq!(entry.last_accessed, start() + TimeDelta::seconds(5));
        assert!(cache.get_from_memory_cache("nope").is_none());

        let metrics = cache.metrics();
        assert_eq!((metrics.hits, metrics.misses), (1, 1));
        assert_eq!(metrics.cache_hit_rate, 0.5);
        assert_eq!(metrics.size, 1);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let config = CacheConfig {
            ttl: Duration::from_secs(60),
            ..small()
        };
        let (mut cache, clock) = cache(config, 0);
        let old = cache.add_to_memory_cache(distinct_board(0), Metadata::new());
        clock.advance(Duration::from_secs(30));
        let fresh = cache.add_to_memory_cache(distinct_board(1), Metadata::new());
        clock.advance(Duration::from_secs(40));

        assert_eq!(cache.cleanup_expired_cache(), 1);
        assert!(!cache.contains(&old));
        assert!(cache.contains(&fresh));
        assert_eq!(cache.metrics().expirations, 1);
    }

    #[test]
    fn test_compressed_copy_follows_config() {
        let (mut cache, _) = cache(small(), 0);
        let id = cache.add_to_memory_cache(distinct_board(0), Metadata::new());
        let blob = cache.get_from_memory_cache(&id).unwrap().compressed.clone().unwrap();
        assert_eq!(board_core::decompress(&blob), Some(distinct_board(0)));

        let config = CacheConfig {
            compress_entries: false,
            ..small()
        };
        let (mut plain, _) = self::cache(config, 0);
        let id = plain.add_to_memory_cache(distinct_board(0), Metadata::new());
        assert!(plain.get_from_memory_cache(&id).unwrap().compressed.is_none());
        assert_eq!(plain.metrics().compressed_bytes, 0);
    }

    #[test]
    fn test_load_range_and_index_bounds() {
        let (mut cache, _) = cache(small(), 8);
        assert!(cache.is_lazy());

        let loaded = cache.load_position_range(2, 4);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].history_index, Some(2));
        assert_eq!(loaded[1].position, distinct_board(3));
        assert!(cache.is_range_loaded(2, 4));
        assert!(!cache.is_range_loaded(2, 5));

        assert!(cache.load_position_at_index(-1).is_none());
        assert!(cache.load_position_at_index(8).is_none());
        let last = cache.load_position_at_index(7).unwrap();
        assert_eq!(last.metadata["name"], json!("move 7"));
        assert!(cache.load_position_range(9, 12).is_empty());
    }

    #[test]
    fn test_preload_is_clamped_and_bounded() {
        let (mut cache, _) = cache(small(), 8);
        assert_eq!(cache.preload_adjacent_positions(0, 1), 2);
        assert_eq!(cache.preload_adjacent_positions(7, 2), 3);
        assert!(cache.len() <= 3);
    }

    #[test]
    fn test_loaded_ranges_are_capped_in_lazy_mode() {
        let (mut cache, _) = cache(small(), 8);
        cache.load_position_at_index(0);
        cache.load_position_at_index(1);
        cache.load_position_at_index(2);
        assert!(cache.metrics().loaded_ranges <= 2);
        assert!(!cache.is_range_loaded(0, 1));
        assert!(cache.is_range_loaded(2, 3));
    }

    #[test]
    fn test_warm_up_loads_short_history_only() {
        let (mut short, _) = cache(small(), 3);
        assert!(!short.is_lazy());
        assert_eq!(short.warm_up(), 3);
        assert_eq!(short.len(), 3);

        let (mut long, _) = cache(small(), 8);
        assert_eq!(long.warm_up(), 0);
        assert!(long.is_empty());
    }

    #[test]
    fn test_search_survives_eviction() {
        let (mut cache, _) = cache(small(), 8);
        for i in 0..8 {
            cache.load_position_at_index(i);
        }
        assert_eq!(cache.len(), 3);

        let hits = cache.search_positions("move 1");
        assert!(hits.iter().all(|h| h.score > 0));
        let first = hits.iter().find(|h| h.history_index == Some(1)).unwrap();
        let reloaded = cache.load_position_at_index(first.history_index.unwrap() as i64).unwrap();
        assert_eq!(reloaded.id, first.id);
    }

    #[test]
    fn test_unreloadable_positions_leave_the_index() {
        let config = CacheConfig {
            ttl: Duration::from_secs(60),
            ..small()
        };
        let (mut cache, clock) = cache(config, 8);
        cache.load_position_at_index(0);
        let stale = cache.add_to_memory_cache(distinct_board(20), Metadata::new());
        for i in 21..25 {
            cache.add_to_memory_cache(distinct_board(i), Metadata::new());
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.metrics().indexed_positions, 4);
        assert!(cache.index.get(&stale).is_none());

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.cleanup_expired_cache(), 3);
        assert_eq!(cache.metrics().indexed_positions, 1);
        assert_eq!(cache.search_positions("move 0").len(), 1);
    }

    #[test]
    fn test_garbage_collection_report() {
        let config = CacheConfig {
            ttl: Duration::from_secs(10),
            ..small()
        };
        let (mut cache, clock) = cache(config, 0);
        cache.add_to_memory_cache(distinct_board(0), Metadata::new());
        clock.advance(Duration::from_secs(11));
        cache.add_to_memory_cache(distinct_board(1), Metadata::new());

        let report = cache.run_garbage_collection();
        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        let metrics = cache.metrics();
        assert_eq!(metrics.gc_runs, 1);
        assert_eq!(metrics.last_gc_time, Some(start() + TimeDelta::seconds(11)));
    }

    #[test]
    fn test_virtual_list_spans_history() {
        let (cache, _) = cache(small(), 8);
        let list = cache.virtual_list(120);
        assert_eq!(list.get_total_height(), 8 * 60);
    }
}
