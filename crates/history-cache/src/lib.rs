//! Position history cache: bounded LRU storage, lazy range loading,
//! search over cached positions, and virtual scrolling arithmetic.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod index;
pub mod lru;
pub mod monitor;
pub mod source;
pub mod virtualizer;

pub use cache::{CacheEntry, CacheMetrics, GcReport, HistoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use error::CacheError;
pub use index::{PositionIndex, SearchHit, SimilarPosition};
pub use monitor::{NoopMonitor, PerformanceMonitor, TracingMonitor};
pub use source::{HistoryRecord, InMemorySource, LoadedRanges, Metadata, PositionSource};
pub use virtualizer::{calculate_visible_range, ItemStyle, VirtualList, VirtualWindow, VisibleRange};
