pub mod disk;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{core::record::RankingRecord, error::CacheResult};

pub use disk::SledStore;
pub use memory::MemoryStore;

/// Refresh bookkeeping, persisted next to the rankings so it survives restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshState {
    pub last_refresh_at: Option<DateTime<Utc>>,
    /// Only true once a refresh went through to the end.
    pub initialized: bool,
    /// Set while the rankings table is being repopulated. Still set at startup
    /// means the previous process died halfway through a download.
    #[serde(default)]
    pub downloading: bool,
    #[serde(default = "default_badge_enabled")]
    pub badge_enabled: bool,
}

fn default_badge_enabled() -> bool {
    true
}

impl RefreshState {
    /// The table holds a complete snapshot that lookups may trust.
    pub fn has_snapshot(&self) -> bool {
        self.initialized && !self.downloading
    }
}

impl Default for RefreshState {
    fn default() -> Self {
        RefreshState {
            last_refresh_at: None,
            initialized: false,
            downloading: false,
            badge_enabled: default_badge_enabled(),
        }
    }
}

/// Local table of rankings keyed by canonical identity, plus the settings
/// record. Each call is atomic for concurrent readers; backend failures come
/// back as `CacheError::StorageUnavailable`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upsert by identity.
    fn put(&self, record: &RankingRecord) -> CacheResult<()>;

    /// Upsert a whole page at once.
    fn put_all(&self, records: &[RankingRecord]) -> CacheResult<()>;

    fn get(&self, identity: &str) -> CacheResult<Option<RankingRecord>>;

    fn count(&self) -> CacheResult<usize>;

    fn clear(&self) -> CacheResult<()>;

    fn state(&self) -> CacheResult<RefreshState>;

    fn set_state(&self, state: &RefreshState) -> CacheResult<()>;

    /// Resolves once everything written so far is durable.
    async fn flush(&self) -> CacheResult<()>;
}
