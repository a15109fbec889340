use async_trait::async_trait;
use sled::{Batch, Db, Tree};
use std::path::Path;
use tracing::{debug, info};

use super::{RefreshState, Store};
use crate::{core::record::RankingRecord, error::CacheResult};

const RANKINGS_TREE: &'static str = "rankings";
const SETTINGS_TREE: &'static str = "settings";
const REFRESH_STATE_KEY: &'static str = "refresh_state";

/// Rankings persisted with sled, values JSON-encoded.
pub struct SledStore {
    db: Db,
    rankings: Tree,
    settings: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let db = sled::open(path.as_ref())?;
        let rankings = db.open_tree(RANKINGS_TREE)?;
        let settings = db.open_tree(SETTINGS_TREE)?;
        info!(path = %path.as_ref().display(), records = rankings.len(), "Opened rankings database");
        Ok(SledStore {
            db,
            rankings,
            settings,
        })
    }
}

#[async_trait]
impl Store for SledStore {
    fn put(&self, record: &RankingRecord) -> CacheResult<()> {
        let value = serde_json::to_vec(record)?;
        self.rankings.insert(record.identity.as_bytes(), value)?;
        Ok(())
    }

    fn put_all(&self, records: &[RankingRecord]) -> CacheResult<()> {
        let mut batch = Batch::default();
        for record in records {
            batch.insert(record.identity.as_bytes(), serde_json::to_vec(record)?);
        }
        self.rankings.apply_batch(batch)?;
        Ok(())
    }

    fn get(&self, identity: &str) -> CacheResult<Option<RankingRecord>> {
        match self.rankings.get(identity.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn count(&self) -> CacheResult<usize> {
        Ok(self.rankings.len())
    }

    fn clear(&self) -> CacheResult<()> {
        self.rankings.clear()?;
        debug!("Cleared rankings table");
        Ok(())
    }

    fn state(&self) -> CacheResult<RefreshState> {
        match self.settings.get(REFRESH_STATE_KEY)? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Ok(RefreshState::default()),
        }
    }

    fn set_state(&self, state: &RefreshState) -> CacheResult<()> {
        self.settings
            .insert(REFRESH_STATE_KEY, serde_json::to_vec(state)?)?;
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn record(identity: &str, rank: u32) -> RankingRecord {
        RankingRecord {
            identity: identity.to_string(),
            display_name: identity.to_uppercase(),
            rank,
            stars: 100 - rank as u64,
            secondary_metrics: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_put_get_count_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledStore::open(temp_dir.path()).unwrap();

        assert_eq!(store.count().unwrap(), 0);
        assert!(store.get("alice").unwrap().is_none());

        store.put(&record("alice", 1)).unwrap();
        store
            .put_all(&[record("bob", 2), record("carol", 3)])
            .unwrap();
        // Upsert keeps a single row per identity.
        store.put(&record("alice", 4)).unwrap();
        store.flush().await.unwrap();

        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.get("alice").unwrap().unwrap().rank, 4);
        assert_eq!(store.get("carol").unwrap().unwrap().display_name, "CAROL");

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.get("bob").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let refreshed_at = Utc::now();
        {
            let store = SledStore::open(temp_dir.path()).unwrap();
            assert_eq!(store.state().unwrap(), RefreshState::default());

            store.put(&record("alice", 1)).unwrap();
            store
                .set_state(&RefreshState {
                    last_refresh_at: Some(refreshed_at),
                    initialized: true,
                    downloading: false,
                    badge_enabled: false,
                })
                .unwrap();
            store.flush().await.unwrap();
        }

        let store = SledStore::open(temp_dir.path()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let state = store.state().unwrap();
        assert!(state.initialized);
        assert!(!state.badge_enabled);
        assert_eq!(state.last_refresh_at, Some(refreshed_at));
    }
}
