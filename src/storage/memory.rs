use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use super::{RefreshState, Store};
use crate::{
    core::record::RankingRecord,
    error::{CacheError, CacheResult},
};

type SharedRankings = Arc<RwLock<HashMap<String, RankingRecord>>>;

/// Volatile store, nothing survives the process. Used for `--ephemeral` runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rankings: SharedRankings,
    state: Arc<Mutex<RefreshState>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::StorageUnavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl Store for MemoryStore {
    fn put(&self, record: &RankingRecord) -> CacheResult<()> {
        let mut data = self.rankings.write().map_err(poisoned)?;
        data.insert(record.identity.clone(), record.clone());
        Ok(())
    }

    fn put_all(&self, records: &[RankingRecord]) -> CacheResult<()> {
        let mut data = self.rankings.write().map_err(poisoned)?;
        data.extend(records.iter().map(|r| (r.identity.clone(), r.clone())));
        Ok(())
    }

    fn get(&self, identity: &str) -> CacheResult<Option<RankingRecord>> {
        let data = self.rankings.read().map_err(poisoned)?;
        Ok(data.get(identity).cloned())
    }

    fn count(&self) -> CacheResult<usize> {
        Ok(self.rankings.read().map_err(poisoned)?.len())
    }

    fn clear(&self) -> CacheResult<()> {
        self.rankings.write().map_err(poisoned)?.clear();
        Ok(())
    }

    fn state(&self) -> CacheResult<RefreshState> {
        Ok(self.state.lock().map_err(poisoned)?.clone())
    }

    fn set_state(&self, state: &RefreshState) -> CacheResult<()> {
        *self.state.lock().map_err(poisoned)? = state.clone();
        Ok(())
    }

    async fn flush(&self) -> CacheResult<()> {
        Ok(())
    }
}
