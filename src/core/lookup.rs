use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    core::{
        record::{normalize_identity, RankingRecord},
        refresh::RefreshLatch,
    },
    storage::Store,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(RankingRecord),
    NotFound,
}

/// Point lookups for badge rendering. Reads the local store only, and fails
/// open: any problem with the cache means "no badge".
#[derive(Clone)]
pub struct LookupService {
    store: Arc<dyn Store>,
    latch: RefreshLatch,
}

impl LookupService {
    pub fn new(store: Arc<dyn Store>, latch: RefreshLatch) -> Self {
        LookupService { store, latch }
    }

    pub fn lookup(&self, handle: &str) -> Lookup {
        let identity = normalize_identity(handle);
        if identity.is_empty() {
            return Lookup::NotFound;
        }

        // The table is being rebuilt, its content is not a snapshot yet.
        if self.latch.is_held() {
            debug!(identity = %identity, "Lookup during refresh, skipping");
            return Lookup::NotFound;
        }

        match self.store.state() {
            Ok(state) if state.has_snapshot() => {}
            Ok(_) => return Lookup::NotFound,
            Err(e) => {
                warn!(identity = %identity, "Could not read cache state: {e}");
                return Lookup::NotFound;
            }
        }

        match self.store.get(&identity) {
            Ok(Some(record)) => Lookup::Found(record),
            Ok(None) => Lookup::NotFound,
            Err(e) => {
                warn!(identity = %identity, "Could not read cached ranking: {e}");
                Lookup::NotFound
            }
        }
    }
}
