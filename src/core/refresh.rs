use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tracing::{debug, error, info, warn};

use crate::{
    client::leaderboard::Fetcher,
    config::Settings,
    core::{
        notifier::Notifier,
        record::{normalize_identity, RankingRecord},
    },
    error::{CacheError, CacheResult},
    storage::{RefreshState, Store},
};

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub cooldown: Duration,
    pub page_size: usize,
    pub max_entries: usize,
    /// Pause between two full pages, to go easy on the provider.
    pub page_delay: std::time::Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy {
            cooldown: Duration::hours(24),
            page_size: 100,
            max_entries: 25_000,
            page_delay: std::time::Duration::from_secs(1),
        }
    }
}

impl RefreshPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        RefreshPolicy {
            cooldown: Duration::hours(settings.cooldown_hours),
            page_size: settings.page_size.max(1),
            max_entries: settings.max_entries,
            page_delay: std::time::Duration::from_millis(settings.page_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub last_refresh_at: DateTime<Utc>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub cache_count: usize,
    pub initialized: bool,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub badge_enabled: bool,
    pub max_cache_size: usize,
    pub refreshing: bool,
}

/// In-process "a download is running" flag, shared with the lookup side.
#[derive(Debug, Clone, Default)]
pub struct RefreshLatch(Arc<AtomicBool>);

impl RefreshLatch {
    pub fn is_held(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Option<LatchGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| LatchGuard(&self.0))
    }
}

// Released on drop, so a refresh future dropped halfway still frees the latch.
struct LatchGuard<'a>(&'a AtomicBool);

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the refresh lifecycle of the rankings cache: cooldown, single-flight,
/// paginated download into the store, and the change notification at the end.
pub struct RefreshCoordinator {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<Notifier>,
    policy: RefreshPolicy,
    latch: RefreshLatch,
    // Serializes read-modify-write of the persisted state.
    state_lock: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<Notifier>,
        policy: RefreshPolicy,
    ) -> CacheResult<Self> {
        let coordinator = RefreshCoordinator {
            store,
            fetcher,
            notifier,
            policy,
            latch: RefreshLatch::default(),
            state_lock: Mutex::new(()),
        };
        coordinator.recover()?;
        Ok(coordinator)
    }

    // A download marker left over from a previous run means the process died
    // mid-refresh: whatever is in the table is not a complete snapshot.
    fn recover(&self) -> CacheResult<()> {
        let mut interrupted = false;
        self.update_state(|state| {
            interrupted = state.downloading;
            if state.downloading {
                state.downloading = false;
                state.initialized = false;
            }
        })?;
        if interrupted {
            warn!("Previous refresh did not complete, cached rankings stay disabled until the next refresh");
        }
        Ok(())
    }

    pub fn latch(&self) -> RefreshLatch {
        self.latch.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.latch.is_held()
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    pub fn status(&self) -> CacheResult<CacheStatus> {
        let state = self.store.state()?;
        Ok(CacheStatus {
            cache_count: self.store.count()?,
            initialized: state.has_snapshot(),
            last_refresh_at: state.last_refresh_at,
            badge_enabled: state.badge_enabled,
            max_cache_size: self.policy.max_entries,
            refreshing: self.is_refreshing(),
        })
    }

    pub async fn set_badge_enabled(&self, enabled: bool) -> CacheResult<bool> {
        self.update_state(|state| state.badge_enabled = enabled)?;
        self.store.flush().await?;
        let delivered = self.notifier.notify_badge_state(enabled);
        info!(enabled, observers = delivered, "Badge display toggled");
        Ok(enabled)
    }

    pub async fn request_refresh(&self) -> CacheResult<RefreshReport> {
        self.request_refresh_at(Utc::now()).await
    }

    /// Same as `request_refresh`, with the cooldown evaluated at `now`.
    pub async fn request_refresh_at(&self, now: DateTime<Utc>) -> CacheResult<RefreshReport> {
        if self.latch.is_held() {
            return Err(CacheError::AlreadyInProgress);
        }

        if let Some(remaining) = self.cooldown_remaining(now)? {
            debug!("Refresh rejected, cooldown active");
            return Err(CacheError::Cooldown { remaining });
        }

        let guard = self
            .latch
            .try_acquire()
            .ok_or(CacheError::AlreadyInProgress)?;

        info!(
            page_size = self.policy.page_size,
            max_entries = self.policy.max_entries,
            "Starting leaderboard refresh"
        );
        let started = std::time::Instant::now();

        match self.download().await {
            Ok(total) => {
                self.update_state(|state| {
                    state.last_refresh_at = Some(now);
                    state.initialized = true;
                    state.downloading = false;
                })?;
                // The snapshot is committed at this point, a late flush
                // failure only delays durability.
                if let Err(e) = self.store.flush().await {
                    warn!("Could not flush refreshed rankings: {e}");
                }
                drop(guard);

                let delivered = self.notifier.notify_refreshed();
                info!(
                    total,
                    observers = delivered,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Leaderboard refresh complete"
                );
                Ok(RefreshReport {
                    last_refresh_at: now,
                    total,
                })
            }
            Err(e) => {
                // last_refresh_at and initialized keep their previous values.
                // The download marker stays set: the table is partial until
                // the next refresh completes.
                error!("Leaderboard refresh aborted: {e}");
                Err(e)
            }
        }
    }

    /// Time left before a new refresh is allowed, `None` if allowed now.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> CacheResult<Option<Duration>> {
        let state = self.store.state()?;
        Ok(state.last_refresh_at.and_then(|last| {
            let elapsed = (now - last).max(Duration::zero());
            (elapsed < self.policy.cooldown).then(|| self.policy.cooldown - elapsed)
        }))
    }

    // Clears the table and repopulates it page by page. Each page is durably
    // written before the next one is requested. A handle seen twice keeps its
    // first, higher ranked row.
    async fn download(&self) -> CacheResult<usize> {
        self.update_state(|state| state.downloading = true)?;
        self.store.clear()?;
        self.store.flush().await?;

        let page_size = self.policy.page_size;
        let mut seen: HashSet<String> = HashSet::new();
        let mut offset = 0;
        let mut total = 0;
        loop {
            let room = self.policy.max_entries.saturating_sub(total);
            if room == 0 {
                info!(total, "Reached maximum cache size, stopping pagination");
                break;
            }

            let page = self.fetcher.fetch_page(offset, page_size).await?;
            let received = page.len();
            if received == 0 {
                break;
            }
            offset += received;

            let written_at = Utc::now();
            let mut records: Vec<RankingRecord> = Vec::with_capacity(received.min(room));
            for raw in page {
                if records.len() == room {
                    break;
                }
                let identity = normalize_identity(&raw.name);
                if !seen.insert(identity) {
                    debug!(name = %raw.name, "Skipping repeated leaderboard entry");
                    continue;
                }
                let rank = (total + records.len() + 1) as u32;
                records.push(RankingRecord::from_raw(raw, rank, written_at));
            }
            self.store.put_all(&records)?;
            self.store.flush().await?;
            total += records.len();
            debug!(total, received, "Stored leaderboard page");

            // A short page is the last one.
            if received < page_size {
                break;
            }
            if total < self.policy.max_entries && !self.policy.page_delay.is_zero() {
                tokio::time::sleep(self.policy.page_delay).await;
            }
        }

        Ok(total)
    }

    fn update_state<F>(&self, change: F) -> CacheResult<RefreshState>
    where
        F: FnOnce(&mut RefreshState),
    {
        let _lock = self
            .state_lock
            .lock()
            .map_err(|_| CacheError::StorageUnavailable("state lock poisoned".to_string()))?;
        let mut state = self.store.state()?;
        change(&mut state);
        self.store.set_state(&state)?;
        Ok(state)
    }
}
