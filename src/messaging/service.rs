use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::{
    core::{lookup::LookupService, refresh::RefreshCoordinator},
    error::{CacheError, CacheResult},
    messaging::models::{Request, Response, ToggleResponse},
    storage::Store,
};

/// A request travelling to the service, with the channel its answer goes back on.
pub struct Envelope {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

/// Answers consumer requests against the coordinator and the local store.
#[derive(Clone)]
pub struct CacheService {
    coordinator: Arc<RefreshCoordinator>,
    lookup: LookupService,
}

impl CacheService {
    pub fn new(coordinator: Arc<RefreshCoordinator>, store: Arc<dyn Store>) -> Self {
        let lookup = LookupService::new(store, coordinator.latch());
        CacheService {
            coordinator,
            lookup,
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Lookup { identity } => Response::Lookup(self.lookup.lookup(&identity).into()),
            Request::Refresh => Response::Refresh(self.coordinator.request_refresh().await.into()),
            Request::Status => match self.coordinator.status() {
                Ok(status) => Response::Status(status),
                Err(e) => {
                    error!("Could not read cache status. {e}");
                    Response::Failed {
                        detail: e.to_string(),
                    }
                }
            },
            Request::ToggleBadge { enabled } => {
                match self.coordinator.set_badge_enabled(enabled).await {
                    Ok(badge_enabled) => Response::ToggleBadge(ToggleResponse {
                        success: true,
                        badge_enabled,
                    }),
                    Err(e) => {
                        error!("Could not toggle badges. {e}");
                        Response::Failed {
                            detail: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    /// Each request gets its own task, so a lookup never waits behind a
    /// refresh that is downloading pages.
    pub async fn serve(self, mut rx: mpsc::Receiver<Envelope>) {
        info!("Cache service listening for requests.");
        while let Some(Envelope { request, reply }) = rx.recv().await {
            let service = self.clone();
            tokio::spawn(async move {
                debug!(?request, "Handling request");
                let response = service.handle(request).await;
                if reply.send(response).is_err() {
                    debug!("Requester went away before the response was ready");
                }
            });
        }
        info!("All request handles dropped, cache service stopped.");
    }

    pub fn spawn(self, capacity: usize) -> ServiceHandle {
        let (tx, rx) = mpsc::channel::<Envelope>(capacity);
        tokio::spawn(self.serve(rx));
        ServiceHandle { tx }
    }
}

/// Cloneable entry point handed to the front-ends and the scheduler.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    pub async fn request(&self, request: Request) -> CacheResult<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|e| {
                CacheError::ChannelSend(format!("Could not send request to cache service. {e}"))
            })?;
        response.await.map_err(|e| {
            CacheError::ChannelSend(format!("Cache service dropped the request. {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::leaderboard::Fetcher,
        core::{lookup::Lookup, notifier::Notifier, refresh::RefreshPolicy, record::RawEntry},
        messaging::models::{LookupResponse, RefreshResponse},
        storage::MemoryStore,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    struct OnePageFetcher {
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl Fetcher for OnePageFetcher {
        async fn fetch_page(&self, offset: usize, _limit: usize) -> CacheResult<Vec<RawEntry>> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if offset > 0 {
                return Ok(vec![]);
            }
            ["Alice", "@Bob"]
                .iter()
                .zip([900, 400])
                .map(|(name, points)| RawEntry::from_json(json!({"username": name, "points": points})))
                .collect()
        }
    }

    fn service(gate: Option<Arc<Notify>>) -> CacheService {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            Arc::new(OnePageFetcher { gate }),
            Arc::new(Notifier::new()),
            RefreshPolicy {
                page_delay: std::time::Duration::ZERO,
                ..RefreshPolicy::default()
            },
        )
        .unwrap();
        CacheService::new(Arc::new(coordinator), store)
    }

    #[tokio::test]
    async fn test_refresh_then_lookup_through_handle() {
        let handle = service(None).spawn(8);

        let lookup = Request::Lookup {
            identity: "@alice".to_string(),
        };
        assert_eq!(
            handle.request(lookup.clone()).await.unwrap(),
            Response::Lookup(Lookup::NotFound.into())
        );

        match handle.request(Request::Refresh).await.unwrap() {
            Response::Refresh(RefreshResponse::Success { total, .. }) => assert_eq!(total, 2),
            other => panic!("unexpected response {other:?}"),
        }

        match handle.request(lookup).await.unwrap() {
            Response::Lookup(LookupResponse {
                found: true,
                record: Some(record),
            }) => {
                assert_eq!(record.rank, 1);
                assert_eq!(record.stars, 900);
            }
            other => panic!("unexpected response {other:?}"),
        }

        match handle.request(Request::Refresh).await.unwrap() {
            Response::Refresh(RefreshResponse::Cooldown { time_remaining_ms }) => {
                assert!(time_remaining_ms > 0)
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lookup_and_status_answer_while_refreshing() {
        let gate = Arc::new(Notify::new());
        let handle = service(Some(gate.clone())).spawn(8);

        let refreshing = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.request(Request::Refresh).await })
        };
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        match handle.request(Request::Status).await.unwrap() {
            Response::Status(status) => assert!(status.refreshing),
            other => panic!("unexpected response {other:?}"),
        }
        assert_eq!(
            handle
                .request(Request::Lookup {
                    identity: "bob".to_string()
                })
                .await
                .unwrap(),
            Response::Lookup(Lookup::NotFound.into())
        );
        assert_eq!(
            handle.request(Request::Refresh).await.unwrap(),
            Response::Refresh(RefreshResponse::AlreadyInProgress)
        );

        gate.notify_one();
        match refreshing.await.unwrap().unwrap() {
            Response::Refresh(RefreshResponse::Success { total, .. }) => assert_eq!(total, 2),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_toggle_badge() {
        let handle = service(None).spawn(8);
        assert_eq!(
            handle
                .request(Request::ToggleBadge { enabled: false })
                .await
                .unwrap(),
            Response::ToggleBadge(ToggleResponse {
                success: true,
                badge_enabled: false
            })
        );
        match handle.request(Request::Status).await.unwrap() {
            Response::Status(status) => assert!(!status.badge_enabled),
            other => panic!("unexpected response {other:?}"),
        }
    }
}
