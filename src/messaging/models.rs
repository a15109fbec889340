use crate::{
    core::{
        lookup::Lookup,
        notifier::Notification,
        record::RankingRecord,
        refresh::{CacheStatus, RefreshReport},
    },
    error::{CacheError, CacheResult},
    messaging::templates::MessageTemplate,
    utils::{format_duration, format_last_update, format_thousands},
};

use chrono::{DateTime, Duration, Local, Utc};
use minijinja::context;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inbound requests from consumers (profile pages, popup, scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    Lookup { identity: String },
    Refresh,
    Status,
    ToggleBadge { enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshResponse {
    Success {
        last_refresh_at: DateTime<Utc>,
        total: usize,
    },
    Cooldown {
        time_remaining_ms: i64,
    },
    AlreadyInProgress,
    Error {
        detail: String,
    },
}

impl From<CacheResult<RefreshReport>> for RefreshResponse {
    fn from(result: CacheResult<RefreshReport>) -> Self {
        match result {
            Ok(report) => RefreshResponse::Success {
                last_refresh_at: report.last_refresh_at,
                total: report.total,
            },
            Err(CacheError::Cooldown { remaining }) => RefreshResponse::Cooldown {
                time_remaining_ms: remaining.num_milliseconds(),
            },
            Err(CacheError::AlreadyInProgress) => RefreshResponse::AlreadyInProgress,
            Err(e) => RefreshResponse::Error {
                detail: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RankingRecord>,
}

impl From<Lookup> for LookupResponse {
    fn from(lookup: Lookup) -> Self {
        match lookup {
            Lookup::Found(record) => LookupResponse {
                found: true,
                record: Some(record),
            },
            Lookup::NotFound => LookupResponse {
                found: false,
                record: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub badge_enabled: bool,
}

/// One response shape per request kind, plus `Failed` when the cache itself
/// could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Lookup(LookupResponse),
    Refresh(RefreshResponse),
    Status(CacheStatus),
    ToggleBadge(ToggleResponse),
    Failed { detail: String },
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rendered = match self {
            Response::Lookup(LookupResponse {
                record: Some(record),
                ..
            }) => MessageTemplate::LookupFound.render(context! {
                name => record.display_name,
                badge => record.badge_label(),
            }),
            Response::Lookup(_) => MessageTemplate::LookupNotFound.render(()),
            Response::Refresh(RefreshResponse::Success {
                last_refresh_at,
                total,
            }) => MessageTemplate::RefreshSuccess.render(context! {
                total => format_thousands(*total as u64),
                timestamp => last_refresh_at.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string(),
            }),
            Response::Refresh(RefreshResponse::Cooldown { time_remaining_ms }) => {
                MessageTemplate::RefreshCooldown.render(context! {
                    remaining => format_duration(Duration::milliseconds(*time_remaining_ms)),
                })
            }
            Response::Refresh(RefreshResponse::AlreadyInProgress) => {
                MessageTemplate::RefreshInProgress.render(())
            }
            Response::Refresh(RefreshResponse::Error { detail }) => MessageTemplate::RefreshFailed
                .render(context! { detail => detail }),
            Response::Status(status) => MessageTemplate::Status.render(context! {
                state => match (status.refreshing, status.initialized) {
                    (true, _) => "Updating...",
                    (false, true) => "Ready",
                    (false, false) => "Need Initialization",
                },
                count => format_thousands(status.cache_count as u64),
                max => format_thousands(status.max_cache_size as u64),
                last_update => format_last_update(status.last_refresh_at, Utc::now()),
                badge_enabled => status.badge_enabled,
            }),
            Response::ToggleBadge(toggle) => MessageTemplate::BadgeToggled
                .render(context! { enabled => toggle.badge_enabled }),
            Response::Failed { detail } => MessageTemplate::RequestFailed
                .render(context! { detail => detail }),
        };
        write!(f, "{}", rendered.map_err(|_| fmt::Error)?)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rendered = match self {
            Notification::DataRefreshed => MessageTemplate::DataRefreshed.render(()),
            Notification::BadgeStateChanged(enabled) => MessageTemplate::BadgeToggled
                .render(context! { enabled => enabled }),
        };
        write!(f, "{}", rendered.map_err(|_| fmt::Error)?)
    }
}
