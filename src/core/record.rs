use crate::{
    error::{CacheError, CacheResult},
    utils::{format_rank, format_thousands},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// Providers disagree on how they name the handle and the score.
const IDENTITY_FIELDS: [&'static str; 3] = ["username", "address", "name"];
const SCORE_FIELDS: [&'static str; 2] = ["points", "stars"];

/// Canonical form of a handle: trimmed, without leading `@`, lower-cased.
/// Applied on both the write path and the lookup path.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_lowercase()
}

/// One leaderboard entry as delivered by the provider, before ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub name: String,
    pub points: u64,
    pub extra: BTreeMap<String, Value>,
}

impl RawEntry {
    pub fn from_json(value: Value) -> CacheResult<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(CacheError::MalformedResponse(format!(
                    "leaderboard entry is not an object: {other}"
                )))
            }
        };

        let name = take_first(&mut fields, &IDENTITY_FIELDS)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|name| !normalize_identity(name).is_empty())
            .ok_or_else(|| CacheError::MalformedResponse("entry without a handle".to_string()))?;

        let points = match take_first(&mut fields, &SCORE_FIELDS) {
            Some(value) => parse_score(&value).ok_or_else(|| {
                CacheError::MalformedResponse(format!("invalid score for {name}: {value}"))
            })?,
            // Provider omits the score for members without any.
            None => 0,
        };

        Ok(RawEntry {
            name,
            points,
            extra: fields.into_iter().collect(),
        })
    }
}

fn take_first(fields: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let key = keys.iter().find(|key| fields.contains_key(**key))?;
    let value = fields.remove(*key);
    // Drop the aliases so they do not leak into the secondary metrics.
    for other in keys {
        fields.remove(*other);
    }
    value
}

// Scores come either as JSON numbers or as display strings like "#1,234".
fn parse_score(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s
            .trim()
            .trim_start_matches('#')
            .replace(',', "")
            .parse::<u64>()
            .ok(),
        Value::Null => Some(0),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub identity: String,
    pub display_name: String,
    pub rank: u32,
    pub stars: u64,
    // Opaque counters (proofs, cycles, ...) passed through as received.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secondary_metrics: BTreeMap<String, Value>,
    pub last_updated: DateTime<Utc>,
}

impl RankingRecord {
    pub fn from_raw(raw: RawEntry, rank: u32, written_at: DateTime<Utc>) -> Self {
        RankingRecord {
            identity: normalize_identity(&raw.name),
            display_name: raw.name.trim().to_string(),
            rank,
            stars: raw.points,
            secondary_metrics: raw.extra,
            last_updated: written_at,
        }
    }

    /// Text shown on a profile badge, e.g. `12th ★ 1,234`.
    pub fn badge_label(&self) -> String {
        format!("{} ★ {}", format_rank(self.rank), format_thousands(self.stars))
    }
}
