//! Read-only views over the most recent snapshot.
//!
//! Nothing here computes trends; every answer is a slice of a stored
//! snapshot, so two reads without an aggregation in between are identical.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sportrend_core::{EntityHighlight, EntityType, EntityTypeDetail, SnapshotRecord};
use sportrend_db::{DbError, Repository, SnapshotFilter};

/// Outcome of a dashboard read when the repository answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Lookup<T> {
    Found(T),
    /// No precomputed data matches the request yet.
    NoData,
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NoData => None,
        }
    }

    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Lookup::NoData)
    }

    fn from_option(value: Option<T>) -> Self {
        value.map_or(Lookup::NoData, Lookup::Found)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDetailView {
    pub snapshot_id: i64,
    pub analysis_time: DateTime<Utc>,
    pub detail: EntityTypeDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportTrends {
    pub snapshot_id: i64,
    pub analysis_time: DateTime<Utc>,
    pub sport_type: String,
    pub total_items: u64,
    pub top_entities: BTreeMap<EntityType, EntityHighlight>,
}

/// The whole latest snapshot.
///
/// # Errors
///
/// Returns [`DbError`] if the repository cannot be read.
pub async fn latest_snapshot(repo: &dyn Repository) -> Result<Lookup<SnapshotRecord>, DbError> {
    let record = repo.find_latest_snapshot(SnapshotFilter::default()).await?;
    Ok(Lookup::from_option(record))
}

/// Detail for one entity type from the newest snapshot that covered it.
///
/// # Errors
///
/// Returns [`DbError`] if the repository cannot be read.
pub async fn latest_entity_detail(
    repo: &dyn Repository,
    entity_type: EntityType,
) -> Result<Lookup<EntityDetailView>, DbError> {
    let filter = SnapshotFilter {
        entity_type: Some(entity_type),
    };
    let Some(record) = repo.find_latest_snapshot(filter).await? else {
        return Ok(Lookup::NoData);
    };
    let view = record
        .snapshot
        .entity_detail(entity_type)
        .cloned()
        .map(|detail| EntityDetailView {
            snapshot_id: record.id,
            analysis_time: record.snapshot.analysis_time,
            detail,
        });
    Ok(Lookup::from_option(view))
}

/// One sport's breakdown from the latest snapshot, optionally narrowed to a
/// single entity type.
///
/// # Errors
///
/// Returns [`DbError`] if the repository cannot be read.
pub async fn latest_sport_trends(
    repo: &dyn Repository,
    sport_type: &str,
    entity_type: Option<EntityType>,
) -> Result<Lookup<SportTrends>, DbError> {
    let filter = SnapshotFilter { entity_type };
    let Some(record) = repo.find_latest_snapshot(filter).await? else {
        return Ok(Lookup::NoData);
    };
    let Some(breakdown) = record.snapshot.sport(sport_type) else {
        return Ok(Lookup::NoData);
    };

    let top_entities: BTreeMap<EntityType, EntityHighlight> = breakdown
        .top_entities
        .iter()
        .filter(|(kind, _)| entity_type.is_none_or(|wanted| wanted == **kind))
        .map(|(kind, highlight)| (*kind, highlight.clone()))
        .collect();
    if entity_type.is_some() && top_entities.is_empty() {
        return Ok(Lookup::NoData);
    }

    Ok(Lookup::Found(SportTrends {
        snapshot_id: record.id,
        analysis_time: record.snapshot.analysis_time,
        sport_type: breakdown.sport_type.clone(),
        total_items: breakdown.total_items,
        top_entities,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_serializes_with_status_tag() {
        let found = serde_json::to_value(Lookup::Found(3)).unwrap();
        assert_eq!(found["status"], "found");
        assert_eq!(found["data"], 3);
        let empty = serde_json::to_value(Lookup::<u32>::NoData).unwrap();
        assert_eq!(empty["status"], "no_data");
    }

    #[test]
    fn found_unwraps_value() {
        assert_eq!(Lookup::Found("x").found(), Some("x"));
        assert!(Lookup::<u8>::NoData.is_no_data());
    }
}
