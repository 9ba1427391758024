//! Horizon-based cleanup of old items, snapshots and trends.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sportrend_core::MAX_RETENTION_DAYS;
use sportrend_db::{PurgeCounts, Repository};

use crate::error::RetentionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    pub cutoff: DateTime<Utc>,
    pub raw_items: u64,
    pub processed_items: u64,
    pub snapshots: u64,
    pub trends_ended: u64,
}

/// Delete items created and snapshots taken more than `horizon_days` before
/// `now`, and mark trends not updated since then as ended.
///
/// The newest snapshot is always kept so the dashboard never goes dark.
///
/// # Errors
///
/// Returns [`RetentionError::InvalidHorizon`] for a horizon above
/// [`MAX_RETENTION_DAYS`], or [`RetentionError::Db`] if the repository fails.
/// A purge that completed before the failure is not rolled back.
pub async fn run_retention(
    repo: &dyn Repository,
    horizon_days: u32,
    now: DateTime<Utc>,
) -> Result<RetentionReport, RetentionError> {
    let cutoff = Some(horizon_days)
        .filter(|days| *days <= MAX_RETENTION_DAYS)
        .and_then(|days| now.checked_sub_signed(TimeDelta::days(i64::from(days))))
        .ok_or(RetentionError::InvalidHorizon(horizon_days))?;
    let PurgeCounts {
        raw_items,
        processed_items,
        snapshots,
    } = repo.purge_before(cutoff).await?;
    let trends_ended = repo.end_stale_trends(cutoff).await?;

    tracing::info!(
        cutoff = %cutoff,
        raw_items,
        processed_items,
        snapshots,
        trends_ended,
        "retention pass finished"
    );
    Ok(RetentionReport {
        cutoff,
        raw_items,
        processed_items,
        snapshots,
        trends_ended,
    })
}
