//! Build filter: which tagged builds have been sitting longer than the threshold.
//!
//! Builds are fetched one at a time, in the order the hub lists them, and each
//! build id is fetched at most once per call. A malformed `update_date` aborts
//! the whole pass; nothing is silently skipped.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, error, info};

use crate::contract::{BuildRecord, HubClient};
use crate::error::NotifyError;

/// Format the hub uses for `update_date`: local time, no offset.
pub const UPDATE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where to look and how old is too old.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub tag: String,
    pub project: String,
    pub threshold_days: u32,
}

pub fn parse_update_date(build_id: &str, value: &str) -> Result<NaiveDateTime, NotifyError> {
    NaiveDateTime::parse_from_str(value.trim(), UPDATE_DATE_FORMAT).map_err(|source| {
        error!(build_id, value, error = %source, "[FILTER][ERROR] Unparsable update_date");
        NotifyError::TimestampParse {
            build_id: build_id.to_string(),
            value: value.to_string(),
            source,
        }
    })
}

/// Whole days overdue if `update_date` is strictly more than `threshold_days`
/// before `now`, otherwise `None`.
pub fn overdue_days(update_date: NaiveDateTime, now: NaiveDateTime, threshold_days: u32) -> Option<i64> {
    let age = now - update_date;
    if age > Duration::days(i64::from(threshold_days)) {
        Some(age.num_days())
    } else {
        None
    }
}

/// Every build under `config.tag` whose age at `now` exceeds the threshold.
pub async fn collect_overdue<H>(
    hub: &H,
    config: &FilterConfig,
    now: NaiveDateTime,
) -> Result<Vec<BuildRecord>, NotifyError>
where
    H: HubClient + ?Sized,
{
    info!(
        tag = %config.tag,
        project = %config.project,
        threshold_days = config.threshold_days,
        %now,
        "[FILTER] Collecting overdue builds"
    );

    let mut build_ids = hub.list_tagged_builds(&config.tag, &config.project).await?;
    let listed = build_ids.len();
    let mut seen = std::collections::HashSet::new();
    build_ids.retain(|id| seen.insert(id.clone()));

    let mut overdue = Vec::new();
    for build_id in &build_ids {
        let info = hub.get_build(build_id, &config.project).await?;
        let update_date = parse_update_date(build_id, &info.update_date)?;

        match overdue_days(update_date, now, config.threshold_days) {
            Some(days) => {
                debug!(build_id = %build_id, packager = %info.packager, days, "[FILTER] Build is overdue");
                overdue.push(BuildRecord {
                    id: build_id.clone(),
                    packager: info.packager,
                    status: info.status,
                    update_date,
                    releases: info.releases,
                    days_overdue: days,
                });
            }
            None => {
                debug!(build_id = %build_id, %update_date, "[FILTER] Build is within threshold");
            }
        }
    }

    info!(
        listed,
        fetched = build_ids.len(),
        overdue = overdue.len(),
        "[FILTER] Filter pass complete"
    );
    Ok(overdue)
}
