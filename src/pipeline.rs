//! One notification run: filter → group → notify.
//!
//! Data only flows forward. Any error before the notification step aborts the
//! run with nothing sent; errors during notification follow the configured
//! [`FailurePolicy`].
//!
//! # Navigation
//! - Entrypoint: [`run_notifications`], or [`run_notifications_with`] to
//!   observe deliveries as they happen
//! - Inputs: [`PipelineConfig`]; output: [`RunReport`]

use chrono::NaiveDateTime;
use tracing::info;

use crate::contract::{HubClient, Mailer};
use crate::error::NotifyError;
use crate::filter::{collect_overdue, FilterConfig};
use crate::grouping::{group_by_packager, PackagerBuckets};
use crate::load_config::RunSettings;
use crate::notify::{notify_packagers, Delivery, FailurePolicy, MessageTemplate, NotifyReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub filter: FilterConfig,
    pub from_address: String,
    pub policy: FailurePolicy,
}

impl PipelineConfig {
    pub fn from_settings(settings: &RunSettings, threshold_days: u32) -> Self {
        PipelineConfig {
            filter: FilterConfig {
                tag: settings.tag.clone(),
                project: settings.project.clone(),
                threshold_days,
            },
            from_address: settings.from_address.clone(),
            policy: settings.policy,
        }
    }

    fn template(&self) -> MessageTemplate {
        MessageTemplate {
            from_address: self.from_address.clone(),
            tag: self.filter.tag.clone(),
            threshold_days: self.filter.threshold_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub buckets: PackagerBuckets,
    pub notifications: NotifyReport,
}

impl RunReport {
    pub fn overdue_builds(&self) -> usize {
        self.buckets.build_count()
    }
}

pub async fn run_notifications<H, M>(
    hub: &H,
    mailer: &M,
    config: &PipelineConfig,
    now: NaiveDateTime,
) -> Result<RunReport, NotifyError>
where
    H: HubClient + ?Sized,
    M: Mailer + ?Sized,
{
    run_notifications_with(hub, mailer, config, now, |_| {}).await
}

/// [`run_notifications`] with a hook fired as each packager's message is accepted.
pub async fn run_notifications_with<H, M, F>(
    hub: &H,
    mailer: &M,
    config: &PipelineConfig,
    now: NaiveDateTime,
    on_delivery: F,
) -> Result<RunReport, NotifyError>
where
    H: HubClient + ?Sized,
    M: Mailer + ?Sized,
    F: FnMut(&Delivery),
{
    info!(?config, "[RUN] Starting notification run");

    let overdue = collect_overdue(hub, &config.filter, now).await?;
    let buckets = group_by_packager(overdue);
    info!(
        packagers = buckets.len(),
        builds = buckets.build_count(),
        "[RUN] Grouped overdue builds by packager"
    );

    let notifications = notify_packagers(
        hub,
        mailer,
        &buckets,
        &config.template(),
        config.policy,
        on_delivery,
    )
    .await?;

    Ok(RunReport {
        buckets,
        notifications,
    })
}
