//! Notifier: one plain-text email per packager listing their overdue builds.
//!
//! For each bucket the packager's address is resolved through the hub, the
//! message is composed, and a [`Mailer`] submits it. What happens when one
//! packager fails is decided by [`FailurePolicy`].

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::contract::{BuildRecord, HubClient, Mailer, NotificationEmail};
use crate::error::NotifyError;
use crate::filter::UPDATE_DATE_FORMAT;
use crate::grouping::PackagerBuckets;

/// What to do when resolving or mailing one packager fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure; later packagers are not notified.
    FailFast,
    /// Record the failure and carry on with the remaining packagers.
    #[default]
    CollectAndContinue,
}

/// Fixed parts of every message in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub from_address: String,
    pub tag: String,
    pub threshold_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub packager: String,
    pub address: String,
    pub builds: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub packager: String,
    pub error: String,
}

/// Outcome of a notification pass, one entry per packager attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: Vec<Delivery>,
    pub failed: Vec<DeliveryFailure>,
}

impl NotifyReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn subject_line(tag: &str, threshold_days: u32) -> String {
    format!("[MonkeyFarm] build tag as {tag} over {threshold_days} days")
}

/// One paragraph per build, in bucket (build id) order.
pub fn format_body<'a, I>(builds: I) -> String
where
    I: IntoIterator<Item = &'a BuildRecord>,
{
    let mut body = String::new();
    for build in builds {
        body.push_str(&format!(
            "Build: {}\nDate: {}\nStatus: {}\nReleases: {}\nDays Tagged: {}\n\n",
            build.id,
            build.update_date.format(UPDATE_DATE_FORMAT),
            build.status,
            build.releases.join(", "),
            build.days_overdue,
        ));
    }
    body
}

pub fn compose_email(
    template: &MessageTemplate,
    to_address: &str,
    builds: &BTreeMap<String, BuildRecord>,
) -> NotificationEmail {
    NotificationEmail {
        from_address: template.from_address.clone(),
        to_address: to_address.to_string(),
        subject: subject_line(&template.tag, template.threshold_days),
        body: format_body(builds.values()),
    }
}

/// Notifies every packager in `buckets`, one message each, calling
/// `on_delivery` right after each accepted message.
///
/// Under [`FailurePolicy::FailFast`] the first failure is returned as the
/// error and the partial report is discarded, so `on_delivery` is the only
/// record of what was sent before it. Under
/// [`FailurePolicy::CollectAndContinue`] this only returns `Ok`, with failures
/// listed in the report.
pub async fn notify_packagers<H, M, F>(
    hub: &H,
    mailer: &M,
    buckets: &PackagerBuckets,
    template: &MessageTemplate,
    policy: FailurePolicy,
    mut on_delivery: F,
) -> Result<NotifyReport, NotifyError>
where
    H: HubClient + ?Sized,
    M: Mailer + ?Sized,
    F: FnMut(&Delivery),
{
    info!(packagers = buckets.len(), ?policy, "[NOTIFY] Starting notifications");
    let mut report = NotifyReport::default();

    for (packager, builds) in buckets {
        match notify_one(hub, mailer, packager, builds, template).await {
            Ok(address) => {
                info!(packager = %packager, %address, builds = builds.len(), "[NOTIFY] Email sent");
                let delivery = Delivery {
                    packager: packager.clone(),
                    address,
                    builds: builds.len(),
                };
                on_delivery(&delivery);
                report.delivered.push(delivery);
            }
            Err(e) => match policy {
                FailurePolicy::FailFast => {
                    error!(packager = %packager, error = %e, "[NOTIFY][ERROR] Aborting remaining notifications");
                    return Err(e);
                }
                FailurePolicy::CollectAndContinue => {
                    warn!(packager = %packager, error = %e, "[NOTIFY] Notification failed, continuing");
                    report.failed.push(DeliveryFailure {
                        packager: packager.clone(),
                        error: e.to_string(),
                    });
                }
            },
        }
    }

    info!(
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "[NOTIFY] Notifications complete"
    );
    Ok(report)
}

async fn notify_one<H, M>(
    hub: &H,
    mailer: &M,
    packager: &str,
    builds: &BTreeMap<String, BuildRecord>,
    template: &MessageTemplate,
) -> Result<String, NotifyError>
where
    H: HubClient + ?Sized,
    M: Mailer + ?Sized,
{
    let address = hub.get_user_email(packager).await?;
    let email = compose_email(template, &address, builds);
    mailer.send(&email).await?;
    Ok(address)
}
