///
/// This module implements the CLI surface of mf-notify: argument parsing and
/// the `run` entrypoint that wires the connection store, the hub client, the
/// mail relay and the notification pipeline together.
///
/// ## How To Use
/// - From the shell: `mf-notify --days 14`. Everything else comes from the
///   environment (see [`RunSettings`]).
/// - Programmatically / from tests: call [`run`] with a constructed [`Cli`].
///
/// ## Output
/// - stdout: one `email sent to <address>` line per notified packager.
/// - stderr: one `failed to notify <packager>: <error>` line per failure, plus logs.
use anyhow::Result;
use clap::Parser;

use crate::hub::MonkeyFarmClient;
use crate::load_config::{require_connection, RunSettings};
use crate::mailer::SmtpMailer;
use crate::pipeline::{run_notifications_with, PipelineConfig};

/// Emails packagers about builds stuck in the testing tag.
#[derive(Parser, Debug)]
#[clap(
    name = "mf-notify",
    version,
    about = "Email packagers about MonkeyFarm builds tagged as testing for too long"
)]
pub struct Cli {
    /// Only report builds older than this many days
    #[clap(long)]
    pub days: u32,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings = RunSettings::from_env()?;
    let profile = require_connection(&settings.config_path, &settings.connection)?;

    let hub = MonkeyFarmClient::connect(&profile, settings.timeout).await?;
    let mailer = SmtpMailer::new(settings.smtp_host.clone(), settings.smtp_port, settings.timeout);
    let config = PipelineConfig::from_settings(&settings, cli.days);
    let now = chrono::Local::now().naive_local();

    // Printed as each message is accepted so a fail-fast abort still reports them.
    let report = run_notifications_with(&hub, &mailer, &config, now, |delivery| {
        println!("email sent to {}", delivery.address);
    })
    .await?;

    for failure in &report.notifications.failed {
        eprintln!("failed to notify {}: {}", failure.packager, failure.error);
    }

    tracing::info!(
        command = "notify",
        overdue_builds = report.overdue_builds(),
        delivered = report.notifications.delivered.len(),
        failed = report.notifications.failed.len(),
        "Notification run complete"
    );

    if !report.notifications.is_success() {
        anyhow::bail!(
            "{} of {} packager notification(s) failed",
            report.notifications.failed.len(),
            report.buckets.len()
        );
    }
    Ok(())
}
