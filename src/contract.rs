//! # contract: data model and the two outbound seams of a notification run
//!
//! A run talks to exactly two things outside the process: the MonkeyFarm hub
//! (tags, builds, users) and a mail relay. Each is a trait here so the
//! filter and notifier can be driven by the real clients in [`crate::hub`] and
//! [`crate::mailer`], or by `mockall` mocks in tests.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; with the `test-export-mocks`
//!   feature (on by default) integration tests can use `MockHubClient` and
//!   `MockMailer` directly.
//!
//! ## Types
//! - [`ConnectionProfile`]: credentials for one named hub connection.
//! - [`BuildInfo`]: what the hub reports for one build.
//! - [`BuildRecord`]: a build that passed the age filter.
//! - [`NotificationEmail`]: one outbound message, built right before dispatch.

use async_trait::async_trait;
use chrono::NaiveDateTime;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::NotifyError;

/// User, API key and service URL for one `connection:<name>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub user: String,
    pub api_key: String,
    pub url: String,
}

/// Metadata the hub returns for a single build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// The user responsible for the build (`user_label` on the wire).
    pub packager: String,
    /// The build status (`status_label` on the wire).
    pub status: String,
    /// Raw `update_date`, parsed by the filter rather than the client.
    pub update_date: String,
    pub releases: Vec<String>,
}

/// A build older than the threshold, ready to be reported to its packager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub id: String,
    pub packager: String,
    pub status: String,
    pub update_date: NaiveDateTime,
    pub releases: Vec<String>,
    /// Whole days since `update_date`, floored.
    pub days_overdue: i64,
}

/// A single plain-text message addressed to one packager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEmail {
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    pub body: String,
}

/// Typed access to the MonkeyFarm hub.
///
/// Implementors hold an authenticated session; every call is one blocking
/// round trip from the caller's point of view and is never retried.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Build identifiers currently carrying `tag` in `project`, in hub order.
    async fn list_tagged_builds(
        &self,
        tag: &str,
        project: &str,
    ) -> Result<Vec<String>, NotifyError>;

    /// Packager, status, last update and releases for one build.
    async fn get_build(&self, build_id: &str, project: &str) -> Result<BuildInfo, NotifyError>;

    /// Email address on file for a hub user.
    async fn get_user_email(&self, user_id: &str) -> Result<String, NotifyError>;
}

/// Delivers composed notifications.
///
/// Implementors must not retry: a failed submission surfaces to the caller,
/// which decides whether the run continues.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &NotificationEmail) -> Result<(), NotifyError>;
}
