//! Error types for mf-notify

use std::path::PathBuf;

use thiserror::Error;

/// Every failure a notification run can hit.
///
/// All of them are fatal to the run except the per-packager ones
/// (`NotFound` for a user, `MailTransport`, `InvalidAddress`), which the
/// notifier may record and move past depending on the failure policy.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The connection store does not exist at its expected path
    #[error("{} not found", .0.display())]
    ConfigNotFound(PathBuf),

    /// The connection store exists but could not be read or parsed
    #[error("Failed to parse config file {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// A connection section lacks one of user, api_key or url
    #[error("Missing '{field}' setting in {section}")]
    MissingField { section: String, field: &'static str },

    /// An environment-supplied run setting is malformed
    #[error("Invalid setting {name}: {message}")]
    Settings { name: &'static str, message: String },

    /// The remote service rejected our credentials
    #[error("Authentication rejected for user {user}: {message}")]
    Auth { user: String, message: String },

    /// A connection's `url` cannot serve as the hub base URL
    #[error("Invalid hub URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Non-success response, or the request never completed
    #[error("Remote call failed ({status}): {message}")]
    Remote { status: String, message: String },

    /// Unknown build, tag or user
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The response body did not carry the fields we consume
    #[error("Unexpected payload from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// A build's update_date did not match `YYYY-MM-DD HH:MM:SS`
    #[error("Failed to parse update_date {value:?} of build {build_id}: {source}")]
    TimestampParse {
        build_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The mail relay could not be reached or refused the message
    #[error("Mail transport failed: {0}")]
    MailTransport(String),

    /// A sender or recipient address is not a valid mailbox
    #[error("Invalid email address {address:?}: {message}")]
    InvalidAddress { address: String, message: String },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        let status = err
            .status()
            .map(|s| s.as_u16().to_string())
            .unwrap_or_else(|| "transport".to_string());
        NotifyError::Remote {
            status,
            message: err.to_string(),
        }
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        NotifyError::MailTransport(err.to_string())
    }
}
