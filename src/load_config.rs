/// `load_config` module: resolves the hub connection profile and the run settings.
///
/// Two inputs feed a run besides the `--days` flag:
/// - the connection store (`~/.mf.conf` by default), an INI file with
///   `[connection:<name>]` sections each carrying `user`, `api_key` and `url`;
/// - environment variables (optionally from a `.env` file) that replace what
///   used to be process-wide constants: project, tag, mail relay, timeouts.
///
/// # Errors
/// Everything here returns [`NotifyError`]; nothing touches the network, so a
/// broken profile always aborts the run before the first remote call.
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::{debug, error, info};

use crate::contract::ConnectionProfile;
use crate::error::NotifyError;
use crate::notify::FailurePolicy;

pub const DEFAULT_CONNECTION: &str = "default";
pub const DEFAULT_PROJECT: &str = "ius";
pub const DEFAULT_TAG: &str = "testing";
pub const DEFAULT_SMTP_HOST: &str = "localhost";
pub const DEFAULT_SMTP_PORT: u16 = 25;
pub const DEFAULT_FROM: &str = "monkeyfarm@localhost";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const SECTION_PREFIX: &str = "connection:";
const REQUIRED_FIELDS: [&str; 3] = ["user", "api_key", "url"];

/// Outcome of looking a connection up by name.
///
/// A missing file and a missing section are both "no profile", but callers
/// report them differently, so neither is folded into an error here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionLookup {
    Found(ConnectionProfile),
    NotFound,
    FileMissing,
}

/// Looks up `connection:<name>` in the store at `path`.
///
/// An empty name means [`DEFAULT_CONNECTION`]. Every connection section in
/// the file is validated, not only the requested one: a store with any
/// incomplete connection fails with [`NotifyError::MissingField`].
pub fn resolve_connection<P: AsRef<Path>>(
    path: P,
    name: &str,
) -> Result<ConnectionLookup, NotifyError> {
    let path_ref = path.as_ref();
    let name = if name.trim().is_empty() {
        DEFAULT_CONNECTION
    } else {
        name.trim()
    };
    info!(config_path = ?path_ref, connection = name, "Resolving connection profile");

    if !path_ref.exists() {
        error!(config_path = ?path_ref, "Connection store not found");
        return Ok(ConnectionLookup::FileMissing);
    }

    let store = Ini::load_from_file(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse connection store");
        NotifyError::ConfigParse {
            path: path_ref.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let mut found = None;
    for (section, props) in store.iter() {
        let Some(section) = section else { continue };
        let Some(conn_name) = section.strip_prefix(SECTION_PREFIX) else {
            continue;
        };

        for field in REQUIRED_FIELDS {
            if props.get(field).map_or(true, |v| v.trim().is_empty()) {
                error!(section, field, "Connection section is incomplete");
                return Err(NotifyError::MissingField {
                    section: section.to_string(),
                    field,
                });
            }
        }

        if conn_name == name && found.is_none() {
            debug!(section, "Matched connection section");
            found = Some(ConnectionProfile {
                user: props.get("user").unwrap_or_default().trim().to_string(),
                api_key: props.get("api_key").unwrap_or_default().trim().to_string(),
                url: props.get("url").unwrap_or_default().trim().to_string(),
            });
        }
    }

    match found {
        Some(profile) => {
            info!(connection = name, user = %profile.user, url = %profile.url, "Connection profile loaded");
            Ok(ConnectionLookup::Found(profile))
        }
        None => {
            info!(connection = name, "No matching connection section");
            Ok(ConnectionLookup::NotFound)
        }
    }
}

/// Like [`resolve_connection`] but treats both "no profile" outcomes as fatal.
pub fn require_connection<P: AsRef<Path>>(
    path: P,
    name: &str,
) -> Result<ConnectionProfile, NotifyError> {
    let path_ref = path.as_ref();
    match resolve_connection(path_ref, name)? {
        ConnectionLookup::Found(profile) => Ok(profile),
        ConnectionLookup::FileMissing => Err(NotifyError::ConfigNotFound(path_ref.to_path_buf())),
        ConnectionLookup::NotFound => Err(NotifyError::NotFound {
            kind: "connection",
            id: if name.trim().is_empty() {
                DEFAULT_CONNECTION.to_string()
            } else {
                name.trim().to_string()
            },
        }),
    }
}

/// Per-run parameters that are not part of the connection profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub config_path: PathBuf,
    pub connection: String,
    pub project: String,
    pub tag: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    /// Bound on every HTTP request and every SMTP session.
    pub timeout: Duration,
    pub policy: FailurePolicy,
}

impl RunSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for unset
    /// or blank keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NotifyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config_path = match get("MF_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => default_config_path()?,
        };

        let smtp_port = match get("MF_SMTP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| NotifyError::Settings {
                name: "MF_SMTP_PORT",
                message: format!("{raw:?}: {e}"),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let timeout_secs = match get("MF_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(NotifyError::Settings {
                        name: "MF_TIMEOUT_SECS",
                        message: format!("{raw:?} is not a positive number of seconds"),
                    })
                }
                Ok(secs) => secs,
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let policy = match get("MF_FAIL_FAST") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => FailurePolicy::FailFast,
                "0" | "false" | "no" => FailurePolicy::CollectAndContinue,
                other => {
                    return Err(NotifyError::Settings {
                        name: "MF_FAIL_FAST",
                        message: format!("expected true or false, got {other:?}"),
                    })
                }
            },
            None => FailurePolicy::CollectAndContinue,
        };

        let settings = RunSettings {
            config_path,
            connection: get("MF_CONNECTION").unwrap_or_else(|| DEFAULT_CONNECTION.to_string()),
            project: get("MF_PROJECT").unwrap_or_else(|| DEFAULT_PROJECT.to_string()),
            tag: get("MF_TAG").unwrap_or_else(|| DEFAULT_TAG.to_string()),
            smtp_host: get("MF_SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port,
            from_address: get("MF_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            policy,
        };
        settings.trace_loaded();
        Ok(settings)
    }

    pub fn trace_loaded(&self) {
        info!(
            config_path = %self.config_path.display(),
            connection = %self.connection,
            project = %self.project,
            tag = %self.tag,
            smtp = %format!("{}:{}", self.smtp_host, self.smtp_port),
            timeout_secs = self.timeout.as_secs(),
            policy = ?self.policy,
            "Loaded run settings"
        );
        debug!(?self, "Run settings (full debug)");
    }
}

fn default_config_path() -> Result<PathBuf, NotifyError> {
    dirs::home_dir()
        .map(|home| home.join(".mf.conf"))
        .ok_or_else(|| NotifyError::Settings {
            name: "MF_CONFIG",
            message: "unset and no home directory to default to".to_string(),
        })
}
