#![doc = "MonkeyFarm hub client: the HTTP implementation of the `HubClient` seam."]
//
//! # Hub client
//!
//! [`MonkeyFarmClient`] wraps the hub's JSON endpoints behind the
//! [`HubClient`] trait used by the filter and notifier.
//!
//! - Construct with [`MonkeyFarmClient::connect`] from a resolved
//!   [`ConnectionProfile`]; this authenticates before returning.
//! - Every request carries the credentials as `_login` / `_api_key` query
//!   parameters and is bounded by the configured timeout.
//! - Responses are `{"data": {...}}` envelopes; only the fields listed on the
//!   payload structs below are consumed.
//!
//! Status mapping: 2xx decodes the body, 401/403 is [`NotifyError::Auth`],
//! 404 on a build or user is [`NotifyError::NotFound`], anything else
//! (including an unknown tag) is [`NotifyError::Remote`].
//! Nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::contract::{BuildInfo, ConnectionProfile, HubClient};
use crate::error::NotifyError;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct TagData {
    tag: TagPayload,
}

#[derive(Debug, Deserialize)]
struct TagPayload {
    #[serde(default)]
    builds: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BuildData {
    build: BuildPayload,
}

#[derive(Debug, Deserialize)]
struct BuildPayload {
    user_label: String,
    status_label: String,
    update_date: String,
    #[serde(default)]
    releases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    email: String,
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, NotifyError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map(|env| env.data)
        .map_err(|e| {
            error!(endpoint, error = %e, "Failed to decode hub payload");
            NotifyError::Decode {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        })
}

/// Build ids from a tag lookup body.
pub fn decode_tag_builds(body: &str) -> Result<Vec<String>, NotifyError> {
    decode::<TagData>("tag", body).map(|d| d.tag.builds)
}

/// Build metadata from a build lookup body.
pub fn decode_build(body: &str) -> Result<BuildInfo, NotifyError> {
    decode::<BuildData>("build", body).map(|d| BuildInfo {
        packager: d.build.user_label,
        status: d.build.status_label,
        update_date: d.build.update_date,
        releases: d.build.releases,
    })
}

/// Email address from a user lookup body.
pub fn decode_user_email(body: &str) -> Result<String, NotifyError> {
    let email = decode::<UserData>("user", body)?.user.email;
    if email.trim().is_empty() {
        return Err(NotifyError::Decode {
            endpoint: "user".to_string(),
            message: "email is empty".to_string(),
        });
    }
    Ok(email)
}

#[derive(Clone)]
struct Credentials {
    user: String,
    api_key: String,
}

pub struct MonkeyFarmClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl MonkeyFarmClient {
    /// An unauthenticated client for `url`; call [`authenticate`](Self::authenticate) next.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let base_url = Url::parse(url.trim()).map_err(|e| NotifyError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(NotifyError::InvalidUrl {
                url: url.to_string(),
                message: "not a base URL".to_string(),
            });
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(MonkeyFarmClient {
            http,
            base_url,
            credentials: None,
        })
    }

    /// Builds a client from a profile and authenticates it.
    pub async fn connect(profile: &ConnectionProfile, timeout: Duration) -> Result<Self, NotifyError> {
        let mut client = Self::new(&profile.url, timeout)?;
        client.authenticate(&profile.user, &profile.api_key).await?;
        Ok(client)
    }

    /// Attaches credentials to this client and checks them against the hub.
    ///
    /// On rejection the credentials are dropped again and `Auth` is returned.
    pub async fn authenticate(&mut self, user: &str, api_key: &str) -> Result<(), NotifyError> {
        info!(user, url = %self.base_url(), "[HUB] Authenticating");
        self.credentials = Some(Credentials {
            user: user.to_string(),
            api_key: api_key.to_string(),
        });

        match self.get("user", user, &[]).await {
            Ok(_) => {
                info!(user, "[HUB] Authenticated");
                Ok(())
            }
            Err(e) => {
                self.credentials = None;
                error!(user, error = %e, "[HUB][ERROR] Authentication failed");
                match e {
                    NotifyError::NotFound { .. } => Err(NotifyError::Auth {
                        user: user.to_string(),
                        message: "user is unknown to the hub".to_string(),
                    }),
                    other => Err(other),
                }
            }
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/{kind}/{id}.json`, with `id` escaped as a single path segment.
    fn resource_url(&self, kind: &str, id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(kind).push(&format!("{id}.json"));
        }
        url
    }

    async fn get(
        &self,
        kind: &'static str,
        id: &str,
        query: &[(&str, &str)],
    ) -> Result<String, NotifyError> {
        let url = self.resource_url(kind, id);
        debug!(%url, "[HUB] GET");

        let mut request = self.http.get(url.clone()).query(query);
        if let Some(creds) = &self.credentials {
            request = request.query(&[("_login", &creds.user), ("_api_key", &creds.api_key)]);
        }

        let response = request.send().await.map_err(|e| {
            error!(%url, error = %e, "[HUB][ERROR] Request failed");
            NotifyError::from(e)
        })?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        error!(%url, status = status.as_u16(), "[HUB][ERROR] Non-success response");
        match status {
            StatusCode::NOT_FOUND => Err(NotifyError::NotFound {
                kind,
                id: id.to_string(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(NotifyError::Auth {
                user: self
                    .credentials
                    .as_ref()
                    .map(|c| c.user.clone())
                    .unwrap_or_default(),
                message: format!("{status}: {}", body.trim()),
            }),
            _ => Err(NotifyError::Remote {
                status: status.as_u16().to_string(),
                message: body.trim().to_string(),
            }),
        }
    }
}

#[async_trait]
impl HubClient for MonkeyFarmClient {
    async fn list_tagged_builds(&self, tag: &str, project: &str) -> Result<Vec<String>, NotifyError> {
        // An unknown tag is a failed listing, not a missing build or user.
        let body = self
            .get("tag", tag, &[("project_label", project)])
            .await
            .map_err(|e| match e {
                NotifyError::NotFound { kind, id } => NotifyError::Remote {
                    status: StatusCode::NOT_FOUND.as_u16().to_string(),
                    message: format!("{kind} {id} not found"),
                },
                other => other,
            })?;
        let builds = decode_tag_builds(&body)?;
        info!(tag, project, builds = builds.len(), "[HUB] Listed tagged builds");
        Ok(builds)
    }

    async fn get_build(&self, build_id: &str, project: &str) -> Result<BuildInfo, NotifyError> {
        let body = self
            .get("build", build_id, &[("project_label", project)])
            .await?;
        let build = decode_build(&body)?;
        debug!(build_id, packager = %build.packager, "[HUB] Fetched build");
        Ok(build)
    }

    async fn get_user_email(&self, user_id: &str) -> Result<String, NotifyError> {
        let body = self.get("user", user_id, &[]).await?;
        decode_user_email(&body)
    }
}
