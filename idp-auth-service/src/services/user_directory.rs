//! Client for the user directory service that owns profile records.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use crate::models::{NewDirectoryUser, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("user profile not found")]
    NotFound,

    #[error("user directory unavailable: {0}")]
    Unavailable(String),

    #[error("invalid user directory response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Profile for an IdP subject id.
    async fn get_user(&self, subject_id: &str) -> Result<UserProfile, DirectoryError>;

    /// Create the profile for a newly confirmed account.
    async fn register_user(&self, user: &NewDirectoryUser) -> Result<(), DirectoryError>;
}

/// Responses come either bare or wrapped in `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileEnvelope {
    Wrapped { data: UserProfile },
    Bare(UserProfile),
}

impl ProfileEnvelope {
    fn into_profile(self) -> UserProfile {
        match self {
            ProfileEnvelope::Wrapped { data } => data,
            ProfileEnvelope::Bare(profile) => profile,
        }
    }
}

#[derive(Clone)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpUserDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("user directory URL cannot be a base: {}", base_url);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn users_url(&self, subject_id: Option<&str>) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                DirectoryError::InvalidResponse("user directory URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty().extend(["v1", "users"]);
            if let Some(id) = subject_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

fn transport_error(err: reqwest::Error) -> DirectoryError {
    if err.is_timeout() {
        DirectoryError::Unavailable("request timed out".to_string())
    } else {
        DirectoryError::Unavailable(err.to_string())
    }
}

fn status_error(status: StatusCode) -> DirectoryError {
    if status == StatusCode::NOT_FOUND {
        DirectoryError::NotFound
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        DirectoryError::Unavailable(format!("status {}", status))
    } else {
        DirectoryError::InvalidResponse(format!("status {}", status))
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    #[instrument(skip(self))]
    async fn get_user(&self, subject_id: &str) -> Result<UserProfile, DirectoryError> {
        let url = self.users_url(Some(subject_id))?;

        let response = self
            .client
            .traced_get(url.as_str())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }

        let envelope: ProfileEnvelope = response
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

        Ok(envelope.into_profile())
    }

    #[instrument(skip(self, user), fields(sub = %user.sub))]
    async fn register_user(&self, user: &NewDirectoryUser) -> Result<(), DirectoryError> {
        let url = self.users_url(None)?;

        let response = self
            .client
            .traced_post(url.as_str())
            .json(user)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            tracing::info!("User already present in directory");
            return Ok(());
        }
        if !status.is_success() {
            return Err(status_error(status));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct MockDirectoryState {
    profiles: HashMap<String, UserProfile>,
    registered: Vec<NewDirectoryUser>,
    get_failure: Option<DirectoryError>,
    register_failure: Option<DirectoryError>,
}

/// In-memory user directory. Registered users become retrievable profiles.
#[derive(Debug, Default)]
pub struct MockUserDirectory {
    state: Mutex<MockDirectoryState>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_profile(&self, subject_id: &str, profile: UserProfile) {
        self.lock().profiles.insert(subject_id.to_string(), profile);
    }

    pub fn fail_get_user(&self, error: DirectoryError) {
        self.lock().get_failure = Some(error);
    }

    pub fn fail_register_user(&self, error: DirectoryError) {
        self.lock().register_failure = Some(error);
    }

    pub fn registered(&self) -> Vec<NewDirectoryUser> {
        self.lock().registered.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockDirectoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn get_user(&self, subject_id: &str) -> Result<UserProfile, DirectoryError> {
        let state = self.lock();
        if let Some(error) = &state.get_failure {
            return Err(error.clone());
        }
        state
            .profiles
            .get(subject_id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn register_user(&self, user: &NewDirectoryUser) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        if let Some(error) = &state.register_failure {
            return Err(error.clone());
        }

        let id = format!("dir-{}", state.registered.len() + 1);
        state.registered.push(user.clone());
        state.profiles.insert(
            user.sub.clone(),
            UserProfile {
                id,
                sub: Some(user.sub.clone()),
                email: user.email.clone(),
                phone_number: user.phone_number.clone(),
                username: user.username.clone(),
                role: Some(user.role),
            },
        );
        Ok(())
    }
}
