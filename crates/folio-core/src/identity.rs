//! Caller identity
//!
//! Every mutation asks an [`IdentityProvider`] who is calling before it
//! touches a store. No caller means the mutation is refused.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

/// Source of the current caller identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated caller, or None when nobody is signed in
    async fn current_caller(&self) -> Option<Caller>;
}

/// A fixed identity
///
/// Used for a local operator, and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    caller: Option<Caller>,
}

impl StaticIdentity {
    pub fn anonymous() -> Self {
        Self { caller: None }
    }

    pub fn signed_in(caller: Caller) -> Self {
        Self {
            caller: Some(caller),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_caller(&self) -> Option<Caller> {
        self.caller.clone()
    }
}

/// Identity backed by a remote auth session
///
/// Resolves the access token against `GET {remote_url}/auth/v1/user` on each
/// call. A missing token, a rejected token and a network failure all mean
/// nobody is signed in.
pub struct SessionIdentity {
    http: Client,
    user_endpoint: String,
    api_key: Option<String>,
    access_token: Option<String>,
}

impl SessionIdentity {
    pub fn new(base_url: &str, api_key: Option<String>, access_token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            user_endpoint: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            api_key,
            access_token,
        }
    }

    /// Build from configuration; None when no remote URL is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.remote_url.as_deref()?;
        Some(Self::new(
            url,
            config.remote_key.clone(),
            config.access_token.clone(),
        ))
    }

    async fn fetch_user(&self, token: &str) -> Result<Caller, reqwest::Error> {
        let mut request = self.http.get(&self.user_endpoint).bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        request.send().await?.error_for_status()?.json().await
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_caller(&self) -> Option<Caller> {
        let Some(token) = self.access_token.as_deref() else {
            debug!("No access token, no caller");
            return None;
        };

        match self.fetch_user(token).await {
            Ok(caller) => Some(caller),
            Err(e) => {
                warn!(error = %e, "Could not resolve session user");
                None
            }
        }
    }
}

/// Pick the identity provider for a configuration
///
/// A remote session wins when a remote URL and access token are set.
/// Otherwise the configured operator is the caller, and with neither the
/// caller is anonymous.
pub fn provider_from_config(config: &Config) -> Box<dyn IdentityProvider> {
    if config.access_token.is_some() {
        if let Some(session) = SessionIdentity::from_config(config) {
            return Box::new(session);
        }
    }
    match &config.operator {
        Some(name) => Box::new(StaticIdentity::signed_in(Caller::new(name.clone()))),
        None => Box::new(StaticIdentity::anonymous()),
    }
}
