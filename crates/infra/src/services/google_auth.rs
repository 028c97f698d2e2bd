use crate::system::ISys;
use anyhow::anyhow;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

// https://developers.google.com/identity/protocols/oauth2/web-server#offline
const TOKEN_REFRESH_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const ONE_MINUTE_IN_MILLIS: i64 = 1000 * 60;

/// Bearer token used by the push gateway and the document mirror
#[async_trait::async_trait]
pub trait IAccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    /// Access token expires in specified in seconds
    pub expires_in: i64,
}

/// Exchanges long lived credentials for a fresh `AccessToken`
#[async_trait::async_trait]
pub trait ITokenRefresher: Send + Sync {
    async fn refresh(&self) -> anyhow::Result<AccessToken>;
}

#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Refresh token grant against the Google OAuth endpoint
pub struct OAuthRefresher {
    client: Client,
    credentials: GoogleCredentials,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    access_token: String,
    expires_in: i64,
}

impl OAuthRefresher {
    pub fn new(client: Client, credentials: GoogleCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait::async_trait]
impl ITokenRefresher for OAuthRefresher {
    async fn refresh(&self) -> anyhow::Result<AccessToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let res = self
            .client
            .post(TOKEN_REFRESH_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("[Network Error] Google token refresh error. Error message: {:?}", e);
                anyhow::Error::new(e)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let message = res.text().await.unwrap_or_default();
            return Err(anyhow!(
                "[Unexpected Response] Google token refresh returned status {}: {}",
                status,
                message
            ));
        }
        let res = res.json::<RefreshTokenResponse>().await?;
        Ok(AccessToken {
            access_token: res.access_token,
            expires_in: res.expires_in,
        })
    }
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    access_token: String,
    expires_ts: i64,
}

/// Hands out the cached access token and renews it shortly before it expires.
/// Concurrent callers wait for a single refresh.
pub struct GoogleAuthProvider {
    refresher: Box<dyn ITokenRefresher>,
    cached: Mutex<Option<CachedAccessToken>>,
    sys: Arc<dyn ISys>,
}

impl GoogleAuthProvider {
    pub fn new(refresher: Box<dyn ITokenRefresher>, sys: Arc<dyn ISys>) -> Self {
        Self {
            refresher,
            cached: Mutex::new(None),
            sys,
        }
    }
}

#[async_trait::async_trait]
impl IAccessTokenProvider for GoogleAuthProvider {
    async fn access_token(&self) -> anyhow::Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            // Still valid for at least one minute
            if self.sys.get_timestamp_millis() + ONE_MINUTE_IN_MILLIS <= token.expires_ts {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.refresher.refresh().await?;
        let expires_ts = self.sys.get_timestamp_millis() + token.expires_in * 1000;
        info!("Google access token renewed, valid for {} seconds", token.expires_in);
        *cached = Some(CachedAccessToken {
            access_token: token.access_token.clone(),
            expires_ts,
        });
        Ok(token.access_token)
    }
}
