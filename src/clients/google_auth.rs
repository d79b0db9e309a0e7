use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::BackendError;

const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Authorized-user credentials as written by Google's installed-app flow.
/// Unknown keys are carried through so saving never loses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl StoredToken {
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let content = fs::read_to_string(path).map_err(|e| {
            BackendError::calendar(format!("cannot read token file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| BackendError::calendar(format!("invalid token file {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), BackendError> {
        let body = serde_json::to_string(self).map_err(|e| BackendError::calendar(e.to_string()))?;
        fs::write(path, body).map_err(|e| BackendError::calendar(e.to_string()))
    }

    /// Expired, or about to be within the next minute.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .map(|expiry| expiry <= now + Duration::seconds(60))
            .unwrap_or(false)
    }

    pub async fn refresh(&self, client: &reqwest::Client) -> Result<Self, BackendError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            self.refresh_token.as_deref(),
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
        ) else {
            return Err(BackendError::calendar(
                "token expired and cannot be refreshed (missing refresh_token or client credentials)",
            ));
        };

        let token_uri = self.token_uri.as_deref().unwrap_or(OAUTH_TOKEN_URL);
        let resp = client
            .post(token_uri)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(BackendError::calendar(format!(
                "Token refresh failed: HTTP {}",
                resp.status()
            )));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::calendar(e.to_string()))?;

        let mut refreshed = self.clone();
        refreshed.token = body.access_token;
        refreshed.expiry = Some(Utc::now() + Duration::seconds(body.expires_in));
        if let Some(rotated) = body.refresh_token {
            refreshed.refresh_token = Some(rotated);
        }
        Ok(refreshed)
    }
}

/// Hands out a valid access token, refreshing and re-saving it on expiry.
pub struct TokenSource {
    path: PathBuf,
    current: tokio::sync::Mutex<StoredToken>,
}

impl TokenSource {
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        let token = StoredToken::load(&path)?;
        Ok(Self {
            path,
            current: tokio::sync::Mutex::new(token),
        })
    }

    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, BackendError> {
        let mut current = self.current.lock().await;
        if current.is_expired(Utc::now()) {
            debug!(path = %self.path.display(), "access token expired, refreshing");
            let refreshed = current.refresh(client).await?;
            refreshed.save(&self.path)?;
            info!("refreshed Google access token");
            *current = refreshed;
        }
        Ok(current.token.clone())
    }
}
