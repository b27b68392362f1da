// Google service-account OAuth: signed JWT assertion exchanged for a bearer token.
use crate::client::http::ensure_success;
use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Google caps it at one hour.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service account key file that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid service account key JSON")
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs the RS256 assertion for `key`, issued at `now` (unix seconds).
pub fn build_assertion(key: &ServiceAccountKey, now: i64) -> Result<String> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("Service account private key is not a valid RSA PEM")?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .context("Failed to sign service account assertion")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    expires_at: i64,
}

/// Where the Sheets client gets its bearer token.
#[derive(Debug)]
pub enum TokenSource {
    /// A pre-issued access token, used as is.
    Static(String),
    ServiceAccount {
        key: ServiceAccountKey,
        cached: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self::ServiceAccount {
            key,
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, exchanging a fresh assertion when needed.
    pub async fn bearer(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount { key, cached } => {
                let mut guard = cached.lock().await;
                let now = chrono::Utc::now().timestamp();
                if let Some(token) = guard.as_ref()
                    && token.expires_at - EXPIRY_MARGIN_SECS > now
                {
                    return Ok(token.value.clone());
                }

                let assertion = build_assertion(key, now)?;
                log::debug!("Requesting access token for {}", key.client_email);
                let response = http
                    .post(&key.token_uri)
                    .form(&[
                        ("grant_type", JWT_BEARER_GRANT),
                        ("assertion", assertion.as_str()),
                    ])
                    .send()
                    .await
                    .context("Token request failed")?;
                let response = ensure_success(response, "Token request").await?;
                let token: TokenResponse = response
                    .json()
                    .await
                    .context("Token response was not valid JSON")?;

                let fresh = CachedToken {
                    value: token.access_token,
                    expires_at: now + token.expires_in.unwrap_or(ASSERTION_TTL_SECS),
                };
                let value = fresh.value.clone();
                *guard = Some(fresh);
                Ok(value)
            }
        }
    }
}
