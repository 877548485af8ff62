//! Google Sheets backed [`TableSource`].
//!
//! Authorization follows the service-account flow: a short-lived RS256 JWT signed
//! with the account's private key is exchanged at the key's `token_uri` for a bearer
//! token. The token is reused until a minute before it expires.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use log::{debug, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use crate::error::{ConnectionError, GatewayError};
use crate::gateway::TableSource;

/// Environment variable holding the service-account key as inline JSON
pub const SERVICE_ACCOUNT_ENV: &str = "GCP_SERVICE_ACCOUNT";

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a service-account key file the portal needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, ConnectionError> {
        serde_json::from_str(json)
            .map_err(|e| ConnectionError::Credentials(format!("invalid service-account key: {}", e)))
    }

    /// Load the key from [`SERVICE_ACCOUNT_ENV`] when set, otherwise from a file
    pub fn load(credentials_file: &Path) -> Result<Self, ConnectionError> {
        let inline = std::env::var(SERVICE_ACCOUNT_ENV).ok();
        Self::resolve(inline.as_deref(), credentials_file)
    }

    /// Inline JSON wins over the credential file
    pub fn resolve(inline: Option<&str>, credentials_file: &Path) -> Result<Self, ConnectionError> {
        if let Some(json) = inline.filter(|s| !s.trim().is_empty()) {
            debug!("using service-account key from {}", SERVICE_ACCOUNT_ENV);
            return Self::from_json(json);
        }

        let json = std::fs::read_to_string(credentials_file).map_err(|e| {
            ConnectionError::Credentials(format!(
                "cannot read {}: {}",
                credentials_file.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// One spreadsheet document read through the Sheets v4 REST API
pub struct GoogleSheets {
    http: reqwest::Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    spreadsheet_id: String,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheets {
    pub fn new(
        key: ServiceAccountKey,
        spreadsheet_id: &str,
        api_base: &str,
    ) -> Result<Self, ConnectionError> {
        if spreadsheet_id.trim().is_empty() {
            return Err(ConnectionError::Config("spreadsheet id is empty".into()));
        }
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| ConnectionError::Credentials(format!("invalid private key: {}", e)))?;

        Ok(GoogleSheets {
            http: reqwest::Client::new(),
            key,
            signing_key,
            spreadsheet_id: spreadsheet_id.trim().to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        })
    }

    fn assertion(&self) -> Result<String, GatewayError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| GatewayError::Unauthorized(format!("cannot sign assertion: {}", e)))
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Unauthorized(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!("obtained access token valid for {}s", token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        title: Option<&str>,
    ) -> Result<T, GatewayError> {
        let token = self.access_token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body, title));
        }
        Ok(response.json().await?)
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.api_base, self.spreadsheet_id)
    }
}

fn status_error(status: StatusCode, body: String, title: Option<&str>) -> GatewayError {
    match (status, title) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => GatewayError::Unauthorized(body),
        (StatusCode::BAD_REQUEST, Some(title)) if body.contains("Unable to parse range") => {
            GatewayError::MissingTable(title.to_string())
        }
        (StatusCode::NOT_FOUND, None) => GatewayError::Unreachable("spreadsheet not found".into()),
        _ => {
            warn!("sheets API answered {}: {}", status, body);
            GatewayError::Http {
                status: status.as_u16(),
                body,
            }
        }
    }
}

/// A1 range covering a whole sheet
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Render a cell value the way the sheet displays it
pub fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[async_trait]
impl TableSource for GoogleSheets {
    fn backend_tag(&self) -> &'static str {
        "google-sheets"
    }

    async fn sheet_titles(&self) -> Result<Vec<String>, GatewayError> {
        let url = format!("{}?fields=sheets.properties.title", self.spreadsheet_url());
        let meta: SpreadsheetMeta = self.get_json(&url, None).await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn read_sheet(&self, title: &str) -> Result<Vec<Vec<String>>, GatewayError> {
        let url = format!(
            "{}/values/{}?majorDimension=ROWS&valueRenderOption=FORMATTED_VALUE",
            self.spreadsheet_url(),
            urlencoding::encode(&sheet_range(title))
        );
        let range: ValueRange = self.get_json(&url, Some(title)).await?;
        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}
