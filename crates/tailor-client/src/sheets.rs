use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tailor_core::error::AppError;
use tailor_core::sink::{prepare_for_write, strip_non_ascii};
use tailor_core::table::{ListingTable, Value};
use tailor_core::traits::{Sink, SinkReceipt};
use url::Url;

/// Spreadsheet id shipped in sample configuration; never a real sheet.
pub const PLACEHOLDER_SPREADSHEET_ID: &str = "your_google_sheets_id_here";
pub const DEFAULT_WORKSHEET: &str = "Products";
pub const DEFAULT_CREDENTIALS: &str = "google-sheets-api.json";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to publish the table in Google Sheets.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// Service-account key file (JSON, as downloaded from the cloud console).
    pub credentials_path: PathBuf,
    pub api_base: String,
    pub strip_non_ascii: bool,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS),
            api_base: DEFAULT_API_BASE.to_string(),
            strip_non_ascii: true,
        }
    }

    pub fn with_worksheet(mut self, worksheet: impl Into<String>) -> Self {
        self.worksheet = worksheet.into();
        self
    }

    pub fn with_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_strip_non_ascii(mut self, strip: bool) -> Self {
        self.strip_non_ascii = strip;
        self
    }

    /// False for an empty id or the sample placeholder.
    pub fn is_configured(&self) -> bool {
        let id = self.spreadsheet_id.trim();
        !id.is_empty() && id != PLACEHOLDER_SPREADSHEET_ID
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self::new(PLACEHOLDER_SPREADSHEET_ID)
    }
}

// ---- Google API types ----

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetInfo {
    properties: Option<SpreadsheetProperties>,
}

#[derive(Deserialize)]
struct SpreadsheetProperties {
    title: Option<String>,
}

#[derive(Deserialize)]
struct UpdateResponse {
    #[serde(rename = "updatedCells")]
    updated_cells: Option<u64>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Replaces the contents of one worksheet with the table.
///
/// The worksheet is cleared (columns A to Z) and rewritten from `A1` with
/// the header row first. If it cannot be cleared it is created.
#[derive(Clone)]
pub struct SheetsSink {
    config: SheetsConfig,
    client: Client,
}

impl SheetsSink {
    pub fn new(config: SheetsConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("Tailor/0.1 (catalog harvester)")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    fn load_key(&self) -> Result<ServiceAccountKey, AppError> {
        let path = &self.config.credentials_path;
        if !path.is_file() {
            return Err(AppError::NotConfigured(format!(
                "Google Sheets credentials file not found: {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::ConfigError(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })
    }

    /// Sign a service-account assertion and trade it for a bearer token.
    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String, AppError> {
        let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("invalid service account private key: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| AppError::ConfigError(format!("cannot sign token request: {e}")))?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        let request = self
            .client
            .post(token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        let response = execute(request)
            .await
            .map_err(|m| AppError::ConnectionFailed(format!("token exchange failed: {m}")))?;

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::ConnectionFailed(format!("Failed to parse token response: {e}"))
        })?;
        Ok(token.access_token)
    }

    /// `<api_base>/spreadsheets/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let base = &self.config.api_base;
        let mut url = Url::parse(base)
            .map_err(|e| AppError::ConfigError(format!("invalid Sheets API base {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError(format!("invalid Sheets API base {base}")))?
            .pop_if_empty()
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }
}

impl Sink for SheetsSink {
    fn name(&self) -> &'static str {
        "google_sheets"
    }

    async fn write(&self, table: &ListingTable) -> Result<SinkReceipt, AppError> {
        if !self.config.is_configured() {
            return Err(AppError::NotConfigured(
                "Google Sheets spreadsheet id is not set".into(),
            ));
        }
        let key = self.load_key()?;

        let mut table = prepare_for_write(table);
        if self.config.strip_non_ascii {
            table = strip_non_ascii(table);
        }

        let token = self.access_token(&key).await?;
        let id = self.config.spreadsheet_id.trim();
        let sheet = &self.config.worksheet;

        // 1. Access check
        let info = execute(self.client.get(self.endpoint(&[id])?).bearer_auth(&token))
            .await
            .map_err(|m| AppError::ConnectionFailed(format!("cannot access spreadsheet {id}: {m}")))?;
        let title = info
            .json::<SpreadsheetInfo>()
            .await
            .ok()
            .and_then(|i| i.properties)
            .and_then(|p| p.title)
            .unwrap_or_else(|| "Unknown".into());
        tracing::debug!(spreadsheet = %title, "Accessing spreadsheet");

        // 2. Clear, or create the worksheet when it cannot be cleared
        let clear = self.endpoint(&[id, "values", format!("{sheet}!A:Z:clear").as_str()])?;
        if let Err(message) =
            execute(self.client.post(clear).bearer_auth(&token).json(&json!({}))).await
        {
            tracing::warn!(worksheet = %sheet, %message, "Cannot clear worksheet, creating it");
            let request = json!({
                "requests": [{ "addSheet": { "properties": { "title": sheet } } }]
            });
            let batch = self.endpoint(&[format!("{id}:batchUpdate").as_str()])?;
            execute(self.client.post(batch).bearer_auth(&token).json(&request))
                .await
                .map_err(|m| {
                    AppError::WriteRejected(format!("failed to create worksheet {sheet}: {m}"))
                })?;
        }

        // 3. Write from A1
        let mut update = self.endpoint(&[id, "values", format!("{sheet}!A1").as_str()])?;
        update.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = execute(
            self.client
                .put(update)
                .bearer_auth(&token)
                .json(&values_payload(&table)),
        )
        .await
        .map_err(|m| AppError::WriteRejected(format!("failed to update {sheet}: {m}")))?;

        let updated_cells = response
            .json::<UpdateResponse>()
            .await
            .ok()
            .and_then(|r| r.updated_cells);
        tracing::info!(
            worksheet = %sheet,
            rows = table.len(),
            updated_cells = ?updated_cells,
            "Google Sheets updated"
        );

        Ok(SinkReceipt {
            rows: table.len(),
            destination: format!("{id}/{sheet}"),
        })
    }
}

/// Request body for a values update: header row, then one row per listing.
///
/// Numeric cells stay JSON numbers so the sheet stores them as numbers.
pub fn values_payload(table: &ListingTable) -> JsonValue {
    let header = table
        .columns()
        .iter()
        .map(|column| JsonValue::from(column.name()))
        .collect::<Vec<_>>();
    let rows = table
        .rows()
        .iter()
        .map(|row| row.cells().iter().map(cell_json).collect::<Vec<_>>());

    json!({
        "majorDimension": "ROWS",
        "values": std::iter::once(header).chain(rows).collect::<Vec<_>>(),
    })
}

fn cell_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Text(t) => json!(t),
        Value::Float32(v) => json!(v),
        Value::Float64(v) => json!(v),
        Value::Int32(v) => json!(v),
        Value::Int64(v) => json!(v),
    }
}

/// Send a request; any transport failure or non-2xx status becomes the
/// API's error message.
async fn execute(request: RequestBuilder) -> Result<Response, String> {
    let response = request.send().await.map_err(|e| e.to_string())?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status.as_u16(), body)))
}
