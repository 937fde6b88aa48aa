use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{SheetError, SheetStore, Table};

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
// renew a little before Google would reject the token
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Google Sheets API v4 backend authenticated as a service account.
pub struct GoogleSheets {
    client: Client,
    api_base: String,
    spreadsheet_id: String,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
    sheet_ids: Mutex<HashMap<String, i64>>,
}

impl GoogleSheets {
    pub fn from_key_file(
        api_base: &str,
        spreadsheet_id: String,
        path: &str,
    ) -> Result<Self, SheetError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SheetError::Credentials(format!("{}: {}", path, e)))?;
        Self::from_key_json(api_base, spreadsheet_id, &raw)
    }

    fn from_key_json(api_base: &str, spreadsheet_id: String, raw: &str) -> Result<Self, SheetError> {
        let key: ServiceAccountKey =
            serde_json::from_str(raw).map_err(|e| SheetError::Credentials(e.to_string()))?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetError::Credentials(e.to_string()))?;

        Ok(Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id,
            client_email: key.client_email,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
            token: Mutex::new(None),
            sheet_ids: Mutex::new(HashMap::new()),
        })
    }

    /// OAuth access token, exchanged from a signed JWT assertion when the
    /// cached one is missing or about to expire.
    async fn access_token(&self) -> Result<String, SheetError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| SheetError::Auth(e.to_string()))?;

        debug!("Requesting spreadsheet access token");
        let resp = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(status, "Token exchange rejected");
            return Err(SheetError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = resp.json().await?;
        info!(expires_in = token.expires_in, "Spreadsheet access token issued");

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(value)
    }

    fn url(&self, segment: &str) -> Result<Url, SheetError> {
        let mut url = Url::parse(&format!("{}/spreadsheets/", self.api_base))
            .map_err(|e| SheetError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::InvalidUrl(self.api_base.clone()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    fn values_url(&self, range: &str, action: Option<&str>) -> Result<Url, SheetError> {
        let mut url = self.url(&self.spreadsheet_id)?;
        let last = match action {
            Some(action) => format!("{}:{}", range, action),
            None => range.to_string(),
        };
        url.path_segments_mut()
            .map_err(|_| SheetError::InvalidUrl(self.api_base.clone()))?
            .push("values")
            .push(&last);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetError> {
        let token = self.access_token().await?;
        let resp = request.bearer_auth(token).send().await?;

        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(SheetError::Api {
            status,
            message: api_error_message(&body),
        })
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.values_url(range, None)?;
        let resp = self.send(self.client.get(url)).await?;
        let body: ValueRange = resp.json().await?;
        Ok(body.values)
    }

    async fn put_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), SheetError> {
        let url = self.values_url(range, None)?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "range": range, "majorDimension": "ROWS", "values": values }));
        self.send(request).await?;
        Ok(())
    }

    async fn header_row(&self, sheet: &str) -> Result<Vec<String>, SheetError> {
        let range = format!("{}!1:1", quote_sheet(sheet));
        Ok(self
            .get_values(&range)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    async fn sheet_id(&self, sheet: &str) -> Result<i64, SheetError> {
        let mut ids = self.sheet_ids.lock().await;
        if let Some(id) = ids.get(sheet) {
            return Ok(*id);
        }

        let url = self.url(&self.spreadsheet_id)?;
        let resp = self
            .send(
                self.client
                    .get(url)
                    .query(&[("fields", "sheets.properties(sheetId,title)")]),
            )
            .await?;
        let meta: SpreadsheetMeta = resp.json().await?;

        for s in meta.sheets {
            ids.insert(s.properties.title, s.properties.sheet_id);
        }

        ids.get(sheet)
            .copied()
            .ok_or_else(|| SheetError::UnknownSheet(sheet.to_string()))
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn read(&self, sheet: &str) -> Result<Table, SheetError> {
        debug!(sheet, "Reading worksheet");
        let values = self.get_values(&quote_sheet(sheet)).await?;
        Ok(Table::from_values(values))
    }

    async fn append(
        &self,
        sheet: &str,
        headers: &[String],
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetError> {
        let mut values = Vec::with_capacity(rows.len() + 1);
        if self.header_row(sheet).await?.is_empty() {
            values.push(headers.to_vec());
        }
        values.extend(rows);

        let range = format!("{}!A1", quote_sheet(sheet));
        let url = self.values_url(&range, Some("append"))?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "majorDimension": "ROWS", "values": values }));
        self.send(request).await?;

        debug!(sheet, rows = values.len(), "Appended rows");
        Ok(())
    }

    async fn update_row(
        &self,
        sheet: &str,
        index: usize,
        values: Vec<String>,
    ) -> Result<(), SheetError> {
        let range = row_range(sheet, index, values.len());
        self.put_values(&range, vec![values]).await
    }

    async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), SheetError> {
        let sheet_id = self.sheet_id(sheet).await?;
        let url = self.url(&format!("{}:batchUpdate", self.spreadsheet_id))?;

        // header is grid row 0, data row `index` is grid row index + 1
        let request = self.client.post(url).json(&json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": index + 1,
                        "endIndex": index + 2
                    }
                }
            }]
        }));
        self.send(request).await?;
        Ok(())
    }

    async fn ensure_headers(&self, sheet: &str, headers: &[String]) -> Result<(), SheetError> {
        if !self.header_row(sheet).await?.is_empty() {
            return Ok(());
        }

        info!(sheet, "Writing header row into blank worksheet");
        let range = format!("{}!A1", quote_sheet(sheet));
        self.put_values(&range, vec![headers.to_vec()]).await
    }
}

/// Sheet name in A1 notation, single-quoted with embedded quotes doubled.
fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// A1 range covering data row `index` across `width` columns.
fn row_range(sheet: &str, index: usize, width: usize) -> String {
    let row = index + 2;
    format!(
        "{}!A{}:{}{}",
        quote_sheet(sheet),
        row,
        column_letter(width.max(1)),
        row
    )
}

/// 1-based column number to its letter name (1 → A, 27 → AA).
fn column_letter(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
