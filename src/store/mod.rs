//! Worksheet access.
//!
//! The workbook is the state of record. Everything above this module talks to
//! it through [`SheetStore`], which deals in whole tables and header-keyed
//! records the same way a spreadsheet user thinks about them.

pub mod cached;
pub mod google;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{Config, SheetNames};

pub use cached::CachedStore;
pub use google::GoogleSheets;
pub use memory::MemorySheets;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spreadsheet api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("spreadsheet authentication failed: {0}")]
    Auth(String),

    #[error("invalid service account credentials: {0}")]
    Credentials(String),

    #[error("invalid spreadsheet url: {0}")]
    InvalidUrl(String),

    #[error("worksheet '{0}' does not exist")]
    UnknownSheet(String),

    #[error("row {index} is out of range for worksheet '{sheet}'")]
    RowOutOfRange { sheet: String, index: usize },
}

impl SheetError {
    /// True when the failure came from the remote service rather than from us.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SheetError::Http(_) | SheetError::Api { .. } | SheetError::Auth(_)
        )
    }
}

/// A worksheet's values with the first row split off as headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from raw grid values. Short rows are padded to the
    /// header width because the remote API drops trailing blank cells.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let headers: Vec<String> = values
            .remove(0)
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let width = headers.len();

        // blank rows stay so indices keep matching sheet rows
        let rows = values
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, String::new());
                }
                row
            })
            .collect();

        Self { headers, rows }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|row| Record { table: self, row })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |row| Record { table: self, row })
    }

    /// Index of the first row whose `column` equals `value` after trimming.
    pub fn position(&self, column: &str, value: &str) -> Option<usize> {
        let col = self.column(column)?;
        let value = value.trim();
        self.rows
            .iter()
            .position(|row| row.get(col).map(|c| c.trim()) == Some(value))
    }

    /// Lays `fields` out in this sheet's column order. Fields the sheet has
    /// no column for are dropped, columns without a field are left blank.
    pub fn encode(&self, fields: &[(&str, String)]) -> Vec<String> {
        encode_row(&self.headers, fields)
    }

    /// Row `index` with `fields` written over it. Columns the fields do not
    /// name keep their current cells.
    pub fn merge(&self, index: usize, fields: &[(&str, String)]) -> Option<Vec<String>> {
        let mut row = self.rows.get(index)?.clone();
        for (name, value) in fields {
            if let Some(col) = self.column(name) {
                row[col] = value.clone();
            }
        }
        Some(row)
    }
}

pub fn encode_row(headers: &[String], fields: &[(&str, String)]) -> Vec<String> {
    headers
        .iter()
        .map(|h| {
            fields
                .iter()
                .find(|(name, _)| name == h)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        })
        .collect()
}

/// One row, addressed by header name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a Table,
    row: &'a [String],
}

impl<'a> Record<'a> {
    /// Cell value trimmed, or `""` when the column is missing.
    pub fn get(&self, column: &str) -> &'a str {
        self.table
            .column(column)
            .and_then(|i| self.row.get(i))
            .map(|v| v.trim())
            .unwrap_or("")
    }
}

#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read(&self, sheet: &str) -> Result<Table, SheetError>;

    /// Reads the sheet as it is now, skipping any cache. Row indices used
    /// for `update_row` and `delete_row` must come from this.
    async fn read_fresh(&self, sheet: &str) -> Result<Table, SheetError> {
        self.read(sheet).await
    }

    /// Appends rows below the last data row. Writes `headers` first when the
    /// sheet is still blank.
    async fn append(
        &self,
        sheet: &str,
        headers: &[String],
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetError>;

    /// Overwrites data row `index` (0-based, header excluded).
    async fn update_row(
        &self,
        sheet: &str,
        index: usize,
        values: Vec<String>,
    ) -> Result<(), SheetError>;

    /// Removes data row `index`; later rows shift up by one.
    async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), SheetError>;

    async fn ensure_headers(&self, sheet: &str, headers: &[String]) -> Result<(), SheetError>;
}

pub const EMPLOYEE_HEADERS: &[&str] = &[
    "employee_id",
    "full_name",
    "department",
    "position",
    "email",
    "phone",
    "join_date",
    "status",
    "daily_rate_basic",
    "daily_rate_transport",
    "meal_allowance_daily",
    "allowance_monthly",
    "bank_account_number",
];

pub const ATTENDANCE_HEADERS: &[&str] = &["date", "employee_id", "status"];

pub const USER_HEADERS: &[&str] = &["username", "password", "role", "employee_id"];

pub const PAYROLL_LOG_HEADERS: &[&str] = &[
    "month",
    "employee_id",
    "full_name",
    "bank_account_number",
    "present_days",
    "daily_basic",
    "daily_transport",
    "meal_allowance_daily",
    "allowance_monthly",
    "overtime",
    "bonus",
    "salary_from_attendance",
    "meal_allowance_total",
    "total_salary",
    "finalized_at",
    "finalized_by",
];

pub fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Builds the configured backend, wrapped in the read cache.
pub async fn init_store(config: &Config) -> anyhow::Result<Arc<dyn SheetStore>> {
    let ttl = Duration::from_secs(config.sheet_cache_ttl);

    let store: Arc<dyn SheetStore> = match config.sheets_backend.as_str() {
        "memory" => {
            info!("Using in-memory worksheets");
            Arc::new(CachedStore::new(MemorySheets::new(), ttl))
        }
        "google" => {
            let spreadsheet_id = config
                .spreadsheet_id
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SPREADSHEET_ID must be set"))?;
            let credentials = config
                .google_credentials_file
                .clone()
                .ok_or_else(|| anyhow::anyhow!("GOOGLE_CREDENTIALS_FILE must be set"))?;

            info!(spreadsheet_id = %spreadsheet_id, "Using Google Sheets");
            let google =
                GoogleSheets::from_key_file(&config.sheets_api_base, spreadsheet_id, &credentials)?;
            Arc::new(CachedStore::new(google, ttl))
        }
        other => anyhow::bail!("unknown SHEETS_BACKEND '{}'", other),
    };

    ensure_layout(store.as_ref(), &config.sheets).await?;
    Ok(store)
}

/// Writes header rows into blank worksheets.
pub async fn ensure_layout(store: &dyn SheetStore, sheets: &SheetNames) -> Result<(), SheetError> {
    store
        .ensure_headers(&sheets.employees, &headers(EMPLOYEE_HEADERS))
        .await?;
    store
        .ensure_headers(&sheets.attendance, &headers(ATTENDANCE_HEADERS))
        .await?;
    store
        .ensure_headers(&sheets.users, &headers(USER_HEADERS))
        .await?;
    store
        .ensure_headers(&sheets.payroll_log, &headers(PAYROLL_LOG_HEADERS))
        .await?;
    Ok(())
}
