use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct SheetNames {
    pub employees: String,
    pub attendance: String,
    pub users: String,
    pub payroll_log: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            employees: "Employees".to_string(),
            attendance: "Attendance".to_string(),
            users: "Users".to_string(),
            payroll_log: "PayrollLog".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Spreadsheet backend
    pub sheets_backend: String,
    pub spreadsheet_id: Option<String>,
    pub google_credentials_file: Option<String>,
    pub sheets_api_base: String,
    pub sheets: SheetNames,
    pub sheet_cache_ttl: u64,

    pub bootstrap_admin: Option<(String, String)>,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let bootstrap_admin = match (
            optional("BOOTSTRAP_ADMIN_USERNAME"),
            optional("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", 900)?, // default 15 min
            refresh_token_ttl: parse_or("REFRESH_TOKEN_TTL", 604800)?, // default 7 days

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parse_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            sheets_backend: env::var("SHEETS_BACKEND").unwrap_or_else(|_| "google".to_string()),
            spreadsheet_id: optional("SPREADSHEET_ID"),
            google_credentials_file: optional("GOOGLE_CREDENTIALS_FILE"),
            sheets_api_base: env::var("SHEETS_API_BASE")
                .unwrap_or_else(|_| "https://sheets.googleapis.com/v4".to_string()),
            sheets: sheet_names(),
            sheet_cache_ttl: parse_or("SHEET_CACHE_TTL", 60)?,

            bootstrap_admin,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

fn sheet_names() -> SheetNames {
    let defaults = SheetNames::default();
    SheetNames {
        employees: optional("SHEET_EMPLOYEES").unwrap_or(defaults.employees),
        attendance: optional("SHEET_ATTENDANCE").unwrap_or(defaults.attendance),
        users: optional("SHEET_USERS").unwrap_or(defaults.users),
        payroll_log: optional("SHEET_PAYROLL_LOG").unwrap_or(defaults.payroll_log),
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Settings for handler tests: in-memory sheets, no caching.
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_refresh_per_min: 1000,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            sheets_backend: "memory".to_string(),
            spreadsheet_id: None,
            google_credentials_file: None,
            sheets_api_base: "http://localhost".to_string(),
            sheets: SheetNames::default(),
            sheet_cache_ttl: 0,
            bootstrap_admin: None,
            log_dir: "logs".to_string(),
        }
    }
}
