use actix_web::{HttpResponse, http::header, web};
use rust_xlsxwriter::XlsxError;
use serde::Deserialize;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{Attendance, load_attendance};
use crate::model::employee::load_employees;
use crate::model::month::Month;
use crate::store::SheetStore;
use crate::utils::http_utils::{bad_request, store_error};
use crate::utils::xlsx::{XLSX_MIME, attendance_workbook, employees_workbook};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ExportQuery {
    /// `YYYY-MM`; all rows when absent
    #[schema(example = "2024-05")]
    pub month: Option<String>,
}

fn download(result: Result<Vec<u8>, XlsxError>, filename: &str) -> actix_web::Result<HttpResponse> {
    let bytes = result.map_err(|e| {
        error!(error = %e, filename, "Excel export failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type(XLSX_MIME)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes))
}

/// Download the employee directory as Excel
#[utoipa::path(
    get,
    path = "/api/export/employees",
    responses(
        (status = 200, description = "Employees.xlsx", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    ),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_employees(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let table = store
        .read(&config.sheets.employees)
        .await
        .map_err(store_error)?;

    download(employees_workbook(&load_employees(&table)), "Employees.xlsx")
}

/// Download attendance as Excel
#[utoipa::path(
    get,
    path = "/api/export/attendance",
    params(ExportQuery),
    responses(
        (status = 200, description = "Attendance_<month>.xlsx", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 400, description = "Malformed month")
    ),
    security(("bearer_auth" = [])),
    tag = "Export"
)]
pub async fn export_attendance(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    query: web::Query<ExportQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let month = match query.month.as_deref().map(str::parse::<Month>) {
        Some(Ok(m)) => Some(m),
        Some(Err(msg)) => return Ok(bad_request(msg)),
        None => None,
    };

    let table = store
        .read(&config.sheets.attendance)
        .await
        .map_err(store_error)?;

    let rows: Vec<Attendance> = load_attendance(&table)
        .into_iter()
        .filter(|a| month.as_ref().is_none_or(|m| m.contains(&a.date)))
        .collect();

    let filename = match &month {
        Some(m) => format!("Attendance_{}.xlsx", m),
        None => "Attendance.xlsx".to_string(),
    };

    download(attendance_workbook(&rows), &filename)
}
