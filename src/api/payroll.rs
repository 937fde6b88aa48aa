use actix_web::{HttpResponse, http::header, web};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{Attendance, attendance_months, load_attendance};
use crate::model::employee::{Employee, load_employees};
use crate::model::month::Month;
use crate::model::payroll::{
    Adjustment, PayrollSheet, compute_payroll, is_finalized, logged_rows,
};
use crate::store::{PAYROLL_LOG_HEADERS, SheetStore, Table, encode_row, headers};
use crate::utils::http_utils::{bad_request, conflict, not_found, store_error};
use crate::utils::xlsx::{XLSX_MIME, payroll_workbook};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    /// `YYYY-MM`; defaults to the newest month with attendance
    #[schema(example = "2024-05")]
    pub month: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct PayrollRequest {
    #[schema(example = "2024-05", value_type = String)]
    pub month: Month,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}

#[derive(Serialize, ToSchema)]
pub struct PayrollMonth {
    #[schema(example = "2024-05", value_type = String)]
    pub month: Month,
    pub locked: bool,
}

/// Serializes finalization so the lock check and the log append happen as
/// one step per process.
#[derive(Default)]
pub struct FinalizeLock(tokio::sync::Mutex<()>);

/// Everything a payroll computation reads.
struct PayrollInputs {
    employees: Vec<Employee>,
    attendance: Vec<Attendance>,
    log: Table,
}

async fn load_inputs(store: &dyn SheetStore, config: &Config) -> actix_web::Result<PayrollInputs> {
    let employees = store
        .read(&config.sheets.employees)
        .await
        .map_err(store_error)?;
    let attendance = store
        .read(&config.sheets.attendance)
        .await
        .map_err(store_error)?;
    let log = store
        .read(&config.sheets.payroll_log)
        .await
        .map_err(store_error)?;

    Ok(PayrollInputs {
        employees: load_employees(&employees),
        attendance: load_attendance(&attendance),
        log,
    })
}

/// The requested month, or the newest one with attendance.
fn resolve_month(requested: Option<&str>, inputs: &PayrollInputs) -> Result<Month, HttpResponse> {
    match requested {
        Some(raw) => raw.parse::<Month>().map_err(bad_request),
        None => attendance_months(&inputs.attendance)
            .into_iter()
            .next()
            .ok_or_else(|| not_found("No attendance data available")),
    }
}

/// The month's sheet: logged rows once finalized, computed rows otherwise.
fn build_sheet(
    inputs: &PayrollInputs,
    month: Month,
    adjustments: &[Adjustment],
) -> Result<PayrollSheet, String> {
    if is_finalized(&inputs.log, &month) {
        let rows = logged_rows(&inputs.log, &month);
        return Ok(PayrollSheet::new(month, true, rows));
    }

    let rows = compute_payroll(&inputs.employees, &inputs.attendance, &month, adjustments)?;
    Ok(PayrollSheet::new(month, false, rows))
}

/// Months with attendance or a finalized payroll
#[utoipa::path(
    get,
    path = "/api/payroll/months",
    operation_id = "list_payroll_months",
    responses(
        (status = 200, description = "Newest first, with lock state", body = Vec<PayrollMonth>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_months(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let inputs = load_inputs(store.get_ref(), &config).await?;

    let mut months = attendance_months(&inputs.attendance);
    months.extend(
        inputs
            .log
            .records()
            .filter_map(|rec| rec.get("month").parse::<Month>().ok()),
    );
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();

    let data: Vec<PayrollMonth> = months
        .into_iter()
        .map(|month| PayrollMonth {
            locked: is_finalized(&inputs.log, &month),
            month,
        })
        .collect();

    Ok(HttpResponse::Ok().json(data))
}

/// Payroll for a month
#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PayrollSheet),
        (status = 400, description = "Malformed month"),
        (status = 404, description = "No attendance data available")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let inputs = load_inputs(store.get_ref(), &config).await?;
    let month = match resolve_month(query.month.as_deref(), &inputs) {
        Ok(m) => m,
        Err(resp) => return Ok(resp),
    };

    match build_sheet(&inputs, month, &[]) {
        Ok(sheet) => Ok(HttpResponse::Ok().json(sheet)),
        Err(msg) => Ok(bad_request(msg)),
    }
}

/// Recompute with manual adjustments
#[utoipa::path(
    post,
    path = "/api/payroll/preview",
    request_body = PayrollRequest,
    responses(
        (status = 200, body = PayrollSheet),
        (status = 400, description = "Invalid adjustment"),
        (status = 409, description = "Month already finalized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn preview_payroll(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    body: web::Json<PayrollRequest>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let inputs = load_inputs(store.get_ref(), &config).await?;
    if is_finalized(&inputs.log, &body.month) {
        return Ok(conflict(format!(
            "Payroll for {} is already finalized",
            body.month
        )));
    }

    match build_sheet(&inputs, body.month.clone(), &body.adjustments) {
        Ok(sheet) => Ok(HttpResponse::Ok().json(sheet)),
        Err(msg) => Ok(bad_request(msg)),
    }
}

/// Finalize and lock a month
#[utoipa::path(
    post,
    path = "/api/payroll/finalize",
    request_body = PayrollRequest,
    responses(
        (status = 201, description = "Rows appended to the payroll log", body = PayrollSheet),
        (status = 400, description = "Invalid adjustment or empty directory"),
        (status = 409, description = "Month already finalized")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn finalize_payroll(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    lock: web::Data<FinalizeLock>,
    body: web::Json<PayrollRequest>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let request = body.into_inner();
    let month = request.month;

    let _guard = lock.0.lock().await;

    let mut inputs = load_inputs(store.get_ref(), &config).await?;
    inputs.log = store
        .read_fresh(&config.sheets.payroll_log)
        .await
        .map_err(store_error)?;
    if is_finalized(&inputs.log, &month) {
        warn!(month = %month, by = %auth.username, "Payroll already finalized");
        return Ok(conflict(format!("Payroll for {} is already finalized", month)));
    }

    if inputs.employees.is_empty() {
        return Ok(bad_request("No employees to pay"));
    }

    let rows = match compute_payroll(
        &inputs.employees,
        &inputs.attendance,
        &month,
        &request.adjustments,
    ) {
        Ok(rows) => rows,
        Err(msg) => return Ok(bad_request(msg)),
    };

    let finalized_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let header_row = if inputs.log.headers.is_empty() {
        headers(PAYROLL_LOG_HEADERS)
    } else {
        inputs.log.headers.clone()
    };
    let log_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| encode_row(&header_row, &r.to_log_fields(&month, &finalized_at, &auth.username)))
        .collect();

    store
        .append(&config.sheets.payroll_log, &header_row, log_rows)
        .await
        .map_err(store_error)?;

    info!(
        month = %month,
        employees = rows.len(),
        by = %auth.username,
        "Payroll finalized"
    );

    Ok(HttpResponse::Created().json(PayrollSheet::new(month, true, rows)))
}

/// Download a month's payroll as Excel
#[utoipa::path(
    get,
    path = "/api/payroll/export",
    params(PayrollQuery),
    responses(
        (status = 200, description = "Payroll_<month>.xlsx", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 404, description = "No attendance data available")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn export_payroll(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let inputs = load_inputs(store.get_ref(), &config).await?;
    let month = match resolve_month(query.month.as_deref(), &inputs) {
        Ok(m) => m,
        Err(resp) => return Ok(resp),
    };

    let sheet = match build_sheet(&inputs, month, &[]) {
        Ok(sheet) => sheet,
        Err(msg) => return Ok(bad_request(msg)),
    };

    let bytes = payroll_workbook(&sheet).map_err(|e| {
        error!(error = %e, month = %sheet.month, "Error exporting payroll");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type(XLSX_MIME)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"Payroll_{}.xlsx\"", sheet.month),
        ))
        .body(bytes))
}
