use crate::{
    auth::auth::AuthUser,
    config::Config,
    model::{
        attendance::{Attendance, AttendanceStatus, attendance_months, find_entry, load_attendance},
        employee::load_employees,
        month::Month,
    },
    store::{ATTENDANCE_HEADERS, SheetStore, Table, encode_row, headers},
    utils::{
        http_utils::{bad_request, conflict, forbidden, not_found, store_error},
        sheet_utils::{is_valid_date, paginate},
    },
};
use actix_web::{HttpResponse, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// `YYYY-MM`
    #[schema(example = "2024-05")]
    pub month: Option<String>,
    /// `YYYY-MM-DD`
    #[schema(example = "2024-05-02")]
    pub date: Option<String>,
    pub employee_id: Option<String>,
    /// `Present` or `Absent`, case-insensitive
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<Attendance>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
}

#[derive(Deserialize, ToSchema)]
pub struct AttendanceEntry {
    #[schema(example = "2024-05-02", format = "date")]
    pub date: String,
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = "Present")]
    pub status: AttendanceStatus,
}

#[derive(Serialize, ToSchema)]
pub struct MonthList {
    #[schema(value_type = Vec<String>, example = json!(["2024-05", "2024-04"]))]
    pub months: Vec<Month>,
}

async fn append_entry(
    store: &dyn SheetStore,
    sheet: &str,
    table: &Table,
    entry: &Attendance,
) -> actix_web::Result<()> {
    let header_row = if table.headers.is_empty() {
        headers(ATTENDANCE_HEADERS)
    } else {
        table.headers.clone()
    };
    let row = encode_row(&header_row, &entry.to_fields());

    store
        .append(sheet, &header_row, vec![row])
        .await
        .map_err(store_error)
}

/// List attendance
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance, newest first", body = AttendanceListResponse),
        (status = 400, description = "Malformed month")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<HttpResponse> {
    // employees are pinned to their own rows
    let employee_filter = if auth.is_employee() {
        match &auth.employee_id {
            Some(id) => Some(id.clone()),
            None => return Err(forbidden("No employee profile")),
        }
    } else {
        query.employee_id.as_ref().map(|id| id.trim().to_string())
    };

    let month = match query.month.as_deref() {
        Some(m) => match m.parse::<Month>() {
            Ok(m) => Some(m),
            Err(msg) => return Ok(bad_request(msg)),
        },
        None => None,
    };

    let table = store
        .read(&config.sheets.attendance)
        .await
        .map_err(store_error)?;

    let mut rows: Vec<Attendance> = load_attendance(&table)
        .into_iter()
        .filter(|a| month.as_ref().is_none_or(|m| m.contains(&a.date)))
        .filter(|a| query.date.as_deref().is_none_or(|d| a.date == d.trim()))
        .filter(|a| employee_filter.as_deref().is_none_or(|id| a.employee_id == id))
        .filter(|a| {
            query
                .status
                .as_deref()
                .is_none_or(|s| a.status.eq_ignore_ascii_case(s.trim()))
        })
        .collect();

    // newest first; the sort is stable so same-day rows keep sheet order
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    let total = rows.len();
    let (data, page, per_page) = paginate(rows, query.page, query.per_page, 20);

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Months with attendance
#[utoipa::path(
    get,
    path = "/api/attendance/months",
    responses(
        (status = 200, description = "Distinct months, newest first", body = MonthList)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_months(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let table = store
        .read(&config.sheets.attendance)
        .await
        .map_err(store_error)?;

    Ok(HttpResponse::Ok().json(MonthList {
        months: attendance_months(&load_attendance(&table)),
    }))
}

/// Record attendance
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = AttendanceEntry,
    responses(
        (status = 201, description = "Recorded", body = Attendance),
        (status = 400, description = "Unknown employee or malformed date"),
        (status = 409, description = "Already recorded for that day", body = Object, example = json!({
            "message": "Attendance for EMP-001 on 2024-05-02 already recorded"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    payload: web::Json<AttendanceEntry>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let entry = Attendance {
        date: payload.date.trim().to_string(),
        employee_id: payload.employee_id.trim().to_string(),
        status: payload.status.to_string(),
    };

    if !is_valid_date(&entry.date) {
        return Ok(bad_request("date must be YYYY-MM-DD"));
    }

    let employees = store
        .read(&config.sheets.employees)
        .await
        .map_err(store_error)?;
    if !load_employees(&employees)
        .iter()
        .any(|e| e.employee_id == entry.employee_id)
    {
        return Ok(bad_request(format!("Unknown employee '{}'", entry.employee_id)));
    }

    let sheet = &config.sheets.attendance;
    let table = store.read(sheet).await.map_err(store_error)?;

    if find_entry(&table, &entry.date, &entry.employee_id).is_some() {
        return Ok(conflict(format!(
            "Attendance for {} on {} already recorded",
            entry.employee_id, entry.date
        )));
    }

    append_entry(store.get_ref(), sheet, &table, &entry).await?;

    info!(employee_id = %entry.employee_id, date = %entry.date, status = %entry.status, "Attendance recorded");

    Ok(HttpResponse::Created().json(entry))
}

/// Change an attendance status
#[utoipa::path(
    put,
    path = "/api/attendance",
    request_body = AttendanceEntry,
    responses(
        (status = 200, description = "Updated", body = Attendance),
        (status = 404, description = "No entry for that day and employee")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    payload: web::Json<AttendanceEntry>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let sheet = &config.sheets.attendance;
    let table = store.read_fresh(sheet).await.map_err(store_error)?;

    let index = match find_entry(&table, &payload.date, &payload.employee_id) {
        Some(i) => i,
        None => return Ok(not_found("Attendance entry not found")),
    };

    let entry = Attendance {
        date: payload.date.trim().to_string(),
        employee_id: payload.employee_id.trim().to_string(),
        status: payload.status.to_string(),
    };

    let Some(row) = table.merge(index, &entry.to_fields()) else {
        return Ok(not_found("Attendance entry not found"));
    };
    store
        .update_row(sheet, index, row)
        .await
        .map_err(store_error)?;

    Ok(HttpResponse::Ok().json(entry))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 201, description = "Checked in successfully", body = Attendance),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth
        .employee_id
        .clone()
        .ok_or_else(|| forbidden("No employee profile"))?;

    let entry = Attendance {
        date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
        employee_id,
        status: AttendanceStatus::Present.to_string(),
    };

    let sheet = &config.sheets.attendance;
    let table = store.read(sheet).await.map_err(store_error)?;

    if find_entry(&table, &entry.date, &entry.employee_id).is_some() {
        return Ok(bad_request("Already checked in today"));
    }

    append_entry(store.get_ref(), sheet, &table, &entry).await?;

    info!(employee_id = %entry.employee_id, "Checked in");

    Ok(HttpResponse::Created().json(entry))
}
