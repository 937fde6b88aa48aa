use crate::{
    auth::auth::AuthUser,
    config::Config,
    model::employee::{Employee, load_employees},
    store::{EMPLOYEE_HEADERS, SheetStore, encode_row, headers},
    utils::{
        http_utils::{bad_request, conflict, not_found, store_error},
        sheet_utils::paginate,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::json;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

fn default_status() -> String {
    "active".to_string()
}

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = "Siti Rahma")]
    pub full_name: String,
    #[serde(default)]
    #[schema(example = "Operations")]
    pub department: String,
    #[serde(default)]
    #[schema(example = "Supervisor")]
    pub position: String,
    #[serde(default)]
    #[schema(example = "siti@company.com", format = "email")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "+628123456789")]
    pub phone: String,
    #[serde(default)]
    #[schema(example = "2023-02-01", format = "date")]
    pub join_date: String,
    #[serde(default = "default_status")]
    #[schema(example = "active")]
    pub status: String,
    #[serde(default)]
    #[schema(example = 150000.0)]
    pub daily_rate_basic: f64,
    #[serde(default)]
    #[schema(example = 25000.0)]
    pub daily_rate_transport: f64,
    #[serde(default)]
    #[schema(example = 20000.0)]
    pub meal_allowance_daily: f64,
    #[serde(default)]
    #[schema(example = 500000.0)]
    pub allowance_monthly: f64,
    #[serde(default)]
    #[schema(example = "0123456789")]
    pub bank_account_number: String,
}

impl From<CreateEmployee> for Employee {
    fn from(p: CreateEmployee) -> Self {
        Employee {
            employee_id: p.employee_id.trim().to_string(),
            full_name: p.full_name.trim().to_string(),
            department: p.department.trim().to_string(),
            position: p.position.trim().to_string(),
            email: p.email.trim().to_string(),
            phone: p.phone.trim().to_string(),
            join_date: p.join_date.trim().to_string(),
            status: p.status.trim().to_string(),
            daily_rate_basic: p.daily_rate_basic,
            daily_rate_transport: p.daily_rate_transport,
            meal_allowance_daily: p.meal_allowance_daily,
            allowance_monthly: p.allowance_monthly,
            bank_account_number: p.bank_account_number.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Exact department, case-insensitive
    pub department: Option<String>,
    /// Exact status, case-insensitive
    pub status: Option<String>,
    /// Matches id, name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: usize,
}

fn matches_query(emp: &Employee, query: &EmployeeQuery) -> bool {
    if let Some(department) = &query.department {
        if !emp.department.eq_ignore_ascii_case(department.trim()) {
            return false;
        }
    }

    if let Some(status) = &query.status {
        if !emp.status.eq_ignore_ascii_case(status.trim()) {
            return false;
        }
    }

    if let Some(search) = &query.search {
        let needle = search.trim().to_lowercase();
        let hit = [&emp.employee_id, &emp.full_name, &emp.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    true
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created successfully", body = Employee),
        (status = 400, description = "Validation failed", body = Object, example = json!({
            "message": "full_name is required"
        })),
        (status = 409, description = "Duplicate employee id", body = Object, example = json!({
            "message": "Employee EMP-001 already exists"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let employee: Employee = payload.into_inner().into();
    if let Err(msg) = employee.validate() {
        return Ok(bad_request(msg));
    }

    let sheet = &config.sheets.employees;
    let table = store.read(sheet).await.map_err(store_error)?;

    if table.position("employee_id", &employee.employee_id).is_some() {
        return Ok(conflict(format!(
            "Employee {} already exists",
            employee.employee_id
        )));
    }

    let header_row = if table.headers.is_empty() {
        headers(EMPLOYEE_HEADERS)
    } else {
        table.headers.clone()
    };
    let row = encode_row(&header_row, &employee.to_fields());

    store
        .append(sheet, &header_row, vec![row])
        .await
        .map_err(store_error)?;

    info!(employee_id = %employee.employee_id, by = %auth.username, "Employee created");

    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let table = store
        .read(&config.sheets.employees)
        .await
        .map_err(store_error)?;

    let filtered: Vec<Employee> = load_employees(&table)
        .into_iter()
        .filter(|e| matches_query(e, &query))
        .collect();
    let total = filtered.len();

    let (data, page, per_page) = paginate(filtered, query.page, query.per_page, 20);
    debug!(total, page, per_page, "Listing employees");

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(content = Object, description = "Any subset of the employee fields", example = json!({
        "department": "Finance",
        "allowance_monthly": 750000
    })),
    responses(
        (status = 200, description = "Employee updated successfully", body = Employee),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let patch = match body.as_object() {
        Some(obj) => obj,
        None => return Ok(bad_request("Payload must be a JSON object")),
    };

    let sheet = &config.sheets.employees;
    let table = store.read_fresh(sheet).await.map_err(store_error)?;

    let index = match table.position("employee_id", &employee_id) {
        Some(i) => i,
        None => return Ok(not_found("Employee not found")),
    };

    let mut employee = match table.record(index) {
        Some(rec) => Employee::from_record(&rec),
        None => return Ok(not_found("Employee not found")),
    };
    if let Err(msg) = employee.apply_patch(patch) {
        return Ok(bad_request(msg));
    }

    let Some(row) = table.merge(index, &employee.to_fields()) else {
        return Ok(not_found("Employee not found"));
    };
    store
        .update_row(sheet, index, row)
        .await
        .map_err(store_error)?;

    info!(employee_id = %employee.employee_id, by = %auth.username, "Employee updated");

    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();
    let sheet = &config.sheets.employees;
    let table = store.read_fresh(sheet).await.map_err(store_error)?;

    let index = match table.position("employee_id", &employee_id) {
        Some(i) if !employee_id.trim().is_empty() => i,
        _ => return Ok(not_found("Employee not found")),
    };

    store
        .delete_row(sheet, index)
        .await
        .map_err(store_error)?;

    info!(employee_id = %employee_id, by = %auth.username, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Employees may only read their own record"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    let employee_id = path.into_inner();
    auth.require_access_to(&employee_id)?;

    let table = store
        .read(&config.sheets.employees)
        .await
        .map_err(store_error)?;

    let employee = load_employees(&table)
        .into_iter()
        .find(|e| e.employee_id == employee_id.trim());

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(not_found("Employee not found")),
    }
}
