use crate::api::attendance::{AttendanceEntry, AttendanceListResponse, AttendanceQuery, MonthList};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::export::ExportQuery;
use crate::api::payroll::{PayrollMonth, PayrollQuery, PayrollRequest};
use crate::auth::auth::AuthUser;
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{Attendance, AttendanceStatus};
use crate::model::employee::Employee;
use crate::model::payroll::{Adjustment, PayrollRow, PayrollSheet, PayrollSummary};
use crate::models::{LoginReqDto, UserReq};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Sheet API",
        version = "0.1.0",
        description = r#"
## HR & Payroll over a spreadsheet

Every record lives in one spreadsheet: the **Employees**, **Attendance**,
**Users** and **PayrollLog** worksheets. The service reads and writes those
sheets directly; there is no other database.

### 🔹 Key Features
- **Employee Directory**
  - Create, update, delete, list and view employee profiles
- **Attendance**
  - Daily Present/Absent entries, filters by month, day, employee and status
- **Payroll**
  - Monthly computation from attendance, manual overtime/bonus adjustments
  - Finalizing a month appends it to the payroll log and locks it
- **Excel Export**
  - Payroll, employee directory and attendance as `.xlsx`

### 🔐 Security
Endpoints under `/api` need a **JWT Bearer** access token from `/auth/login`.
Payroll and exports are limited to **admin** and **hr**; an **employee** only
sees their own profile and attendance.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::register,
        crate::auth::handlers::me,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance::list_attendance,
        crate::api::attendance::list_months,
        crate::api::attendance::record_attendance,
        crate::api::attendance::update_attendance,
        crate::api::attendance::check_in,

        crate::api::payroll::list_months,
        crate::api::payroll::get_payroll,
        crate::api::payroll::preview_payroll,
        crate::api::payroll::finalize_payroll,
        crate::api::payroll::export_payroll,

        crate::api::export::export_employees,
        crate::api::export::export_attendance
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            UserReq,
            AuthUser,
            Employee,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            Attendance,
            AttendanceStatus,
            AttendanceEntry,
            AttendanceQuery,
            AttendanceListResponse,
            MonthList,
            Adjustment,
            PayrollRow,
            PayrollSummary,
            PayrollSheet,
            PayrollQuery,
            PayrollRequest,
            PayrollMonth,
            ExportQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token rotation and user accounts"),
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Attendance", description = "Attendance APIs"),
        (name = "Payroll", description = "Monthly payroll and finalization"),
        (name = "Export", description = "Excel downloads"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
