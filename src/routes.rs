use crate::{
    api::{attendance, employee, export, payroll},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / requests_per_min as u64).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes; register checks the admin token itself
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(handlers::me)
            .service(
                web::scope("/employee")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::list_attendance))
                            .route(web::post().to(attendance::record_attendance))
                            .route(web::put().to(attendance::update_attendance)),
                    )
                    .service(web::resource("/months").route(web::get().to(attendance::list_months)))
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in))),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("").route(web::get().to(payroll::get_payroll)))
                    .service(web::resource("/months").route(web::get().to(payroll::list_months)))
                    .service(
                        web::resource("/preview").route(web::post().to(payroll::preview_payroll)),
                    )
                    .service(
                        web::resource("/finalize").route(web::post().to(payroll::finalize_payroll)),
                    )
                    .service(web::resource("/export").route(web::get().to(payroll::export_payroll))),
            )
            .service(
                web::scope("/export")
                    .service(
                        web::resource("/employees").route(web::get().to(export::export_employees)),
                    )
                    .service(
                        web::resource("/attendance").route(web::get().to(export::export_attendance)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair, the old refresh token is spent

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::payroll::FinalizeLock;
    use crate::auth::handlers::bootstrap_admin;
    use crate::auth::jwt::generate_access_token;
    use crate::auth::refresh_registry::RefreshRegistry;
    use crate::model::role::Role;
    use crate::store::{SheetError, SheetStore, Table, cached::CachedStore, memory::MemorySheets};
    use async_trait::async_trait;
    use std::time::Duration;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test, web::Data};
    use serde_json::{Value, json};

    macro_rules! app {
        ($store:expr) => {{
            let config = Config::for_tests();
            let store: Arc<dyn SheetStore> = $store.clone();
            test::init_service(
                App::new()
                    .app_data(Data::from(store))
                    .app_data(Data::new(config.clone()))
                    .app_data(Data::new(RefreshRegistry::new(config.refresh_token_ttl)))
                    .app_data(Data::new(FinalizeLock::default()))
                    .configure(|cfg| configure(cfg, config.clone())),
            )
            .await
        }};
    }

    /// Memory sheets that give up the executor on every call, the way a
    /// network round trip would.
    struct YieldingSheets(MemorySheets);

    #[async_trait]
    impl SheetStore for YieldingSheets {
        async fn read(&self, sheet: &str) -> Result<Table, SheetError> {
            tokio::task::yield_now().await;
            self.0.read(sheet).await
        }

        async fn append(
            &self,
            sheet: &str,
            headers: &[String],
            rows: Vec<Vec<String>>,
        ) -> Result<(), SheetError> {
            tokio::task::yield_now().await;
            self.0.append(sheet, headers, rows).await
        }

        async fn update_row(
            &self,
            sheet: &str,
            index: usize,
            values: Vec<String>,
        ) -> Result<(), SheetError> {
            tokio::task::yield_now().await;
            self.0.update_row(sheet, index, values).await
        }

        async fn delete_row(&self, sheet: &str, index: usize) -> Result<(), SheetError> {
            tokio::task::yield_now().await;
            self.0.delete_row(sheet, index).await
        }

        async fn ensure_headers(&self, sheet: &str, headers: &[String]) -> Result<(), SheetError> {
            self.0.ensure_headers(sheet, headers).await
        }
    }

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    // the governor keys on the peer address
    fn request(method: &str, uri: &str) -> test::TestRequest {
        let req = match method {
            "POST" => test::TestRequest::post(),
            "PUT" => test::TestRequest::put(),
            "DELETE" => test::TestRequest::delete(),
            _ => test::TestRequest::get(),
        };
        req.uri(uri).peer_addr("127.0.0.1:4000".parse().unwrap())
    }

    fn token(username: &str, role: Role, employee_id: Option<&str>) -> String {
        let bearer = generate_access_token(
            username.to_string(),
            role.id(),
            employee_id.map(str::to_string),
            "test-secret",
            900,
        )
        .unwrap();
        format!("Bearer {}", bearer)
    }

    fn hr() -> String {
        token("hr.ana", Role::Hr, None)
    }

    async fn seeded() -> Arc<MemorySheets> {
        let store = MemorySheets::new();
        seed_into(&store).await;
        Arc::new(store)
    }

    async fn seed_into(store: &MemorySheets) {
        store
            .seed(
                "Users",
                grid(&[
                    &["username", "password", "role", "employee_id"],
                    &["admin", "admin", "admin", ""],
                ]),
            )
            .await;
        store
            .seed(
                "Employees",
                grid(&[
                    &[
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
                    ],
                    &[
                        "E1", "Ana", "Ops", "Clerk", "", "", "2023-01-02", "active", "100", "10",
                        "5", "50", "000123",
                    ],
                ]),
            )
            .await;
        store
            .seed(
                "Attendance",
                grid(&[
                    &["date", "employee_id", "status"],
                    &["2024-05-01", "E1", "Present"],
                    &["2024-05-02", "E1", "present"],
                    &["2024-05-03", "E1", "Absent"],
                    &["2024-04-30", "E1", "Present"],
                ]),
            )
            .await;
    }

    async fn body_message(resp: actix_web::dev::ServiceResponse) -> String {
        let body: Value = test::read_body_json(resp).await;
        body["message"].as_str().unwrap_or_default().to_string()
    }

    fn employee_ids(table: &Table) -> Vec<String> {
        table
            .records()
            .map(|rec| rec.get("employee_id").to_string())
            .collect()
    }

    #[actix_web::test]
    async fn login_issues_a_token_pair() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": "ADMIN", "password": "admin"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["access_token"].is_string());
        assert!(body["refresh_token"].is_string());

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": "admin", "password": "wrong"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn refresh_token_is_single_use() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": "admin", "password": "admin"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let refresh = format!("Bearer {}", body["refresh_token"].as_str().unwrap());

        let req = request("POST", "/auth/refresh")
            .insert_header((header::AUTHORIZATION, refresh.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = request("POST", "/auth/refresh")
            .insert_header((header::AUTHORIZATION, refresh))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn protected_routes_need_a_bearer_token() {
        let store = seeded().await;
        let app = app!(store);

        let resp = test::call_service(&app, request("GET", "/api/employee").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = request("GET", "/api/me")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["username"], "hr.ana");
        assert_eq!(body["role"], "hr");
    }

    #[actix_web::test]
    async fn employee_crud_round() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("POST", "/api/employee")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"employee_id": "E2", "full_name": "Budi", "daily_rate_basic": 120.0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = request("POST", "/api/employee")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"employee_id": "E2", "full_name": "Again"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = request("PUT", "/api/employee/E2")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"department": "Finance"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["department"], "Finance");
        assert_eq!(body["status"], "active");

        let req = request("GET", "/api/employee?search=budi")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);

        let req = request("DELETE", "/api/employee/E2")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = request("GET", "/api/employee/E2")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        // the remaining employee kept its row
        let req = request("GET", "/api/employee/E1")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["full_name"], "Ana");
    }

    #[actix_web::test]
    async fn employees_only_reach_their_own_records() {
        let store = seeded().await;
        let app = app!(store);
        let own = token("ana", Role::Employee, Some("E1"));

        let req = request("GET", "/api/employee/E1")
            .insert_header((header::AUTHORIZATION, own.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = request("GET", "/api/employee/E9")
            .insert_header((header::AUTHORIZATION, own.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = request("GET", "/api/payroll?month=2024-05")
            .insert_header((header::AUTHORIZATION, own.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = request("GET", "/api/attendance?employee_id=E9")
            .insert_header((header::AUTHORIZATION, own))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 4);
        assert_eq!(body["data"][0]["date"], "2024-05-03");
    }

    #[actix_web::test]
    async fn duplicate_attendance_is_rejected() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("POST", "/api/attendance")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"date": "2024-05-01", "employee_id": "E1", "status": "absent"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = request("PUT", "/api/attendance")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"date": "2024-05-01", "employee_id": "E1", "status": "absent"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "Absent");

        let req = request("POST", "/api/attendance")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"date": "2024-05-04", "employee_id": "E7", "status": "Present"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = request("GET", "/api/attendance/months")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["months"], json!(["2024-05", "2024-04"]));
    }

    #[actix_web::test]
    async fn finalizing_locks_the_month() {
        let store = seeded().await;
        let app = app!(store);

        // newest month by default: 2 days * (100 + 10) + 2 * 5 + 50
        let req = request("GET", "/api/payroll")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["month"], "2024-05");
        assert_eq!(body["locked"], false);
        assert_eq!(body["rows"][0]["total_salary"], 280.0);

        let req = request("POST", "/api/payroll/preview")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"month": "2024-05", "adjustments": [{"employee_id": "E1", "bonus": 20.0}]}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["summary"]["total_payroll"], 300.0);

        let finalize = json!({"month": "2024-05", "adjustments": [{"employee_id": "E1", "overtime": 15.0}]});
        let req = request("POST", "/api/payroll/finalize")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(&finalize)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = request("POST", "/api/payroll/finalize")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(&finalize)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = request("POST", "/api/payroll/preview")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"month": "2024-05"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        // logged rows win over a fresh computation
        let req = request("GET", "/api/payroll?month=2024-05")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["locked"], true);
        assert_eq!(body["rows"][0]["overtime"], 15.0);
        assert_eq!(body["rows"][0]["total_salary"], 295.0);

        let log = store.read("PayrollLog").await.unwrap();
        let rec = log.record(0).unwrap();
        assert_eq!(rec.get("finalized_by"), "hr.ana");
        assert_eq!(rec.get("bank_account_number"), "000123");

        let req = request("GET", "/api/payroll/months")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!([
                {"month": "2024-05", "locked": true},
                {"month": "2024-04", "locked": false}
            ])
        );
    }

    #[actix_web::test]
    async fn payroll_month_errors() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("GET", "/api/payroll?month=05-2024")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let empty = Arc::new(MemorySheets::new());
        let app = app!(empty);
        let req = request("GET", "/api/payroll")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = request("POST", "/api/payroll/finalize")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"month": "2024-05"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn exports_are_excel_attachments() {
        let store = seeded().await;
        let app = app!(store);

        for (uri, filename) in [
            ("/api/payroll/export?month=2024-05", "Payroll_2024-05.xlsx"),
            ("/api/export/employees", "Employees.xlsx"),
            ("/api/export/attendance?month=2024-04", "Attendance_2024-04.xlsx"),
        ] {
            let req = request("GET", uri)
                .insert_header((header::AUTHORIZATION, hr()))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);

            let headers = resp.headers();
            assert_eq!(
                headers.get(header::CONTENT_TYPE).unwrap(),
                crate::utils::xlsx::XLSX_MIME
            );
            let disposition = headers.get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
            assert!(disposition.contains(filename), "{}", disposition);

            let body = test::read_body(resp).await;
            assert!(body.starts_with(b"PK"));
        }
    }

    #[actix_web::test]
    async fn auth_failures_answer_with_a_json_message() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": " ", "password": ""}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_message(resp).await, "Username or password required");

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": "nobody", "password": "x"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_message(resp).await, "Invalid credentials");

        let req = request("GET", "/api/payroll")
            .insert_header((header::AUTHORIZATION, token("ana", Role::Employee, Some("E1"))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_message(resp).await, "HR/Admin only");

        let resp = test::call_service(&app, request("GET", "/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_message(resp).await, "Missing Authorization header");
    }

    #[actix_web::test]
    async fn refresh_follows_the_users_sheet() {
        let store = seeded().await;
        let app = app!(store);

        let login = || {
            request("POST", "/auth/login")
                .set_json(json!({"username": "admin", "password": "admin"}))
                .to_request()
        };
        let body: Value = test::call_and_read_body_json(&app, login()).await;
        let first = format!("Bearer {}", body["refresh_token"].as_str().unwrap());
        let body: Value = test::call_and_read_body_json(&app, login()).await;
        let second = format!("Bearer {}", body["refresh_token"].as_str().unwrap());

        // demoted by hand in the sheet
        store
            .seed(
                "Users",
                grid(&[
                    &["username", "password", "role", "employee_id"],
                    &["admin", "admin", "employee", "E1"],
                ]),
            )
            .await;

        let req = request("POST", "/auth/refresh")
            .insert_header((header::AUTHORIZATION, first))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let access = format!("Bearer {}", body["access_token"].as_str().unwrap());

        let req = request("GET", "/api/me")
            .insert_header((header::AUTHORIZATION, access))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["role"], "employee");
        assert_eq!(body["employee_id"], "E1");

        // removed from the sheet
        store
            .seed("Users", grid(&[&["username", "password", "role", "employee_id"]]))
            .await;

        let req = request("POST", "/auth/refresh")
            .insert_header((header::AUTHORIZATION, second))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_message(resp).await, "Invalid credentials");
    }

    #[actix_web::test]
    async fn logout_revokes_the_refresh_token() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": "admin", "password": "admin"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let refresh = format!("Bearer {}", body["refresh_token"].as_str().unwrap());

        let req = request("POST", "/auth/logout")
            .insert_header((header::AUTHORIZATION, refresh.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = request("POST", "/auth/refresh")
            .insert_header((header::AUTHORIZATION, refresh))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[actix_web::test]
    async fn only_admins_register_users() {
        let store = seeded().await;
        let app = app!(store);
        let admin = token("admin", Role::Admin, None);
        let new_user = json!({"username": "budi", "password": "pw", "role": "employee", "employee_id": "E1"});

        let req = request("POST", "/auth/register")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(&new_user)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = request("POST", "/auth/register")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(&new_user)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let users = store.read("Users").await.unwrap();
        let rec = users.record(1).unwrap();
        assert_eq!(rec.get("username"), "budi");
        assert_eq!(rec.get("employee_id"), "E1");
        assert!(rec.get("password").starts_with("$argon2"));

        let req = request("POST", "/auth/register")
            .insert_header((header::AUTHORIZATION, admin))
            .set_json(json!({"username": "BUDI", "password": "pw", "role": "hr"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = request("POST", "/auth/login")
            .set_json(json!({"username": "budi", "password": "pw"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn bootstrap_admin_is_seeded_once() {
        let store = MemorySheets::new();
        let mut config = Config::for_tests();
        config.bootstrap_admin = Some(("root".to_string(), "changeme".to_string()));

        bootstrap_admin(&store, &config).await.unwrap();
        bootstrap_admin(&store, &config).await.unwrap();

        let users = store.read("Users").await.unwrap();
        let records: Vec<_> = users.records().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("username"), "root");
        assert_eq!(records[0].get("role"), "admin");
        assert!(records[0].get("password").starts_with("$argon2"));
    }

    #[actix_web::test]
    async fn check_in_once_per_day() {
        let store = seeded().await;
        let app = app!(store);
        let own = token("ana", Role::Employee, Some("E1"));

        let req = request("POST", "/api/attendance/check-in")
            .insert_header((header::AUTHORIZATION, own.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["employee_id"], "E1");
        assert_eq!(body["status"], "Present");

        let req = request("POST", "/api/attendance/check-in")
            .insert_header((header::AUTHORIZATION, own))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_message(resp).await, "Already checked in today");

        let req = request("POST", "/api/attendance/check-in")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_employees_are_not_found() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("PUT", "/api/employee/E9")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"department": "Finance"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_message(resp).await, "Employee not found");

        let req = request("DELETE", "/api/employee/E9")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        assert_eq!(employee_ids(&store.read("Employees").await.unwrap()), ["E1"]);
    }

    #[actix_web::test]
    async fn attendance_pages_through_the_list() {
        let store = seeded().await;
        let app = app!(store);

        let req = request("GET", "/api/attendance?per_page=3&page=2")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 4);
        assert_eq!(body["page"], 2);
        assert_eq!(body["per_page"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["date"], "2024-04-30");
    }

    #[actix_web::test]
    async fn updates_keep_columns_outside_the_model() {
        let store = seeded().await;
        store
            .seed(
                "Employees",
                grid(&[
                    &["employee_id", "full_name", "daily_rate_basic", "notes"],
                    &["E1", "Ana", "100", "keep me"],
                ]),
            )
            .await;
        store
            .seed(
                "Attendance",
                grid(&[
                    &["date", "employee_id", "status", "remark"],
                    &["2024-05-01", "E1", "Present", "late bus"],
                ]),
            )
            .await;
        let app = app!(store);

        let req = request("PUT", "/api/employee/E1")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"full_name": "Ana R"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = request("PUT", "/api/attendance")
            .insert_header((header::AUTHORIZATION, hr()))
            .set_json(json!({"date": "2024-05-01", "employee_id": "E1", "status": "absent"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let employees = store.read("Employees").await.unwrap();
        let rec = employees.record(0).unwrap();
        assert_eq!(rec.get("full_name"), "Ana R");
        assert_eq!(rec.get("notes"), "keep me");

        let attendance = store.read("Attendance").await.unwrap();
        let rec = attendance.record(0).unwrap();
        assert_eq!(rec.get("status"), "Absent");
        assert_eq!(rec.get("remark"), "late bus");
    }

    #[actix_web::test]
    async fn deletes_target_the_live_row_not_the_cached_one() {
        let store = Arc::new(CachedStore::new(MemorySheets::new(), Duration::from_secs(300)));
        let header_row: &[&str] = &["employee_id", "full_name"];
        store
            .inner()
            .seed("Employees", grid(&[header_row, &["E1", "Ana"], &["E2", "Budi"]]))
            .await;
        let app = app!(store);

        let req = request("GET", "/api/employee")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 2);

        // a row inserted by hand above the others
        store
            .inner()
            .seed(
                "Employees",
                grid(&[header_row, &["E0", "Citra"], &["E1", "Ana"], &["E2", "Budi"]]),
            )
            .await;

        let req = request("DELETE", "/api/employee/E2")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let live = store.inner().read("Employees").await.unwrap();
        assert_eq!(employee_ids(&live), ["E0", "E1"]);
    }

    #[actix_web::test]
    async fn concurrent_finalize_logs_the_month_once() {
        let store = YieldingSheets(MemorySheets::new());
        seed_into(&store.0).await;
        let store = Arc::new(store);
        let app = app!(store);

        let finalize = || {
            request("POST", "/api/payroll/finalize")
                .insert_header((header::AUTHORIZATION, hr()))
                .set_json(json!({"month": "2024-05"}))
                .to_request()
        };
        let (a, b) = futures::join!(
            test::call_service(&app, finalize()),
            test::call_service(&app, finalize())
        );
        let mut statuses = [a.status(), b.status()];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

        let log = store.read("PayrollLog").await.unwrap();
        assert_eq!(log.records().count(), 1);

        let req = request("GET", "/api/payroll?month=2024-05")
            .insert_header((header::AUTHORIZATION, hr()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["locked"], true);
        assert_eq!(body["summary"]["employee_count"], 1);
        assert_eq!(body["summary"]["total_payroll"], 280.0);
    }
}
