use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{check_credential, hash_password},
        refresh_registry::RefreshRegistry,
    },
    config::Config,
    model::{employee::load_employees, role::Role, user::User},
    models::{LoginReqDto, TokenType, UserReq},
    store::{SheetStore, Table, USER_HEADERS, encode_row, headers},
    utils::http_utils::{bad_request, conflict, store_error, unauthorized},
};
use actix_web::{HttpRequest, HttpResponse, Responder, error::ErrorInternalServerError, get, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

/// Finds a user row by username, ignoring case and surrounding blanks.
fn find_user(table: &Table, username: &str) -> Option<User> {
    let wanted = username.trim();
    table
        .records()
        .find(|rec| rec.get("username").eq_ignore_ascii_case(wanted))
        .map(|rec| User::from_record(&rec))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

/// Issues an access/refresh pair and records the refresh token as live.
async fn issue_tokens(
    username: String,
    role: Role,
    employee_id: Option<String>,
    config: &Config,
    registry: &RefreshRegistry,
) -> Result<LoginResponse, jsonwebtoken::errors::Error> {
    let access_token = generate_access_token(
        username.clone(),
        role.id(),
        employee_id.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    )?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        username.clone(),
        role.id(),
        employee_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )?;

    debug!(jti = %refresh_claims.jti, "Registering refresh token");
    registry.issue(&refresh_claims.jti, &username).await;

    Ok(LoginResponse {
        access_token,
        refresh_token,
    })
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(store, config, registry, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    registry: web::Data<RefreshRegistry>,
) -> actix_web::Result<HttpResponse> {
    info!("Login request received");

    // 1️⃣ Basic validation
    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Ok(bad_request("Username or password required"));
    }

    debug!("Reading users sheet");

    // 2️⃣ Fetch user row
    let users = store
        .read(&config.sheets.users)
        .await
        .map_err(store_error)?;

    let db_user = match find_user(&users, &user.username) {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Ok(unauthorized("Invalid credentials"));
        }
    };

    // 3️⃣ Verify password
    if !check_credential(&user.password, &db_user.password) {
        info!("Invalid credentials: password mismatch");
        return Ok(unauthorized("Invalid credentials"));
    }

    let role = match db_user.role.parse::<Role>() {
        Ok(r) => r,
        Err(_) => {
            warn!(role = %db_user.role, "User row has an unknown role");
            return Ok(unauthorized("Invalid credentials"));
        }
    };

    // 4️⃣ Tokens
    let tokens = issue_tokens(
        db_user.username.clone(),
        role,
        db_user.employee_id.clone(),
        &config,
        &registry,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to sign tokens");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The signed-in user", body = AuthUser),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[get("/me")]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(auth)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
    registry: web::Data<RefreshRegistry>,
) -> actix_web::Result<HttpResponse> {
    let token = match bearer(&req) {
        Some(t) => t,
        None => return Ok(unauthorized("No token")),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(unauthorized("Invalid or expired token")),
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(unauthorized("Refresh token required"));
    }

    // 🔥 revoke old refresh token; a second redemption fails here
    if !registry.redeem(&claims.jti).await {
        info!(username = %claims.sub, "Refresh token not live");
        return Ok(unauthorized("Refresh token revoked"));
    }

    // role and employee link come from the sheet, not the old token
    let users = store
        .read_fresh(&config.sheets.users)
        .await
        .map_err(store_error)?;

    let db_user = match find_user(&users, &claims.sub) {
        Some(u) => u,
        None => {
            info!(username = %claims.sub, "Refresh for a user no longer in the sheet");
            return Ok(unauthorized("Invalid credentials"));
        }
    };

    let role = match db_user.role.parse::<Role>() {
        Ok(r) => r,
        Err(_) => {
            warn!(role = %db_user.role, "User row has an unknown role");
            return Ok(unauthorized("Invalid credentials"));
        }
    };

    // 🔄 issue new pair
    let tokens = issue_tokens(db_user.username, role, db_user.employee_id, &config, &registry)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to sign tokens");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    registry: web::Data<RefreshRegistry>,
) -> impl Responder {
    // 1️⃣ extract Authorization header
    let token = match bearer(&req) {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    // 2️⃣ verify JWT
    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // 3️⃣ only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // 4️⃣ revoke refresh token (idempotent)
    registry.revoke(&claims.jti).await;

    HttpResponse::NoContent().finish()
}

/// User registration handler (admin only)
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserReq,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register(
    auth: AuthUser,
    user: web::Json<UserReq>,
    store: web::Data<dyn SheetStore>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;

    let username = user.username.trim();
    let password = &user.password;

    if username.is_empty() || password.is_empty() {
        return Ok(bad_request("Username and password must not be empty"));
    }

    let role = match user.role.trim().parse::<Role>() {
        Ok(r) => r,
        Err(_) => return Ok(bad_request(format!("Unknown role '{}'", user.role))),
    };

    let employee_id = user
        .employee_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    if let Some(id) = &employee_id {
        let employees = store
            .read(&config.sheets.employees)
            .await
            .map_err(store_error)?;
        if !load_employees(&employees).iter().any(|e| &e.employee_id == id) {
            return Ok(bad_request(format!("Unknown employee '{}'", id)));
        }
    }

    let users = store
        .read(&config.sheets.users)
        .await
        .map_err(store_error)?;

    if find_user(&users, username).is_some() {
        return Ok(conflict("Username already taken"));
    }

    let hashed = hash_password(password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let new_user = User {
        username: username.to_string(),
        password: hashed,
        role: role.to_string(),
        employee_id,
    };

    let header_row = if users.headers.is_empty() {
        headers(USER_HEADERS)
    } else {
        users.headers.clone()
    };
    let row = encode_row(&header_row, &new_user.to_fields());

    store
        .append(&config.sheets.users, &header_row, vec![row])
        .await
        .map_err(store_error)?;

    info!(username, role = %role, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

/// Seeds an admin user when the users sheet has none yet.
pub async fn bootstrap_admin(store: &dyn SheetStore, config: &Config) -> anyhow::Result<()> {
    let Some((username, password)) = &config.bootstrap_admin else {
        return Ok(());
    };

    let users = store.read(&config.sheets.users).await?;
    let has_admin = users
        .records()
        .any(|rec| matches!(rec.get("role").parse::<Role>(), Ok(Role::Admin)));
    if has_admin {
        return Ok(());
    }

    let admin = User {
        username: username.trim().to_string(),
        password: hash_password(password).map_err(|e| anyhow::anyhow!("{}", e))?,
        role: Role::Admin.to_string(),
        employee_id: None,
    };
    let header_row = headers(USER_HEADERS);
    let row = if users.headers.is_empty() {
        encode_row(&header_row, &admin.to_fields())
    } else {
        users.encode(&admin.to_fields())
    };
    store.append(&config.sheets.users, &header_row, vec![row]).await?;

    info!(username = %admin.username, "Bootstrap admin created");
    Ok(())
}
