use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use crate::utils::http_utils::forbidden;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(value_type = String, example = "admin")]
    pub role: Role,

    /// Present only if this user is linked to an employee record
    #[schema(example = "EMP-001", nullable = true)]
    pub employee_id: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by the auth middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ))
            }
        };

        ready(AuthUser::from_access_token(token, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    pub fn from_access_token(token: &str, secret: &str) -> Result<Self, &'static str> {
        let claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;

        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }

        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(forbidden("HR/Admin only"))
        }
    }

    /// Returns true if the user is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    /// HR and admins see everyone; employees only their own linked record.
    pub fn require_access_to(&self, employee_id: &str) -> actix_web::Result<()> {
        if !self.is_employee() {
            return Ok(());
        }
        match &self.employee_id {
            Some(own) if own == employee_id.trim() => Ok(()),
            _ => Err(forbidden("Not your record")),
        }
    }
}
