use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::utils::http_utils::unauthorized;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

fn reject(req: ServiceRequest, reason: &str) -> ServiceResponse<BoxBody> {
    debug!(path = %req.path(), reason, "Request rejected");
    req.into_response(unauthorized(reason).map_into_boxed_body())
}

/// Validates the bearer access token and attaches the caller as [`AuthUser`].
/// Refresh tokens are not accepted here.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let secret = match req.app_data::<Data<Config>>() {
        Some(config) => config.jwt_secret.clone(),
        None => return Err(actix_web::error::ErrorInternalServerError("App config missing")),
    };

    let header = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map(str::to_owned));

    let token = match header {
        None => return Ok(reject(req, "Missing Authorization header")),
        Some(Err(_)) => return Ok(reject(req, "Invalid Authorization header encoding")),
        Some(Ok(value)) => match value.strip_prefix("Bearer ") {
            Some(t) => t.to_owned(),
            None => {
                return Ok(reject(
                    req,
                    "Authorization header must start with Bearer",
                ));
            }
        },
    };

    match AuthUser::from_access_token(&token, &secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(reason) => Ok(reject(req, reason)),
    }
}
