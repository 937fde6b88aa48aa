use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims(
    username: String,
    role: u8,
    employee_id: Option<String>,
    ttl: usize,
    token_type: TokenType,
) -> Claims {
    Claims {
        sub: username,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        employee_id,
    }
}

pub fn generate_access_token(
    username: String,
    role: u8,
    employee_id: Option<String>,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    let claims = claims(username, role, employee_id, ttl, TokenType::Access);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_refresh_token(
    username: String,
    role: u8,
    employee_id: Option<String>,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = claims(username, role, employee_id, ttl, TokenType::Refresh);

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
