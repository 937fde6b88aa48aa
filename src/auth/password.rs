use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

/// Checks a login attempt against the users sheet cell.
///
/// Rows written by this service hold argon2 hashes. Rows typed in by hand
/// hold the password itself and are compared exactly.
pub fn check_credential(password: &str, stored: &str) -> bool {
    if stored.starts_with("$argon2") {
        verify_password(password, stored).is_ok()
    } else {
        !stored.is_empty() && password == stored
    }
}
