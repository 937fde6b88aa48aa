use crate::store::Record;

/// A row of the users sheet.
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password: String,
    pub role: String,
    pub employee_id: Option<String>,
}

impl User {
    pub fn from_record(rec: &Record<'_>) -> Self {
        let employee_id = rec.get("employee_id");
        Self {
            username: rec.get("username").to_string(),
            password: rec.get("password").to_string(),
            role: rec.get("role").to_string(),
            employee_id: (!employee_id.is_empty()).then(|| employee_id.to_string()),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("role", self.role.clone()),
            ("employee_id", self.employee_id.clone().unwrap_or_default()),
        ]
    }
}
