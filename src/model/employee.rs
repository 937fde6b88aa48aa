use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::store::{Record, Table};
use crate::utils::sheet_utils::{
    check_amount, format_amount, is_valid_date, safe_float, value_as_amount, value_as_text,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "employee_id": "EMP-001",
        "full_name": "Siti Rahma",
        "department": "Operations",
        "position": "Supervisor",
        "email": "siti@company.com",
        "phone": "+628123456789",
        "join_date": "2023-02-01",
        "status": "active",
        "daily_rate_basic": 150000.0,
        "daily_rate_transport": 25000.0,
        "meal_allowance_daily": 20000.0,
        "allowance_monthly": 500000.0,
        "bank_account_number": "0123456789"
    })
)]
pub struct Employee {
    pub employee_id: String,
    pub full_name: String,
    pub department: String,
    pub position: String,
    pub email: String,
    pub phone: String,

    #[schema(example = "2023-02-01", format = "date")]
    pub join_date: String,

    #[schema(example = "active")]
    pub status: String,

    pub daily_rate_basic: f64,
    pub daily_rate_transport: f64,
    pub meal_allowance_daily: f64,
    pub allowance_monthly: f64,

    /// Kept as text so leading zeros survive.
    pub bank_account_number: String,
}

impl Employee {
    pub fn from_record(rec: &Record<'_>) -> Self {
        Self {
            employee_id: rec.get("employee_id").to_string(),
            full_name: rec.get("full_name").to_string(),
            department: rec.get("department").to_string(),
            position: rec.get("position").to_string(),
            email: rec.get("email").to_string(),
            phone: rec.get("phone").to_string(),
            join_date: rec.get("join_date").to_string(),
            status: rec.get("status").to_string(),
            daily_rate_basic: safe_float(rec.get("daily_rate_basic")),
            daily_rate_transport: safe_float(rec.get("daily_rate_transport")),
            meal_allowance_daily: safe_float(rec.get("meal_allowance_daily")),
            allowance_monthly: safe_float(rec.get("allowance_monthly")),
            bank_account_number: rec.get("bank_account_number").to_string(),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("employee_id", self.employee_id.clone()),
            ("full_name", self.full_name.clone()),
            ("department", self.department.clone()),
            ("position", self.position.clone()),
            ("email", self.email.clone()),
            ("phone", self.phone.clone()),
            ("join_date", self.join_date.clone()),
            ("status", self.status.clone()),
            ("daily_rate_basic", format_amount(self.daily_rate_basic)),
            ("daily_rate_transport", format_amount(self.daily_rate_transport)),
            ("meal_allowance_daily", format_amount(self.meal_allowance_daily)),
            ("allowance_monthly", format_amount(self.allowance_monthly)),
            ("bank_account_number", self.bank_account_number.clone()),
        ]
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.employee_id.trim().is_empty() {
            return Err("employee_id is required".into());
        }
        if self.full_name.trim().is_empty() {
            return Err("full_name is required".into());
        }
        if !self.join_date.is_empty() && !is_valid_date(&self.join_date) {
            return Err("join_date must be YYYY-MM-DD".into());
        }
        check_amount("daily_rate_basic", self.daily_rate_basic)?;
        check_amount("daily_rate_transport", self.daily_rate_transport)?;
        check_amount("meal_allowance_daily", self.meal_allowance_daily)?;
        check_amount("allowance_monthly", self.allowance_monthly)?;
        Ok(())
    }

    /// Applies a partial JSON update. The key column cannot change.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        if patch.is_empty() {
            return Err("No fields provided for update".into());
        }

        for (field, value) in patch {
            match field.as_str() {
                "employee_id" => {
                    if value_as_text(field, value)? != self.employee_id {
                        return Err("employee_id cannot be changed".into());
                    }
                }
                "full_name" => self.full_name = value_as_text(field, value)?,
                "department" => self.department = value_as_text(field, value)?,
                "position" => self.position = value_as_text(field, value)?,
                "email" => self.email = value_as_text(field, value)?,
                "phone" => self.phone = value_as_text(field, value)?,
                "join_date" => self.join_date = value_as_text(field, value)?,
                "status" => self.status = value_as_text(field, value)?,
                "daily_rate_basic" => self.daily_rate_basic = value_as_amount(field, value)?,
                "daily_rate_transport" => {
                    self.daily_rate_transport = value_as_amount(field, value)?
                }
                "meal_allowance_daily" => {
                    self.meal_allowance_daily = value_as_amount(field, value)?
                }
                "allowance_monthly" => self.allowance_monthly = value_as_amount(field, value)?,
                "bank_account_number" => {
                    self.bank_account_number = value_as_text(field, value)?
                }
                other => return Err(format!("Unknown field '{}'", other)),
            }
        }

        self.validate()
    }
}

/// Directory in sheet order. Rows without an id are skipped.
pub fn load_employees(table: &Table) -> Vec<Employee> {
    table
        .records()
        .filter(|rec| !rec.get("employee_id").is_empty())
        .map(|rec| Employee::from_record(&rec))
        .collect()
}
