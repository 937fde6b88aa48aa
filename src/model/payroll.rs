use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::{Attendance, present_days};
use crate::model::employee::Employee;
use crate::model::month::Month;
use crate::store::{Record, Table};
use crate::utils::sheet_utils::{check_amount, format_amount, safe_float};

/// One employee's pay for one month.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollRow {
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    pub full_name: String,
    pub bank_account_number: String,
    pub present_days: u32,
    pub daily_basic: f64,
    pub daily_transport: f64,
    pub meal_allowance_daily: f64,
    pub allowance_monthly: f64,
    pub overtime: f64,
    pub bonus: f64,
    pub salary_from_attendance: f64,
    pub meal_allowance_total: f64,
    pub total_salary: f64,
}

impl PayrollRow {
    fn new(emp: &Employee, present_days: u32) -> Self {
        let mut row = Self {
            employee_id: emp.employee_id.clone(),
            full_name: emp.full_name.clone(),
            bank_account_number: emp.bank_account_number.clone(),
            present_days,
            daily_basic: emp.daily_rate_basic,
            daily_transport: emp.daily_rate_transport,
            meal_allowance_daily: emp.meal_allowance_daily,
            allowance_monthly: emp.allowance_monthly,
            overtime: 0.0,
            bonus: 0.0,
            salary_from_attendance: 0.0,
            meal_allowance_total: 0.0,
            total_salary: 0.0,
        };
        row.recalculate();
        row
    }

    /// Derived columns from the inputs.
    pub fn recalculate(&mut self) {
        let days = f64::from(self.present_days);
        self.salary_from_attendance = days * (self.daily_basic + self.daily_transport);
        self.meal_allowance_total = days * self.meal_allowance_daily;
        self.total_salary = self.salary_from_attendance
            + self.meal_allowance_total
            + self.allowance_monthly
            + self.overtime
            + self.bonus;
    }

    fn apply(&mut self, adj: &Adjustment) {
        if let Some(days) = adj.present_days {
            self.present_days = days;
        }
        if let Some(overtime) = adj.overtime {
            self.overtime = overtime;
        }
        if let Some(bonus) = adj.bonus {
            self.bonus = bonus;
        }
        self.recalculate();
    }

    pub fn from_log_record(rec: &Record<'_>) -> Self {
        Self {
            employee_id: rec.get("employee_id").to_string(),
            full_name: rec.get("full_name").to_string(),
            bank_account_number: rec.get("bank_account_number").to_string(),
            present_days: safe_float(rec.get("present_days")).max(0.0) as u32,
            daily_basic: safe_float(rec.get("daily_basic")),
            daily_transport: safe_float(rec.get("daily_transport")),
            meal_allowance_daily: safe_float(rec.get("meal_allowance_daily")),
            allowance_monthly: safe_float(rec.get("allowance_monthly")),
            overtime: safe_float(rec.get("overtime")),
            bonus: safe_float(rec.get("bonus")),
            salary_from_attendance: safe_float(rec.get("salary_from_attendance")),
            meal_allowance_total: safe_float(rec.get("meal_allowance_total")),
            total_salary: safe_float(rec.get("total_salary")),
        }
    }

    pub fn to_log_fields(
        &self,
        month: &Month,
        finalized_at: &str,
        finalized_by: &str,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("month", month.to_string()),
            ("employee_id", self.employee_id.clone()),
            ("full_name", self.full_name.clone()),
            ("bank_account_number", self.bank_account_number.clone()),
            ("present_days", self.present_days.to_string()),
            ("daily_basic", format_amount(self.daily_basic)),
            ("daily_transport", format_amount(self.daily_transport)),
            ("meal_allowance_daily", format_amount(self.meal_allowance_daily)),
            ("allowance_monthly", format_amount(self.allowance_monthly)),
            ("overtime", format_amount(self.overtime)),
            ("bonus", format_amount(self.bonus)),
            ("salary_from_attendance", format_amount(self.salary_from_attendance)),
            ("meal_allowance_total", format_amount(self.meal_allowance_total)),
            ("total_salary", format_amount(self.total_salary)),
            ("finalized_at", finalized_at.to_string()),
            ("finalized_by", finalized_by.to_string()),
        ]
    }
}

/// Manual edits to one employee's computed row.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Adjustment {
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    #[schema(example = 22)]
    pub present_days: Option<u32>,
    #[schema(example = 150000.0)]
    pub overtime: Option<f64>,
    #[schema(example = 250000.0)]
    pub bonus: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayrollSummary {
    #[schema(example = "2024-05", value_type = String)]
    pub month: Month,
    pub total_payroll: f64,
    pub average_salary: f64,
    pub employee_count: usize,
}

impl PayrollSummary {
    pub fn of(month: &Month, rows: &[PayrollRow]) -> Self {
        let total: f64 = rows.iter().map(|r| r.total_salary).sum();
        let average = if rows.is_empty() {
            0.0
        } else {
            total / rows.len() as f64
        };

        Self {
            month: month.clone(),
            total_payroll: total,
            average_salary: average,
            employee_count: rows.len(),
        }
    }
}

/// A month's payroll as shown to the user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayrollSheet {
    #[schema(example = "2024-05", value_type = String)]
    pub month: Month,
    /// True once the month has been finalized; rows then come from the log.
    pub locked: bool,
    pub rows: Vec<PayrollRow>,
    pub summary: PayrollSummary,
}

impl PayrollSheet {
    pub fn new(month: Month, locked: bool, rows: Vec<PayrollRow>) -> Self {
        let summary = PayrollSummary::of(&month, &rows);
        Self {
            month,
            locked,
            rows,
            summary,
        }
    }
}

/// Computes every employee's pay for `month`, in directory order.
pub fn compute_payroll(
    employees: &[Employee],
    attendance: &[Attendance],
    month: &Month,
    adjustments: &[Adjustment],
) -> Result<Vec<PayrollRow>, String> {
    let mut by_id: HashMap<&str, &Adjustment> = HashMap::new();
    for adj in adjustments {
        let id = adj.employee_id.trim();
        if !employees.iter().any(|e| e.employee_id == id) {
            return Err(format!("Adjustment for unknown employee '{}'", id));
        }
        if let Some(overtime) = adj.overtime {
            check_amount("overtime", overtime)?;
        }
        if let Some(bonus) = adj.bonus {
            check_amount("bonus", bonus)?;
        }
        by_id.insert(id, adj);
    }

    Ok(employees
        .iter()
        .map(|emp| {
            let days = present_days(attendance, month, &emp.employee_id);
            let mut row = PayrollRow::new(emp, days);
            if let Some(adj) = by_id.get(emp.employee_id.as_str()) {
                row.apply(adj);
            }
            row
        })
        .collect())
}

/// Months that already have finalized rows in the log.
pub fn is_finalized(log: &Table, month: &Month) -> bool {
    log.records().any(|rec| rec.get("month") == month.as_str())
}

/// The month's rows from its first finalization. Later batches for the same
/// month and repeated employee ids within a batch are ignored.
pub fn logged_rows(log: &Table, month: &Month) -> Vec<PayrollRow> {
    let mut batch: Option<String> = None;
    let mut seen = HashSet::new();

    log.records()
        .filter(|rec| rec.get("month") == month.as_str())
        .filter(|rec| {
            let stamp = batch.get_or_insert_with(|| rec.get("finalized_at").to_string());
            rec.get("finalized_at") == stamp.as_str()
        })
        .filter(|rec| seen.insert(rec.get("employee_id").to_string()))
        .map(|rec| PayrollRow::from_log_record(&rec))
        .collect()
}
