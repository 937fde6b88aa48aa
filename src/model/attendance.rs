use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::month::Month;
use crate::store::{Record, Table};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString, Serialize, ToSchema)]
#[strum(ascii_case_insensitive)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown attendance status '{}'", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Attendance {
    #[schema(example = "2024-05-02", format = "date")]
    pub date: String,
    #[schema(example = "EMP-001")]
    pub employee_id: String,
    /// As written in the sheet; normally `Present` or `Absent`.
    #[schema(example = "Present")]
    pub status: String,
}

impl Attendance {
    pub fn from_record(rec: &Record<'_>) -> Self {
        Self {
            date: rec.get("date").to_string(),
            employee_id: rec.get("employee_id").to_string(),
            status: rec.get("status").to_string(),
        }
    }

    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("date", self.date.clone()),
            ("employee_id", self.employee_id.clone()),
            ("status", self.status.clone()),
        ]
    }

    pub fn is_present(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("present")
    }
}

pub fn load_attendance(table: &Table) -> Vec<Attendance> {
    table
        .records()
        .filter(|rec| !rec.get("date").is_empty() || !rec.get("employee_id").is_empty())
        .map(|rec| Attendance::from_record(&rec))
        .collect()
}

/// Row index of the entry for `employee_id` on `date`.
pub fn find_entry(table: &Table, date: &str, employee_id: &str) -> Option<usize> {
    table
        .records()
        .position(|rec| rec.get("date") == date.trim() && rec.get("employee_id") == employee_id.trim())
}

/// Distinct months that have attendance, newest first.
pub fn attendance_months(rows: &[Attendance]) -> Vec<Month> {
    let mut months: Vec<Month> = rows.iter().filter_map(|a| Month::of_date(&a.date)).collect();
    months.sort_unstable_by(|a, b| b.cmp(a));
    months.dedup();
    months
}

/// Present days per employee for one month.
pub fn present_days(rows: &[Attendance], month: &Month, employee_id: &str) -> u32 {
    let employee_id = employee_id.trim();
    rows.iter()
        .filter(|a| month.contains(&a.date) && a.employee_id == employee_id && a.is_present())
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, id: &str, status: &str) -> Attendance {
        Attendance {
            date: date.into(),
            employee_id: id.into(),
            status: status.into(),
        }
    }

    #[test]
    fn status_parses_any_case() {
        assert_eq!("present".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Present);
        assert_eq!("ABSENT".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Absent);
        assert!("leave".parse::<AttendanceStatus>().is_err());
        assert_eq!(AttendanceStatus::Present.to_string(), "Present");
        assert_eq!(
            serde_json::from_str::<AttendanceStatus>("\"absent\"").unwrap(),
            AttendanceStatus::Absent
        );
    }

    #[test]
    fn months_are_distinct_and_newest_first() {
        let rows = vec![
            row("2024-04-30", "E1", "Present"),
            row("2024-05-01", "E1", "Present"),
            row("2024-05-02", "E2", "Absent"),
            row("garbage", "E2", "Absent"),
            row("2023-12-15", "E1", "Present"),
        ];

        let months: Vec<String> = attendance_months(&rows).into_iter().map(String::from).collect();
        assert_eq!(months, vec!["2024-05", "2024-04", "2023-12"]);
    }

    #[test]
    fn present_days_counts_only_present_in_month() {
        let may: Month = "2024-05".parse().unwrap();
        let rows = vec![
            row("2024-05-01", "E1", "present"),
            row("2024-05-02", "E1", " PRESENT "),
            row("2024-05-03", "E1", "Absent"),
            row("2024-06-01", "E1", "Present"),
            row("2024-05-01", "E2", "Present"),
        ];

        assert_eq!(present_days(&rows, &may, "E1"), 2);
        assert_eq!(present_days(&rows, &may, " E2"), 1);
        assert_eq!(present_days(&rows, &may, "E3"), 0);
    }
}
