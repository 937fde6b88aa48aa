use std::str::FromStr;

use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A payroll month in `YYYY-MM` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month(String);

impl Month {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Month of a `YYYY-MM-DD` attendance date, judged by its prefix.
    pub fn of_date(date: &str) -> Option<Self> {
        date.trim().get(..7).and_then(|m| m.parse().ok())
    }

    /// True when `date` falls in this month (prefix match).
    pub fn contains(&self, date: &str) -> bool {
        date.trim().starts_with(self.0.as_str())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let well_formed = s.len() == 7
            && NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").is_ok();
        if well_formed {
            Ok(Month(s.to_string()))
        } else {
            Err(format!("'{}' is not a month in YYYY-MM form", s))
        }
    }
}

impl TryFrom<String> for Month {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.0
    }
}
