use chrono::NaiveDate;
use serde_json::Value;

/// Reads a money or count cell leniently.
///
/// Thousands separators and the `Rp` marker are stripped; blanks and
/// anything that still fails to parse read as zero.
pub fn safe_float(raw: &str) -> f64 {
    let cleaned = raw.replace(',', "").replace("Rp", "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Formats an amount for a sheet cell, without a trailing `.0` on whole numbers.
pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

pub fn is_valid_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

/// Text from a JSON patch value. Numbers are accepted and stringified so a
/// bank account sent as a number still lands as text.
pub fn value_as_text(field: &str, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(format!("{} must be a string", field)),
    }
}

/// Non-negative amount from a JSON patch value; numeric strings go through
/// the same lenient parsing as sheet cells.
pub fn value_as_amount(field: &str, value: &Value) -> Result<f64, String> {
    let amount = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{} must be a number", field))?,
        Value::String(s) => safe_float(s),
        Value::Null => 0.0,
        _ => return Err(format!("{} must be a number", field)),
    };
    check_amount(field, amount)
}

pub fn check_amount(field: &str, amount: f64) -> Result<f64, String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("{} must be a non-negative number", field));
    }
    Ok(amount)
}

/// Page slice for 1-based `page`; returns the clamped (page, per_page).
pub fn paginate<T>(items: Vec<T>, page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> (Vec<T>, u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, 100);
    let offset = (page as usize - 1) * per_page as usize;

    let data = items
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();
    (data, page, per_page)
}
