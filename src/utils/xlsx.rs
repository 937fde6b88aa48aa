//! Excel downloads.

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::model::attendance::Attendance;
use crate::model::employee::Employee;
use crate::model::payroll::PayrollSheet;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin)
}

/// Writes the bold header row with widths and freezes it.
fn write_header(worksheet: &mut Worksheet, columns: &[(&str, f64)]) -> Result<(), XlsxError> {
    let format = header_format();
    for (col, (title, width)) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &format)?;
        worksheet.set_column_width(col as u16, *width)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn finish(worksheet: &mut Worksheet, rows: usize, columns: usize) -> Result<(), XlsxError> {
    if rows > 0 && columns > 0 {
        worksheet.autofilter(0, 0, rows as u32, (columns - 1) as u16)?;
    }
    Ok(())
}

/// Payroll for one month, with a totals row under the data.
pub fn payroll_workbook(sheet: &PayrollSheet) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Payroll")?;

    let columns = [
        ("Employee ID", 14.0),
        ("Name", 28.0),
        ("Bank Account", 20.0),
        ("Present Days", 12.0),
        ("Daily Basic", 14.0),
        ("Daily Transport", 14.0),
        ("Meal Allowance / Day", 18.0),
        ("Fixed Allowance", 16.0),
        ("Overtime", 12.0),
        ("Bonus", 12.0),
        ("Salary From Attendance", 20.0),
        ("Meal Allowance Total", 18.0),
        ("Total Salary", 16.0),
    ];
    write_header(worksheet, &columns)?;

    let money = Format::new().set_num_format("#,##0.00");

    for (idx, r) in sheet.rows.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, &r.employee_id)?;
        worksheet.write_string(row, 1, &r.full_name)?;
        // text, so account numbers keep leading zeros
        worksheet.write_string(row, 2, &r.bank_account_number)?;
        worksheet.write_number(row, 3, r.present_days)?;

        let amounts = [
            r.daily_basic,
            r.daily_transport,
            r.meal_allowance_daily,
            r.allowance_monthly,
            r.overtime,
            r.bonus,
            r.salary_from_attendance,
            r.meal_allowance_total,
            r.total_salary,
        ];
        for (offset, amount) in amounts.iter().enumerate() {
            worksheet.write_number_with_format(row, 4 + offset as u16, *amount, &money)?;
        }
    }

    let total_row = (sheet.rows.len() + 1) as u32;
    let bold = Format::new().set_bold();
    let bold_money = Format::new().set_bold().set_num_format("#,##0.00");
    worksheet.write_string_with_format(total_row, 0, "TOTAL", &bold)?;
    worksheet.write_number_with_format(total_row, 12, sheet.summary.total_payroll, &bold_money)?;

    finish(worksheet, sheet.rows.len(), columns.len())?;
    workbook.save_to_buffer()
}

pub fn employees_workbook(employees: &[Employee]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Employees")?;

    let columns = [
        ("Employee ID", 14.0),
        ("Full Name", 28.0),
        ("Department", 18.0),
        ("Position", 18.0),
        ("Email", 28.0),
        ("Phone", 16.0),
        ("Join Date", 12.0),
        ("Status", 10.0),
        ("Daily Basic", 14.0),
        ("Daily Transport", 14.0),
        ("Meal Allowance / Day", 18.0),
        ("Fixed Allowance", 16.0),
        ("Bank Account", 20.0),
    ];
    write_header(worksheet, &columns)?;

    for (idx, e) in employees.iter().enumerate() {
        let row = (idx + 1) as u32;
        let text = [
            &e.employee_id,
            &e.full_name,
            &e.department,
            &e.position,
            &e.email,
            &e.phone,
            &e.join_date,
            &e.status,
        ];
        for (col, value) in text.iter().enumerate() {
            worksheet.write_string(row, col as u16, value.as_str())?;
        }
        worksheet.write_number(row, 8, e.daily_rate_basic)?;
        worksheet.write_number(row, 9, e.daily_rate_transport)?;
        worksheet.write_number(row, 10, e.meal_allowance_daily)?;
        worksheet.write_number(row, 11, e.allowance_monthly)?;
        worksheet.write_string(row, 12, &e.bank_account_number)?;
    }

    finish(worksheet, employees.len(), columns.len())?;
    workbook.save_to_buffer()
}

pub fn attendance_workbook(rows: &[Attendance]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Attendance")?;

    let columns = [("Date", 12.0), ("Employee ID", 14.0), ("Status", 10.0)];
    write_header(worksheet, &columns)?;

    for (idx, a) in rows.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_string(row, 0, &a.date)?;
        worksheet.write_string(row, 1, &a.employee_id)?;
        worksheet.write_string(row, 2, &a.status)?;
    }

    finish(worksheet, rows.len(), columns.len())?;
    workbook.save_to_buffer()
}
