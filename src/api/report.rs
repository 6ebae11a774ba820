use std::fmt::Write as _;
use std::io;

use crate::core::{HouseholdBudget, ProjectionError, Summary, YearRecord};

pub const DEFAULT_CURRENCY_SYMBOL: &str = "£";
pub const CSV_FILE_NAME: &str = "investment_projection.csv";

pub fn format_currency(value: f64, symbol: &str) -> String {
    if !value.is_finite() {
        return format!("{symbol}{value}");
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{cents}")
}

pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn column_headers(symbol: &str) -> Vec<String> {
    let mut headers = vec!["Year".to_string()];
    for label in [
        "Total IRA Contributions",
        "Total Stock Contributions",
        "Total Bond Contributions",
        "Total Cash Contributions",
        "Total Contributions",
        "Investment Gains",
        "Year-End Balance",
        "Inflation Adjusted Balance",
        "Taxes Paid",
        "Early Withdrawal Penalty",
    ] {
        headers.push(format!("{label} ({symbol})"));
    }
    headers
}

fn row_cells(record: &YearRecord, symbol: &str) -> Vec<String> {
    let by_category = &record.cumulative_contributions_by_category;
    let mut cells = vec![record.year.to_string()];
    for amount in [
        by_category.ira,
        by_category.stocks,
        by_category.bonds,
        by_category.cash,
        record.cumulative_total_contributions,
        record.cumulative_investment_gains,
        record.year_end_balance,
        record.inflation_adjusted_balance,
        record.taxes_paid,
        record.early_withdrawal_penalty,
    ] {
        cells.push(format_currency(amount, symbol));
    }
    cells
}

pub fn write_csv<W: io::Write>(
    writer: W,
    records: &[YearRecord],
    symbol: &str,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(column_headers(symbol))?;
    for record in records {
        csv_writer.write_record(row_cells(record, symbol))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn render_csv(records: &[YearRecord], symbol: &str) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, records, symbol)?;
    String::from_utf8(buffer)
        .map_err(|err| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, err)))
}

pub fn render_table(records: &[YearRecord], symbol: &str) -> String {
    let headers = column_headers(symbol);
    let rows: Vec<Vec<String>> = records.iter().map(|r| row_cells(r, symbol)).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_line = |cells: &[String]| {
        let line = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:>width$}"))
            .collect::<Vec<_>>()
            .join(" | ");
        let _ = writeln!(out, "{line}");
    };
    push_line(&headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&rule);
    for row in &rows {
        push_line(row);
    }
    out
}

pub fn render_summary(summary: &Summary, budget: Option<&HouseholdBudget>, symbol: &str) -> String {
    let money = |value: f64| format_currency(value, symbol);
    let mut out = String::from("Summary\n");
    let _ = writeln!(
        out,
        "After {} years, your investment will be worth approximately {}.",
        summary.horizon_years,
        money(summary.final_balance)
    );
    let _ = writeln!(
        out,
        "Adjusted for inflation, the value is approximately {}.",
        money(summary.final_inflation_adjusted_balance)
    );
    let _ = writeln!(out, "Total Contributions: {}", money(summary.total_contributions));
    let _ = writeln!(out, "Total Gains: {}", money(summary.total_gains));
    let _ = writeln!(out, "Total Taxes Paid: {}", money(summary.total_taxes_paid));
    let _ = writeln!(
        out,
        "Total Early Withdrawal Penalty: {}",
        money(summary.total_early_withdrawal_penalty)
    );
    match summary.average_annual_return() {
        Ok(rate) => {
            let _ = writeln!(out, "Average Annual Return: {}", format_percent(rate));
        }
        Err(ProjectionError::UndefinedAverageReturn) => {
            let _ = writeln!(
                out,
                "Average Annual Return: undefined (no contributions were made)"
            );
        }
        Err(other) => {
            let _ = writeln!(out, "Average Annual Return: {other}");
        }
    }
    if let Some(budget) = budget {
        let _ = writeln!(
            out,
            "Monthly Amount Left for Living Expenses: {}",
            money(budget.monthly_living_expenses())
        );
    }
    out
}
