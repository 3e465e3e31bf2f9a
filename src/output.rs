use crate::error::AppError;
use crate::models::{BillingRecord, Page};
use crate::pivot::{plot_number, PivotReport};
use chrono::NaiveDate;
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
    Csv,
}

pub fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| csv_field(c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Left-aligned text table sized to its widest cell per column.
fn text_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers)];
    out.extend(rows.iter().map(|r| line(r)));
    out.join("\n")
}

fn render(headers: Vec<String>, rows: Vec<Vec<String>>, format: Format) -> String {
    match format {
        Format::Csv => std::iter::once(csv_line(&headers))
            .chain(rows.iter().map(|r| csv_line(r)))
            .collect::<Vec<_>>()
            .join("\n"),
        Format::Table | Format::Json => text_table(&headers, &rows),
    }
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

pub fn render_pivot(report: &PivotReport, format: Format) -> Result<String, AppError> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(&report.rows)?);
    }

    let headers = std::iter::once("date".to_string())
        .chain(report.categories.iter().cloned())
        .collect();
    let rows = report
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.date.to_string())
                .chain(
                    report
                        .categories
                        .iter()
                        .map(|c| row.get(c).map(|v| v.to_string()).unwrap_or_default()),
                )
                .collect()
        })
        .collect();
    Ok(render(headers, rows, format))
}

pub fn render_billing(
    page: &Page<BillingRecord>,
    page_index: u32,
    page_size: u32,
    format: Format,
) -> Result<String, AppError> {
    if format == Format::Json {
        return Ok(serde_json::to_string_pretty(page)?);
    }

    let headers = [
        "invoice", "customer", "period_start", "period_end", "amount", "status", "due", "paid",
    ]
    .map(String::from)
    .to_vec();
    let rows = page
        .content
        .iter()
        .map(|r| {
            vec![
                r.invoice_number.clone(),
                r.customer_name.clone(),
                r.billing_period_start.to_string(),
                r.billing_period_end.to_string(),
                r.total_amount.to_string(),
                r.status.as_str().to_string(),
                opt_date(r.due_date),
                opt_date(r.paid_date),
            ]
        })
        .collect();

    let body = render(headers, rows, format);
    if format == Format::Csv {
        return Ok(body);
    }
    Ok(format!(
        "{body}\npage {} of {} ({} records)",
        u64::from(page_index) + 1,
        page.page_count(page_size).max(1),
        page.total_elements
    ))
}

pub fn render_trend(points: &[(NaiveDate, Decimal)], format: Format) -> Result<String, AppError> {
    if format == Format::Json {
        let labels: Vec<_> = points.iter().map(|(d, _)| d.to_string()).collect();
        let values: Vec<_> = points.iter().map(|(_, v)| plot_number(*v)).collect();
        return Ok(serde_json::to_string_pretty(
            &json!({ "labels": labels, "values": values }),
        )?);
    }

    let headers = vec!["date".to_string(), "cost".to_string()];
    let rows = points
        .iter()
        .map(|(d, v)| vec![d.to_string(), v.to_string()])
        .collect();
    Ok(render(headers, rows, format))
}
