//! Rendering of orders for the terminal.

use std::fmt::Write;

use super::OutputFormat;
use crate::error::Result;
use crate::order::{Order, OrderWithHistory};
use crate::validation::ValidationReport;

/// Fields shown in order summaries.
const SUMMARY_FIELDS: [(&str, &str); 3] = [("C10", "product"), ("C11", "vintage"), ("C40", "qty")];

/// Timestamp format for terminal output.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render a list of orders.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_orders(orders: &[Order], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(orders)?),
        OutputFormat::Plain => Ok(orders.iter().map(summary_line).collect::<Vec<_>>().join("\n")),
        OutputFormat::Table => Ok(orders_table(orders)),
    }
}

/// Render one order with its history.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_order(full: &OrderWithHistory, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(full)?);
    }

    let order = &full.order;
    let mut out = String::new();
    let _ = writeln!(out, "Order {}", order.cle);
    let _ = writeln!(out, "  Status:        {}", order.status);
    let _ = writeln!(out, "  Holder:        {}", order.current_holder);
    let _ = writeln!(out, "  Created by:    {}", order.created_by);
    let _ = writeln!(out, "  Last modified: {}", order.last_modified_by);
    let _ = writeln!(out, "  Created:       {}", order.created_at.format(TIME_FORMAT));
    let _ = writeln!(out, "  Updated:       {}", order.updated_at.format(TIME_FORMAT));
    let _ = writeln!(out);
    let _ = writeln!(out, "Fields");

    let width = order.data.keys().map(String::len).max().unwrap_or(0);
    for (code, value) in &order.data {
        let text = crate::order::value_text(value).unwrap_or_else(|| "null".to_string());
        let _ = writeln!(out, "  {code:<width$}  {text}");
    }

    if !full.history.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "History");
        for entry in &full.history {
            let _ = writeln!(
                out,
                "  {}  {:<18} {}",
                entry.timestamp.format(TIME_FORMAT),
                entry.action,
                entry.actor
            );
        }
    }

    Ok(out.trim_end().to_string())
}

/// Render a validation report, one message per line.
#[must_use]
pub fn render_report(report: &ValidationReport) -> String {
    if report.is_empty() {
        return "valid".to_string();
    }
    let mut out = String::new();
    for (code, messages) in report.errors() {
        for message in messages {
            let _ = writeln!(out, "{code}: {message}");
        }
    }
    out.trim_end().to_string()
}

fn summary_line(order: &Order) -> String {
    let mut line = format!("{}  {}  holder={}", order.cle, order.status, order.current_holder);
    for (code, label) in SUMMARY_FIELDS {
        if let Some(value) = order.field(code) {
            let _ = write!(line, "  {label}={value}");
        }
    }
    line
}

fn orders_table(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders.".to_string();
    }

    let headers = ["CLE", "STATUS", "HOLDER", "PRODUCT", "VINTAGE", "UPDATED"];
    let rows: Vec<[String; 6]> = orders
        .iter()
        .map(|order| {
            [
                order.cle.clone(),
                order.status.to_string(),
                order.current_holder.clone(),
                order.field("C10").unwrap_or_default(),
                order.field("C11").unwrap_or_default(),
                order.updated_at.format(TIME_FORMAT).to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let format_row = |cells: &[&str]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(&headers)];
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(format_row(&cells));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{CircleData, HistoryEntry};
    use serde_json::json;

    fn order(cle: &str) -> Order {
        let data: CircleData = json!({"C10": "1111A0", "C11": "2019", "C40": 1200})
            .as_object()
            .cloned()
            .unwrap();
        Order::new_draft(cle.to_string(), data, "broker_a", "broker_a")
    }

    #[test]
    fn test_plain_list() {
        let out = render_orders(&[order("CLE-1")], OutputFormat::Plain).unwrap();
        assert_eq!(
            out,
            "CLE-1  new_draft  holder=broker_a  product=1111A0  vintage=2019  qty=1200"
        );
    }

    #[test]
    fn test_table_list() {
        let out = render_orders(&[order("CLE-1"), order("CLE-22")], OutputFormat::Table).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("CLE     STATUS"));
        assert!(lines[2].starts_with("CLE-22  new_draft"));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render_orders(&[], OutputFormat::Table).unwrap(), "No orders.");
    }

    #[test]
    fn test_json_list() {
        let out = render_orders(&[order("CLE-1")], OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["cle"], "CLE-1");
    }

    #[test]
    fn test_render_order_with_history() {
        let order = order("CLE-1");
        let history = vec![HistoryEntry {
            id: 1,
            cle: "CLE-1".to_string(),
            timestamp: order.created_at,
            actor: "broker_a".to_string(),
            action: "created".to_string(),
            changed_data: None,
        }];
        let full = OrderWithHistory { order, history };

        let out = render_order(&full, OutputFormat::Plain).unwrap();
        assert!(out.starts_with("Order CLE-1"));
        assert!(out.contains("  C40  1200"));
        assert!(out.contains("created"));

        let json = render_order(&full, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["history"][0]["action"], "created");
        assert_eq!(parsed["status"], "new_draft");
    }

    #[test]
    fn test_render_report() {
        let mut report = ValidationReport::default();
        assert_eq!(render_report(&report), "valid");

        report.push("C1", "bad colour");
        report.push("C11", "too old");
        assert_eq!(render_report(&report), "C1: bad colour\nC11: too old");
    }
}
