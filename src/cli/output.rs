// Terminal output helpers: colored status lines, the rule table, and the
// network-operation spinner.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::router::RemoteRule;

pub fn log_info(message: &str) {
    println!("\x1b[0;34mℹ️  {}\x1b[0m", message);
}

pub fn log_success(message: &str) {
    println!("\x1b[0;32m✅ {}\x1b[0m", message);
}

pub fn log_error(message: &str) {
    eprintln!("\x1b[0;31m❌ {}\x1b[0m", message);
}

pub fn log_warning(message: &str) {
    println!("\x1b[1;33m⚠️  {}\x1b[0m", message);
}

/// Spinner shown during network operations; suppressed in --json mode so
/// stdout stays machine-parseable (the spinner itself draws to stderr).
pub fn spinner(message: &str, silent: bool) -> Option<ProgressBar> {
    if silent {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

/// Render the rule table with aligned columns.
pub fn render_rules_table(rules: &[RemoteRule]) -> String {
    let header = ["Name", "Status", "External Port", "Internal", "Protocol"];

    let rows: Vec<[String; 5]> = rules
        .iter()
        .map(|rule| {
            [
                rule.name.clone(),
                if rule.enabled { "Enabled" } else { "Disabled" }.to_string(),
                rule.external_port.to_string(),
                format!("{}:{}", rule.local_address, rule.local_port),
                rule.protocol.to_uppercase(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let header_cells: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let header_line = format_row(&header_cells);
    let mut out = String::new();
    out.push_str(&header_line);
    out.push('\n');
    out.push_str(&"-".repeat(header_line.len()));
    for row in &rows {
        out.push('\n');
        out.push_str(&format_row(row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: i64, external_port: u16, enabled: bool) -> RemoteRule {
        RemoteRule {
            id: Some(id),
            name: format!("Rule {}", id),
            local_address: "192.168.178.10".to_string(),
            local_port: 80,
            external_port,
            protocol: "tcp/udp".to_string(),
            enabled,
        }
    }

    #[test]
    fn test_table_contains_all_fields() {
        let table = render_rules_table(&[rule(1, 8080, true), rule(2, 443, false)]);

        assert!(table.contains("Rule 1"));
        assert!(table.contains("8080"));
        assert!(table.contains("192.168.178.10:80"));
        assert!(table.contains("TCP/UDP"));
        assert!(table.contains("Enabled"));
        assert!(table.contains("Disabled"));
    }

    #[test]
    fn test_table_columns_align() {
        let table = render_rules_table(&[rule(1, 8080, true), rule(2, 443, false)]);
        let lines: Vec<&str> = table.lines().collect();

        // Header, separator, two rows
        assert_eq!(lines.len(), 4);
        let positions: Vec<usize> = lines[0].match_indices(" | ").map(|(i, _)| i).collect();
        for row in &lines[2..] {
            let row_positions: Vec<usize> = row.match_indices(" | ").map(|(i, _)| i).collect();
            assert_eq!(row_positions, positions);
        }
    }

    #[test]
    fn test_spinner_silent_mode() {
        assert!(spinner("working", true).is_none());
        let pb = spinner("working", false);
        assert!(pb.is_some());
        finish_spinner(pb);
    }
}
