//! Plain-text console sections for an analysis run.

use crate::columns::{DETAIL_COLUMNS, TIMESTAMP};
use crate::diagnosis::Diagnosis;
use crate::frame::Frame;
use crate::summary::Summary;

/// Printed in place of a missing value.
pub const MISSING_MARKER: &str = "NaN";

/// Trailing rows shown in the detail table.
pub const DEFAULT_TAIL_ROWS: usize = 15;

pub fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING_MARKER.to_string(),
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:>w$}", h, w = *w))
        .collect();
    out.push_str(header_line.join("  ").trim_end());
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:>w$}", cell, w = *w))
            .collect();
        out.push_str(&line.join("  "));
        out.push('\n');
    }
    out
}

pub fn summary_table(summary: &Summary) -> String {
    let rows: Vec<Vec<String>> = summary
        .columns
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                format_value(s.mean, 3),
                format_value(s.max, 3),
                format_value(s.min, 3),
            ]
        })
        .collect();
    let mut out = String::from("=== OVERALL STATISTICS ===\n");
    out.push_str(&render_table(&["column", "mean", "max", "min"], &rows));
    out
}

/// The last `tail` rows of the detail columns present in the frame.
pub fn detail_table(frame: &Frame, tail: usize) -> String {
    let present: Vec<&str> = DETAIL_COLUMNS
        .iter()
        .copied()
        .filter(|name| frame.has_column(name))
        .collect();
    let start = frame.len().saturating_sub(tail);
    let rows: Vec<Vec<String>> = (start..frame.len())
        .map(|row| {
            present
                .iter()
                .map(|name| {
                    let decimals = if *name == TIMESTAMP { 0 } else { 1 };
                    format_value(frame.value(name, row), decimals)
                })
                .collect()
        })
        .collect();
    let mut out = format!("=== LAST {} SAMPLES ===\n", frame.len() - start);
    out.push_str(&render_table(&present, &rows));
    out
}

pub fn diagnosis_block(diagnosis: &Diagnosis) -> String {
    let mut out = format!(
        "--- Diagnosis at crash point (t={}) ---\n",
        format_value(diagnosis.timestamp, 1)
    );
    for suspicion in &diagnosis.suspicions {
        out.push_str(suspicion.message());
        out.push('\n');
    }
    if let Some(post) = diagnosis.post_crash.as_ref() {
        out.push_str(&format!(
            "Sample t+1 (post-crash): Usage={}%, Power={}W, Temp={}°C\n",
            format_value(post.gpu_usage, 1),
            format_value(post.power, 1),
            format_value(post.gpu_temp, 1)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::diagnose;
    use crate::frame::{normalize, parse_csv, Column};
    use crate::summary::summarize;

    #[test]
    fn test_missing_values_print_marker() {
        assert_eq!(format_value(None, 1), "NaN");
        assert_eq!(format_value(Some(59.94), 1), "59.9");
        assert_eq!(format_value(Some(3.0), 0), "3");
    }

    #[test]
    fn test_summary_table_lists_every_column() {
        let frame = Frame::from_columns(vec![
            Column::numeric("fps", vec![Some(60.0), Some(30.0)]),
            Column::numeric("fan_rpm", vec![None, None]),
        ])
        .unwrap();
        let text = summary_table(&summarize(&frame));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].trim_start().starts_with("fps"));
        assert!(lines[2].contains("45.000"));
        assert!(lines[3].contains("NaN"));
    }

    #[test]
    fn test_detail_table_tails_and_skips_absent_columns() {
        let mut body = String::from("FPS,TEMP. DA GPU\n");
        for i in 0..20 {
            body.push_str(&format!("{},70\n", 60 + i));
        }
        let frame = normalize(parse_csv(body.as_bytes(), "N/A").unwrap());
        let text = detail_table(&frame, DEFAULT_TAIL_ROWS);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== LAST 15 SAMPLES ===");
        assert_eq!(lines.len(), 2 + DEFAULT_TAIL_ROWS);
        let header: Vec<&str> = lines[1].split_whitespace().collect();
        assert_eq!(header, vec!["timestamp", "fps", "gpu_temp"]);
        let last: Vec<&str> = lines.last().unwrap().split_whitespace().collect();
        assert_eq!(last, vec!["19", "79.0", "70.0"]);
    }

    #[test]
    fn test_diagnosis_block_shows_post_crash_marker() {
        let frame = normalize(
            parse_csv(
                b"FPS,UTIL. DA GPU,TEMP. DA GPU\n60,50,90\nN/A,N/A,91\n",
                "N/A",
            )
            .unwrap(),
        );
        let text = diagnosis_block(&diagnose(&frame).unwrap());
        assert!(text.starts_with("--- Diagnosis at crash point (t=0.0) ---"));
        assert!(text.contains("overheating"));
        assert!(text.contains("Usage=NaN%, Power=NaNW"));
        assert!(text.contains("Temp=91.0°C"));
    }
}
