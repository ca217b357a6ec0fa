//! Telemetry normalization and crash diagnosis for GPU overlay logs.

pub mod columns;
pub mod diagnosis;
pub mod frame;
pub mod report;
pub mod summary;
pub mod window;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use columns::{canonical_name, inspect_headers, HeaderReport, HEADER_MAP};
pub use diagnosis::{diagnose, Diagnosis, PostCrashSnapshot, Reading, Suspicion, THRESHOLDS};
pub use frame::{normalize, parse_csv, Column, ColumnData, Frame, DEFAULT_NA_TOKEN};
pub use summary::{summarize, ColumnStats, Summary};
pub use window::{CrashWindow, CRASH_WINDOW_ROWS};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("telemetry log is empty (no header row)")]
    EmptyLog,
    #[error("telemetry log has a header but no samples")]
    NoSamples,
    #[error("row {row}: expected {expected} fields, found {found}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}: malformed CSV: {message}")]
    Csv { row: usize, message: String },
    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Analysis {
    pub rows: usize,
    pub summary: Summary,
    pub window: CrashWindow,
    pub diagnosis: Option<Diagnosis>,
}

/// Parse and normalize a telemetry log in one step.
pub fn load_telemetry(input: &[u8], na_token: &str) -> Result<Frame, TelemetryError> {
    Ok(normalize(parse_csv(input, na_token)?))
}

/// Run every read-only derivation over a normalized frame.
pub fn analyze(frame: &Frame) -> Result<Analysis, TelemetryError> {
    let window = CrashWindow::locate(frame)?;
    Ok(Analysis {
        rows: frame.len(),
        summary: summarize(frame),
        window,
        diagnosis: diagnose(frame),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &[u8] = b"FPS,UTIL. DA GPU,SCLK DA GPU,ENERGIA DA GPU,TEMP. DA GPU,VENT. DA GPU\n\
        144,97,2450,210,74,1650\n\
        141,98,2440,212,76,1700\n\
        138,99,2430,215,79,1750\n\
        0,3,420,90,88,1800\n\
        N/A,0,N/A,35,81,1800\n";

    #[test]
    fn test_analyze_end_to_end() {
        let frame = load_telemetry(LOG, DEFAULT_NA_TOKEN).unwrap();
        let analysis = analyze(&frame).unwrap();
        assert_eq!(analysis.rows, 5);
        assert_eq!(analysis.window, CrashWindow { start: 0, end: 4 });

        let fps = analysis.summary.get("fps").unwrap();
        assert_eq!(fps.count, 4);
        assert_eq!(fps.min, Some(0.0));

        let diagnosis = analysis.diagnosis.unwrap();
        assert_eq!(diagnosis.row, 3);
        // fps == 0 at the crash row, so the stall rule stays quiet.
        assert_eq!(
            diagnosis.suspicions,
            vec![
                Suspicion::Overheating { gpu_temp: 88.0 },
                Suspicion::Downclock { gpu_clock: 420.0 },
            ]
        );
        assert_eq!(diagnosis.post_crash.unwrap().power, Some(35.0));
    }

    #[test]
    fn test_analysis_serializes_missing_as_null() {
        let frame = load_telemetry(b"FPS,VENT. DA GPU\n60,N/A\n", DEFAULT_NA_TOKEN).unwrap();
        let analysis = analyze(&frame).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        let fan = &json["summary"]["columns"][1];
        assert_eq!(fan["name"], "fan_rpm");
        assert!(fan["mean"].is_null());
        assert_eq!(json["window"]["end"], 0);
    }

    #[test]
    fn test_errors_name_the_row() {
        let err = load_telemetry(b"FPS,TEMP. DA GPU\n60,70\n61,70,5\n", DEFAULT_NA_TOKEN).unwrap_err();
        assert_eq!(err.to_string(), "row 2: expected 2 fields, found 3");
    }
}
