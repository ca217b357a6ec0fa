use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::columns::{canonical_name, TIMESTAMP};
use crate::TelemetryError;

/// Token the overlay writes for samples it could not read.
pub const DEFAULT_NA_TOKEN: &str = "N/A";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "cells", rename_all = "snake_case")]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Numeric(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(cells) => cells.len(),
            ColumnData::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_numeric(self) -> ColumnData {
        match self {
            ColumnData::Text(cells) => ColumnData::Numeric(
                cells
                    .into_iter()
                    .map(|cell| cell.as_deref().and_then(coerce_cell))
                    .collect(),
            ),
            numeric @ ColumnData::Numeric(_) => numeric,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn text(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(cells),
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Numeric cells, or `None` while the column still holds raw text.
    pub fn values(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }

    pub fn last_valid_index(&self) -> Option<usize> {
        self.values()?.iter().rposition(Option::is_some)
    }
}

/// Column-oriented telemetry table. All columns share the same row count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
    rows: usize,
}

impl Frame {
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TelemetryError> {
        let rows = columns.first().map_or(0, |c| c.data.len());
        for column in &columns {
            if column.data.len() != rows {
                return Err(TelemetryError::ColumnLength {
                    column: column.name.clone(),
                    expected: rows,
                    found: column.data.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Numeric cell lookup. Absent columns, text columns and out-of-range
    /// rows all read as missing.
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name)?.values()?.get(row).copied().flatten()
    }

    pub fn last_valid_index(&self, name: &str) -> Option<usize> {
        self.column(name)?.last_valid_index()
    }
}

/// Parse a single cell as a decimal number. Anything else, including a
/// literal `NaN`, is a missing value.
pub(crate) fn coerce_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Decode comma-delimited telemetry into a raw frame of text columns keyed
/// by the original headers. Empty cells and `na_token` cells are missing.
pub fn parse_csv(input: &[u8], na_token: &str) -> Result<Frame, TelemetryError> {
    if na_token.trim().is_empty() {
        return Err(TelemetryError::InvalidParameter(
            "missing-value token must not be empty".into(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let raw_headers = reader
        .byte_headers()
        .map_err(|e| TelemetryError::Csv {
            row: 0,
            message: e.to_string(),
        })?
        .clone();
    let headers: Vec<String> = raw_headers
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(TelemetryError::EmptyLog);
    }
    let headers = dedupe_headers(headers);

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (idx, record) in reader.byte_records().enumerate() {
        let row = idx + 1;
        let record = record.map_err(|e| TelemetryError::Csv {
            row,
            message: e.to_string(),
        })?;
        if record.len() > headers.len() {
            return Err(TelemetryError::RaggedRow {
                row,
                expected: headers.len(),
                found: record.len(),
            });
        }
        // A short row (a log cut off mid-write) is padded with missing cells.
        for (idx, column) in cells.iter_mut().enumerate() {
            let text = record.get(idx).map(String::from_utf8_lossy);
            match text {
                Some(text) if !text.is_empty() && text != na_token => {
                    column.push(Some(text.into_owned()))
                }
                _ => column.push(None),
            }
        }
    }

    if cells.first().map_or(true, Vec::is_empty) {
        return Err(TelemetryError::NoSamples);
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::text(name, cells))
        .collect();
    Frame::from_columns(columns)
}

// Blank headers become `Unnamed: <i>`; repeats get a `.1`, `.2`, ... suffix.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                header
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Rename mapped headers, coerce every column to numeric and (re)write the
/// `timestamp` column as the zero-based row ordinal.
pub fn normalize(frame: Frame) -> Frame {
    let rows = frame.rows;
    let mut columns: Vec<Column> = frame
        .columns
        .into_iter()
        .map(|column| Column {
            name: canonical_name(&column.name)
                .map(str::to_string)
                .unwrap_or(column.name),
            data: column.data.into_numeric(),
        })
        .collect();

    let stamps = ColumnData::Numeric((0..rows).map(|i| Some(i as f64)).collect());
    match columns.iter_mut().find(|c| c.name == TIMESTAMP) {
        Some(existing) => existing.data = stamps,
        None => columns.push(Column {
            name: TIMESTAMP.to_string(),
            data: stamps,
        }),
    }

    Frame { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{FPS, GPU_TEMP, GPU_USAGE};

    const SAMPLE: &[u8] = b"FPS,UTIL. DA GPU,TEMP. DA GPU,GPU HOTSPOT\n\
        60,98,71,80\n\
        N/A,97,72,glitch\n\
        59, 12 ,N/A,82\n";

    #[test]
    fn test_parse_marks_sentinel_and_empty_cells_missing() {
        let raw = parse_csv(b"A,B\n1,N/A\n,2\n", "N/A").unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(
            raw.column("B").unwrap().data,
            ColumnData::Text(vec![None, Some("2".into())])
        );
        assert_eq!(
            raw.column("A").unwrap().data,
            ColumnData::Text(vec![Some("1".into()), None])
        );
    }

    #[test]
    fn test_parse_rejects_empty_and_header_only_input() {
        assert!(matches!(parse_csv(b"", "N/A"), Err(TelemetryError::EmptyLog)));
        assert!(matches!(
            parse_csv(b"FPS,UTIL. DA GPU\n", "N/A"),
            Err(TelemetryError::NoSamples)
        ));
    }

    #[test]
    fn test_parse_reports_overlong_row_number() {
        let err = parse_csv(b"A,B\n1,2\n3,4,5\n", "N/A").unwrap_err();
        match err {
            TelemetryError::RaggedRow {
                row,
                expected,
                found,
            } => {
                assert_eq!(row, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_final_row_pads_missing_cells() {
        let raw =
            parse_csv(b"FPS,UTIL. DA GPU,TEMP. DA GPU\n60,90,70\n58,5\n", "N/A").unwrap();
        assert_eq!(raw.len(), 2);
        let frame = normalize(raw);
        assert_eq!(frame.value(FPS, 1), Some(58.0));
        assert_eq!(frame.value(GPU_USAGE, 1), Some(5.0));
        assert_eq!(frame.value(GPU_TEMP, 0), Some(70.0));
        assert_eq!(frame.value(GPU_TEMP, 1), None);
    }

    #[test]
    fn test_parse_rejects_blank_sentinel() {
        assert!(matches!(
            parse_csv(b"A\n1\n", " "),
            Err(TelemetryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_duplicate_and_blank_headers_are_renamed() {
        let raw = parse_csv(b"FPS,FPS,\n1,2,3\n", "N/A").unwrap();
        let names: Vec<&str> = raw.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["FPS", "FPS.1", "Unnamed: 2"]);
    }

    #[test]
    fn test_normalize_renames_coerces_and_passes_through() {
        let frame = normalize(parse_csv(SAMPLE, "N/A").unwrap());
        let names: Vec<&str> = frame.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![FPS, GPU_USAGE, GPU_TEMP, "GPU HOTSPOT", TIMESTAMP]
        );
        assert_eq!(frame.value(FPS, 0), Some(60.0));
        assert_eq!(frame.value(FPS, 1), None);
        assert_eq!(frame.value(GPU_USAGE, 2), Some(12.0));
        assert_eq!(frame.value(GPU_TEMP, 2), None);
        assert_eq!(frame.value("GPU HOTSPOT", 1), None);
        assert_eq!(frame.value("GPU HOTSPOT", 2), Some(82.0));
    }

    #[test]
    fn test_timestamp_is_row_ordinal() {
        let mut body = String::from("FPS\n");
        for i in 0..37 {
            body.push_str(&format!("{}\n", i * 2));
        }
        let frame = normalize(parse_csv(body.as_bytes(), "N/A").unwrap());
        let stamps = frame.column(TIMESTAMP).unwrap().values().unwrap();
        assert_eq!(stamps.len(), frame.len());
        for (i, stamp) in stamps.iter().enumerate() {
            assert_eq!(*stamp, Some(i as f64));
        }
    }

    #[test]
    fn test_existing_timestamp_column_is_overwritten_in_place() {
        let frame = normalize(parse_csv(b"timestamp,FPS\n100,60\n200,61\n", "N/A").unwrap());
        assert_eq!(frame.columns()[0].name, TIMESTAMP);
        assert_eq!(frame.columns().len(), 2);
        assert_eq!(frame.value(TIMESTAMP, 1), Some(1.0));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(parse_csv(SAMPLE, "N/A").unwrap());
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_coerce_treats_nan_literal_as_missing() {
        assert_eq!(coerce_cell("NaN"), None);
        assert_eq!(coerce_cell("abc"), None);
        assert_eq!(coerce_cell(" 1.5 "), Some(1.5));
        assert_eq!(coerce_cell("-3"), Some(-3.0));
    }

    #[test]
    fn test_from_columns_rejects_uneven_lengths() {
        let err = Frame::from_columns(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0)]),
            Column::numeric("b", vec![Some(1.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, TelemetryError::ColumnLength { found: 1, .. }));
    }

    #[test]
    fn test_last_valid_index_skips_trailing_missing() {
        let frame = Frame::from_columns(vec![Column::numeric(
            FPS,
            vec![Some(60.0), Some(0.0), None, None],
        )])
        .unwrap();
        assert_eq!(frame.last_valid_index(FPS), Some(1));
        assert_eq!(frame.last_valid_index("missing"), None);
    }
}
