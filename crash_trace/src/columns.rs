//! Canonical metric names and the vendor header mapping.

use serde::{Deserialize, Serialize};

use crate::frame::{coerce_cell, ColumnData, Frame};

pub const FPS: &str = "fps";
pub const GPU_USAGE: &str = "gpu_usage";
pub const GPU_CLOCK: &str = "gpu_clock";
pub const POWER: &str = "power";
pub const GPU_TEMP: &str = "gpu_temp";
pub const FAN_RPM: &str = "fan_rpm";
pub const MEM_USAGE: &str = "mem_usage";
pub const MEM_CLOCK: &str = "mem_clock";
pub const CPU_USAGE: &str = "cpu_usage";
pub const SYSTEM_MEM: &str = "system_mem";
pub const TIMESTAMP: &str = "timestamp";

/// Overlay export headers (pt-BR locale) and the canonical name each maps to.
pub const HEADER_MAP: [(&str, &str); 10] = [
    ("FPS", FPS),
    ("UTIL. DA GPU", GPU_USAGE),
    ("SCLK DA GPU", GPU_CLOCK),
    ("ENERGIA DA GPU", POWER),
    ("TEMP. DA GPU", GPU_TEMP),
    ("VENT. DA GPU", FAN_RPM),
    ("UTIL. MEM. GPU", MEM_USAGE),
    ("MCLK DA GPU", MEM_CLOCK),
    ("UTIL. DA CPU", CPU_USAGE),
    ("UTIL. MEM. SISTEMA", SYSTEM_MEM),
];

/// Columns shown in the trailing detail table, in display order.
pub const DETAIL_COLUMNS: [&str; 7] = [
    TIMESTAMP, FPS, GPU_USAGE, GPU_CLOCK, GPU_TEMP, POWER, MEM_USAGE,
];

/// Look up the canonical name for a source header. Matching is exact, so
/// canonical names themselves never match and renaming is a no-op on
/// already-normalized frames.
pub fn canonical_name(header: &str) -> Option<&'static str> {
    HEADER_MAP
        .iter()
        .find(|(source, _)| *source == header)
        .map(|(_, canonical)| *canonical)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HeaderReport {
    pub header: String,
    pub canonical: Option<String>,
    pub numeric: usize,
    pub missing: usize,
    pub unparseable: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Per-column parse statistics for a raw (not yet normalized) frame.
pub fn inspect_headers(raw: &Frame) -> Vec<HeaderReport> {
    raw.columns()
        .iter()
        .map(|column| {
            let mut report = HeaderReport {
                header: column.name.clone(),
                canonical: canonical_name(&column.name).map(str::to_string),
                numeric: 0,
                missing: 0,
                unparseable: 0,
                min: None,
                max: None,
            };
            let mut record = |value: Option<f64>, parse_failed: bool| match value {
                Some(v) => {
                    report.numeric += 1;
                    report.min = Some(report.min.map_or(v, |m| m.min(v)));
                    report.max = Some(report.max.map_or(v, |m| m.max(v)));
                }
                None if parse_failed => report.unparseable += 1,
                None => report.missing += 1,
            };
            match &column.data {
                ColumnData::Text(cells) => {
                    for cell in cells {
                        match cell {
                            Some(text) => {
                                let value = coerce_cell(text);
                                record(value, value.is_none());
                            }
                            None => record(None, false),
                        }
                    }
                }
                ColumnData::Numeric(values) => {
                    for value in values {
                        record(*value, false);
                    }
                }
            }
            report
        })
        .collect()
}
