use serde::{Deserialize, Serialize};

use crate::frame::{Column, Frame};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
}

impl ColumnStats {
    fn from_column(column: &Column) -> Self {
        let mut stats = ColumnStats {
            name: column.name.clone(),
            count: 0,
            mean: None,
            max: None,
            min: None,
        };
        let Some(values) = column.values() else {
            return stats;
        };
        let mut total = 0.0;
        for v in values.iter().flatten().copied() {
            stats.count += 1;
            total += v;
            stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
            stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
        }
        if stats.count > 0 {
            stats.mean = Some(total / stats.count as f64);
        }
        stats
    }
}

/// Whole-series mean/max/min per column, in table order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub columns: Vec<ColumnStats>,
}

impl Summary {
    pub fn get(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|s| s.name == name)
    }

    /// Names of columns with no usable samples at all.
    pub fn empty_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|s| s.count == 0)
            .map(|s| s.name.as_str())
    }
}

pub fn summarize(frame: &Frame) -> Summary {
    Summary {
        columns: frame.columns().iter().map(ColumnStats::from_column).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{normalize, parse_csv};

    #[test]
    fn test_stats_ignore_missing_values() {
        let frame = Frame::from_columns(vec![Column::numeric(
            "fps",
            vec![Some(60.0), None, Some(30.0), Some(90.0)],
        )])
        .unwrap();
        let summary = summarize(&frame);
        let fps = summary.get("fps").unwrap();
        assert_eq!(fps.count, 3);
        assert_eq!(fps.mean, Some(60.0));
        assert_eq!(fps.max, Some(90.0));
        assert_eq!(fps.min, Some(30.0));
    }

    #[test]
    fn test_all_missing_column_reports_missing_not_zero() {
        let frame = Frame::from_columns(vec![Column::numeric("fan_rpm", vec![None, None])]).unwrap();
        let stats = &summarize(&frame).columns[0];
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.max, None);
        assert_eq!(stats.min, None);
        assert_eq!(summarize(&frame).empty_columns().collect::<Vec<_>>(), vec!["fan_rpm"]);
    }

    #[test]
    fn test_summary_preserves_column_order() {
        let frame = normalize(parse_csv(b"TEMP. DA GPU,FPS,OTHER\n70,60,x\n", "N/A").unwrap());
        let summary = summarize(&frame);
        let names: Vec<&str> = summary.columns.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["gpu_temp", "fps", "OTHER", "timestamp"]);
    }
}
