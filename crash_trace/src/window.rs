use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::TelemetryError;

/// Rows shaded before the final sample.
pub const CRASH_WINDOW_ROWS: usize = 20;

/// Inclusive row range `[start, end]` leading up to the last sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashWindow {
    pub start: usize,
    pub end: usize,
}

impl CrashWindow {
    pub fn locate(frame: &Frame) -> Result<Self, TelemetryError> {
        Self::for_rows(frame.len())
    }

    pub fn for_rows(rows: usize) -> Result<Self, TelemetryError> {
        let end = rows.checked_sub(1).ok_or(TelemetryError::NoSamples)?;
        Ok(Self {
            start: end.saturating_sub(CRASH_WINDOW_ROWS),
            end,
        })
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.start..=self.end).contains(&row)
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}
