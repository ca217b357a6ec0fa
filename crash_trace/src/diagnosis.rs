//! Rule-based crash diagnosis from the last sample that still reported FPS.

use serde::{Deserialize, Serialize};

use crate::columns::{FPS, GPU_CLOCK, GPU_TEMP, GPU_USAGE, POWER, TIMESTAMP};
use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    pub max_gpu_temp_c: f64,
    pub min_gpu_usage_pct: f64,
    pub min_fps: f64,
    pub min_gpu_clock_mhz: f64,
}

pub const THRESHOLDS: Thresholds = Thresholds {
    max_gpu_temp_c: 85.0,
    min_gpu_usage_pct: 10.0,
    min_fps: 0.0,
    min_gpu_clock_mhz: 500.0,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suspicion {
    Overheating { gpu_temp: f64 },
    EngineStall { gpu_usage: f64, fps: f64 },
    Downclock { gpu_clock: f64 },
}

impl Suspicion {
    pub fn message(&self) -> &'static str {
        match self {
            Suspicion::Overheating { .. } => "SUSPECT: GPU overheating.",
            Suspicion::EngineStall { .. } => {
                "SUSPECT: sudden bottleneck or lost communication with the game engine."
            }
            Suspicion::Downclock { .. } => {
                "SUSPECT: aggressive downclock (possible power or driver problem)."
            }
        }
    }
}

/// The metrics the rules look at, taken from a single row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub fps: Option<f64>,
    pub gpu_usage: Option<f64>,
    pub gpu_clock: Option<f64>,
    pub gpu_temp: Option<f64>,
}

impl Reading {
    pub fn from_row(frame: &Frame, row: usize) -> Self {
        Self {
            fps: frame.value(FPS, row),
            gpu_usage: frame.value(GPU_USAGE, row),
            gpu_clock: frame.value(GPU_CLOCK, row),
            gpu_temp: frame.value(GPU_TEMP, row),
        }
    }

    /// Evaluate every rule independently, in fixed order. A missing operand
    /// never satisfies a rule.
    pub fn suspicions(&self) -> Vec<Suspicion> {
        let t = &THRESHOLDS;
        let mut out = Vec::new();
        if let Some(gpu_temp) = above(self.gpu_temp, t.max_gpu_temp_c) {
            out.push(Suspicion::Overheating { gpu_temp });
        }
        if let (Some(gpu_usage), Some(fps)) = (
            below(self.gpu_usage, t.min_gpu_usage_pct),
            above(self.fps, t.min_fps),
        ) {
            out.push(Suspicion::EngineStall { gpu_usage, fps });
        }
        if let Some(gpu_clock) = below(self.gpu_clock, t.min_gpu_clock_mhz) {
            out.push(Suspicion::Downclock { gpu_clock });
        }
        out
    }
}

fn above(value: Option<f64>, limit: f64) -> Option<f64> {
    value.filter(|v| *v > limit)
}

fn below(value: Option<f64>, limit: f64) -> Option<f64> {
    value.filter(|v| *v < limit)
}

/// The row right after the last FPS sample, reported verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostCrashSnapshot {
    pub row: usize,
    pub gpu_usage: Option<f64>,
    pub power: Option<f64>,
    pub gpu_temp: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub row: usize,
    pub timestamp: Option<f64>,
    pub reading: Reading,
    pub suspicions: Vec<Suspicion>,
    pub post_crash: Option<PostCrashSnapshot>,
}

/// Diagnose the crash point, i.e. the last row with a usable FPS value.
/// Returns `None` when the log carries no FPS data at all.
pub fn diagnose(frame: &Frame) -> Option<Diagnosis> {
    let row = frame.last_valid_index(FPS)?;
    let reading = Reading::from_row(frame, row);
    let next = row + 1;
    let post_crash = (next < frame.len()).then(|| PostCrashSnapshot {
        row: next,
        gpu_usage: frame.value(GPU_USAGE, next),
        power: frame.value(POWER, next),
        gpu_temp: frame.value(GPU_TEMP, next),
    });
    Some(Diagnosis {
        row,
        timestamp: frame.value(TIMESTAMP, row),
        reading,
        suspicions: reading.suspicions(),
        post_crash,
    })
}
