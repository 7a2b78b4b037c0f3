//! Kilometer split detection

use crate::models::Split;
use crate::telemetry::format_pace;

/// Length of one split in meters
pub const SPLIT_DISTANCE_M: f64 = 1000.0;

/// Floating-point slack when testing a boundary, so a course summing to
/// 999.9999999 m still completes its kilometer (meters)
const BOUNDARY_EPSILON_M: f64 = 1e-3;

/// Emits one [`Split`] per whole kilometer crossed.
///
/// Splits are keyed by a strictly increasing km index, so a boundary is never
/// announced twice even if GPS wanders back and forth across it.
#[derive(Debug, Clone, Default)]
pub struct SplitDetector {
    splits: Vec<Split>,
    last_split_elapsed_s: f64,
}

impl SplitDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check for newly completed kilometers after a distance update.
    ///
    /// `previous_*` describe the last accepted sample, `distance_m` and
    /// `elapsed_s` the current one. Each crossed boundary gets a crossing time
    /// interpolated along the segment, so a multi-km catch-up after a GPS gap
    /// yields one split per km in order. Returns the splits emitted by this call.
    pub fn on_distance_update(
        &mut self,
        previous_distance_m: f64,
        previous_elapsed_s: f64,
        distance_m: f64,
        elapsed_s: f64,
    ) -> Vec<Split> {
        let completed = ((distance_m + BOUNDARY_EPSILON_M) / SPLIT_DISTANCE_M).floor() as u32;
        let mut emitted = Vec::new();

        while self.completed_km() < completed {
            let km_index = self.completed_km() + 1;
            let boundary_m = km_index as f64 * SPLIT_DISTANCE_M;

            let crossing_s = if distance_m > previous_distance_m {
                let fraction = ((boundary_m - previous_distance_m)
                    / (distance_m - previous_distance_m))
                    .clamp(0.0, 1.0);
                previous_elapsed_s + (elapsed_s - previous_elapsed_s) * fraction
            } else {
                elapsed_s
            };

            let duration_s = (crossing_s - self.last_split_elapsed_s).max(0.0);
            let split = Split {
                km_index,
                split_duration_seconds: duration_s.round() as u64,
                pace_label: format_pace(duration_s),
            };

            tracing::debug!(km = km_index, duration_s, "Split completed");

            self.last_split_elapsed_s = self.last_split_elapsed_s.max(crossing_s);
            self.splits.push(split.clone());
            emitted.push(split);
        }

        emitted
    }

    /// Pace within the current, incomplete kilometer
    pub fn current_split_pace(&self, distance_m: f64, elapsed_s: f64) -> Option<f64> {
        let into_split_m = distance_m - self.completed_km() as f64 * SPLIT_DISTANCE_M;
        if into_split_m <= 0.0 {
            return None;
        }
        let split_elapsed_s = (elapsed_s - self.last_split_elapsed_s).max(0.0);
        Some(split_elapsed_s / (into_split_m / SPLIT_DISTANCE_M))
    }

    pub fn completed_km(&self) -> u32 {
        self.splits.len() as u32
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn last_split_elapsed_s(&self) -> f64 {
        self.last_split_elapsed_s
    }
}
