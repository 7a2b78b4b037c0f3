//! Live telemetry accumulation
//!
//! Running distance, pace, speed, elevation gain and calories derived from the
//! stream of accepted samples. Timing is owned by the session; every update
//! receives the current pause-adjusted elapsed time.

use serde::{Deserialize, Serialize};

/// Settings for derived metrics and session timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Below this speed pace is undefined rather than huge (m/s)
    pub speed_floor_mps: f64,

    /// Average pace is withheld until distance exceeds this (meters)
    pub avg_pace_min_distance_m: f64,

    /// Runner body weight used by the calorie estimate (kg)
    pub body_weight_kg: f64,

    /// kcal per kg per km
    pub calorie_factor: f64,

    /// Samples kept for the pace sparkline
    pub pace_history_capacity: usize,

    /// Elapsed-time tick period (milliseconds)
    pub tick_interval_ms: u64,

    /// Countdown between confirming start and going active (milliseconds)
    pub countdown_ms: u64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            speed_floor_mps: 0.5,
            avg_pace_min_distance_m: 50.0,
            body_weight_kg: 70.0,
            calorie_factor: 1.036,
            pace_history_capacity: crate::pace_history::DEFAULT_CAPACITY,
            tick_interval_ms: 1000,
            countdown_ms: 2500,
        }
    }
}

/// Accumulated metrics for one session
#[derive(Debug, Clone)]
pub struct TelemetryAccumulator {
    settings: TelemetrySettings,
    distance_m: f64,
    current_pace_sec_per_km: Option<f64>,
    avg_pace_sec_per_km: Option<f64>,
    current_speed_kmh: f64,
    elevation_gain_m: f64,
    calories_kcal: f64,
}

impl TelemetryAccumulator {
    pub fn new(settings: TelemetrySettings) -> Self {
        Self {
            settings,
            distance_m: 0.0,
            current_pace_sec_per_km: None,
            avg_pace_sec_per_km: None,
            current_speed_kmh: 0.0,
            elevation_gain_m: 0.0,
            calories_kcal: 0.0,
        }
    }

    /// Fold one accepted sample into the running totals.
    ///
    /// `distance_delta_m` is the displacement from the previous accepted point
    /// and `elevation_gain_m` the already band-filtered climb for this step.
    pub fn on_accepted_sample(
        &mut self,
        distance_delta_m: f64,
        speed_mps: Option<f64>,
        elevation_gain_m: f64,
        elapsed_seconds: f64,
    ) {
        if distance_delta_m.is_finite() && distance_delta_m > 0.0 {
            self.distance_m += distance_delta_m;
        }
        if elevation_gain_m.is_finite() && elevation_gain_m > 0.0 {
            self.elevation_gain_m += elevation_gain_m;
        }

        match speed_mps.filter(|s| s.is_finite() && *s >= 0.0) {
            Some(speed) => {
                self.current_speed_kmh = speed * 3.6;
                self.current_pace_sec_per_km = pace_from_speed(speed, self.settings.speed_floor_mps);
            }
            // no reported or derivable speed: the instantaneous pace is unknown
            None => {
                self.current_speed_kmh = 0.0;
                self.current_pace_sec_per_km = None;
            }
        }

        self.calories_kcal =
            estimate_calories(self.distance_km(), self.settings.body_weight_kg, self.settings.calorie_factor);
        self.refresh_average(elapsed_seconds);
    }

    /// Recompute time-dependent metrics on a timer tick
    pub fn on_tick(&mut self, elapsed_seconds: f64) {
        self.refresh_average(elapsed_seconds);
    }

    fn refresh_average(&mut self, elapsed_seconds: f64) {
        self.avg_pace_sec_per_km = if self.distance_m > self.settings.avg_pace_min_distance_m {
            Some(elapsed_seconds / self.distance_km())
        } else {
            None
        };
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn current_pace_sec_per_km(&self) -> Option<f64> {
        self.current_pace_sec_per_km
    }

    pub fn avg_pace_sec_per_km(&self) -> Option<f64> {
        self.avg_pace_sec_per_km
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    pub fn elevation_gain_m(&self) -> f64 {
        self.elevation_gain_m
    }

    pub fn calories_kcal(&self) -> f64 {
        self.calories_kcal
    }

    pub fn settings(&self) -> &TelemetrySettings {
        &self.settings
    }
}

/// Pace in seconds per km, or `None` at or below the speed floor
pub fn pace_from_speed(speed_mps: f64, floor_mps: f64) -> Option<f64> {
    if speed_mps > floor_mps {
        Some(1000.0 / speed_mps)
    } else {
        None
    }
}

/// Speed implied by covering `distance_m` in `dt_ms`
pub fn derive_speed(distance_m: f64, dt_ms: i64) -> Option<f64> {
    if dt_ms > 0 && distance_m.is_finite() {
        Some(distance_m / (dt_ms as f64 / 1000.0))
    } else {
        None
    }
}

/// Simplified MET-style estimate: `km * kg * factor`. Not physiologically exact.
pub fn estimate_calories(distance_km: f64, body_weight_kg: f64, factor: f64) -> f64 {
    distance_km * body_weight_kg * factor
}

/// `m:ss` label for a pace in seconds per km
pub fn format_pace(sec_per_km: f64) -> String {
    if !sec_per_km.is_finite() || sec_per_km <= 0.0 {
        return "--:--".to_string();
    }
    let total = sec_per_km.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Pace phrased for a voice announcement
pub fn spoken_pace(sec_per_km: f64) -> String {
    let total = sec_per_km.max(0.0).round() as u64;
    let (minutes, seconds) = (total / 60, total % 60);
    match (minutes, seconds) {
        (0, s) => format!("{} seconds per kilometer", s),
        (m, 0) => format!("{} minutes per kilometer", m),
        (m, s) => format!("{} minutes {} seconds per kilometer", m, s),
    }
}

/// `h:mm:ss` once past an hour, otherwise `mm:ss`
pub fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
