use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Workout intensity chosen before a run. Cosmetic to the engine: it only
/// selects a named profile for display and is carried into the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutMode {
    Walk,
    Jog,
    #[default]
    Run,
    Sprint,
    LongRun,
    Recovery,
}

/// Display profile attached to a workout mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    pub label: &'static str,
    pub pattern: &'static str,
    pub theme: &'static str,
}

impl WorkoutMode {
    pub const ALL: [WorkoutMode; 6] = [
        WorkoutMode::Walk,
        WorkoutMode::Jog,
        WorkoutMode::Run,
        WorkoutMode::Sprint,
        WorkoutMode::LongRun,
        WorkoutMode::Recovery,
    ];

    pub fn profile(&self) -> ModeProfile {
        match self {
            WorkoutMode::Walk => ModeProfile {
                label: "Walk",
                pattern: "steady",
                theme: "emerald",
            },
            WorkoutMode::Jog => ModeProfile {
                label: "Jog",
                pattern: "easy",
                theme: "sky",
            },
            WorkoutMode::Run => ModeProfile {
                label: "Run",
                pattern: "tempo",
                theme: "amber",
            },
            WorkoutMode::Sprint => ModeProfile {
                label: "Sprint",
                pattern: "intervals",
                theme: "rose",
            },
            WorkoutMode::LongRun => ModeProfile {
                label: "Long Run",
                pattern: "endurance",
                theme: "violet",
            },
            WorkoutMode::Recovery => ModeProfile {
                label: "Recovery",
                pattern: "gentle",
                theme: "slate",
            },
        }
    }
}

impl fmt::Display for WorkoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.profile().label)
    }
}

impl std::str::FromStr for WorkoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "walk" => Ok(WorkoutMode::Walk),
            "jog" => Ok(WorkoutMode::Jog),
            "run" => Ok(WorkoutMode::Run),
            "sprint" => Ok(WorkoutMode::Sprint),
            "long_run" | "longrun" => Ok(WorkoutMode::LongRun),
            "recovery" => Ok(WorkoutMode::Recovery),
            _ => Err(format!("Invalid workout mode: {}", s)),
        }
    }
}

/// Lifecycle state of a workout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Selecting,
    Starting,
    Active,
    Paused,
    Finished,
}

impl SessionState {
    /// Active or Paused: device resources are held
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Selecting => "selecting",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One raw reading from the device geolocation source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub lat: f64,
    pub lng: f64,

    /// Radius of uncertainty in meters, if the device reports one
    pub accuracy_m: Option<f64>,

    /// Instantaneous ground speed in meters per second
    pub speed_mps: Option<f64>,

    /// Altitude above sea level in meters
    pub altitude_m: Option<f64>,

    /// Device timestamp in epoch milliseconds
    pub timestamp_ms: i64,
}

impl RawFix {
    pub fn new(lat: f64, lng: f64, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lng,
            accuracy_m: None,
            speed_mps: None,
            altitude_m: None,
            timestamp_ms,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude_m = Some(altitude_m);
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// What the geolocation watch delivers: a fix, or notice that the source failed
#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    Fix(RawFix),
    Unavailable(String),
}

/// An accepted point on the session polyline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    pub altitude_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub timestamp_ms: i64,
}

impl RoutePoint {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

impl From<&RawFix> for RoutePoint {
    fn from(fix: &RawFix) -> Self {
        RoutePoint {
            lat: fix.lat,
            lng: fix.lng,
            altitude_m: fix.altitude_m,
            speed_mps: fix.speed_mps,
            timestamp_ms: fix.timestamp_ms,
        }
    }
}

/// Time taken for one whole kilometer.
///
/// The duration runs between the interpolated moments the cumulative distance
/// crossed each kilometer boundary, not between the samples that carried it
/// over, so a sparse or jumping fix stream still yields per-km times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    /// 1-based kilometer number
    pub km_index: u32,
    pub split_duration_seconds: u64,
    /// Pace as `m:ss` per kilometer
    pub pace_label: String,
}

/// Coarse GPS signal quality exposed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    Strong,
    Ok,
    Weak,
    Searching,
}

/// Discrete notification raised by the session for external notifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        mode: WorkoutMode,
    },
    Paused {
        elapsed_seconds: u64,
    },
    Resumed {
        paused_seconds: u64,
    },
    KmCompleted {
        km_index: u32,
        split_duration_seconds: u64,
        pace_label: String,
    },
    Finished {
        distance_km: f64,
        elapsed_seconds: u64,
    },
}

/// Live read-model of the session, recomputed on every tick and accepted sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub state: SessionState,
    pub mode: WorkoutMode,
    pub elapsed_seconds: u64,
    pub distance_m: f64,
    pub distance_km: f64,
    pub current_pace_sec_per_km: Option<f64>,
    pub avg_pace_sec_per_km: Option<f64>,
    pub current_split_pace_sec_per_km: Option<f64>,
    pub current_speed_kmh: f64,
    pub elevation_gain_m: f64,
    pub calories_kcal: f64,
    pub signal: SignalQuality,
    pub route_points: usize,
    pub splits_completed: usize,
}

/// Immutable record produced when a session finishes. Field names are the
/// stable export format handed to persistence and sharing collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: Uuid,
    pub mode: WorkoutMode,

    /// Wall-clock moment the session became active
    pub date: DateTime<Utc>,

    pub distance_km: Decimal,
    pub duration_min: Decimal,

    /// Average pace as `m:ss` per kilometer
    pub avg_pace: Option<String>,
    pub avg_pace_sec_per_km: Option<f64>,

    pub elevation_gain_m: u32,
    pub calories_kcal: u32,
    pub route: Vec<RoutePoint>,
    pub splits: Vec<Split>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workout_mode_serialization() {
        let json = serde_json::to_string(&WorkoutMode::LongRun).unwrap();
        assert_eq!(json, "\"long_run\"");

        let mode: WorkoutMode = serde_json::from_str("\"recovery\"").unwrap();
        assert_eq!(mode, WorkoutMode::Recovery);
    }

    #[test]
    fn test_workout_mode_parsing() {
        assert_eq!("long-run".parse::<WorkoutMode>().unwrap(), WorkoutMode::LongRun);
        assert_eq!("Sprint".parse::<WorkoutMode>().unwrap(), WorkoutMode::Sprint);
        assert!("swim".parse::<WorkoutMode>().is_err());
        assert_eq!(WorkoutMode::default(), WorkoutMode::Run);
    }

    #[test]
    fn test_every_mode_has_a_profile() {
        for mode in WorkoutMode::ALL {
            let profile = mode.profile();
            assert!(!profile.label.is_empty());
            assert!(!profile.theme.is_empty());
        }
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Paused.to_string(), "paused");
        assert!(SessionState::Paused.is_live());
        assert!(!SessionState::Starting.is_live());
    }

    #[test]
    fn test_route_point_from_fix() {
        let fix = RawFix::new(51.5, -0.12, 1_000).with_altitude(12.0).with_speed(3.0);
        let point = RoutePoint::from(&fix);
        assert_eq!(point.lat, 51.5);
        assert_eq!(point.altitude_m, Some(12.0));
        assert_eq!(point.speed_mps, Some(3.0));
        assert_eq!(point.timestamp_ms, 1_000);
    }
}
