//! Workout session state machine
//!
//! `WorkoutSession` is the aggregate for one run. It owns the filter,
//! accumulator, split detector, route and pace history, and gates all of them
//! on its lifecycle state:
//!
//! ```text
//! Selecting -> Starting -> Active <-> Paused -> Finished
//! ```
//!
//! Elapsed time is `now - started_at`, where `started_at` moves forward by
//! each paused interval on resume. Finished is terminal; every mutating call
//! on a finished session is a no-op.
//!
//! The route is made of segments. The first fix after a resume, or after a
//! run of mutually consistent jump rejections, opens a new segment: it is
//! recorded but adds no distance across the break.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::filter::{FilterDecision, JumpRecovery, RejectReason, SampleFilter, SignalThresholds};
use crate::models::{
    ActivitySummary, LocationUpdate, RawFix, RoutePoint, SessionEvent, SessionState,
    SignalQuality, Split, TelemetrySnapshot, WorkoutMode,
};
use crate::pace_history::PaceHistory;
use crate::resources::{DeviceResource, ResourceScope};
use crate::route::RouteRecorder;
use crate::splits::SplitDetector;
use crate::telemetry::{derive_speed, format_pace, TelemetryAccumulator};

/// Result of offering one location update to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Accepted {
        distance_m: f64,
        splits_completed: usize,
    },
    Rejected(RejectReason),
    /// The location source reported an error; nothing was recorded
    SourceUnavailable,
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SampleOutcome::Accepted { .. })
    }
}

/// One run, from mode selection to finish
pub struct WorkoutSession {
    id: Uuid,
    mode: WorkoutMode,
    state: SessionState,
    clock: Arc<dyn Clock>,

    filter: SampleFilter,
    signal_thresholds: SignalThresholds,
    telemetry: TelemetryAccumulator,
    splits: SplitDetector,
    route: RouteRecorder,
    pace_history: PaceHistory,

    /// Pause-adjusted anchor for elapsed time
    started_at_ms: Option<i64>,
    /// Wall-clock moment the session first went active
    activated_at_ms: Option<i64>,
    paused_at_ms: Option<i64>,
    /// Last computed elapsed time, never decreasing
    elapsed_ms: i64,

    last_altitude_m: Option<f64>,
    last_sample_elapsed_s: f64,
    signal: SignalQuality,
    /// Next accepted fix starts a new segment
    segment_break: bool,
    jump_recovery: JumpRecovery,

    events: Vec<SessionEvent>,
    pending_resources: Vec<Box<dyn DeviceResource>>,
    resource_scope: Option<ResourceScope>,
    summary: Option<ActivitySummary>,
}

impl WorkoutSession {
    pub fn new(mode: WorkoutMode, config: &TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            state: SessionState::Selecting,
            clock,
            filter: SampleFilter::new(config.filter.clone()),
            signal_thresholds: config.signal.clone(),
            telemetry: TelemetryAccumulator::new(config.telemetry.clone()),
            splits: SplitDetector::new(),
            route: RouteRecorder::new(),
            pace_history: PaceHistory::new(config.telemetry.pace_history_capacity),
            started_at_ms: None,
            activated_at_ms: None,
            paused_at_ms: None,
            elapsed_ms: 0,
            last_altitude_m: None,
            last_sample_elapsed_s: 0.0,
            signal: SignalQuality::Searching,
            segment_break: false,
            jump_recovery: JumpRecovery::new(),
            events: Vec::new(),
            pending_resources: Vec::new(),
            resource_scope: None,
            summary: None,
        }
    }

    /// Device resources to hold while the session is live
    pub fn with_resources(mut self, resources: Vec<Box<dyn DeviceResource>>) -> Self {
        self.pending_resources = resources;
        self
    }

    /// Change the workout mode; only while selecting
    pub fn select_mode(&mut self, mode: WorkoutMode) -> Result<()> {
        self.require(SessionState::Selecting, "change mode")?;
        self.mode = mode;
        Ok(())
    }

    /// Confirm the selection and begin the countdown
    pub fn confirm_start(&mut self) -> Result<()> {
        self.require(SessionState::Selecting, "start")?;
        self.state = SessionState::Starting;
        tracing::info!(session = %self.id, mode = %self.mode, "Countdown started");
        Ok(())
    }

    /// End of the countdown: anchor timing and begin sampling
    pub fn activate(&mut self) -> Result<()> {
        self.require(SessionState::Starting, "activate")?;

        let now = self.clock.now_ms();
        self.started_at_ms = Some(now);
        self.activated_at_ms = Some(now);
        self.elapsed_ms = 0;
        self.last_sample_elapsed_s = 0.0;
        self.state = SessionState::Active;

        let resources = std::mem::take(&mut self.pending_resources);
        self.resource_scope = Some(ResourceScope::acquire_all(resources));

        tracing::info!(session = %self.id, mode = %self.mode, "Session active");
        self.events.push(SessionEvent::Started { mode: self.mode });
        Ok(())
    }

    /// Freeze timing and metrics
    pub fn pause(&mut self) -> Result<()> {
        self.require(SessionState::Active, "pause")?;

        self.refresh_elapsed();
        self.paused_at_ms = Some(self.clock.now_ms());
        self.state = SessionState::Paused;

        tracing::info!(session = %self.id, elapsed_s = self.elapsed_seconds(), "Session paused");
        self.events.push(SessionEvent::Paused {
            elapsed_seconds: self.elapsed_seconds(),
        });
        Ok(())
    }

    /// Shift the time anchor past the pause, then resume timing and sampling
    pub fn resume(&mut self) -> Result<()> {
        self.require(SessionState::Paused, "resume")?;

        let now = self.clock.now_ms();
        let paused_ms = self
            .paused_at_ms
            .take()
            .map_or(0, |paused_at| (now - paused_at).max(0));
        if let Some(started_at) = self.started_at_ms.as_mut() {
            *started_at += paused_ms;
        }
        // movement while paused must not count as distance
        self.segment_break = true;
        self.jump_recovery.reset();
        self.state = SessionState::Active;

        tracing::info!(session = %self.id, paused_ms, "Session resumed");
        self.events.push(SessionEvent::Resumed {
            paused_seconds: (paused_ms / 1000) as u64,
        });
        Ok(())
    }

    /// Timer tick: recompute elapsed time and sample the pace sparkline.
    /// Returns false when the session is not active.
    pub fn tick(&mut self) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        let elapsed_s = self.refresh_elapsed();
        self.telemetry.on_tick(elapsed_s);
        if let Some(pace) = self.telemetry.current_pace_sec_per_km() {
            self.pace_history.push(pace);
        }
        true
    }

    /// Offer one update from the geolocation watch
    pub fn ingest(&mut self, update: &LocationUpdate) -> SampleOutcome {
        match update {
            LocationUpdate::Fix(fix) => self.ingest_fix(fix),
            LocationUpdate::Unavailable(reason) => {
                if self.state.is_live() {
                    tracing::warn!(session = %self.id, %reason, "Location source unavailable");
                    self.signal = SignalQuality::Searching;
                }
                SampleOutcome::SourceUnavailable
            }
        }
    }

    /// Run one fix through filter, accumulator, split detector and route
    pub fn ingest_fix(&mut self, fix: &RawFix) -> SampleOutcome {
        // Checked first so a late fix can never touch a paused or finished session
        if self.state != SessionState::Active {
            return SampleOutcome::Rejected(RejectReason::SessionInactive(self.state));
        }

        let prior = if self.segment_break {
            None
        } else {
            self.route.last()
        };
        let mut decision = self.filter.accept(fix, prior, self.state);
        if !matches!(decision, FilterDecision::Rejected(RejectReason::Malformed)) {
            self.signal = self.signal_thresholds.classify(fix.accuracy_m);
        }

        let mut segment_start = self.segment_break;
        if matches!(decision, FilterDecision::Rejected(RejectReason::ImplausibleJump { .. })) {
            if self.jump_recovery.observe(fix, self.filter.policy()) {
                tracing::info!(
                    session = %self.id,
                    "Repeated consistent jumps, restarting route segment"
                );
                decision = FilterDecision::Accepted { distance_m: 0.0 };
                segment_start = true;
            }
        } else if matches!(
            decision,
            FilterDecision::Accepted { .. } | FilterDecision::Rejected(RejectReason::Jitter { .. })
        ) {
            // the anchor still matches reality
            self.jump_recovery.reset();
        }

        let distance_m = match decision {
            FilterDecision::Accepted { distance_m } => distance_m,
            FilterDecision::Rejected(reason) => {
                tracing::debug!(session = %self.id, ?reason, "Fix rejected");
                return SampleOutcome::Rejected(reason);
            }
        };

        let elapsed_s = self.refresh_elapsed();
        let speed_mps = if segment_start {
            self.last_altitude_m = None;
            fix.speed_mps
        } else {
            fix.speed_mps.or_else(|| {
                self.route
                    .last()
                    .and_then(|prior| derive_speed(distance_m, fix.timestamp_ms - prior.timestamp_ms))
            })
        };

        let elevation_gain = self.filter.elevation_gain(self.last_altitude_m, fix.altitude_m);
        if let Some(altitude) = fix.altitude_m.filter(|a| a.is_finite()) {
            self.last_altitude_m = Some(altitude);
        }

        let previous_distance_m = self.telemetry.distance_m();
        self.telemetry
            .on_accepted_sample(distance_m, speed_mps, elevation_gain, elapsed_s);

        let completed = self.splits.on_distance_update(
            previous_distance_m,
            self.last_sample_elapsed_s,
            self.telemetry.distance_m(),
            elapsed_s,
        );
        for split in &completed {
            tracing::info!(
                session = %self.id,
                km = split.km_index,
                pace = %split.pace_label,
                "Kilometer completed"
            );
            self.events.push(SessionEvent::KmCompleted {
                km_index: split.km_index,
                split_duration_seconds: split.split_duration_seconds,
                pace_label: split.pace_label.clone(),
            });
        }

        self.last_sample_elapsed_s = elapsed_s;
        self.segment_break = false;
        self.route.append(RoutePoint::from(fix));

        SampleOutcome::Accepted {
            distance_m,
            splits_completed: completed.len(),
        }
    }

    /// Stop everything, release device resources and produce the summary.
    pub fn finish(&mut self, notes: Option<String>) -> Result<ActivitySummary> {
        if !self.state.is_live() {
            return Err(TrackerError::InvalidTransition {
                from: self.state,
                action: "finish",
            });
        }

        // paused time is already excluded; only an active session advances
        self.refresh_elapsed();
        let elapsed_s = self.elapsed_ms as f64 / 1000.0;
        self.telemetry.on_tick(elapsed_s);
        self.state = SessionState::Finished;
        self.paused_at_ms = None;
        self.resource_scope = None;

        let summary = self.build_summary(notes);
        tracing::info!(
            session = %self.id,
            distance_km = %summary.distance_km,
            duration_min = %summary.duration_min,
            splits = summary.splits.len(),
            "Session finished"
        );
        self.events.push(SessionEvent::Finished {
            distance_km: self.telemetry.distance_km(),
            elapsed_seconds: self.elapsed_seconds(),
        });
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    fn build_summary(&self, notes: Option<String>) -> ActivitySummary {
        let date = self
            .activated_at_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);
        let avg_pace = self.telemetry.avg_pace_sec_per_km();

        ActivitySummary {
            id: self.id,
            mode: self.mode,
            date,
            distance_km: to_decimal(self.telemetry.distance_km()),
            duration_min: to_decimal(self.elapsed_ms as f64 / 60_000.0),
            avg_pace: avg_pace.map(format_pace),
            avg_pace_sec_per_km: avg_pace,
            elevation_gain_m: self.telemetry.elevation_gain_m().round() as u32,
            calories_kcal: self.telemetry.calories_kcal().round() as u32,
            route: self.route.points().to_vec(),
            splits: self.splits.splits().to_vec(),
            notes,
        }
    }

    /// Recompute elapsed time while active, clamped non-negative and
    /// non-decreasing against clock adjustments. Returns seconds.
    fn refresh_elapsed(&mut self) -> f64 {
        if self.state == SessionState::Active {
            if let Some(started_at) = self.started_at_ms {
                let raw = self.clock.now_ms() - started_at;
                self.elapsed_ms = self.elapsed_ms.max(raw.max(0));
            }
        }
        self.elapsed_ms as f64 / 1000.0
    }

    fn require(&self, expected: SessionState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            tracing::debug!(session = %self.id, state = %self.state, action, "Transition refused");
            Err(TrackerError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Drain events raised since the last call
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let elapsed_s = self.elapsed_ms as f64 / 1000.0;
        TelemetrySnapshot {
            state: self.state,
            mode: self.mode,
            elapsed_seconds: self.elapsed_seconds(),
            distance_m: self.telemetry.distance_m(),
            distance_km: self.telemetry.distance_km(),
            current_pace_sec_per_km: self.telemetry.current_pace_sec_per_km(),
            avg_pace_sec_per_km: self.telemetry.avg_pace_sec_per_km(),
            current_split_pace_sec_per_km: self
                .splits
                .current_split_pace(self.telemetry.distance_m(), elapsed_s),
            current_speed_kmh: self.telemetry.current_speed_kmh(),
            elevation_gain_m: self.telemetry.elevation_gain_m(),
            calories_kcal: self.telemetry.calories_kcal(),
            signal: self.signal,
            route_points: self.route.len(),
            splits_completed: self.splits.splits().len(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> WorkoutMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        (self.elapsed_ms / 1000) as u64
    }

    pub fn distance_m(&self) -> f64 {
        self.telemetry.distance_m()
    }

    pub fn route(&self) -> &[RoutePoint] {
        self.route.points()
    }

    pub fn splits(&self) -> &[Split] {
        self.splits.splits()
    }

    pub fn pace_history(&self) -> &PaceHistory {
        &self.pace_history
    }

    pub fn signal(&self) -> SignalQuality {
        self.signal
    }

    /// The frozen summary, once finished
    pub fn summary(&self) -> Option<&ActivitySummary> {
        self.summary.as_ref()
    }
}

impl std::fmt::Debug for WorkoutSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkoutSession")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("distance_m", &self.telemetry.distance_m())
            .field("route_points", &self.route.len())
            .field("splits", &self.splits.splits().len())
            .finish_non_exhaustive()
    }
}

/// Two-decimal value with a fixed scale, so exports always read `x.xx`
fn to_decimal(value: f64) -> Decimal {
    let mut decimal = Decimal::from_f64(value).unwrap_or_default().round_dp(2);
    decimal.rescale(2);
    decimal
}
