//! GPS sample filtering
//!
//! Decides whether a raw fix is trustworthy enough to enter the telemetry
//! pipeline. Decisions are pure: nothing is mutated here, the session applies
//! an accepted sample afterwards.
//!
//! Every threshold lives in [`FilterPolicy`]. The defaults (40 m accuracy
//! ceiling, 3 m jitter floor, 0.5-10 m elevation band) are empirical and
//! should be calibrated against real traces rather than treated as physics.

use serde::{Deserialize, Serialize};

use crate::geo;
use crate::models::{RawFix, RoutePoint, SessionState, SignalQuality};

/// Tunable thresholds for sample acceptance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// Fixes reporting a worse accuracy radius than this are rejected (meters)
    pub max_accuracy_m: f64,

    /// Movement at or below this distance from the previous point is jitter (meters)
    pub min_displacement_m: f64,

    /// Altitude deltas must exceed this to count as climbing (meters)
    pub min_elevation_delta_m: f64,

    /// Altitude deltas must stay below this; larger jumps are altimeter spikes (meters)
    pub max_elevation_delta_m: f64,

    /// Implied speed above this between two fixes is a position jump (m/s).
    /// `None` disables the check.
    pub max_plausible_speed_mps: Option<f64>,

    /// After this many consecutive jump rejections that agree with each
    /// other, the last accepted point is taken as the outlier and the route
    /// restarts from the newest fix. `0` disables re-anchoring.
    pub reanchor_after_jumps: u32,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            max_accuracy_m: 40.0,
            min_displacement_m: 3.0,
            min_elevation_delta_m: 0.5,
            max_elevation_delta_m: 10.0,
            max_plausible_speed_mps: Some(15.0),
            reanchor_after_jumps: 3,
        }
    }
}

/// Why a fix was not accepted
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Sampling is gated off in this state
    SessionInactive(SessionState),
    /// Non-finite or out-of-range coordinates, or a negative accuracy
    Malformed,
    PoorAccuracy { accuracy_m: f64 },
    Jitter { distance_m: f64 },
    ImplausibleJump { speed_mps: f64 },
}

/// Outcome of filtering one fix
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    /// Accepted; carries the displacement from the prior accepted point
    Accepted { distance_m: f64 },
    Rejected(RejectReason),
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted { .. })
    }
}

/// Applies a [`FilterPolicy`] to incoming fixes
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    policy: FilterPolicy,
}

impl SampleFilter {
    pub fn new(policy: FilterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Decide whether `candidate` enters the pipeline.
    pub fn accept(
        &self,
        candidate: &RawFix,
        prior: Option<&RoutePoint>,
        state: SessionState,
    ) -> FilterDecision {
        if state != SessionState::Active {
            return FilterDecision::Rejected(RejectReason::SessionInactive(state));
        }

        if !Self::is_well_formed(candidate) {
            return FilterDecision::Rejected(RejectReason::Malformed);
        }

        // Unknown accuracy is tolerated
        if let Some(accuracy_m) = candidate.accuracy_m {
            if accuracy_m > self.policy.max_accuracy_m {
                return FilterDecision::Rejected(RejectReason::PoorAccuracy { accuracy_m });
            }
        }

        let Some(prior) = prior else {
            return FilterDecision::Accepted { distance_m: 0.0 };
        };

        let distance_m = geo::distance_meters(prior.position(), candidate.position());
        if distance_m <= self.policy.min_displacement_m {
            return FilterDecision::Rejected(RejectReason::Jitter { distance_m });
        }

        if let Some(max_speed) = self.policy.max_plausible_speed_mps {
            let dt_ms = candidate.timestamp_ms - prior.timestamp_ms;
            if dt_ms > 0 {
                let speed_mps = distance_m / (dt_ms as f64 / 1000.0);
                if speed_mps > max_speed {
                    return FilterDecision::Rejected(RejectReason::ImplausibleJump { speed_mps });
                }
            }
        }

        FilterDecision::Accepted { distance_m }
    }

    /// Elevation gain contributed by moving from `previous` to `current` altitude.
    ///
    /// Only deltas strictly inside the configured band count; descents, flat
    /// noise and spikes all contribute zero.
    pub fn elevation_gain(&self, previous: Option<f64>, current: Option<f64>) -> f64 {
        match (previous, current) {
            (Some(prev), Some(curr)) if prev.is_finite() && curr.is_finite() => {
                let delta = curr - prev;
                if delta > self.policy.min_elevation_delta_m
                    && delta < self.policy.max_elevation_delta_m
                {
                    delta
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn is_well_formed(fix: &RawFix) -> bool {
        fix.lat.is_finite()
            && fix.lng.is_finite()
            && (-90.0..=90.0).contains(&fix.lat)
            && (-180.0..=180.0).contains(&fix.lng)
            && fix.accuracy_m.map_or(true, |a| a.is_finite() && a >= 0.0)
            && fix.speed_mps.map_or(true, |s| s.is_finite())
    }
}

/// Streak of fixes rejected as position jumps.
///
/// A single bad accepted point would otherwise lock out every real fix after
/// it. When the rejected fixes form a plausible track among themselves, the
/// session starts a new segment from the latest one.
#[derive(Debug, Clone, Default)]
pub struct JumpRecovery {
    last: Option<RawFix>,
    streak: u32,
}

impl JumpRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fix rejected as a jump. Returns true when the streak is long
    /// enough to re-anchor on `fix`; the streak is cleared in that case.
    pub fn observe(&mut self, fix: &RawFix, policy: &FilterPolicy) -> bool {
        // a redelivered or out-of-order fix is not new evidence
        if let Some(previous) = &self.last {
            if fix.timestamp_ms <= previous.timestamp_ms {
                return false;
            }
        }

        let consistent = self
            .last
            .as_ref()
            .map_or(false, |previous| Self::agrees(previous, fix, policy));
        self.streak = if consistent { self.streak + 1 } else { 1 };
        self.last = Some(fix.clone());

        if policy.reanchor_after_jumps > 0 && self.streak >= policy.reanchor_after_jumps {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.streak = 0;
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    fn agrees(previous: &RawFix, fix: &RawFix, policy: &FilterPolicy) -> bool {
        let distance_m = geo::distance_meters(previous.position(), fix.position());
        let dt_s = (fix.timestamp_ms - previous.timestamp_ms) as f64 / 1000.0;
        match policy.max_plausible_speed_mps {
            Some(max_speed) => distance_m / dt_s <= max_speed,
            None => distance_m <= policy.max_accuracy_m,
        }
    }
}

/// Accuracy bands for the signal indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// At or below this radius the signal is strong (meters)
    pub strong_max_m: f64,
    /// At or below this radius the signal is usable (meters)
    pub ok_max_m: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            strong_max_m: 10.0,
            ok_max_m: 25.0,
        }
    }
}

impl SignalThresholds {
    /// Classify a received fix. A fix without accuracy still proves the
    /// receiver has a lock, so it counts as `Ok`.
    pub fn classify(&self, accuracy_m: Option<f64>) -> SignalQuality {
        match accuracy_m {
            None => SignalQuality::Ok,
            Some(a) if a <= self.strong_max_m => SignalQuality::Strong,
            Some(a) if a <= self.ok_max_m => SignalQuality::Ok,
            Some(_) => SignalQuality::Weak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::meters_to_lat_degrees;

    fn prior_at(lat: f64, timestamp_ms: i64) -> RoutePoint {
        RoutePoint {
            lat,
            lng: 0.0,
            altitude_m: None,
            speed_mps: None,
            timestamp_ms,
        }
    }

    #[test]
    fn test_first_fix_is_accepted() {
        let filter = SampleFilter::default();
        let fix = RawFix::new(45.0, 7.0, 0).with_accuracy(10.0);
        assert_eq!(
            filter.accept(&fix, None, SessionState::Active),
            FilterDecision::Accepted { distance_m: 0.0 }
        );
    }

    #[test]
    fn test_inactive_states_reject() {
        let filter = SampleFilter::default();
        let fix = RawFix::new(45.0, 7.0, 0);
        for state in [
            SessionState::Selecting,
            SessionState::Starting,
            SessionState::Paused,
            SessionState::Finished,
        ] {
            assert_eq!(
                filter.accept(&fix, None, state),
                FilterDecision::Rejected(RejectReason::SessionInactive(state))
            );
        }
    }

    #[test]
    fn test_accuracy_gate() {
        let filter = SampleFilter::default();
        let poor = RawFix::new(0.0, 0.0, 0).with_accuracy(45.0);
        assert_eq!(
            filter.accept(&poor, None, SessionState::Active),
            FilterDecision::Rejected(RejectReason::PoorAccuracy { accuracy_m: 45.0 })
        );

        let boundary = RawFix::new(0.0, 0.0, 0).with_accuracy(40.0);
        assert!(filter.accept(&boundary, None, SessionState::Active).is_accepted());

        let unknown = RawFix::new(0.0, 0.0, 0);
        assert!(filter.accept(&unknown, None, SessionState::Active).is_accepted());
    }

    #[test]
    fn test_jitter_rejected() {
        let filter = SampleFilter::default();
        let prior = prior_at(0.0, 0);

        let same = RawFix::new(0.0, 0.0, 1_000);
        assert!(matches!(
            filter.accept(&same, Some(&prior), SessionState::Active),
            FilterDecision::Rejected(RejectReason::Jitter { .. })
        ));

        let two_m = RawFix::new(meters_to_lat_degrees(2.0), 0.0, 1_000);
        assert!(!filter.accept(&two_m, Some(&prior), SessionState::Active).is_accepted());

        let five_m = RawFix::new(meters_to_lat_degrees(5.0), 0.0, 1_000).with_accuracy(10.0);
        match filter.accept(&five_m, Some(&prior), SessionState::Active) {
            FilterDecision::Accepted { distance_m } => assert!((distance_m - 5.0).abs() < 1e-6),
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_implausible_jump_rejected() {
        let filter = SampleFilter::default();
        let prior = prior_at(0.0, 0);

        // 500 m in one second
        let teleport = RawFix::new(meters_to_lat_degrees(500.0), 0.0, 1_000);
        assert!(matches!(
            filter.accept(&teleport, Some(&prior), SessionState::Active),
            FilterDecision::Rejected(RejectReason::ImplausibleJump { .. })
        ));

        // 500 m after a two minute gap is a catch-up, not a jump
        let catch_up = RawFix::new(meters_to_lat_degrees(500.0), 0.0, 120_000);
        assert!(filter.accept(&catch_up, Some(&prior), SessionState::Active).is_accepted());
    }

    #[test]
    fn test_jump_recovery_needs_consistent_streak() {
        let policy = FilterPolicy::default();
        let mut recovery = JumpRecovery::new();
        let at = |m: f64, t: i64| RawFix::new(meters_to_lat_degrees(m), 0.0, t);

        assert!(!recovery.observe(&at(0.0, 0), &policy));
        assert!(!recovery.observe(&at(3.5, 1_000), &policy));
        assert_eq!(recovery.streak(), 2);
        // the same fix delivered twice does not extend the streak
        assert!(!recovery.observe(&at(3.5, 1_000), &policy));
        assert_eq!(recovery.streak(), 2);
        assert!(recovery.observe(&at(7.0, 2_000), &policy));
        assert_eq!(recovery.streak(), 0);

        // scattered rejections never build a streak
        assert!(!recovery.observe(&at(0.0, 10_000), &policy));
        assert!(!recovery.observe(&at(900.0, 11_000), &policy));
        assert!(!recovery.observe(&at(0.0, 12_000), &policy));
        assert_eq!(recovery.streak(), 1);
    }

    #[test]
    fn test_jump_recovery_disabled() {
        let policy = FilterPolicy {
            reanchor_after_jumps: 0,
            ..FilterPolicy::default()
        };
        let mut recovery = JumpRecovery::new();
        for i in 0..10 {
            let fix = RawFix::new(meters_to_lat_degrees(i as f64 * 3.5), 0.0, i * 1_000);
            assert!(!recovery.observe(&fix, &policy));
        }
    }

    #[test]
    fn test_malformed_rejected() {
        let filter = SampleFilter::default();
        for fix in [
            RawFix::new(f64::NAN, 0.0, 0),
            RawFix::new(91.0, 0.0, 0),
            RawFix::new(0.0, -181.0, 0),
            RawFix::new(0.0, 0.0, 0).with_accuracy(-1.0),
        ] {
            assert_eq!(
                filter.accept(&fix, None, SessionState::Active),
                FilterDecision::Rejected(RejectReason::Malformed)
            );
        }
    }

    #[test]
    fn test_elevation_band() {
        let filter = SampleFilter::default();
        assert_eq!(filter.elevation_gain(Some(100.0), Some(102.0)), 2.0);
        assert_eq!(filter.elevation_gain(Some(100.0), Some(100.4)), 0.0);
        assert_eq!(filter.elevation_gain(Some(100.0), Some(100.5)), 0.0);
        assert_eq!(filter.elevation_gain(Some(100.0), Some(110.0)), 0.0);
        assert_eq!(filter.elevation_gain(Some(100.0), Some(95.0)), 0.0);
        assert_eq!(filter.elevation_gain(None, Some(95.0)), 0.0);
    }

    #[test]
    fn test_signal_classification() {
        let thresholds = SignalThresholds::default();
        assert_eq!(thresholds.classify(Some(5.0)), SignalQuality::Strong);
        assert_eq!(thresholds.classify(Some(20.0)), SignalQuality::Ok);
        assert_eq!(thresholds.classify(Some(60.0)), SignalQuality::Weak);
        assert_eq!(thresholds.classify(None), SignalQuality::Ok);
    }
}
