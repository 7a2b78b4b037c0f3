use std::sync::{Arc, Mutex};

use pacetrack::audio::{AudioDispatcher, AudioOutput, AudioSettings, Tone};
use pacetrack::clock::ManualClock;
use pacetrack::config::TrackerConfig;
use pacetrack::error::{AudioError, Result, TrackerError};
use pacetrack::geo::meters_to_lat_degrees;
use pacetrack::models::{RawFix, SessionEvent, SessionState, WorkoutMode};
use pacetrack::resources::DeviceResource;
use pacetrack::session::WorkoutSession;
use pacetrack::tracker::{self, TrackerHandle};
use tokio::task::JoinHandle;

/// Tracker actor tests with recording collaborators

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

struct RecordingAudio {
    journal: Journal,
    fail_speech: bool,
}

impl AudioOutput for RecordingAudio {
    fn speak(&mut self, phrase: &str) -> std::result::Result<(), AudioError> {
        if self.fail_speech {
            return Err(AudioError::SpeechUnavailable("muted".to_string()));
        }
        self.journal.push(format!("say {}", phrase));
        Ok(())
    }

    fn play_tone(&mut self, tone: Tone) -> std::result::Result<(), AudioError> {
        self.journal.push(format!("tone {:?}", tone));
        Ok(())
    }
}

struct WakeLock {
    journal: Journal,
}

impl DeviceResource for WakeLock {
    fn name(&self) -> &str {
        "wake_lock"
    }

    fn acquire(&mut self) -> Result<()> {
        self.journal.push("acquire wake_lock".to_string());
        Ok(())
    }

    fn release(&mut self) {
        self.journal.push("release wake_lock".to_string());
    }
}

fn spawn_tracker(
    clock: &ManualClock,
    journal: &Journal,
    fail_speech: bool,
) -> (TrackerHandle, JoinHandle<()>) {
    let mut config = TrackerConfig::default();
    config.telemetry.countdown_ms = 0;

    let session = WorkoutSession::new(WorkoutMode::Run, &config, Arc::new(clock.clone()))
        .with_resources(vec![Box::new(WakeLock {
            journal: journal.clone(),
        })]);
    let audio = AudioDispatcher::new(
        AudioSettings::default(),
        Box::new(RecordingAudio {
            journal: journal.clone(),
            fail_speech,
        }),
    );
    tracker::spawn(session, audio, &config.telemetry)
}

async fn run_kilometer(handle: &TrackerHandle, clock: &ManualClock) {
    for i in 0..=100 {
        let fix = RawFix::new(meters_to_lat_degrees(i as f64 * 10.0), 0.0, clock.now_ms())
            .with_accuracy(5.0)
            .with_speed(3.0);
        handle.push_fix(fix).await.unwrap();
        clock.advance(3_333);
    }
}

#[tokio::test]
async fn test_kilometer_announced_and_resources_released() {
    let clock = ManualClock::new(0);
    let journal = Journal::default();
    let (handle, task) = spawn_tracker(&clock, &journal, false);
    let mut events = handle.subscribe_events();

    handle.start().await.unwrap();
    handle.wait_until_active().await.unwrap();
    run_kilometer(&handle, &clock).await;

    let summary = handle.finish(None).await.unwrap();
    task.await.unwrap();

    assert_eq!(summary.splits.len(), 1);
    assert!(matches!(events.recv().await.unwrap(), SessionEvent::Started { .. }));
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::KmCompleted { km_index: 1, .. }
    ));
    assert!(matches!(events.recv().await.unwrap(), SessionEvent::Finished { .. }));

    let entries = journal.entries();
    assert_eq!(entries.first().map(String::as_str), Some("acquire wake_lock"));
    assert!(entries.iter().any(|e| e.starts_with("say Kilometer 1 complete")));
    assert!(entries.contains(&"release wake_lock".to_string()));
    assert_eq!(handle.snapshot().state, SessionState::Finished);
}

#[tokio::test]
async fn test_audio_failure_does_not_stop_session() {
    let clock = ManualClock::new(0);
    let journal = Journal::default();
    let (handle, _task) = spawn_tracker(&clock, &journal, true);

    handle.start().await.unwrap();
    handle.wait_until_active().await.unwrap();
    run_kilometer(&handle, &clock).await;

    let summary = handle.finish(None).await.unwrap();
    assert_eq!(summary.splits.len(), 1);
    assert!(journal.entries().iter().all(|e| !e.starts_with("say")));
}

#[tokio::test]
async fn test_pause_gates_samples_through_actor() {
    let clock = ManualClock::new(0);
    let journal = Journal::default();
    let (handle, _task) = spawn_tracker(&clock, &journal, false);

    handle.start().await.unwrap();
    handle.wait_until_active().await.unwrap();
    handle
        .push_fix(RawFix::new(0.0, 0.0, clock.now_ms()).with_accuracy(5.0))
        .await
        .unwrap();

    handle.pause().await.unwrap();
    clock.advance(30_000);
    handle
        .push_fix(RawFix::new(meters_to_lat_degrees(100.0), 0.0, clock.now_ms()).with_accuracy(5.0))
        .await
        .unwrap();
    handle.location_unavailable("permission revoked").await.unwrap();
    assert!(matches!(
        handle.pause().await,
        Err(TrackerError::InvalidTransition { from: SessionState::Paused, .. })
    ));
    handle.resume().await.unwrap();

    let mut telemetry = handle.watch_telemetry();
    let snapshot = telemetry
        .wait_for(|s| s.state == SessionState::Active)
        .await
        .unwrap()
        .clone();
    assert_eq!(snapshot.route_points, 1);
    assert_eq!(snapshot.distance_m, 0.0);
    assert_eq!(snapshot.elapsed_seconds, 0);
}
