//! Single-writer session actor
//!
//! A tokio task owns the [`WorkoutSession`] exclusively. Lifecycle commands,
//! location updates and the elapsed-time tick all arrive through one loop, so
//! every mutation is serialized in arrival order. Readers observe the session
//! through a `watch` channel (telemetry read-model) and a `broadcast` channel
//! (discrete events); audio feedback is dispatched from inside the loop.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::audio::AudioDispatcher;
use crate::error::{Result, TrackerError};
use crate::models::{
    ActivitySummary, LocationUpdate, RawFix, SessionState, SessionEvent, TelemetrySnapshot,
    WorkoutMode,
};
use crate::session::WorkoutSession;
use crate::telemetry::TelemetrySettings;

const COMMAND_QUEUE_DEPTH: usize = 256;
const EVENT_QUEUE_DEPTH: usize = 64;

enum Command {
    SelectMode(WorkoutMode, oneshot::Sender<Result<()>>),
    Start(oneshot::Sender<Result<()>>),
    Pause(oneshot::Sender<Result<()>>),
    Resume(oneshot::Sender<Result<()>>),
    Location(LocationUpdate),
    Finish {
        notes: Option<String>,
        reply: oneshot::Sender<Result<ActivitySummary>>,
    },
}

/// Handle to a running session actor. Cheap to clone.
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
    telemetry: watch::Receiver<TelemetrySnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

/// Start the actor for `session`
pub fn spawn(
    session: WorkoutSession,
    audio: AudioDispatcher,
    settings: &TelemetrySettings,
) -> (TrackerHandle, JoinHandle<()>) {
    let (commands, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (telemetry_tx, telemetry) = watch::channel(session.snapshot());
    let (events, _) = broadcast::channel(EVENT_QUEUE_DEPTH);

    let actor = Actor {
        session,
        audio,
        events: events.clone(),
        telemetry: telemetry_tx,
        tick_period: Duration::from_millis(settings.tick_interval_ms.max(1)),
        countdown: Duration::from_millis(settings.countdown_ms),
    };
    let task = tokio::spawn(actor.run(rx));

    (
        TrackerHandle {
            commands,
            telemetry,
            events,
        },
        task,
    )
}

impl TrackerHandle {
    pub async fn select_mode(&self, mode: WorkoutMode) -> Result<()> {
        self.request(|reply| Command::SelectMode(mode, reply)).await?
    }

    /// Confirm start; the session goes active once the countdown elapses
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await?
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(Command::Pause).await?
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(Command::Resume).await?
    }

    /// Finish the run and receive the summary for persistence
    pub async fn finish(&self, notes: Option<String>) -> Result<ActivitySummary> {
        self.request(|reply| Command::Finish { notes, reply }).await?
    }

    /// Queue a location update behind any earlier commands
    pub async fn push_location(&self, update: LocationUpdate) -> Result<()> {
        self.commands
            .send(Command::Location(update))
            .await
            .map_err(|_| TrackerError::SessionClosed)
    }

    pub async fn push_fix(&self, fix: RawFix) -> Result<()> {
        self.push_location(LocationUpdate::Fix(fix)).await
    }

    /// Report that the geolocation source failed or was denied
    pub async fn location_unavailable(&self, reason: impl Into<String>) -> Result<()> {
        self.push_location(LocationUpdate::Unavailable(reason.into())).await
    }

    /// Forward a geolocation watch into the session queue until either side closes
    pub fn attach_source(&self, mut source: mpsc::Receiver<LocationUpdate>) -> JoinHandle<()> {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            while let Some(update) = source.recv().await {
                if commands.send(Command::Location(update)).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Latest telemetry read-model
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.borrow().clone()
    }

    pub fn watch_telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.telemetry.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Wait for the countdown to end (or the session to close)
    pub async fn wait_until_active(&self) -> Result<()> {
        let mut rx = self.telemetry.clone();
        let snapshot = rx
            .wait_for(|s| s.state != SessionState::Starting && s.state != SessionState::Selecting)
            .await
            .map_err(|_| TrackerError::SessionClosed)?;
        if snapshot.state == SessionState::Active {
            Ok(())
        } else {
            Err(TrackerError::InvalidTransition {
                from: snapshot.state,
                action: "activate",
            })
        }
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| TrackerError::SessionClosed)?;
        response.await.map_err(|_| TrackerError::SessionClosed)
    }
}

struct Actor {
    session: WorkoutSession,
    audio: AudioDispatcher,
    events: broadcast::Sender<SessionEvent>,
    telemetry: watch::Sender<TelemetrySnapshot>,
    tick_period: Duration,
    countdown: Duration,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut ticker = time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                maybe_command = commands.recv() => {
                    let Some(command) = maybe_command else {
                        tracing::debug!(session = %self.session.id(), "All handles dropped");
                        break;
                    };
                    self.handle(command, &mut countdown_deadline, &mut ticker);
                }
                _ = countdown_elapsed(countdown_deadline) => {
                    countdown_deadline = None;
                    if let Err(e) = self.session.activate() {
                        tracing::warn!(error = %e, "Countdown ended without activation");
                    }
                    ticker.reset();
                }
                _ = ticker.tick() => {
                    self.session.tick();
                }
            }

            self.publish();
            if self.session.state() == SessionState::Finished {
                break;
            }
        }
        // dropping the session releases any device resources still held
    }

    fn handle(
        &mut self,
        command: Command,
        countdown_deadline: &mut Option<Instant>,
        ticker: &mut time::Interval,
    ) {
        match command {
            Command::SelectMode(mode, reply) => {
                let _ = reply.send(self.session.select_mode(mode));
            }
            Command::Start(reply) => {
                let result = self.session.confirm_start();
                if result.is_ok() {
                    *countdown_deadline = Some(Instant::now() + self.countdown);
                }
                let _ = reply.send(result);
            }
            Command::Pause(reply) => {
                let _ = reply.send(self.session.pause());
            }
            Command::Resume(reply) => {
                let result = self.session.resume();
                if result.is_ok() {
                    // the anchor has moved; restart the tick period from here
                    ticker.reset();
                }
                let _ = reply.send(result);
            }
            Command::Location(update) => {
                self.session.ingest(&update);
            }
            Command::Finish { notes, reply } => {
                let _ = reply.send(self.session.finish(notes));
            }
        }
    }

    fn publish(&mut self) {
        for event in self.session.take_events() {
            self.audio.dispatch(&event);
            // no subscribers is fine
            let _ = self.events.send(event);
        }
        self.telemetry.send_replace(self.session.snapshot());
    }
}

async fn countdown_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSettings, LogAudio};
    use crate::clock::ManualClock;
    use crate::config::TrackerConfig;
    use crate::geo::meters_to_lat_degrees;
    use std::sync::Arc;

    fn spawn_tracker(clock: &ManualClock) -> (TrackerHandle, JoinHandle<()>) {
        let mut config = TrackerConfig::default();
        config.telemetry.countdown_ms = 0;
        let session = WorkoutSession::new(WorkoutMode::Run, &config, Arc::new(clock.clone()));
        let audio = AudioDispatcher::new(AudioSettings::default(), Box::new(LogAudio));
        spawn(session, audio, &config.telemetry)
    }

    #[tokio::test]
    async fn test_start_then_finish() {
        let clock = ManualClock::new(0);
        let (handle, task) = spawn_tracker(&clock);
        let mut events = handle.subscribe_events();

        handle.start().await.unwrap();
        handle.wait_until_active().await.unwrap();

        handle
            .push_fix(RawFix::new(0.0, 0.0, clock.now_ms()).with_accuracy(5.0))
            .await
            .unwrap();
        clock.advance(10_000);
        handle
            .push_fix(RawFix::new(meters_to_lat_degrees(30.0), 0.0, clock.now_ms()).with_accuracy(5.0))
            .await
            .unwrap();

        let summary = handle.finish(None).await.unwrap();
        assert_eq!(summary.route.len(), 2);
        assert_eq!(summary.duration_min.to_string(), "0.17");

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Started { mode: WorkoutMode::Run });
        assert!(matches!(events.recv().await.unwrap(), SessionEvent::Finished { .. }));

        task.await.unwrap();
        assert!(matches!(handle.pause().await, Err(TrackerError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_invalid_command_reported() {
        let clock = ManualClock::new(0);
        let (handle, _task) = spawn_tracker(&clock);

        assert!(matches!(
            handle.pause().await,
            Err(TrackerError::InvalidTransition { from: SessionState::Selecting, .. })
        ));
        handle.select_mode(WorkoutMode::Sprint).await.unwrap();
        handle.start().await.unwrap();
        handle.wait_until_active().await.unwrap();
        assert_eq!(handle.snapshot().mode, WorkoutMode::Sprint);
    }

    #[tokio::test]
    async fn test_attached_source_feeds_session() {
        let clock = ManualClock::new(0);
        let (handle, _task) = spawn_tracker(&clock);
        handle.start().await.unwrap();
        handle.wait_until_active().await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let forwarder = handle.attach_source(rx);
        for i in 0..5 {
            clock.advance(5_000);
            tx.send(LocationUpdate::Fix(RawFix::new(
                meters_to_lat_degrees(i as f64 * 10.0),
                0.0,
                clock.now_ms(),
            )))
            .await
            .unwrap();
        }
        drop(tx);
        forwarder.await.unwrap();

        let summary = handle.finish(None).await.unwrap();
        assert_eq!(summary.route.len(), 5);
        assert_eq!(summary.distance_km.to_string(), "0.04");
    }
}
