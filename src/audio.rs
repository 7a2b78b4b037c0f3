//! Voice and tone feedback
//!
//! Turns [`SessionEvent`]s into spoken phrases and short tones. Output is
//! best-effort: a failing speech engine is logged and ignored, never allowed
//! to reach session state.

use serde::{Deserialize, Serialize};

use crate::error::AudioError;
use crate::models::SessionEvent;
use crate::telemetry::{format_duration, spoken_pace};

/// Short non-verbal cues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Start,
    Pause,
    Resume,
    Success,
    Finish,
}

/// Device-side speech and tone player
pub trait AudioOutput: Send {
    fn speak(&mut self, phrase: &str) -> Result<(), AudioError>;
    fn play_tone(&mut self, tone: Tone) -> Result<(), AudioError>;
}

/// Writes announcements to the log instead of a speaker
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioOutput for LogAudio {
    fn speak(&mut self, phrase: &str) -> Result<(), AudioError> {
        tracing::info!(target: "pacetrack::voice", "{}", phrase);
        Ok(())
    }

    fn play_tone(&mut self, tone: Tone) -> Result<(), AudioError> {
        tracing::debug!(target: "pacetrack::voice", ?tone, "tone");
        Ok(())
    }
}

/// User preferences for feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub voice_enabled: bool,
    pub tones_enabled: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            voice_enabled: true,
            tones_enabled: true,
        }
    }
}

/// What to say and play for one event
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub phrase: String,
    pub tone: Option<Tone>,
}

impl Announcement {
    pub fn for_event(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::Started { mode } => Announcement {
                phrase: format!("{} started. Let's go!", mode),
                tone: Some(Tone::Start),
            },
            SessionEvent::Paused { .. } => Announcement {
                phrase: "Workout paused.".to_string(),
                tone: Some(Tone::Pause),
            },
            SessionEvent::Resumed { .. } => Announcement {
                phrase: "Resuming workout.".to_string(),
                tone: Some(Tone::Resume),
            },
            SessionEvent::KmCompleted {
                km_index,
                split_duration_seconds,
                ..
            } => Announcement {
                phrase: format!(
                    "Kilometer {} complete. Pace {}.",
                    km_index,
                    spoken_pace(*split_duration_seconds as f64)
                ),
                tone: Some(Tone::Success),
            },
            SessionEvent::Finished {
                distance_km,
                elapsed_seconds,
            } => Announcement {
                phrase: format!(
                    "Workout complete. {:.2} kilometers in {}.",
                    distance_km,
                    format_duration(*elapsed_seconds)
                ),
                tone: Some(Tone::Finish),
            },
        }
    }
}

/// Routes session events to an [`AudioOutput`]
pub struct AudioDispatcher {
    settings: AudioSettings,
    output: Box<dyn AudioOutput>,
}

impl AudioDispatcher {
    pub fn new(settings: AudioSettings, output: Box<dyn AudioOutput>) -> Self {
        Self { settings, output }
    }

    /// Fire-and-forget: failures are logged and swallowed
    pub fn dispatch(&mut self, event: &SessionEvent) {
        let announcement = Announcement::for_event(event);

        if self.settings.tones_enabled {
            if let Some(tone) = announcement.tone {
                if let Err(e) = self.output.play_tone(tone) {
                    tracing::warn!(error = %e, ?tone, "Tone playback failed");
                }
            }
        }

        if self.settings.voice_enabled {
            if let Err(e) = self.output.speak(&announcement.phrase) {
                tracing::warn!(error = %e, "Voice announcement failed");
            }
        }
    }
}

impl std::fmt::Debug for AudioDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDispatcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkoutMode;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        phrases: Arc<Mutex<Vec<String>>>,
        tones: Arc<Mutex<Vec<Tone>>>,
    }

    impl AudioOutput for Recorder {
        fn speak(&mut self, phrase: &str) -> Result<(), AudioError> {
            self.phrases.lock().unwrap().push(phrase.to_string());
            Ok(())
        }

        fn play_tone(&mut self, tone: Tone) -> Result<(), AudioError> {
            self.tones.lock().unwrap().push(tone);
            Ok(())
        }
    }

    struct Broken;

    impl AudioOutput for Broken {
        fn speak(&mut self, _phrase: &str) -> Result<(), AudioError> {
            Err(AudioError::SpeechUnavailable("no engine".to_string()))
        }

        fn play_tone(&mut self, _tone: Tone) -> Result<(), AudioError> {
            Err(AudioError::TonePlayback("muted".to_string()))
        }
    }

    #[test]
    fn test_km_announcement() {
        let event = SessionEvent::KmCompleted {
            km_index: 3,
            split_duration_seconds: 330,
            pace_label: "5:30".to_string(),
        };
        let announcement = Announcement::for_event(&event);
        assert_eq!(
            announcement.phrase,
            "Kilometer 3 complete. Pace 5 minutes 30 seconds per kilometer."
        );
        assert_eq!(announcement.tone, Some(Tone::Success));
    }

    #[test]
    fn test_finish_announcement() {
        let event = SessionEvent::Finished {
            distance_km: 5.0123,
            elapsed_seconds: 1_650,
        };
        assert_eq!(
            Announcement::for_event(&event).phrase,
            "Workout complete. 5.01 kilometers in 27:30."
        );
    }

    #[test]
    fn test_dispatch_respects_settings() {
        let recorder = Recorder::default();
        let mut dispatcher = AudioDispatcher::new(
            AudioSettings {
                voice_enabled: false,
                tones_enabled: true,
            },
            Box::new(recorder.clone()),
        );

        dispatcher.dispatch(&SessionEvent::Started {
            mode: WorkoutMode::Jog,
        });

        assert!(recorder.phrases.lock().unwrap().is_empty());
        assert_eq!(*recorder.tones.lock().unwrap(), vec![Tone::Start]);
    }

    #[test]
    fn test_failures_are_swallowed() {
        let mut dispatcher = AudioDispatcher::new(AudioSettings::default(), Box::new(Broken));
        dispatcher.dispatch(&SessionEvent::Paused { elapsed_seconds: 10 });
        dispatcher.dispatch(&SessionEvent::Resumed { paused_seconds: 5 });
    }
}
