// Library interface for pacetrack modules
// This allows integration tests and the CLI to drive a session

pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod geo;
pub mod import;
pub mod logging;
pub mod models;
pub mod pace_history;
pub mod resources;
pub mod route;
pub mod session;
pub mod splits;
pub mod telemetry;
pub mod tracker;

// Re-export commonly used types for convenience
pub use models::*;
pub use audio::{AudioDispatcher, AudioOutput, AudioSettings, LogAudio};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use filter::{FilterDecision, FilterPolicy, RejectReason, SampleFilter};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use session::{SampleOutcome, WorkoutSession};
pub use tracker::TrackerHandle;
