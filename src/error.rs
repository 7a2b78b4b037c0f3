//! Unified error hierarchy for pacetrack
//!
//! The per-sample path never produces errors (bad fixes are filtered, not
//! raised). Errors here cover lifecycle misuse, configuration, file
//! import/export and the best-effort audio and device collaborators.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::SessionState;

/// Top-level error type for all pacetrack operations
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A lifecycle operation was attempted from a state that does not allow it.
    /// The session is left untouched.
    #[error("Cannot {action} while session is {from}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Import/export errors
    #[error("Import/Export error: {0}")]
    ImportExport(#[from] ImportExportError),

    /// Audio output errors (always swallowed by the dispatcher)
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// A device resource (location watch, wake lock, ...) could not be acquired
    #[error("Resource {name} unavailable: {reason}")]
    Resource { name: String, reason: String },

    /// The tracker task is gone (session finished or dropped)
    #[error("Session closed")]
    SessionClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A threshold is outside its meaningful range
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Elevation band lower bound must sit below the upper bound
    #[error("Elevation band is empty: ({min}, {max})")]
    EmptyElevationBand { min: f64, max: f64 },

    /// TOML could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Import and export errors
#[derive(Debug, Error)]
pub enum ImportExportError {
    /// Format-specific parsing error
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// The file contained no usable track points
    #[error("No track points found in {path}")]
    EmptyTrack { path: PathBuf },

    /// Serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Export failed
    #[error("Export failed to {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

/// Audio output errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// Speech synthesis is not available on this device
    #[error("Speech engine unavailable: {0}")]
    SpeechUnavailable(String),

    /// Tone playback failed
    #[error("Tone playback failed: {0}")]
    TonePlayback(String),
}

/// Result type alias for pacetrack operations
pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    /// Recoverable errors leave the session usable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrackerError::InvalidTransition { .. }
                | TrackerError::Audio(_)
                | TrackerError::Resource { .. }
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrackerError::InvalidTransition { .. } => ErrorSeverity::Warning,
            TrackerError::Audio(_) => ErrorSeverity::Info,
            TrackerError::Resource { .. } => ErrorSeverity::Warning,
            TrackerError::SessionClosed => ErrorSeverity::Warning,
            TrackerError::Config(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::InvalidTransition { from, action } => {
                format!("You can't {} a workout that is {}.", action, from)
            }
            TrackerError::Resource { name, .. } if name == "location" => {
                "Location is unavailable. Your run will be timed without GPS distance.".to_string()
            }
            TrackerError::ImportExport(ImportExportError::EmptyTrack { path }) => {
                format!("No GPS points found in {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}
