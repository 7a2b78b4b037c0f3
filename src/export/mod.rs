//! Persisting finished sessions
//!
//! The summary goes out as JSON (the record handed to storage) and the route
//! as GPX 1.1 for other tools.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ImportExportError, Result};
use crate::models::ActivitySummary;

pub mod gpx;
pub mod json;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Gpx,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ImportExportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "gpx" => Ok(ExportFormat::Gpx),
            _ => Err(ImportExportError::ParseError {
                format: "export format".to_string(),
                reason: format!("unsupported format: {}", s),
            }),
        }
    }
}

/// Write a finished session in the requested format
pub fn export_summary<P: AsRef<Path>>(
    summary: &ActivitySummary,
    format: ExportFormat,
    output_path: P,
) -> Result<()> {
    let path = output_path.as_ref();
    match format {
        ExportFormat::Json => json::export_summary(summary, path)?,
        ExportFormat::Gpx => gpx::export_route(summary, path)?,
    }
    tracing::info!(path = %path.display(), format = ?format, session = %summary.id, "Session exported");
    Ok(())
}
