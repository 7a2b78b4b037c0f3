//! Recorded-track import for replaying sessions

use std::path::Path;

use crate::error::Result;
use crate::models::RawFix;

pub mod gpx;

/// Trait for reading a recorded track into a stream of raw fixes
pub trait ImportFormat {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Read every fix from the file, in recording order
    fn import_file(&self, file_path: &Path) -> Result<Vec<RawFix>>;

    /// Get the format name for this importer
    fn get_format_name(&self) -> &'static str;
}

/// Picks an importer by file extension
pub struct ImportManager {
    importers: Vec<Box<dyn ImportFormat>>,
}

impl ImportManager {
    pub fn new() -> Self {
        let importers: Vec<Box<dyn ImportFormat>> = vec![Box::new(gpx::GpxImporter::new())];
        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path) -> Result<Vec<RawFix>> {
        for importer in &self.importers {
            if importer.can_import(file_path) {
                tracing::info!(
                    path = %file_path.display(),
                    format = importer.get_format_name(),
                    "Importing track"
                );
                return importer.import_file(file_path);
            }
        }

        Err(crate::error::ImportExportError::ParseError {
            format: "unknown".to_string(),
            reason: format!("no importer for {}", file_path.display()),
        }
        .into())
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}
