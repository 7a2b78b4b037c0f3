use std::io::Write;
use std::path::Path;

use crate::error::ImportExportError;
use crate::models::ActivitySummary;

/// Export a finished session summary to JSON
pub fn export_summary<P: AsRef<Path>>(
    summary: &ActivitySummary,
    output_path: P,
) -> Result<(), ImportExportError> {
    export_json(summary, output_path)
}

/// Export any serializable data structure to JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<(), ImportExportError>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let path = output_path.as_ref();
    let json_data = serde_json::to_string_pretty(data)?;

    let mut file = std::fs::File::create(path).map_err(|e| ImportExportError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    file.write_all(json_data.as_bytes())
        .map_err(|e| ImportExportError::ExportFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(())
}
