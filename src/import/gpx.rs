//! GPX track import
//!
//! Every `<trkpt>` of every track segment becomes one [`RawFix`]. GPX carries
//! no accuracy or speed, so those stay unset and the session derives speed
//! from consecutive points. Points without a `<time>` are spaced one second
//! after their predecessor so planned routes can still be replayed.

use chrono::DateTime;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{ImportExportError, Result};
use crate::import::ImportFormat;
use crate::models::RawFix;

const UNTIMED_POINT_SPACING_MS: i64 = 1_000;

pub struct GpxImporter;

impl GpxImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GpxImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFormat for GpxImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase() == "gpx")
            .unwrap_or(false)
    }

    fn import_file(&self, file_path: &Path) -> Result<Vec<RawFix>> {
        let file = File::open(file_path)?;
        let fixes = parse_gpx(BufReader::new(file))?;
        if fixes.is_empty() {
            return Err(ImportExportError::EmptyTrack {
                path: file_path.to_path_buf(),
            }
            .into());
        }
        tracing::debug!(points = fixes.len(), "GPX track parsed");
        Ok(fixes)
    }

    fn get_format_name(&self) -> &'static str {
        "GPX"
    }
}

/// Parse GPX from any reader into raw fixes
pub fn parse_gpx<R: Read>(reader: R) -> Result<Vec<RawFix>> {
    let gpx = gpx::read(reader).map_err(|e| ImportExportError::ParseError {
        format: "GPX".to_string(),
        reason: e.to_string(),
    })?;

    let mut fixes = Vec::new();
    let mut last_ms: Option<i64> = None;

    for track in &gpx.tracks {
        for seg in &track.segments {
            for pt in &seg.points {
                let lng = pt.point().x();
                let lat = pt.point().y();

                let timestamp_ms = pt
                    .time
                    .as_ref()
                    .and_then(|t| t.format().ok())
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.timestamp_millis())
                    .or_else(|| last_ms.map(|ms| ms + UNTIMED_POINT_SPACING_MS))
                    .unwrap_or(0);
                last_ms = Some(timestamp_ms);

                let mut fix = RawFix::new(lat, lng, timestamp_ms);
                fix.altitude_m = pt.elevation;
                fixes.push(fix);
            }
        }
    }

    Ok(fixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn gpx_tempfile() -> NamedTempFile {
        tempfile::Builder::new().suffix(".gpx").tempfile().unwrap()
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Morning</name>
    <trkseg>
      <trkpt lat="52.5000000" lon="13.4000000">
        <ele>34.5</ele>
        <time>2024-05-01T07:00:00Z</time>
      </trkpt>
      <trkpt lat="52.5001000" lon="13.4000000">
        <ele>35.0</ele>
        <time>2024-05-01T07:00:05Z</time>
      </trkpt>
      <trkpt lat="52.5002000" lon="13.4000000">
      </trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    #[test]
    fn test_parse_points() {
        let fixes = parse_gpx(SAMPLE.as_bytes()).unwrap();
        assert_eq!(fixes.len(), 3);

        assert!((fixes[0].lat - 52.5).abs() < 1e-9);
        assert!((fixes[0].lng - 13.4).abs() < 1e-9);
        assert_eq!(fixes[0].altitude_m, Some(34.5));
        assert_eq!(fixes[0].accuracy_m, None);

        assert_eq!(fixes[1].timestamp_ms - fixes[0].timestamp_ms, 5_000);
        // untimed point follows its predecessor
        assert_eq!(fixes[2].timestamp_ms - fixes[1].timestamp_ms, 1_000);
        assert_eq!(fixes[2].altitude_m, None);
    }

    #[test]
    fn test_import_file_and_empty_track() {
        let importer = GpxImporter::new();

        let mut file = gpx_tempfile();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        assert!(importer.can_import(file.path()));
        assert_eq!(importer.import_file(file.path()).unwrap().len(), 3);

        let mut empty = gpx_tempfile();
        empty
            .write_all(br#"<?xml version="1.0"?><gpx version="1.1" creator="t"></gpx>"#)
            .unwrap();
        let err = importer.import_file(empty.path()).unwrap_err();
        assert!(err.to_string().contains("No track points"));
    }

    #[test]
    fn test_malformed_gpx() {
        assert!(parse_gpx("not xml at all".as_bytes()).is_err());
    }
}
