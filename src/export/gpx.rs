//! GPX 1.1 route export

use gpx::errors::GpxError;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use time::OffsetDateTime;

use crate::error::ImportExportError;
use crate::models::{ActivitySummary, RoutePoint};

/// Build a single-track GPX document from the session route
pub fn build_gpx(points: &[RoutePoint], activity_name: &str) -> Gpx {
    let waypoints: Vec<Waypoint> = points
        .iter()
        .map(|p| {
            let mut wp = Waypoint::new(geo::Point::new(p.lng, p.lat));
            wp.elevation = p.altitude_m;
            wp.time = OffsetDateTime::from_unix_timestamp_nanos(p.timestamp_ms as i128 * 1_000_000)
                .ok()
                .map(gpx::Time::from);
            wp
        })
        .collect();

    let mut track = Track::new();
    track.name = Some(activity_name.to_string());
    track.segments = vec![TrackSegment { points: waypoints }];

    Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("pacetrack".to_string()),
        tracks: vec![track],
        ..Default::default()
    }
}

/// Serialize the route to any writer
pub fn write_gpx<W: Write>(
    points: &[RoutePoint],
    activity_name: &str,
    writer: W,
) -> Result<(), GpxError> {
    gpx::write(&build_gpx(points, activity_name), writer)
}

/// Write the route of a finished session to a GPX file
pub fn export_route<P: AsRef<Path>>(
    summary: &ActivitySummary,
    output_path: P,
) -> Result<(), ImportExportError> {
    let path = output_path.as_ref();
    let name = format!(
        "{} {}",
        summary.mode.profile().label,
        summary.date.format("%Y-%m-%d %H:%M")
    );

    let file = File::create(path).map_err(|e| ImportExportError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    write_gpx(&summary.route, &name, file).map_err(|e| ImportExportError::ExportFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
