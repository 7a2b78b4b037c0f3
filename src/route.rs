//! Append-only polyline of accepted GPS points.

use crate::geo;
use crate::models::{LatLng, RoutePoint};

/// Ordered record of every accepted point in a session.
///
/// Points are never reordered or removed while the session runs; the map,
/// export and share collaborators read it as-is.
#[derive(Debug, Clone, Default)]
pub struct RouteRecorder {
    points: Vec<RoutePoint>,
}

impl RouteRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, point: RoutePoint) {
        self.points.push(point);
    }

    pub fn last(&self) -> Option<&RoutePoint> {
        self.points.last()
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline length recomputed from the stored points
    pub fn path_length_meters(&self) -> f64 {
        let coords: Vec<LatLng> = self.points.iter().map(RoutePoint::position).collect();
        geo::path_length_meters(&coords)
    }

    /// Southwest and northeast corners, for fitting a map viewport
    pub fn bounds(&self) -> Option<(LatLng, LatLng)> {
        let first = self.points.first()?.position();
        let (sw, ne) = self.points.iter().skip(1).fold((first, first), |(sw, ne), p| {
            (
                LatLng::new(sw.lat.min(p.lat), sw.lng.min(p.lng)),
                LatLng::new(ne.lat.max(p.lat), ne.lng.max(p.lng)),
            )
        });
        Some((sw, ne))
    }
}
