use crate::{Color, GeometryError};
use std::path::Path;

/// Fixed-point scale of emitted unit-sphere coordinates.
pub const SPHERE_SCALE: f64 = 10000.0;
pub const DEFAULT_CRATER_SEGMENTS: u32 = 12;
pub const DEFAULT_SURFACE_COLOR: Color = Color::new(200, 200, 200, 200);

/// Unit-sphere point stored as `int16 * 10000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpherePoint {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl SpherePoint {
    fn from_unit(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: (x * SPHERE_SCALE).round() as i16,
            y: (y * SPHERE_SCALE).round() as i16,
            z: (z * SPHERE_SCALE).round() as i16,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfacePolyline {
    pub points: Vec<SpherePoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceAsset {
    pub name: String,
    pub polylines: Vec<SurfacePolyline>,
    pub color: Color,
}

impl SurfaceAsset {
    pub fn vertex_count(&self) -> usize {
        self.polylines.iter().map(|p| p.points.len()).sum()
    }
}

/// Parses surface overlay sources.
pub trait SurfaceProvider {
    fn parse(&self, path: &Path) -> Result<SurfaceAsset, GeometryError>;
}

/// x = depth, y = horizontal, z = vertical.
pub fn lon_lat_to_sphere(lon_deg: f64, lat_deg: f64) -> SpherePoint {
    let (lon, lat) = (lon_deg.to_radians(), lat_deg.to_radians());
    SpherePoint::from_unit(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Closed small circle of angular radius `radius_deg` around (lon, lat).
/// The first point is repeated at the end.
pub fn generate_crater(
    center_lon_deg: f64,
    center_lat_deg: f64,
    radius_deg: f64,
    segments: u32,
) -> Vec<SpherePoint> {
    let segments = segments.max(3);
    let (sin_r, cos_r) = radius_deg.to_radians().sin_cos();
    let (sin_co, cos_co) = (90.0 - center_lat_deg).to_radians().sin_cos();
    let (sin_lon, cos_lon) = center_lon_deg.to_radians().sin_cos();

    (0..=segments)
        .map(|i| {
            let angle = i as f64 * std::f64::consts::TAU / segments as f64;
            // circle around the north pole
            let (x, y, z) = (sin_r * angle.cos(), sin_r * angle.sin(), cos_r);
            // tilt by co-latitude around y
            let (x2, y2, z2) = (x * cos_co + z * sin_co, y, -x * sin_co + z * cos_co);
            // spin by longitude around z
            SpherePoint::from_unit(x2 * cos_lon - y2 * sin_lon, x2 * sin_lon + y2 * cos_lon, z2)
        })
        .collect()
}
