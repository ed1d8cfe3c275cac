use crate::{Color, Point};
use once_cell::sync::OnceCell;

/// Style class marking the strip used for collision and hull fill.
pub const HULL_CLASS: &str = "hull";
/// Style class whose color is supplied at draw time.
pub const HEAT_CLASS: &str = "heat";

pub const RADIAL_SECTORS: usize = 16;
const PARALLEL_EPSILON: f64 = 1e-10;

#[derive(Clone, Debug, PartialEq)]
pub struct LineStrip {
    pub points: Vec<Point>,
    pub is_closed: bool,
    pub stroke_width: f32,
    pub class: String,
    pub color: Color,
}

impl LineStrip {
    pub fn is_hull(&self) -> bool {
        self.class == HULL_CLASS
    }

    pub fn is_heat(&self) -> bool {
        self.class == HEAT_CLASS
    }
}

/// Named attachment point on a model.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub position: Point,
    pub name: String,
}

#[derive(Clone, Debug)]
struct DerivedGeometry {
    radius: u32,
    hull: Option<Vec<Point>>,
    radial_profile: Option<[u8; RADIAL_SECTORS]>,
}

/// Immutable vector-art asset. Derived geometry is computed on first query
/// and shared by every record that references the model.
#[derive(Clone, Debug)]
pub struct Model {
    pub file_name: String,
    pub line_strips: Vec<LineStrip>,
    pub slots: Vec<Slot>,
    derived: OnceCell<DerivedGeometry>,
}

impl Model {
    pub fn new(file_name: impl Into<String>, line_strips: Vec<LineStrip>, slots: Vec<Slot>) -> Self {
        Self {
            file_name: file_name.into(),
            line_strips,
            slots,
            derived: OnceCell::new(),
        }
    }

    /// Ceiling of the largest vertex distance from the origin.
    pub fn radius(&self) -> u32 {
        self.derived().radius
    }

    /// Convex hull of the collision polygon, counter-clockwise.
    pub fn collision_hull(&self) -> Option<&[Point]> {
        self.derived().hull.as_deref()
    }

    /// Farthest polygon hit per 22.5 degree sector, starting at 0 degrees.
    pub fn radial_profile(&self) -> Option<[u8; RADIAL_SECTORS]> {
        self.derived().radial_profile
    }

    /// Identifier-safe lowercase form of the file name, used in emitted symbols.
    pub fn c_name(&self) -> String {
        self.file_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect()
    }

    /// `MODEL_<NAME>_IDX`
    pub fn constant_name(&self) -> String {
        format!("MODEL_{}_IDX", self.c_name().to_ascii_uppercase())
    }

    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name == name)
    }

    pub fn vertex_count(&self) -> usize {
        self.line_strips.iter().map(|s| s.points.len()).sum()
    }

    /// Hull-class closed strip, else the first closed strip.
    pub fn collision_source(&self) -> Option<&LineStrip> {
        self.line_strips
            .iter()
            .find(|s| s.is_closed && s.is_hull())
            .or_else(|| self.line_strips.iter().find(|s| s.is_closed))
    }

    fn derived(&self) -> &DerivedGeometry {
        self.derived.get_or_init(|| {
            let source = self.collision_source();
            DerivedGeometry {
                radius: compute_radius(&self.line_strips),
                hull: source.map(|s| convex_hull(&s.points)),
                radial_profile: source.map(|s| radial_profile(&s.points)),
            }
        })
    }
}

fn compute_radius(strips: &[LineStrip]) -> u32 {
    let max_sq = strips
        .iter()
        .flat_map(|s| s.points.iter())
        .map(|p| {
            let (x, y) = (p.x as f64, p.y as f64);
            x * x + y * y
        })
        .fold(0.0f64, f64::max);
    max_sq.sqrt().ceil() as u32
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    let (ax, ay) = ((a.x - o.x) as f64, (a.y - o.y) as f64);
    let (bx, by) = ((b.x - o.x) as f64, (b.y - o.y) as f64);
    ax * by - ay * bx
}

/// Andrew's monotone chain. Collinear points are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Ray casts from the origin against every edge of the closed polygon.
pub fn radial_profile(polygon: &[Point]) -> [u8; RADIAL_SECTORS] {
    let mut profile = [1u8; RADIAL_SECTORS];
    if polygon.len() < 2 {
        return profile;
    }

    for (sector, slot) in profile.iter_mut().enumerate() {
        let angle = sector as f64 * std::f64::consts::TAU / RADIAL_SECTORS as f64;
        let (dx, dy) = (angle.cos(), angle.sin());
        let mut farthest = 0.0f64;

        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            let (ax, ay) = (a.x as f64, a.y as f64);
            let (ex, ey) = (b.x as f64 - ax, b.y as f64 - ay);

            let det = dx * ey - dy * ex;
            if det.abs() < PARALLEL_EPSILON {
                continue;
            }
            let t = (ax * ey - ay * ex) / det;
            let u = (ax * dy - ay * dx) / det;
            if t >= 0.0 && (0.0..=1.0).contains(&u) && t > farthest {
                farthest = t;
            }
        }

        *slot = farthest.ceil().clamp(1.0, 255.0) as u8;
    }
    profile
}
