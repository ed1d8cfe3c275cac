use crate::{Color, GeometryError, LineStrip, Model, Point, Slot};
use serde::Deserialize;
use std::{fs, path::Path};

/// Turns a vector-art source into a centered [`Model`].
pub trait GeometryProvider {
    fn parse_source(&self, path: &Path) -> Result<Model, GeometryError>;
}

/// Reads models from the outline JSON written by the art export step.
///
/// ```json
/// {
///   "center": [0, 0],
///   "strips": [{ "points": [[-4, -4], [4, -4], [0, 6]], "closed": true,
///                "stroke_width": 1.5, "class": "hull", "color": "#40c0ff" }],
///   "slots": [{ "name": "engine", "position": [0, -4] }]
/// }
/// ```
///
/// Points are translated so `center` (or the bounding-box center when absent)
/// becomes the local origin.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonModelProvider;

#[derive(Deserialize)]
struct RawModel {
    #[serde(default)]
    center: Option<[f32; 2]>,
    #[serde(default)]
    strips: Vec<RawStrip>,
    #[serde(default)]
    slots: Vec<RawSlot>,
}

#[derive(Deserialize)]
struct RawStrip {
    points: Vec<[f32; 2]>,
    #[serde(default)]
    closed: bool,
    #[serde(default = "default_stroke_width")]
    stroke_width: f32,
    #[serde(default)]
    class: String,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Deserialize)]
struct RawSlot {
    name: String,
    position: [f32; 2],
}

fn default_stroke_width() -> f32 {
    1.0
}

impl GeometryProvider for JsonModelProvider {
    fn parse_source(&self, path: &Path) -> Result<Model, GeometryError> {
        let text = fs::read_to_string(path).map_err(|e| GeometryError::from_io(path, e))?;
        let raw: RawModel =
            serde_json::from_str(&text).map_err(|e| GeometryError::parse(path, e.to_string()))?;

        let file_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GeometryError::parse(path, "model path has no file name"))?
            .to_string();

        let center = match raw.center {
            Some([x, y]) => Point::new(x, y),
            None => bounding_box_center(&raw.strips),
        };

        let mut line_strips = Vec::with_capacity(raw.strips.len());
        for strip in raw.strips {
            let color = match strip.color.as_deref() {
                Some(hex) => Color::from_hex(hex).map_err(|e| GeometryError::parse(path, e))?,
                None => Color::default(),
            };
            line_strips.push(LineStrip {
                points: strip
                    .points
                    .iter()
                    .map(|&[x, y]| Point::new(x, y) - center)
                    .collect(),
                is_closed: strip.closed,
                stroke_width: strip.stroke_width,
                class: strip.class,
                color,
            });
        }

        let slots = raw
            .slots
            .into_iter()
            .map(|slot| Slot {
                position: Point::new(slot.position[0], slot.position[1]) - center,
                name: slot.name,
            })
            .collect();

        log::debug!(
            "parsed model {} ({} strips) from {}",
            file_name,
            line_strips.len(),
            path.display()
        );
        Ok(Model::new(file_name, line_strips, slots))
    }
}

fn bounding_box_center(strips: &[RawStrip]) -> Point {
    let mut points = strips.iter().flat_map(|s| s.points.iter());
    let Some(&[x0, y0]) = points.next() else {
        return Point::zero();
    };
    let (mut min, mut max) = (Point::new(x0, y0), Point::new(x0, y0));
    for &[x, y] in points {
        min = Point::new(min.x.min(x), min.y.min(y));
        max = Point::new(max.x.max(x), max.y.max(y));
    }
    Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5)
}
