//! Host-side mirror of the generated orbit initialisation, in the same f32
//! arithmetic, so emitted worlds can be checked without running the engine.

use stellar_data::Record;
use stellar_geometry::Point;

/// Gravitational constant used by the engine.
pub const GRAVITY: f32 = 6.67430;
/// Bodies closer than this (squared) are skipped.
const MIN_DISTANCE_SQ: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Body {
    pub position: Point,
    pub mass: f32,
}

impl Body {
    /// Spawn-time state of a resolved record; unset fields take their defaults.
    pub fn of(record: &Record) -> Self {
        let entity = record.entity();
        Self {
            position: entity.and_then(|e| e.position).unwrap_or_default(),
            mass: entity
                .and_then(|e| e.mass)
                .unwrap_or(stellar_data::DEFAULT_MASS) as f32,
        }
    }
}

fn pull(from: Point, body: &Body) -> Option<Point> {
    let d = body.position - from;
    let d2 = d.length_squared();
    if d2 < MIN_DISTANCE_SQ {
        return None;
    }
    let gm = GRAVITY * body.mass / (d2 * d2.sqrt());
    Some(d * gm)
}

/// Tangential speed for a circular orbit of `orbiter` around `bodies[target]`,
/// in the field of every body in `bodies` (the orbiter itself excluded).
///
/// The target's own acceleration is subtracted, so the orbit is computed in
/// the target's frame. Returns `None` when the orbiter sits on its target.
pub fn circular_orbit_speed(bodies: &[Body], orbiter: Point, target: usize) -> Option<f32> {
    let center = bodies.get(target)?.position;
    let d = orbiter - center;
    let dist = d.length();
    if dist <= f32::EPSILON {
        return None;
    }
    let radial = d * (1.0 / dist);

    let mut accel = Point::zero();
    for (k, body) in bodies.iter().enumerate() {
        let Some(on_orbiter) = pull(orbiter, body) else {
            continue;
        };
        accel = accel + on_orbiter;
        if k != target {
            if let Some(on_center) = pull(center, body) {
                accel = accel - on_center;
            }
        }
    }

    let centripetal = -(accel.x * radial.x + accel.y * radial.y);
    Some(if centripetal > 0.0 {
        (centripetal * dist).sqrt()
    } else {
        0.0
    })
}
