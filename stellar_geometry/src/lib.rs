pub mod color;
pub mod error;
pub mod model;
pub mod point;
pub mod provider;
pub mod surface;

pub use color::Color;
pub use error::GeometryError;
pub use model::*;
pub use point::Point;
pub use provider::{GeometryProvider, JsonModelProvider};
pub use surface::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn closed(points: &[(f32, f32)], class: &str) -> LineStrip {
        LineStrip {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            is_closed: true,
            stroke_width: 1.0,
            class: class.to_string(),
            color: Color::WHITE,
        }
    }

    fn square(half: f32) -> Model {
        Model::new(
            "square",
            vec![closed(
                &[(-half, -half), (half, -half), (half, half), (-half, half)],
                "hull",
            )],
            vec![],
        )
    }

    fn circle(radius: f32, segments: usize) -> Vec<(f32, f32)> {
        (0..segments)
            .map(|i| {
                let a = i as f32 * std::f32::consts::TAU / segments as f32;
                (radius * a.cos(), radius * a.sin())
            })
            .collect()
    }

    fn rotation_of(hull: &[Point], expected: &[Point]) -> bool {
        hull.len() == expected.len()
            && (0..hull.len()).any(|shift| {
                hull.iter()
                    .cycle()
                    .skip(shift)
                    .zip(expected)
                    .all(|(a, b)| a == b)
            })
    }

    // -------------------- Derived geometry --------------------

    #[test]
    fn square_radius_rounds_up_diagonal() {
        assert_eq!(square(10.0).radius(), 15);
    }

    #[test]
    fn radius_of_empty_model_is_zero() {
        assert_eq!(Model::new("dot", vec![], vec![]).radius(), 0);
    }

    #[test]
    fn convex_input_hull_is_the_input_ccw() {
        let model = square(10.0);
        let hull = model.collision_hull().unwrap();
        let expected = &model.line_strips[0].points;
        assert!(rotation_of(hull, expected), "hull {hull:?}");
    }

    #[test]
    fn hull_drops_concave_vertex() {
        let model = Model::new(
            "arrow",
            vec![closed(&[(0.0, 0.0), (10.0, -10.0), (2.0, 0.0), (10.0, 10.0)], "hull")],
            vec![],
        );
        let hull = model.collision_hull().unwrap();
        assert_eq!(hull.len(), 3);
        assert!(!hull.contains(&Point::new(2.0, 0.0)));
    }

    #[test]
    fn hull_prefers_hull_class_strip() {
        let model = Model::new(
            "two",
            vec![
                closed(&[(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)], "trim"),
                closed(&[(-5.0, -5.0), (5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)], "hull"),
            ],
            vec![],
        );
        assert!(model.collision_hull().unwrap().contains(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn hull_falls_back_to_first_closed_strip() {
        let model = Model::new(
            "fallback",
            vec![closed(&[(-3.0, -3.0), (3.0, -3.0), (0.0, 3.0)], "trim")],
            vec![],
        );
        assert_eq!(model.collision_hull().unwrap().len(), 3);
    }

    #[test]
    fn open_strips_have_no_hull_or_profile() {
        let mut strip = closed(&[(0.0, 0.0), (4.0, 0.0)], "");
        strip.is_closed = false;
        let model = Model::new("spark", vec![strip], vec![]);
        assert!(model.collision_hull().is_none());
        assert!(model.radial_profile().is_none());
        assert_eq!(model.radius(), 4);
    }

    #[test]
    fn circle_profile_is_flat() {
        let model = Model::new("ring", vec![closed(&circle(10.0, 32), "hull")], vec![]);
        let profile = model.radial_profile().unwrap();
        for (sector, distance) in profile.iter().enumerate() {
            assert!(
                (9..=11).contains(distance),
                "sector {sector} distance {distance}"
            );
        }
    }

    #[test]
    fn profile_clamps_to_byte_range() {
        let model = Model::new("giant", vec![closed(&circle(400.0, 24), "hull")], vec![]);
        assert!(model.radial_profile().unwrap().iter().all(|&d| d == 255));

        let tiny = Model::new("tiny", vec![closed(&circle(0.2, 8), "hull")], vec![]);
        assert!(tiny.radial_profile().unwrap().iter().all(|&d| d == 1));
    }

    #[test]
    fn slot_lookup_is_first_case_sensitive_match() {
        let model = Model::new(
            "ship",
            vec![],
            vec![
                Slot { position: Point::new(0.0, -4.0), name: "engine".into() },
                Slot { position: Point::new(2.0, 0.0), name: "gun".into() },
                Slot { position: Point::new(-2.0, 0.0), name: "gun".into() },
            ],
        );
        assert_eq!(model.slot_index("gun"), Some(1));
        assert_eq!(model.slot_index("Engine"), None);
    }

    // -------------------- Providers --------------------

    #[test]
    fn json_provider_centers_on_bounding_box() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate.json");
        fs::write(
            &path,
            r##"{
                "strips": [{ "points": [[0, 0], [20, 0], [20, 10], [0, 10]],
                             "closed": true, "class": "hull", "color": "#ff0000" }],
                "slots": [{ "name": "engine", "position": [10, 0] }]
            }"##,
        )
        .unwrap();

        let model = JsonModelProvider.parse_source(&path).unwrap();
        assert_eq!(model.file_name, "crate");
        assert_eq!(model.line_strips[0].points[0], Point::new(-10.0, -5.0));
        assert_eq!(model.line_strips[0].color, Color::new(255, 0, 0, 255));
        assert_eq!(model.slots[0].position, Point::new(0.0, -5.0));
    }

    #[test]
    fn json_provider_honours_explicit_center() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offset.json");
        fs::write(
            &path,
            r#"{ "center": [1, 1], "strips": [{ "points": [[1, 1], [3, 1]] }] }"#,
        )
        .unwrap();

        let model = JsonModelProvider.parse_source(&path).unwrap();
        assert_eq!(model.line_strips[0].points, vec![Point::zero(), Point::new(2.0, 0.0)]);
        assert!(!model.line_strips[0].is_closed);
        assert_eq!(model.line_strips[0].stroke_width, 1.0);
    }

    #[test]
    fn json_provider_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonModelProvider
            .parse_source(&dir.path().join("nope.json"))
            .unwrap_err();
        assert!(matches!(err, GeometryError::FileNotFound { .. }));
    }

    #[test]
    fn json_provider_rejects_bad_color() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r##"{ "strips": [{ "points": [[0, 0]], "color": "#12" }] }"##).unwrap();
        assert!(matches!(
            JsonModelProvider.parse_source(&path),
            Err(GeometryError::Parse { .. })
        ));
    }

    // -------------------- Surfaces --------------------

    #[test]
    fn lon_lat_axes() {
        assert_eq!(lon_lat_to_sphere(0.0, 0.0), SpherePoint { x: 10000, y: 0, z: 0 });
        assert_eq!(lon_lat_to_sphere(90.0, 0.0), SpherePoint { x: 0, y: 10000, z: 0 });
        assert_eq!(lon_lat_to_sphere(0.0, 90.0), SpherePoint { x: 0, y: 0, z: 10000 });
    }

    #[test]
    fn crater_is_closed_loop_around_center() {
        let points = generate_crater(30.0, 10.0, 5.0, DEFAULT_CRATER_SEGMENTS);
        assert_eq!(points.len(), DEFAULT_CRATER_SEGMENTS as usize + 1);
        assert_eq!(points.first(), points.last());

        let center = lon_lat_to_sphere(30.0, 10.0);
        let expected_cos = 5.0f64.to_radians().cos();
        for p in &points {
            let dot = (p.x as f64 * center.x as f64
                + p.y as f64 * center.y as f64
                + p.z as f64 * center.z as f64)
                / (SPHERE_SCALE * SPHERE_SCALE);
            assert!((dot - expected_cos).abs() < 1e-3, "dot {dot}");
        }
    }
}
