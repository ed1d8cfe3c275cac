mod error;
pub mod models;
pub mod physics;
pub mod surfaces;
pub mod worlds;

pub use error::CodegenError;
pub use models::{DrawCommand, ModelTables, Palette};
pub use surfaces::SurfaceTables;
pub use worlds::WorldTables;

use std::fmt::Write;
use std::sync::Arc;
use stellar_data::World;
use stellar_data::resolve::push_unique;
use stellar_geometry::{Model, SurfaceAsset};

const BANNER: &str = "// generated, do not edit manually";

/// Header and source text of one compiler run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    pub header: String,
    pub source: String,
}

/// Identifier-safe lowercase form of an asset name.
pub(crate) fn c_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// One `    entry,` row per item; a null row keeps empty C arrays valid.
pub(crate) fn write_pointer_rows(out: &mut String, rows: &[String]) -> std::fmt::Result {
    if rows.is_empty() {
        writeln!(out, "    0,")?;
    }
    for row in rows {
        writeln!(out, "    {row},")?;
    }
    Ok(())
}

/// Models every world needs: entity references first, across worlds in
/// order, then models forced in by `require_model`.
pub fn emitted_models(worlds: &[World]) -> Vec<Arc<Model>> {
    let mut out = Vec::new();
    for world in worlds {
        for entity in &world.entities {
            for model in entity.all_referenced_models() {
                push_unique(&mut out, &model);
            }
        }
    }
    for model in worlds.iter().flat_map(|w| w.required_models.iter()) {
        push_unique(&mut out, model);
    }
    out
}

fn write_header_prelude(h: &mut String) -> std::fmt::Result {
    writeln!(h)?;
    writeln!(h, "{BANNER}")?;
    writeln!(h)?;
    writeln!(h, "#pragma once")?;
    writeln!(h, "#include \"platform/platform.h\"")?;
    writeln!(h, "void _generated_draw_model(color_t color, uint16_t index);")?;
    writeln!(h, "uint16_t _generated_get_model_radius(uint16_t index);")?;
    writeln!(h, "const uint8_t* _generated_get_radial_profile(uint16_t model_idx);")?;
    writeln!(
        h,
        "const int16_t* _generated_get_collision_hull(uint16_t model_idx, uint16_t* count);"
    )?;
    writeln!(h)?;
    writeln!(h, "struct surface_polyline;")?;
    writeln!(h, "struct surface_data;")?;
    writeln!(h, "const struct surface_data* _generated_get_surface(uint16_t index);")?;
    writeln!(h)?;
    writeln!(h, "void _generated_load_map_data(uint16_t index);")?;
    writeln!(h)
}

fn write_source_prelude(c: &mut String) -> std::fmt::Result {
    const ENGINE_HEADERS: [&str; 12] = [
        "renderer.gen.h",
        "entity/entity.h",
        "entity/controller.h",
        "entity/camera.h",
        "entity/engine.h",
        "entity/weapon.h",
        "entity/ai.h",
        "entity/radar.h",
        "graphics/surface.h",
        "debug/debug.h",
        "hud/hud.h",
        "debug/profiler.h",
    ];

    writeln!(c)?;
    writeln!(c, "{BANNER}")?;
    writeln!(c)?;
    for header in ENGINE_HEADERS {
        writeln!(c, "#include \"{header}\"")?;
    }
    writeln!(c)?;
    writeln!(c, "#ifdef _WIN32")?;
    writeln!(c, "#include <Windows.h>")?;
    writeln!(c, "#include <gl/GL.h>")?;
    writeln!(c, "#else")?;
    writeln!(c, "#include <GL/gl.h>")?;
    writeln!(c, "#endif")?;
    writeln!(c, "#include <math.h>")?;
    writeln!(c, "#include <string.h>")?;
    writeln!(c)
}

/// Renders both artifacts. `surfaces` must be in surface handle order.
pub fn generate(
    models: &[Arc<Model>],
    surfaces: &[Arc<SurfaceAsset>],
    worlds: &[World],
) -> Result<GeneratedArtifacts, CodegenError> {
    let model_tables = ModelTables::new(models)?;
    let surface_tables = SurfaceTables::new(surfaces)?;
    let world_tables = WorldTables::new(worlds, surfaces)?;

    let mut header = String::with_capacity(4096);
    write_header_prelude(&mut header)?;
    model_tables.write_header(&mut header)?;
    surface_tables.write_header(&mut header)?;
    world_tables.write_header(&mut header)?;

    let mut source = String::with_capacity(64 * 1024);
    write_source_prelude(&mut source)?;
    model_tables.write_source(&mut source)?;
    surface_tables.write_source(&mut source)?;
    world_tables.write_source(&mut source)?;

    Ok(GeneratedArtifacts { header, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_data::{ModelRef, Record, RecordKind, VariantData};
    use stellar_geometry::{Color, LineStrip, Point, Slot, SpherePoint, SurfacePolyline};
    use stellar_ids::{ModelHandle, SpawnId, SurfaceHandle, TemplateHandle};

    fn strip(points: &[(f32, f32)], closed: bool, class: &str, color: Color) -> LineStrip {
        LineStrip {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            is_closed: closed,
            stroke_width: 1.0,
            class: class.to_string(),
            color,
        }
    }

    fn square(name: &str, half: f32, slots: Vec<Slot>) -> Arc<Model> {
        let corners = [(-half, -half), (half, -half), (half, half), (-half, half)];
        Arc::new(Model::new(
            name,
            vec![strip(&corners, true, "hull", Color::WHITE)],
            slots,
        ))
    }

    fn entity(ty: &str, model: &Arc<Model>, spawn: u32) -> Record {
        let mut record = Record::empty(RecordKind::Entity);
        record.base.type_name = Some(ty.to_string());
        record.base.model = Some(ModelRef {
            handle: ModelHandle::from_index(0),
            model: Some(Arc::clone(model)),
        });
        record.base.spawn_id = Some(SpawnId::from_index(spawn));
        record
    }

    fn entity_mut(record: &mut Record) -> &mut stellar_data::EntityData {
        match &mut record.data {
            VariantData::Entity(e) => e,
            VariantData::Slotted(s) => &mut s.entity,
            VariantData::Part(_) => panic!("not an entity"),
        }
    }

    fn world(name: &str, entities: Vec<Record>) -> World {
        World {
            entities,
            ..World::new(name)
        }
    }

    fn section<'a>(source: &'a str, start: &str) -> &'a str {
        let from = source.find(start).unwrap();
        let rest = &source[from..];
        let end = rest.find("\n}\n").unwrap();
        &rest[..end]
    }

    // -------------------- End to end --------------------

    #[test]
    fn single_entity_world() {
        // half width 8 gives a radius of ceil(8 * sqrt 2) = 12
        let rock = square("rock", 8.0, vec![]);
        assert_eq!(rock.radius(), 12);
        let mut record = entity("ENTITY_TYPEREF_ASTEROID", &rock, 0);
        entity_mut(&mut record).mass = Some(100);

        let worlds = vec![world("belt", vec![record])];
        let models = emitted_models(&worlds);
        let out = generate(&models, &[], &worlds).unwrap();

        assert!(out.header.contains("#define MODEL_ROCK_IDX    ((uint16_t)0)"));
        assert!(out.header.contains("#define WORLD_BELT_IDX ((uint16_t)0)"));

        let routine = section(&out.source, "static void _world_belt(");
        assert!(routine.contains("  od->model_idx[new_idx] = MODEL_ROCK_IDX;"));
        assert!(routine.contains("  od->position_orientation.radius[new_idx] = 12;"));
        assert!(routine.contains("  od->mass[new_idx] = 100;"));
        assert!(routine.contains("  od->health[new_idx] = 1000;"));
        assert!(routine.contains("  od->position_orientation.orientation_x[new_idx] = 1.0f;"));
        assert!(routine.contains("  od->position_orientation.orientation_y[new_idx] = 0.0f;"));
        assert!(!routine.contains("velocity"));
        assert!(!routine.contains("camera_set_entity"));

        assert!(out.source.contains("    _world_belt,"));
        assert!(out.source.contains("  _ASSERT(index >= 0 && index < 1);"));
    }

    #[test]
    fn explicit_radius_and_velocity_are_emitted() {
        let rock = square("rock", 8.0, vec![]);
        let mut record = entity("ENTITY_TYPEREF_ASTEROID", &rock, 0);
        let e = entity_mut(&mut record);
        e.radius = Some(30);
        e.velocity = Some(Point::new(1.5, -2.0));

        let worlds = vec![world("belt", vec![record])];
        let out = generate(&emitted_models(&worlds), &[], &worlds).unwrap();
        assert!(out.source.contains("  od->position_orientation.radius[new_idx] = 30;"));
        assert!(out.source.contains("  od->velocity_x[new_idx] = 1.5f;"));
        assert!(out.source.contains("  od->velocity_y[new_idx] = -2.0f;"));
    }

    #[test]
    fn controlled_wiring_only_for_controlled_entity() {
        let hull = square("hull", 10.0, vec![]);
        let a = entity("ENTITY_TYPEREF_ASTEROID", &hull, 0);
        let b = entity("ENTITY_TYPEREF_SHIP", &hull, 1);
        let mut w = world("duel", vec![a, b]);
        w.controlled = Some(SpawnId::from_index(1));

        let worlds = vec![w];
        let out = generate(&emitted_models(&worlds), &[], &worlds).unwrap();
        let routine = section(&out.source, "static void _world_duel(");

        let wiring = "  camera_set_entity(OBJECT_ID_WITH_TYPE(new_idx, ENTITY_TYPEREF_SHIP._));";
        assert_eq!(routine.matches("camera_set_entity").count(), 1);
        assert_eq!(routine.matches("hud_set_entity").count(), 1);
        let wired = routine.find(wiring).unwrap();
        let second_spawn = routine.rfind("  new_idx = od->active++;").unwrap();
        assert!(wired > second_spawn);
        assert!(!routine.contains("ENTITY_TYPEREF_ASTEROID._"));
    }

    // -------------------- Orbits --------------------

    #[test]
    fn orbit_block_references_target_spawn_id() {
        let body = square("body", 10.0, vec![]);
        let mut sun = entity("ENTITY_TYPEREF_PLANET", &body, 0);
        entity_mut(&mut sun).mass = Some(1000);
        let mut moon = entity("ENTITY_TYPEREF_SATELLITE", &body, 1);
        let e = entity_mut(&mut moon);
        e.position = Some(Point::new(100.0, 0.0));
        e.orbit_target = Some(TemplateHandle::from_index(0));
        e.orbit_target_spawn_id = Some(SpawnId::from_index(0));

        let worlds = vec![world("system", vec![sun, moon])];
        let out = generate(&emitted_models(&worlds), &[], &worlds).unwrap();
        let routine = section(&out.source, "static void _world_system(");

        assert!(routine.contains("  // Circular orbit velocity around entity 0 (N-body corrected)"));
        assert!(routine.contains("  // host preview speed: 8.1696"));
        assert!(routine.contains("    od->velocity_x[new_idx] = -_rny * _v + od->velocity_x[0];"));
        assert!(routine.contains(
            "  ai_orbit_engage(OBJECT_ID_WITH_TYPE(new_idx, ENTITY_TYPEREF_SATELLITE._), 0);"
        ));
    }

    // -------------------- Slots --------------------

    #[test]
    fn slotted_entity_reserves_padded_part_block() {
        let ship_model = square(
            "ship",
            10.0,
            vec![
                Slot {
                    position: Point::new(0.0, 8.0),
                    name: "gun".into(),
                },
                Slot {
                    position: Point::new(-6.5, 0.0),
                    name: "engine".into(),
                },
            ],
        );
        let flame = square("flame", 2.0, vec![]);

        let mut engine = Record::empty(RecordKind::Engine);
        engine.base.type_name = Some("PART_TYPEREF_ENGINE".into());
        engine.base.model = Some(ModelRef {
            handle: ModelHandle::from_index(1),
            model: Some(Arc::clone(&flame)),
        });

        let mut ship = Record::empty(RecordKind::Slotted);
        ship.base = entity("ENTITY_TYPEREF_SHIP", &ship_model, 0).base;
        if let VariantData::Slotted(slotted) = &mut ship.data {
            let mut binding = stellar_data::SlotBinding::new("engine", TemplateHandle::from_index(3));
            binding.slot_ref = Some(1);
            binding.resolved_child = Some(Box::new(engine));
            slotted.slots.push(binding);
        }

        let worlds = vec![world("hangar", vec![ship])];
        let models = emitted_models(&worlds);
        assert_eq!(models.len(), 2);
        let out = generate(&models, &[], &worlds).unwrap();
        let routine = section(&out.source, "static void _world_hangar(");

        assert!(routine.contains("  _ASSERT(pd->active + 8 < pd->capacity);"));
        assert!(routine.contains("  od->parts_count[new_idx] = 1;"));
        assert!(routine.contains("  memset(&pd->model_idx[pd->active], -1, sizeof(uint16_t) * 8);"));
        assert!(routine.contains("  pd->local_offset_x[new_pidx] = -6.5f;"));
        assert!(routine.contains("  pd->model_idx[new_pidx] = MODEL_FLAME_IDX;"));
        assert!(routine.contains("  pd->type[new_pidx] = PART_TYPEREF_ENGINE;"));
        assert!(routine.contains("  pd->local_orientation_x[new_pidx] = 1.0f;"));
        assert!(routine.contains("    struct engine_data* _data = (struct engine_data*)(pd->data[new_pidx].data);"));
        assert!(routine.contains("    _data->power = 1.0f;"));
        assert!(routine.contains("  pd->active += 7;"));
    }

    #[test]
    fn reserved_parts_round_up_to_blocks() {
        assert_eq!(worlds::reserved_parts(0), 0);
        assert_eq!(worlds::reserved_parts(1), 8);
        assert_eq!(worlds::reserved_parts(8), 8);
        assert_eq!(worlds::reserved_parts(9), 16);
    }

    // -------------------- Model tables --------------------

    #[test]
    fn hull_fill_comes_before_lines() {
        let red = Color::new(255, 0, 0, 255);
        let model = Model::new(
            "lander",
            vec![
                strip(&[(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)], true, "hull", red),
                strip(&[(0.0, 0.0), (-3.0, 0.0)], false, "heat", red),
                strip(&[(1.0, 1.0), (2.0, 2.0)], false, "", red),
            ],
            vec![],
        );
        let set = vec![Arc::new(model)];
        let palette = Palette::build(&set).unwrap();
        let cmds = models::draw_commands(&set[0], &palette).unwrap();

        let modes: Vec<u16> = cmds.iter().map(|c| c.mode).collect();
        assert_eq!(
            modes,
            vec![
                models::GL_TRIANGLE_FAN,
                models::GL_LINE_LOOP,
                models::GL_LINE_STRIP,
                models::GL_LINE_STRIP
            ]
        );
        assert_eq!(cmds[0].color_ref, models::COLOR_HULL_FILL);
        assert_eq!(cmds[1].color_ref, 0);
        assert_eq!(cmds[2].color_ref, models::COLOR_DRAW_TIME);
        assert_eq!(cmds[3].color_ref, 0);
        assert_eq!((cmds[3].start, cmds[3].count), (5, 2));
        assert_eq!(cmds[1].width_ref, 10);
        assert_eq!(cmds[2].width_ref, models::WIDTH_UNCHANGED);
    }

    #[test]
    fn palette_is_shared_and_first_seen() {
        let red = Color::new(255, 0, 0, 255);
        let blue = Color::new(0, 0, 255, 255);
        let a = Model::new("a", vec![strip(&[(0.0, 0.0), (1.0, 0.0)], false, "", red)], vec![]);
        let b = Model::new(
            "b",
            vec![
                strip(&[(0.0, 0.0), (1.0, 0.0)], false, "", blue),
                strip(&[(0.0, 0.0), (1.0, 0.0)], false, "", red),
            ],
            vec![],
        );
        let palette = Palette::build(&[Arc::new(a), Arc::new(b)]).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.index_of(red), Some(0));
        assert_eq!(palette.index_of(blue), Some(1));
    }

    #[test]
    fn identical_vertex_data_shares_one_array() {
        let a = square("a", 5.0, vec![]);
        let b = square("b", 5.0, vec![]);
        let models = vec![a, b];
        let tables = ModelTables::new(&models).unwrap();
        assert_eq!(tables.vertex_array_count(), 1);

        let out = generate(&models, &[], &[]).unwrap();
        assert!(out.source.contains("static const int16_t _model_a_vertices[]"));
        assert!(!out.source.contains("_model_b_vertices"));
        assert!(out.source.contains("static const uint16_t _model_b_cmds[]"));
    }

    #[test]
    fn radius_and_profile_tables() {
        let dust = Arc::new(Model::new(
            "dust",
            vec![strip(&[(0.0, 0.0), (3.0, 4.0)], false, "", Color::WHITE)],
            vec![],
        ));
        let models = vec![square("box", 10.0, vec![]), dust];
        let out = generate(&models, &[], &[]).unwrap();

        let radius = section(&out.source, "uint16_t _generated_get_model_radius(");
        assert!(radius.contains("    15,\n    5,\n"));
        assert!(out.source.contains("  { 0 }, // 1: dust (no profile)"));
        assert!(out.source.contains("static const int16_t _model_box_hull[] = { "));
        assert!(out.source.contains("    0 /* dust (no hull) */,"));
    }

    #[test]
    fn vertex_outside_int16_fails() {
        let huge = square("huge", 40000.0, vec![]);
        let err = ModelTables::new(&[huge]).err().unwrap();
        assert!(matches!(err, CodegenError::VertexOutOfRange { .. }));
    }

    #[test]
    fn two_models_with_one_name_fail() {
        let models = vec![square("Rock", 1.0, vec![]), square("rock", 2.0, vec![])];
        let err = ModelTables::new(&models).err().unwrap();
        assert!(matches!(err, CodegenError::DuplicateModelName { .. }));
    }

    // -------------------- Surfaces --------------------

    #[test]
    fn surfaces_are_emitted_by_handle_index() {
        let terra = Arc::new(SurfaceAsset {
            name: "terra".into(),
            polylines: vec![SurfacePolyline {
                points: vec![SpherePoint { x: 10000, y: 0, z: 0 }, SpherePoint { x: 0, y: 10000, z: 0 }],
            }],
            color: Color::new(90, 160, 255, 200),
        });
        let body = square("planet", 10.0, vec![]);
        let mut planet = entity("ENTITY_TYPEREF_PLANET", &body, 0);
        entity_mut(&mut planet).surface = Some(SurfaceHandle::from_index(0));

        let worlds = vec![world("home", vec![planet])];
        let out = generate(&emitted_models(&worlds), &[terra], &worlds).unwrap();

        assert!(out.header.contains("#define SURFACE_TERRA_IDX ((uint16_t)0)"));
        assert!(out.source.contains("static const int16_t _surf_0_poly_0[] = { 10000, 0, 0, 0, 10000, 0 };"));
        assert!(out.source.contains("  { _surf_0_poly_0, 2 },"));
        assert!(out.source.contains("  { _surf_0_polys, 1, { 90, 160, 255, 200 } },  // 0: terra"));
        assert!(out.source.contains("  // Surface: terra"));
        assert!(out.source.contains("  od->rotation_speed[new_idx] = 0.001f;"));
    }

    #[test]
    fn unknown_surface_handle_fails() {
        let body = square("planet", 10.0, vec![]);
        let mut planet = entity("ENTITY_TYPEREF_PLANET", &body, 0);
        entity_mut(&mut planet).surface = Some(SurfaceHandle::from_index(4));
        let worlds = vec![world("home", vec![planet])];
        let err = generate(&emitted_models(&worlds), &[], &worlds).unwrap_err();
        assert!(matches!(err, CodegenError::Data(_)));
    }

    #[test]
    fn no_surfaces_means_no_surface_tables() {
        let out = generate(&[square("a", 1.0, vec![])], &[], &[]).unwrap();
        assert!(!out.source.contains("_generated_get_surface(uint16_t index) {"));
        assert!(out.header.contains("const struct surface_data* _generated_get_surface(uint16_t index);"));
    }

    // -------------------- Model order --------------------

    #[test]
    fn emitted_models_follow_first_reference_then_required() {
        let a = square("a", 1.0, vec![]);
        let b = square("b", 1.0, vec![]);
        let c = square("c", 1.0, vec![]);
        let mut first = world("one", vec![entity("T", &b, 0)]);
        first.required_models.push(Arc::clone(&c));
        let second = world("two", vec![entity("T", &a, 0), entity("T", &b, 1)]);

        let names: Vec<String> = emitted_models(&[first, second])
            .iter()
            .map(|m| m.file_name.clone())
            .collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
