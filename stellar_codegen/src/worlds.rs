//! One spawn routine per world, filling the engine's structure-of-arrays
//! storage, plus the world-index dispatch.

use crate::physics::{Body, circular_orbit_speed};
use crate::{CodegenError, c_ident, write_pointer_rows};
use rustc_hash::FxHashSet;
use std::fmt::Write;
use std::sync::Arc;
use stellar_data::{
    DEFAULT_HEALTH, DEFAULT_MASS, DEFAULT_ROTATION_SPEED, DataError, EntityData, Record,
    VariantData, World, c_float,
};
use stellar_geometry::{Model, SurfaceAsset};
use stellar_ids::{ArenaHandle, SpawnId, SurfaceHandle};

pub const SATELLITE_TYPE: &str = "ENTITY_TYPEREF_SATELLITE";
/// Parts are reserved in blocks of this many entries.
pub const PART_BLOCK: usize = 8;

pub fn world_constant_name(world: &World) -> String {
    format!("WORLD_{}_IDX", c_ident(&world.name).to_ascii_uppercase())
}

pub fn world_routine_name(world: &World) -> String {
    format!("_world_{}", c_ident(&world.name))
}

/// Slot count rounded up to the next multiple of [`PART_BLOCK`].
pub const fn reserved_parts(slot_count: usize) -> usize {
    (slot_count + PART_BLOCK - 1) & !(PART_BLOCK - 1)
}

fn type_name(record: &Record) -> Result<&str, DataError> {
    record
        .base
        .type_name
        .as_deref()
        .ok_or(DataError::MissingField {
            field: "type",
            type_tag: record.type_tag(),
        })
}

fn model(record: &Record) -> Result<&Arc<Model>, DataError> {
    record.model().ok_or(DataError::MissingField {
        field: "model",
        type_tag: record.type_tag(),
    })
}

fn object_id(ty: &str) -> String {
    format!("OBJECT_ID_WITH_TYPE(new_idx, {ty}._)")
}

pub struct WorldTables<'a> {
    worlds: &'a [World],
    surfaces: &'a [Arc<SurfaceAsset>],
}

impl<'a> WorldTables<'a> {
    pub fn new(worlds: &'a [World], surfaces: &'a [Arc<SurfaceAsset>]) -> Result<Self, CodegenError> {
        let mut seen = FxHashSet::default();
        for world in worlds {
            let name = world_routine_name(world);
            if !seen.insert(name.clone()) {
                return Err(CodegenError::DuplicateWorldName { name });
            }
        }
        Ok(Self { worlds, surfaces })
    }

    pub fn write_header(&self, h: &mut String) -> std::fmt::Result {
        for (i, world) in self.worlds.iter().enumerate() {
            writeln!(h, "#define {} ((uint16_t){i})", world_constant_name(world))?;
        }
        Ok(())
    }

    pub fn write_source(&self, c: &mut String) -> Result<(), CodegenError> {
        for world in self.worlds {
            self.write_world(c, world)?;
            log::info!(
                "generated world {} ({} entities)",
                world.name,
                world.entities.len()
            );
        }
        self.write_dispatch(c)?;
        Ok(())
    }

    fn surface(&self, handle: SurfaceHandle) -> Result<&SurfaceAsset, DataError> {
        self.surfaces
            .get(handle.as_usize())
            .map(|s| s.as_ref())
            .ok_or(DataError::IndexOutOfRange {
                arena: SurfaceHandle::LABEL,
                index: handle.index(),
                len: self.surfaces.len(),
            })
    }

    fn write_world(&self, c: &mut String, world: &World) -> Result<(), CodegenError> {
        writeln!(
            c,
            "static void {}(struct objects_data* od, struct parts_data* pd) {{",
            world_routine_name(world)
        )?;
        writeln!(c, "  uint32_t new_idx;")?;
        writeln!(c, "  uint32_t new_pidx;")?;

        for (i, record) in world.entities.iter().enumerate() {
            writeln!(c)?;
            self.write_entity(c, world, i, record)?;
        }

        writeln!(c, "}}")?;
        writeln!(c)?;
        Ok(())
    }

    fn write_entity(
        &self,
        c: &mut String,
        world: &World,
        i: usize,
        record: &Record,
    ) -> Result<(), CodegenError> {
        let ty = type_name(record)?;
        let model = model(record)?;
        let defaults = EntityData::default();
        let entity = record.entity().unwrap_or(&defaults);
        let position = entity.position.unwrap_or_default();
        let rotation = entity.rotation.unwrap_or(0.0);
        let radius = entity.radius.unwrap_or(model.radius() as i64);

        writeln!(c, "  new_idx = od->active++;")?;
        writeln!(c, "  od->type[new_idx] = {ty};")?;
        writeln!(c, "  od->model_idx[new_idx] = {};", model.constant_name())?;
        writeln!(
            c,
            "  od->position_orientation.position_x[new_idx] = {};",
            c_float(position.x as f64)
        )?;
        writeln!(
            c,
            "  od->position_orientation.position_y[new_idx] = {};",
            c_float(position.y as f64)
        )?;
        writeln!(
            c,
            "  od->position_orientation.orientation_x[new_idx] = {};",
            c_float(rotation.cos())
        )?;
        writeln!(
            c,
            "  od->position_orientation.orientation_y[new_idx] = {};",
            c_float(rotation.sin())
        )?;
        writeln!(c, "  od->position_orientation.radius[new_idx] = {radius};")?;
        writeln!(c, "  od->mass[new_idx] = {};", entity.mass.unwrap_or(DEFAULT_MASS))?;
        writeln!(
            c,
            "  od->health[new_idx] = {};",
            entity.health.unwrap_or(DEFAULT_HEALTH)
        )?;

        if let Some(velocity) = entity.velocity {
            writeln!(c, "  od->velocity_x[new_idx] = {};", c_float(velocity.x as f64))?;
            writeln!(c, "  od->velocity_y[new_idx] = {};", c_float(velocity.y as f64))?;
        }

        if let Some(target) = entity.orbit_target_spawn_id {
            write_orbit(c, world, i, target, Body::of(record))?;
        }

        if let Some(handle) = entity.surface {
            let surface = self.surface(handle)?;
            writeln!(c)?;
            writeln!(c, "  // Surface: {}", surface.name)?;
            writeln!(c, "  od->surface_idx[new_idx] = {};", handle.index())?;
            writeln!(
                c,
                "  od->rotation_speed[new_idx] = {};",
                c_float(entity.rotation_speed.unwrap_or(DEFAULT_ROTATION_SPEED))
            )?;
            writeln!(c, "  od->surface_rotation[new_idx] = 0.0f;")?;
        }

        if let Some(target) = entity.orbit_target_spawn_id {
            if ty == SATELLITE_TYPE {
                writeln!(c)?;
                writeln!(c, "  // Engage AI orbit keeper for satellite")?;
                writeln!(c, "  ai_orbit_engage({}, {});", object_id(ty), target.index())?;
            }
        }

        if let VariantData::Slotted(slotted) = &record.data {
            let slot_count = slotted.slots.len();
            let reserved = reserved_parts(slot_count);

            writeln!(c)?;
            writeln!(c, "  _ASSERT(pd->active + {reserved} < pd->capacity);")?;
            writeln!(c, "  od->parts_start_idx[new_idx] = pd->active;")?;
            writeln!(c, "  od->parts_count[new_idx] = {slot_count};")?;
            writeln!(c)?;
            writeln!(c, "  memset(&pd->model_idx[pd->active], -1, sizeof(uint16_t) * {reserved});")?;
            writeln!(c)?;

            for binding in &slotted.slots {
                let slot = binding
                    .slot_ref
                    .and_then(|index| model.slots.get(index))
                    .ok_or_else(|| DataError::MissingSlot {
                        model: model.file_name.clone(),
                        slot: binding.slot_name.clone(),
                    })?;
                let child = binding.resolved_child.as_deref().ok_or_else(|| {
                    DataError::MissingSpawnId {
                        handle: binding.child.to_string(),
                    }
                })?;
                let part = child.part().ok_or(DataError::UnknownDataType {
                    kind: child.type_tag().to_string(),
                    constructor: "Part",
                })?;

                writeln!(c, "  new_pidx = pd->active++;")?;
                writeln!(c, "  pd->parent_id[new_pidx] = {};", object_id(ty))?;
                writeln!(
                    c,
                    "  pd->local_offset_x[new_pidx] = {};",
                    c_float(slot.position.x as f64)
                )?;
                writeln!(
                    c,
                    "  pd->local_offset_y[new_pidx] = {};",
                    c_float(slot.position.y as f64)
                )?;
                writeln!(c, "  pd->model_idx[new_pidx] = {};", model_of(child)?)?;
                writeln!(c, "  pd->type[new_pidx] = {};", type_name(child)?)?;
                // slots carry no orientation yet
                writeln!(c, "  pd->local_orientation_x[new_pidx] = 1.0f;")?;
                writeln!(c, "  pd->local_orientation_y[new_pidx] = 0.0f;")?;
                part.emit_part_data(c, "pd->data[new_pidx].data")?;
                writeln!(c)?;
            }

            writeln!(c, "  pd->active += {};", reserved - slot_count)?;
        }

        if world.is_controlled(record) {
            let id = object_id(ty);
            writeln!(c)?;
            writeln!(c, "  debug_watch_set({id});")?;
            writeln!(c, "  controller_set_entity({id});")?;
            writeln!(c, "  camera_set_entity({id});")?;
            writeln!(c, "  hud_set_entity({id});")?;
            writeln!(c)?;
        }
        Ok(())
    }

    fn write_dispatch(&self, c: &mut String) -> std::fmt::Result {
        let routines: Vec<String> = self.worlds.iter().map(world_routine_name).collect();
        writeln!(c, "void _generated_load_map_data(uint16_t index) {{")?;
        writeln!(
            c,
            "  static void (*_data[])(struct objects_data*, struct parts_data*) = {{"
        )?;
        write_pointer_rows(c, &routines)?;
        writeln!(c, "  }};")?;
        writeln!(c, "  _ASSERT(index >= 0 && index < {});", self.worlds.len())?;
        writeln!(c, "  _data[index](entity_manager_get_objects(), entity_manager_get_parts());")?;
        writeln!(c, "}}")?;
        writeln!(c)
    }
}

fn model_of(record: &Record) -> Result<String, DataError> {
    model(record).map(|m| m.constant_name())
}

/// Emits the N-body circular orbit block for the entity at `index`.
fn write_orbit(
    c: &mut String,
    world: &World,
    index: usize,
    target: SpawnId,
    orbiter: Body,
) -> std::fmt::Result {
    let t = target.index();
    let earlier: Vec<Body> = world.entities[..index].iter().map(Body::of).collect();

    writeln!(c)?;
    writeln!(c, "  // Circular orbit velocity around entity {t} (N-body corrected)")?;
    match circular_orbit_speed(&earlier, orbiter.position, target.as_usize()) {
        Some(speed) => {
            log::debug!("[{}] entity {index} orbits {t} at {speed:.4}", world.name);
            writeln!(c, "  // host preview speed: {speed:.4}")?;
        }
        None => {
            log::warn!(
                "[{}] entity {index} is placed on its orbit target {t}",
                world.name
            );
            writeln!(c, "  // host preview speed: undefined, orbiter sits on its target")?;
        }
    }
    writeln!(c, "  {{")?;
    writeln!(c, "    float _dx = od->position_orientation.position_x[new_idx] - od->position_orientation.position_x[{t}];")?;
    writeln!(c, "    float _dy = od->position_orientation.position_y[new_idx] - od->position_orientation.position_y[{t}];")?;
    writeln!(c, "    float _dist = sqrtf(_dx * _dx + _dy * _dy);")?;
    writeln!(c, "    float _rnx = _dx / _dist;")?;
    writeln!(c, "    float _rny = _dy / _dist;")?;
    writeln!(c)?;
    writeln!(c, "    // Relative acceleration of orbiter w.r.t. orbit center (tidal frame)")?;
    writeln!(c, "    float _arx = 0.0f, _ary = 0.0f;")?;
    writeln!(c, "    for (uint32_t _k = 0; _k < od->active; _k++) {{")?;
    writeln!(c, "      if (_k == (uint32_t)new_idx) continue;")?;
    writeln!(c)?;
    writeln!(c, "      // Gravity on orbiter from body _k")?;
    writeln!(c, "      float _ox = od->position_orientation.position_x[_k] - od->position_orientation.position_x[new_idx];")?;
    writeln!(c, "      float _oy = od->position_orientation.position_y[_k] - od->position_orientation.position_y[new_idx];")?;
    writeln!(c, "      float _od2 = _ox * _ox + _oy * _oy;")?;
    writeln!(c, "      if (_od2 < 1.0f) continue;")?;
    writeln!(c, "      float _od1 = sqrtf(_od2);")?;
    writeln!(c, "      float _gm = 6.67430f * od->mass[_k] / (_od2 * _od1);")?;
    writeln!(c, "      _arx += _gm * _ox;")?;
    writeln!(c, "      _ary += _gm * _oy;")?;
    writeln!(c)?;
    writeln!(c, "      // Subtract gravity on orbit center from same body (tidal correction)")?;
    writeln!(c, "      if (_k != (uint32_t){t}) {{")?;
    writeln!(c, "        float _cx = od->position_orientation.position_x[_k] - od->position_orientation.position_x[{t}];")?;
    writeln!(c, "        float _cy = od->position_orientation.position_y[_k] - od->position_orientation.position_y[{t}];")?;
    writeln!(c, "        float _cd2 = _cx * _cx + _cy * _cy;")?;
    writeln!(c, "        if (_cd2 >= 1.0f) {{")?;
    writeln!(c, "          float _cd1 = sqrtf(_cd2);")?;
    writeln!(c, "          float _gmc = 6.67430f * od->mass[_k] / (_cd2 * _cd1);")?;
    writeln!(c, "          _arx -= _gmc * _cx;")?;
    writeln!(c, "          _ary -= _gmc * _cy;")?;
    writeln!(c, "        }}")?;
    writeln!(c, "      }}")?;
    writeln!(c, "    }}")?;
    writeln!(c)?;
    writeln!(c, "    // Centripetal component (toward orbit center)")?;
    writeln!(c, "    float _a_cent = -(_arx * _rnx + _ary * _rny);")?;
    writeln!(c, "    float _v = _a_cent > 0.0f ? sqrtf(_a_cent * _dist) : 0.0f;")?;
    writeln!(c, "    od->velocity_x[new_idx] = -_rny * _v + od->velocity_x[{t}];")?;
    writeln!(c, "    od->velocity_y[new_idx] = _rnx * _v + od->velocity_y[{t}];")?;
    writeln!(c, "  }}")
}
