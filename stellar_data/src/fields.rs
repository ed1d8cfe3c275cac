//! Per-variant field tables. A key is looked up in the variant's own table,
//! then its parent's, then the base table; a miss everywhere is an unknown field.

use crate::entity::{EntityData, EntityWithSlotsData};
use crate::part::{EnginePartData, PartData, RadarPartData, WeaponPartData};
use crate::record::{BaseData, ModelRef, Record, VariantData};
use crate::value::{
    FieldValue, Mismatch, RecordTag, integer, model, number, point, string, surface, template,
    uint16,
};
use crate::DataError;

type Setter<T> = fn(&mut T, &FieldValue) -> Result<(), Mismatch>;

static BASE_FIELDS: phf::Map<&'static str, Setter<BaseData>> = phf::phf_map! {
    "type" => |b: &mut BaseData, v: &FieldValue| -> Result<(), Mismatch> {
        b.type_name = Some(string(v)?);
        Ok(())
    },
    "model" => |b: &mut BaseData, v: &FieldValue| -> Result<(), Mismatch> {
        b.model = Some(ModelRef::new(model(v)?));
        Ok(())
    },
};

static ENTITY_FIELDS: phf::Map<&'static str, Setter<EntityData>> = phf::phf_map! {
    "mass" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.mass = Some(integer(v)?);
        Ok(())
    },
    "radius" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.radius = Some(uint16(v)?);
        Ok(())
    },
    "health" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.health = Some(integer(v)?);
        Ok(())
    },
    "position" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.position = Some(point(v)?);
        Ok(())
    },
    "velocity" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.velocity = Some(point(v)?);
        Ok(())
    },
    "rotation" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.rotation = Some(number(v)?);
        Ok(())
    },
    "orbit" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.orbit_target = Some(template(v, RecordTag::Entity)?);
        e.orbit_target_spawn_id = None;
        Ok(())
    },
    "surface" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.surface = Some(surface(v)?);
        Ok(())
    },
    "rotation_speed" => |e: &mut EntityData, v: &FieldValue| -> Result<(), Mismatch> {
        e.rotation_speed = Some(number(v)?);
        Ok(())
    },
};

static SLOTTED_FIELDS: phf::Map<&'static str, Setter<EntityWithSlotsData>> = phf::phf_map! {
    "slots" => |s: &mut EntityWithSlotsData, v: &FieldValue| -> Result<(), Mismatch> {
        let FieldValue::Table(entries) = v else {
            return Err(Mismatch::new("table of Part", v));
        };
        for (slot_name, child) in entries {
            let child = template(child, RecordTag::Part)?;
            s.bind(slot_name, child);
        }
        Ok(())
    },
};

static ENGINE_FIELDS: phf::Map<&'static str, Setter<EnginePartData>> = phf::phf_map! {
    "particle_model" => |p: &mut EnginePartData, v: &FieldValue| -> Result<(), Mismatch> {
        p.particle_model = Some(ModelRef::new(model(v)?));
        Ok(())
    },
    "power" => |p: &mut EnginePartData, v: &FieldValue| -> Result<(), Mismatch> {
        p.power = Some(integer(v)?);
        Ok(())
    },
};

static WEAPON_FIELDS: phf::Map<&'static str, Setter<WeaponPartData>> = phf::phf_map! {
    "weapon_type" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.weapon_type = Some(string(v)?);
        Ok(())
    },
    "cooldown" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.cooldown_ticks = Some(integer(v)?);
        Ok(())
    },
    "projectile_model" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.projectile_model = Some(ModelRef::new(model(v)?));
        Ok(())
    },
    "smoke_model" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.smoke_model = Some(ModelRef::new(model(v)?));
        Ok(())
    },
    "projectile_speed" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.projectile_speed = Some(number(v)?);
        Ok(())
    },
    "rocket_thrust" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.rocket_thrust = Some(number(v)?);
        Ok(())
    },
    "rocket_fuel" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.rocket_fuel_ticks = Some(integer(v)?);
        Ok(())
    },
    "rocket_lifetime" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.rocket_lifetime_ticks = Some(integer(v)?);
        Ok(())
    },
    "max_range" => |w: &mut WeaponPartData, v: &FieldValue| -> Result<(), Mismatch> {
        w.max_range = Some(number(v)?);
        Ok(())
    },
};

static RADAR_FIELDS: phf::Map<&'static str, Setter<RadarPartData>> = phf::phf_map! {
    "range" => |r: &mut RadarPartData, v: &FieldValue| -> Result<(), Mismatch> {
        r.range = Some(number(v)?);
        Ok(())
    },
};

fn lookup<T>(
    table: &phf::Map<&'static str, Setter<T>>,
    target: &mut T,
    key: &str,
    value: &FieldValue,
) -> Option<Result<(), Mismatch>> {
    table.get(key).map(|set| set(target, value))
}

pub(crate) fn apply(record: &mut Record, key: &str, value: &FieldValue) -> Result<(), DataError> {
    let type_tag = record.type_tag();

    let own = match &mut record.data {
        VariantData::Entity(entity) => lookup(&ENTITY_FIELDS, entity, key, value),
        VariantData::Slotted(slotted) => lookup(&SLOTTED_FIELDS, slotted, key, value)
            .or_else(|| lookup(&ENTITY_FIELDS, &mut slotted.entity, key, value)),
        VariantData::Part(PartData::Engine(engine)) => lookup(&ENGINE_FIELDS, engine, key, value),
        VariantData::Part(PartData::Weapon(weapon)) => lookup(&WEAPON_FIELDS, weapon, key, value),
        VariantData::Part(PartData::Radar(radar)) => lookup(&RADAR_FIELDS, radar, key, value),
    };

    let result = match own {
        Some(result) => result,
        None => lookup(&BASE_FIELDS, &mut record.base, key, value).ok_or_else(|| {
            DataError::UnknownField {
                field: key.to_string(),
                type_tag,
            }
        })?,
    };

    result.map_err(|m| DataError::TypeMismatch {
        field: key.to_string(),
        type_tag,
        expected: m.expected,
        found: m.found,
    })
}
