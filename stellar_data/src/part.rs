use crate::emit::c_float;
use crate::record::ModelRef;
use std::fmt::{self, Write};

pub const DEFAULT_ENGINE_POWER: i64 = 100;
pub const DEFAULT_WEAPON_TYPE: &str = "WEAPON_TYPE_LASER";
pub const DEFAULT_COOLDOWN_TICKS: i64 = 60;
pub const DEFAULT_PROJECTILE_SPEED: f64 = 200.0;
pub const DEFAULT_MAX_RANGE: f64 = 300.0;
pub const DEFAULT_RADAR_RANGE: f64 = 500.0;

/// Model index written for "no model".
pub const NO_MODEL: &str = "0xFFFF";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnginePartData {
    pub particle_model: Option<ModelRef>,
    /// Hundredths; emitted divided by 100.
    pub power: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeaponPartData {
    pub weapon_type: Option<String>,
    pub cooldown_ticks: Option<i64>,
    pub projectile_model: Option<ModelRef>,
    pub smoke_model: Option<ModelRef>,
    pub projectile_speed: Option<f64>,
    pub rocket_thrust: Option<f64>,
    pub rocket_fuel_ticks: Option<i64>,
    pub rocket_lifetime_ticks: Option<i64>,
    pub max_range: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RadarPartData {
    pub range: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PartData {
    Engine(EnginePartData),
    Weapon(WeaponPartData),
    Radar(RadarPartData),
}

fn model_index(model: &Option<ModelRef>) -> String {
    model
        .as_ref()
        .and_then(|m| m.model.as_ref())
        .map(|m| m.constant_name())
        .unwrap_or_else(|| NO_MODEL.to_string())
}

impl PartData {
    pub const fn struct_name(&self) -> &'static str {
        match self {
            PartData::Engine(_) => "engine_data",
            PartData::Weapon(_) => "weapon_data",
            PartData::Radar(_) => "radar_data",
        }
    }

    /// Part models, for emission dedup.
    pub fn model_refs(&self) -> Vec<&ModelRef> {
        match self {
            PartData::Engine(engine) => engine.particle_model.iter().collect(),
            PartData::Weapon(weapon) => weapon
                .projectile_model
                .iter()
                .chain(weapon.smoke_model.iter())
                .collect(),
            PartData::Radar(_) => Vec::new(),
        }
    }

    pub(crate) fn model_refs_mut(&mut self) -> Vec<&mut ModelRef> {
        match self {
            PartData::Engine(engine) => engine.particle_model.iter_mut().collect(),
            PartData::Weapon(weapon) => weapon
                .projectile_model
                .iter_mut()
                .chain(weapon.smoke_model.iter_mut())
                .collect(),
            PartData::Radar(_) => Vec::new(),
        }
    }

    /// Writes the payload initializer for the union storage at `access`,
    /// filling unset fields with their defaults.
    pub fn emit_part_data(&self, out: &mut String, access: &str) -> fmt::Result {
        let ty = self.struct_name();
        writeln!(out, "  {{")?;
        writeln!(out, "    struct {ty}* _data = (struct {ty}*)({access});")?;
        match self {
            PartData::Engine(engine) => {
                let power = engine.power.unwrap_or(DEFAULT_ENGINE_POWER) as f64 / 100.0;
                writeln!(out, "    _data->power = {};", c_float(power))?;
                writeln!(
                    out,
                    "    _data->particle_model = {};",
                    model_index(&engine.particle_model)
                )?;
            }
            PartData::Weapon(weapon) => {
                writeln!(
                    out,
                    "    _data->weapon_type = {};",
                    weapon.weapon_type.as_deref().unwrap_or(DEFAULT_WEAPON_TYPE)
                )?;
                writeln!(
                    out,
                    "    _data->cooldown_ticks = {};",
                    weapon.cooldown_ticks.unwrap_or(DEFAULT_COOLDOWN_TICKS)
                )?;
                writeln!(
                    out,
                    "    _data->projectile_model = {};",
                    model_index(&weapon.projectile_model)
                )?;
                writeln!(out, "    _data->smoke_model = {};", model_index(&weapon.smoke_model))?;
                writeln!(
                    out,
                    "    _data->projectile_speed = {};",
                    c_float(weapon.projectile_speed.unwrap_or(DEFAULT_PROJECTILE_SPEED))
                )?;
                writeln!(
                    out,
                    "    _data->rocket_thrust = {};",
                    c_float(weapon.rocket_thrust.unwrap_or(0.0))
                )?;
                writeln!(
                    out,
                    "    _data->rocket_fuel_ticks = {};",
                    weapon.rocket_fuel_ticks.unwrap_or(0)
                )?;
                writeln!(
                    out,
                    "    _data->rocket_lifetime_ticks = {};",
                    weapon.rocket_lifetime_ticks.unwrap_or(0)
                )?;
                writeln!(
                    out,
                    "    _data->max_range = {};",
                    c_float(weapon.max_range.unwrap_or(DEFAULT_MAX_RANGE))
                )?;
            }
            PartData::Radar(radar) => {
                writeln!(
                    out,
                    "    _data->range = {};",
                    c_float(radar.range.unwrap_or(DEFAULT_RADAR_RANGE))
                )?;
            }
        }
        writeln!(out, "  }}")
    }
}
