use crate::Record;
use stellar_geometry::Point;
use stellar_ids::{SpawnId, SurfaceHandle, TemplateHandle};

pub const DEFAULT_HEALTH: i64 = 1000;
pub const DEFAULT_MASS: i64 = 0;
pub const DEFAULT_ROTATION_SPEED: f64 = 0.001;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityData {
    pub mass: Option<i64>,
    /// Explicit collision radius; the model radius is used when unset.
    pub radius: Option<i64>,
    pub health: Option<i64>,
    pub position: Option<Point>,
    pub velocity: Option<Point>,
    /// Radians.
    pub rotation: Option<f64>,
    /// Library handle of the body to orbit.
    pub orbit_target: Option<TemplateHandle>,
    /// Filled in by resolution from the world's spawn table.
    pub orbit_target_spawn_id: Option<SpawnId>,
    pub surface: Option<SurfaceHandle>,
    pub rotation_speed: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SlotBinding {
    /// Slot name as authored.
    pub slot_name: String,
    /// Index into the owning model's slots, set by resolution.
    pub slot_ref: Option<usize>,
    pub child: TemplateHandle,
    pub resolved_child: Option<Box<Record>>,
}

impl SlotBinding {
    pub fn new(slot_name: impl Into<String>, child: TemplateHandle) -> Self {
        Self {
            slot_name: slot_name.into(),
            slot_ref: None,
            child,
            resolved_child: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityWithSlotsData {
    pub entity: EntityData,
    pub slots: Vec<SlotBinding>,
}

impl EntityWithSlotsData {
    /// Rebinds `slot_name`, keeping bindings for other slots.
    pub fn bind(&mut self, slot_name: &str, child: TemplateHandle) {
        match self.slots.iter_mut().find(|b| b.slot_name == slot_name) {
            Some(binding) => *binding = SlotBinding::new(slot_name, child),
            None => self.slots.push(SlotBinding::new(slot_name, child)),
        }
    }
}
