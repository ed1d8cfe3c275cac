use crate::resolve::push_unique;
use crate::Record;
use std::sync::Arc;
use stellar_geometry::Model;
use stellar_ids::SpawnId;

/// Output of one world file: resolved records in spawn order (index = spawn id).
#[derive(Clone, Debug, Default)]
pub struct World {
    pub name: String,
    pub entities: Vec<Record>,
    pub controlled: Option<SpawnId>,
    /// Models forced into the emitted set by `require_model`.
    pub required_models: Vec<Arc<Model>>,
}

impl World {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Every model this world needs emitted, first-seen order.
    pub fn models(&self) -> Vec<Arc<Model>> {
        let mut out = Vec::new();
        for entity in &self.entities {
            for model in entity.all_referenced_models() {
                push_unique(&mut out, &model);
            }
        }
        for model in &self.required_models {
            push_unique(&mut out, model);
        }
        out
    }

    pub fn is_controlled(&self, record: &Record) -> bool {
        self.controlled.is_some() && record.spawn_id() == self.controlled
    }
}
