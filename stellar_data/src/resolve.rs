use crate::record::{ModelRef, Record, VariantData};
use crate::DataError;
use std::sync::Arc;
use stellar_geometry::Model;
use stellar_ids::{ModelHandle, SpawnId, TemplateHandle};

/// What resolution needs from the session: arena lookups and the current
/// world's spawn table. Template lookup and "was it spawned" stay separate
/// queries so spawn ordering can be checked on its own.
pub trait ResolveContext {
    fn model(&self, handle: ModelHandle) -> Result<Arc<Model>, DataError>;

    fn template(&self, handle: TemplateHandle) -> Result<Record, DataError>;

    /// Spawn id of the most recent spawn of `handle` in the current world.
    fn spawn_id_of(&self, handle: TemplateHandle) -> Option<SpawnId>;

    /// Human-readable description used in error messages.
    fn describe(&self, handle: TemplateHandle) -> String {
        match self.template(handle) {
            Ok(record) => match &record.base.type_name {
                Some(ty) => format!("{handle} ({ty})"),
                None => handle.to_string(),
            },
            Err(_) => handle.to_string(),
        }
    }
}

fn resolve_model_ref(slot: &mut ModelRef, ctx: &dyn ResolveContext) -> Result<(), DataError> {
    slot.model = Some(ctx.model(slot.handle)?);
    Ok(())
}

impl Record {
    /// Returns a copy with every model reference, orbit target and slot
    /// child resolved. Slot bindings end up sorted by slot index.
    pub fn resolve_models(&self, ctx: &dyn ResolveContext) -> Result<Record, DataError> {
        let mut resolved = self.clone();
        let type_tag = resolved.type_tag();

        if resolved.base.type_name.is_none() {
            return Err(DataError::MissingField {
                field: "type",
                type_tag,
            });
        }
        match resolved.base.model.as_mut() {
            Some(model) => resolve_model_ref(model, ctx)?,
            None => {
                return Err(DataError::MissingField {
                    field: "model",
                    type_tag,
                });
            }
        }
        let own_model = resolved.model().cloned();

        match &mut resolved.data {
            VariantData::Entity(entity) => {
                entity.orbit_target_spawn_id = resolve_orbit(entity.orbit_target, ctx)?;
            }
            VariantData::Slotted(slotted) => {
                slotted.entity.orbit_target_spawn_id =
                    resolve_orbit(slotted.entity.orbit_target, ctx)?;

                let model = own_model.ok_or(DataError::MissingField {
                    field: "model",
                    type_tag,
                })?;
                for binding in &mut slotted.slots {
                    let slot_ref = model.slot_index(&binding.slot_name).ok_or_else(|| {
                        DataError::MissingSlot {
                            model: model.file_name.clone(),
                            slot: binding.slot_name.clone(),
                        }
                    })?;
                    let child = ctx.template(binding.child)?.resolve_models(ctx)?;
                    binding.slot_ref = Some(slot_ref);
                    binding.resolved_child = Some(Box::new(child));
                }
                slotted.slots.sort_by_key(|b| b.slot_ref);
                if slotted.slots.is_empty() {
                    log::warn!(
                        "slotted {} has no slot bindings",
                        resolved.base.type_name.as_deref().unwrap_or("entity")
                    );
                }
            }
            VariantData::Part(part) => {
                for model in part.model_refs_mut() {
                    resolve_model_ref(model, ctx)?;
                }
            }
        }

        Ok(resolved)
    }

    /// Own model, part models and, for slotted entities, every child's
    /// models, in first-seen order without duplicates.
    pub fn all_referenced_models(&self) -> Vec<Arc<Model>> {
        let mut out: Vec<Arc<Model>> = Vec::new();
        self.collect_models(&mut out);
        out
    }

    fn collect_models(&self, out: &mut Vec<Arc<Model>>) {
        if let Some(model) = self.model() {
            push_unique(out, model);
        }
        match &self.data {
            VariantData::Part(part) => {
                for model in part.model_refs().into_iter().filter_map(|m| m.model.as_ref()) {
                    push_unique(out, model);
                }
            }
            VariantData::Slotted(slotted) => {
                for child in slotted.slots.iter().filter_map(|b| b.resolved_child.as_deref()) {
                    child.collect_models(out);
                }
            }
            VariantData::Entity(_) => {}
        }
    }
}

/// Appends `model` unless the same asset is already listed.
pub fn push_unique(out: &mut Vec<Arc<Model>>, model: &Arc<Model>) {
    if !out.iter().any(|seen| Arc::ptr_eq(seen, model)) {
        out.push(Arc::clone(model));
    }
}

fn resolve_orbit(
    target: Option<TemplateHandle>,
    ctx: &dyn ResolveContext,
) -> Result<Option<SpawnId>, DataError> {
    let Some(target) = target else {
        return Ok(None);
    };
    ctx.spawn_id_of(target)
        .map(Some)
        .ok_or_else(|| DataError::OrbitTargetNotSpawned {
            target: ctx.describe(target),
        })
}
