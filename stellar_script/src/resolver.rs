use crate::ScriptError;
use crate::arena::Library;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use stellar_data::{DataError, Record, ResolveContext, World};
use stellar_geometry::Model;
use stellar_ids::{ArenaHandle, ModelHandle, SpawnId, TemplateHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverState {
    Init,
    Spawning,
    Finalized,
}

/// Per-world spawn bookkeeping. Spawn ids are keyed by template origin, so a
/// spawned copy and the template it came from answer the same way.
#[derive(Debug)]
pub struct WorldResolver {
    name: String,
    path: PathBuf,
    state: ResolverState,
    entities: Vec<Record>,
    spawned: FxHashMap<TemplateHandle, SpawnId>,
    controlled: Option<SpawnId>,
    required_models: Vec<ModelHandle>,
}

struct LibraryContext<'a> {
    library: &'a Library,
    spawned: &'a FxHashMap<TemplateHandle, SpawnId>,
}

impl ResolveContext for LibraryContext<'_> {
    fn model(&self, handle: ModelHandle) -> Result<Arc<Model>, DataError> {
        self.library.model(handle).cloned()
    }

    fn template(&self, handle: TemplateHandle) -> Result<Record, DataError> {
        Ok(self.library.template(handle)?.record.clone())
    }

    fn spawn_id_of(&self, handle: TemplateHandle) -> Option<SpawnId> {
        let origin = self.library.template(handle).ok()?.origin;
        self.spawned.get(&origin).copied()
    }
}

impl WorldResolver {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            state: ResolverState::Init,
            entities: Vec::new(),
            spawned: FxHashMap::default(),
            controlled: None,
            required_models: Vec::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn spawned_count(&self) -> usize {
        self.entities.len()
    }

    fn data(&self, err: DataError) -> ScriptError {
        ScriptError::data(&self.path, err)
    }

    fn ensure_open(&self) -> Result<(), ScriptError> {
        if self.state == ResolverState::Finalized {
            return Err(ScriptError::Argument(format!(
                "world `{}` is already finalized",
                self.name
            )));
        }
        Ok(())
    }

    /// Resolves `handle`, appends it under the next spawn id and stores the
    /// resolved record in the library. Returns the handle of that record.
    pub fn spawn(
        &mut self,
        library: &mut Library,
        handle: TemplateHandle,
    ) -> Result<TemplateHandle, ScriptError> {
        self.ensure_open()?;
        self.state = ResolverState::Spawning;

        let template = library.template(handle).map_err(|e| self.data(e))?;
        let origin = template.origin;
        let record = template.record.clone();

        let ctx = LibraryContext {
            library: &*library,
            spawned: &self.spawned,
        };
        let mut resolved = record.resolve_models(&ctx).map_err(|e| self.data(e))?;

        let spawn_id = SpawnId::next_for_len(self.entities.len()).ok_or_else(|| {
            self.data(DataError::IndexOutOfRange {
                arena: SpawnId::LABEL,
                index: u32::MAX,
                len: self.entities.len(),
            })
        })?;
        resolved.base.spawn_id = Some(spawn_id);

        let resolved_handle = library
            .add_spawned(resolved.clone(), origin)
            .map_err(|e| self.data(e))?;
        self.spawned.insert(origin, spawn_id);
        self.entities.push(resolved);

        log::debug!("[{}] spawned {} as {}", self.name, handle, spawn_id);
        Ok(resolved_handle)
    }

    /// Marks the spawned entity behind `handle` as player-controlled.
    pub fn control(&mut self, library: &Library, handle: TemplateHandle) -> Result<(), ScriptError> {
        self.ensure_open()?;
        let template = library.template(handle).map_err(|e| self.data(e))?;
        let spawn_id = template
            .record
            .spawn_id()
            .or_else(|| self.spawned.get(&template.origin).copied())
            .ok_or_else(|| {
                let ctx = LibraryContext {
                    library,
                    spawned: &self.spawned,
                };
                self.data(DataError::MissingSpawnId {
                    handle: ctx.describe(handle),
                })
            })?;
        if let Some(previous) = self.controlled.replace(spawn_id) {
            log::warn!(
                "[{}] control moved from {} to {}",
                self.name,
                previous,
                spawn_id
            );
        }
        Ok(())
    }

    pub fn require_model(&mut self, handle: ModelHandle) -> Result<(), ScriptError> {
        self.ensure_open()?;
        if !self.required_models.contains(&handle) {
            self.required_models.push(handle);
        }
        Ok(())
    }

    /// Closes the world and hands out its spawn list.
    pub fn finalize(&mut self, library: &Library) -> Result<World, ScriptError> {
        self.ensure_open()?;
        self.state = ResolverState::Finalized;

        let required_models = self
            .required_models
            .iter()
            .map(|&h| library.model(h).cloned())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.data(e))?;

        if self.entities.is_empty() {
            log::warn!("[{}] world spawns nothing", self.name);
        }

        Ok(World {
            name: self.name.clone(),
            entities: std::mem::take(&mut self.entities),
            controlled: self.controlled,
            required_models,
        })
    }
}
