use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stellar_data::{DataError, Record};
use stellar_geometry::{Model, SurfaceAsset};
use stellar_ids::{ArenaHandle, ModelHandle, SurfaceHandle, TemplateHandle};

/// Append-only store plus a canonical-path index. Handles stay valid for the
/// whole run.
#[derive(Debug)]
pub struct Arena<H, T> {
    items: Vec<T>,
    by_path: IndexMap<PathBuf, H>,
}

impl<H: ArenaHandle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_path: IndexMap::new(),
        }
    }
}

impl<H: ArenaHandle, T> Arena<H, T> {
    pub fn push(&mut self, item: T) -> Result<H, DataError> {
        let handle = H::next_for_len(self.items.len()).ok_or(DataError::IndexOutOfRange {
            arena: H::LABEL,
            index: u32::MAX,
            len: self.items.len(),
        })?;
        self.items.push(item);
        Ok(handle)
    }

    pub fn get(&self, handle: H) -> Result<&T, DataError> {
        self.items
            .get(handle.as_usize())
            .ok_or_else(|| DataError::IndexOutOfRange {
                arena: H::LABEL,
                index: handle.as_usize() as u32,
                len: self.items.len(),
            })
    }

    /// Records that `path` loaded into `handle`.
    pub fn alias(&mut self, path: PathBuf, handle: H) {
        self.by_path.insert(path, handle);
    }

    pub fn lookup(&self, path: &Path) -> Option<H> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Library entry. `origin` is the template a spawned copy was made from
/// (itself for authored templates), so a spawn is found from either handle.
#[derive(Clone, Debug)]
pub struct Template {
    pub record: Record,
    pub origin: TemplateHandle,
}

/// Session-wide arenas; survive every world of a run.
#[derive(Debug, Default)]
pub struct Library {
    pub models: Arena<ModelHandle, Arc<Model>>,
    pub templates: Arena<TemplateHandle, Template>,
    pub surfaces: Arena<SurfaceHandle, Arc<SurfaceAsset>>,
}

impl Library {
    pub fn model(&self, handle: ModelHandle) -> Result<&Arc<Model>, DataError> {
        self.models.get(handle)
    }

    pub fn template(&self, handle: TemplateHandle) -> Result<&Template, DataError> {
        self.templates.get(handle)
    }

    pub fn surface(&self, handle: SurfaceHandle) -> Result<&Arc<SurfaceAsset>, DataError> {
        self.surfaces.get(handle)
    }

    /// Stores a freshly authored template; it is its own origin.
    pub fn add_template(&mut self, record: Record) -> Result<TemplateHandle, DataError> {
        let handle = TemplateHandle::next_for_len(self.templates.len()).ok_or(
            DataError::IndexOutOfRange {
                arena: TemplateHandle::LABEL,
                index: u32::MAX,
                len: self.templates.len(),
            },
        )?;
        self.templates.push(Template {
            record,
            origin: handle,
        })
    }

    pub fn add_spawned(
        &mut self,
        record: Record,
        origin: TemplateHandle,
    ) -> Result<TemplateHandle, DataError> {
        self.templates.push(Template { record, origin })
    }
}
