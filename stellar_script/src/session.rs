use crate::arena::Library;
use crate::bindings;
use crate::resolver::WorldResolver;
use crate::surface::LuaSurfaceProvider;
use crate::ScriptError;
use mlua::{Lua, Value};
use std::cell::{Ref, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use stellar_data::{FieldValue, Record, RecordTag, World};
use stellar_geometry::{GeometryProvider, JsonModelProvider, Model, SurfaceAsset, SurfaceProvider};
use stellar_ids::{ModelHandle, SurfaceHandle, TemplateHandle};

pub const ENTITIES_DIR: &str = "entities";
pub const PARTS_DIR: &str = "parts";
pub const MODEL_EXT: &str = "json";
pub const SCRIPT_EXT: &str = "lua";

/// Where cache tables look for their backing files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPaths {
    /// Holds `entities/` and `parts/`.
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub surfaces_dir: PathBuf,
    /// Run in every fresh host before the world file.
    pub prelude: Option<PathBuf>,
}

impl SessionPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            models_dir: data_dir.join("models"),
            surfaces_dir: data_dir.join("surfaces"),
            prelude: None,
            data_dir,
        }
    }
}

/// Kinds of lazily loaded assets reachable from the script globals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Entity,
    Part,
    Surface,
}

impl AssetKind {
    pub const fn global(self) -> &'static str {
        match self {
            AssetKind::Model => "models",
            AssetKind::Entity => "entities",
            AssetKind::Part => "parts",
            AssetKind::Surface => "surfaces",
        }
    }

    fn path(self, paths: &SessionPaths, name: &str) -> PathBuf {
        match self {
            AssetKind::Model => paths.models_dir.join(format!("{name}.{MODEL_EXT}")),
            AssetKind::Entity => paths.data_dir.join(ENTITIES_DIR).join(format!("{name}.{SCRIPT_EXT}")),
            AssetKind::Part => paths.data_dir.join(PARTS_DIR).join(format!("{name}.{SCRIPT_EXT}")),
            AssetKind::Surface => paths.surfaces_dir.join(format!("{name}.{SCRIPT_EXT}")),
        }
    }
}

pub(crate) struct Shared {
    paths: SessionPaths,
    geometry: Box<dyn GeometryProvider>,
    surfaces: Box<dyn SurfaceProvider>,
    library: RefCell<Library>,
    /// Files currently executing, innermost last.
    loading: RefCell<Vec<PathBuf>>,
}

/// One compiler run. Owns the library arenas, which every world of the run
/// shares; each world still gets a fresh Lua state.
pub struct CompilationSession {
    shared: Rc<Shared>,
}

impl CompilationSession {
    pub fn new(paths: SessionPaths) -> Self {
        Self::with_providers(paths, Box::new(JsonModelProvider), Box::new(LuaSurfaceProvider))
    }

    pub fn with_providers(
        paths: SessionPaths,
        geometry: Box<dyn GeometryProvider>,
        surfaces: Box<dyn SurfaceProvider>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                paths,
                geometry,
                surfaces,
                library: RefCell::new(Library::default()),
                loading: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.shared.paths
    }

    pub fn library(&self) -> Ref<'_, Library> {
        self.shared.library.borrow()
    }

    /// Every surface loaded so far; position equals the surface handle index.
    pub fn surfaces(&self) -> Vec<Arc<SurfaceAsset>> {
        self.library().surfaces.iter().cloned().collect()
    }

    /// Runs one world file to completion in a fresh host.
    pub fn compile_world(&self, path: &Path) -> Result<World, ScriptError> {
        let path = dunce::canonicalize(path).map_err(|e| ScriptError::from_io(path, e))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ScriptError::Argument(format!("bad world file name: {}", path.display())))?
            .to_string();

        log::info!("compiling world {name}");
        let resolver = Rc::new(RefCell::new(WorldResolver::new(name, &path)));
        let host = Host {
            shared: Rc::clone(&self.shared),
            world: Rc::clone(&resolver),
        };

        let lua = Lua::new();
        bindings::install(&lua, host.clone()).map_err(|e| ScriptError::from_lua(&path, e))?;

        match &self.shared.paths.prelude {
            Some(prelude) if prelude.is_file() => {
                host.run_file(&lua, prelude)?;
            }
            Some(prelude) => log::debug!("no prelude at {}", prelude.display()),
            None => {}
        }
        host.run_file(&lua, &path)?;
        drop(lua);

        let library = self.shared.library.borrow();
        let world = resolver.borrow_mut().finalize(&library)?;
        log::info!(
            "world {} spawns {} entities{}",
            world.name,
            world.entities.len(),
            if world.controlled.is_some() { ", one controlled" } else { "" }
        );
        Ok(world)
    }
}

/// What callbacks see: the session plus the world being compiled.
#[derive(Clone)]
pub(crate) struct Host {
    shared: Rc<Shared>,
    world: Rc<RefCell<WorldResolver>>,
}

impl Host {
    pub(crate) fn of(lua: &Lua) -> mlua::Result<Host> {
        lua.app_data_ref::<Host>()
            .map(|host| Host::clone(&host))
            .ok_or_else(|| mlua::Error::RuntimeError("script host is not installed".into()))
    }

    fn current_file(&self) -> PathBuf {
        self.shared
            .loading
            .borrow()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn data(&self, err: stellar_data::DataError) -> ScriptError {
        ScriptError::data(&self.current_file(), err)
    }

    pub(crate) fn run_file(&self, lua: &Lua, path: &Path) -> Result<Value, ScriptError> {
        let source = fs::read_to_string(path).map_err(|e| ScriptError::from_io(path, e))?;
        self.shared.loading.borrow_mut().push(path.to_path_buf());
        let result = lua
            .load(source.as_str())
            .set_name(format!("@{}", path.display()))
            .eval::<Value>();
        self.shared.loading.borrow_mut().pop();
        result.map_err(|e| ScriptError::from_lua(path, e))
    }

    fn canonical(&self, kind: AssetKind, name: &str) -> Result<PathBuf, ScriptError> {
        if name.is_empty() {
            return Err(ScriptError::Argument(format!(
                "empty name looked up in `{}`",
                kind.global()
            )));
        }
        let path = kind.path(&self.shared.paths, name);
        dunce::canonicalize(&path).map_err(|e| ScriptError::from_io(&path, e))
    }

    pub(crate) fn load_model(&self, name: &str) -> Result<ModelHandle, ScriptError> {
        let key = self.canonical(AssetKind::Model, name)?;
        if let Some(handle) = self.shared.library.borrow().models.lookup(&key) {
            return Ok(handle);
        }
        let model = self.shared.geometry.parse_source(&key)?;
        log::debug!("loaded model {} from {}", model.file_name, key.display());

        let mut library = self.shared.library.borrow_mut();
        let handle = library.models.push(Arc::new(model)).map_err(|e| self.data(e))?;
        library.models.alias(key, handle);
        Ok(handle)
    }

    pub(crate) fn load_surface(&self, name: &str) -> Result<SurfaceHandle, ScriptError> {
        let key = self.canonical(AssetKind::Surface, name)?;
        if let Some(handle) = self.shared.library.borrow().surfaces.lookup(&key) {
            return Ok(handle);
        }
        let surface = self.shared.surfaces.parse(&key)?;
        log::debug!(
            "loaded surface {} ({} polylines) from {}",
            surface.name,
            surface.polylines.len(),
            key.display()
        );

        let mut library = self.shared.library.borrow_mut();
        let handle = library.surfaces.push(Arc::new(surface)).map_err(|e| self.data(e))?;
        library.surfaces.alias(key, handle);
        Ok(handle)
    }

    /// Runs an entity or part file once per run; it must return one handle
    /// of the matching tag.
    pub(crate) fn load_template(
        &self,
        lua: &Lua,
        tag: RecordTag,
        name: &str,
    ) -> Result<TemplateHandle, ScriptError> {
        let kind = match tag {
            RecordTag::Entity => AssetKind::Entity,
            RecordTag::Part => AssetKind::Part,
        };
        let key = self.canonical(kind, name)?;
        if let Some(handle) = self.shared.library.borrow().templates.lookup(&key) {
            return Ok(handle);
        }
        if self.shared.loading.borrow().contains(&key) {
            return Err(ScriptError::ScriptRuntime {
                path: key,
                message: format!("`{}.{name}` refers to itself while loading", kind.global()),
            });
        }

        log::debug!("loading {} {}", tag.name(), key.display());
        let value = self.run_file(lua, &key)?;
        let handle = match bindings::handle_of(&value) {
            Some(crate::ScriptHandle::Template { handle, tag: found }) if found == tag => handle,
            _ => {
                return Err(ScriptError::Argument(format!(
                    "{} must return exactly one {} handle, got {}",
                    key.display(),
                    tag.name(),
                    bindings::describe_value(&value)
                )));
            }
        };
        self.shared.library.borrow_mut().templates.alias(key, handle);
        Ok(handle)
    }

    pub(crate) fn add_template(&self, record: Record) -> Result<TemplateHandle, ScriptError> {
        let handle = self.shared.library.borrow_mut().add_template(record);
        handle.map_err(|e| self.data(e))
    }

    pub(crate) fn extend(
        &self,
        handle: TemplateHandle,
        entries: Vec<(String, FieldValue)>,
    ) -> Result<TemplateHandle, ScriptError> {
        let extended = {
            let library = self.shared.library.borrow();
            let template = library.template(handle).map_err(|e| self.data(e))?;
            template.record.extend(entries).map_err(|e| self.data(e))?
        };
        self.add_template(extended)
    }

    pub(crate) fn spawn(&self, handle: TemplateHandle) -> Result<TemplateHandle, ScriptError> {
        let mut library = self.shared.library.borrow_mut();
        self.world.borrow_mut().spawn(&mut library, handle)
    }

    pub(crate) fn control(&self, handle: TemplateHandle) -> Result<(), ScriptError> {
        let library = self.shared.library.borrow();
        self.world.borrow_mut().control(&library, handle)
    }

    pub(crate) fn require_model(&self, handle: ModelHandle) -> Result<(), ScriptError> {
        self.world.borrow_mut().require_model(handle)
    }

    pub(crate) fn model(&self, handle: ModelHandle) -> Result<Arc<Model>, ScriptError> {
        let library = self.shared.library.borrow();
        library.model(handle).cloned().map_err(|e| self.data(e))
    }

    pub(crate) fn surface(&self, handle: SurfaceHandle) -> Result<Arc<SurfaceAsset>, ScriptError> {
        let library = self.shared.library.borrow();
        library.surface(handle).cloned().map_err(|e| self.data(e))
    }
}
