use std::{
    fmt::{Display, Formatter},
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use stellar_codegen::{CodegenError, GeneratedArtifacts};
use stellar_data::World;
use stellar_project::{ProjectConfig, ProjectError, ProjectPaths};
use stellar_script::{CompilationSession, ScriptError, SessionPaths};

#[derive(Debug)]
pub enum CompilerError {
    Io(PathBuf, std::io::Error),
    Project(ProjectError),
    Script(ScriptError),
    Codegen(CodegenError),
}

impl Display for CompilerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, err) => write!(f, "{}: {err}", path.display()),
            Self::Project(err) => write!(f, "{err}"),
            Self::Script(err) => write!(f, "{err}"),
            Self::Codegen(err) => write!(f, "code generation failed: {err}"),
        }
    }
}

impl std::error::Error for CompilerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, err) => Some(err),
            Self::Project(err) => Some(err),
            Self::Script(err) => Some(err),
            Self::Codegen(err) => Some(err),
        }
    }
}

impl From<ProjectError> for CompilerError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}

impl From<ScriptError> for CompilerError {
    fn from(value: ScriptError) -> Self {
        Self::Script(value)
    }
}

impl From<CodegenError> for CompilerError {
    fn from(value: CodegenError) -> Self {
        Self::Codegen(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSummary {
    pub worlds: usize,
    pub entities: usize,
    pub models: usize,
    pub surfaces: usize,
    pub header: PathBuf,
    pub source: PathBuf,
}

impl Display for CompileSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} worlds, {} entities, {} models, {} surfaces",
            self.worlds, self.entities, self.models, self.surfaces
        )
    }
}

pub fn session_paths(paths: &ProjectPaths) -> SessionPaths {
    SessionPaths {
        data_dir: paths.data.clone(),
        models_dir: paths.models.clone(),
        surfaces_dir: paths.surfaces.clone(),
        prelude: Some(paths.prelude.clone()),
    }
}

/// Compiles every world in order; the first failure stops the run.
pub fn compile_worlds(
    session: &CompilationSession,
    world_files: &[PathBuf],
) -> Result<Vec<World>, CompilerError> {
    world_files
        .iter()
        .map(|path| session.compile_world(path).map_err(CompilerError::from))
        .collect()
}

/// Compiles and generates in memory; nothing is written.
pub fn build_artifacts(
    paths: &ProjectPaths,
) -> Result<(GeneratedArtifacts, CompileSummary), CompilerError> {
    let session = CompilationSession::new(session_paths(paths));
    let world_files = stellar_project::discover_worlds(paths)?;
    let worlds = compile_worlds(&session, &world_files)?;

    let models = stellar_codegen::emitted_models(&worlds);
    let surfaces = session.surfaces();
    let artifacts = stellar_codegen::generate(&models, &surfaces, &worlds)?;

    let summary = CompileSummary {
        worlds: worlds.len(),
        entities: worlds.iter().map(|w| w.entities.len()).sum(),
        models: models.len(),
        surfaces: surfaces.len(),
        header: paths.header.clone(),
        source: paths.source.clone(),
    };
    Ok((artifacts, summary))
}

/// Full run: compile, generate, then write both artifacts.
pub fn compile_project(
    root: &Path,
    config: &ProjectConfig,
) -> Result<CompileSummary, CompilerError> {
    let paths = config.resolve(root);
    let (artifacts, summary) = build_artifacts(&paths)?;
    write_artifacts(&artifacts, &paths.header, &paths.source)?;
    log::info!("wrote {}", paths.header.display());
    log::info!("wrote {}", paths.source.display());
    Ok(summary)
}

/// Writes both files next to their targets first, then renames them into
/// place. A failure at any step leaves the previous pair of outputs in place.
pub fn write_artifacts(
    artifacts: &GeneratedArtifacts,
    header: &Path,
    source: &Path,
) -> Result<(), CompilerError> {
    let staged_header = write_staged(header, &artifacts.header)?;
    let staged_source = match write_staged(source, &artifacts.source) {
        Ok(staged) => staged,
        Err(err) => {
            discard(&staged_header);
            return Err(err);
        }
    };

    let previous_header = match set_aside(header) {
        Ok(previous) => previous,
        Err(err) => {
            discard(&staged_header);
            discard(&staged_source);
            return Err(err);
        }
    };
    if let Err(err) = commit(&staged_header, header) {
        discard(&staged_header);
        discard(&staged_source);
        restore(previous_header.as_deref(), header);
        return Err(err);
    }
    if let Err(err) = commit(&staged_source, source) {
        discard(&staged_source);
        restore(previous_header.as_deref(), header);
        return Err(err);
    }
    if let Some(previous) = previous_header {
        discard(&previous);
    }
    Ok(())
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn write_staged(target: &Path, text: &str) -> Result<PathBuf, CompilerError> {
    let io = |e| CompilerError::Io(target.to_path_buf(), e);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io)?;
    }
    let staged = sibling(target, ".tmp");
    let file = fs::File::create(&staged).map_err(io)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(text.as_bytes()).map_err(io)?;
    writer.flush().map_err(io)?;
    Ok(staged)
}

/// Moves an existing output to `<target>.bak` and returns where it went.
fn set_aside(target: &Path) -> Result<Option<PathBuf>, CompilerError> {
    if !target.exists() {
        return Ok(None);
    }
    let backup = sibling(target, ".bak");
    fs::rename(target, &backup).map_err(|e| CompilerError::Io(target.to_path_buf(), e))?;
    Ok(Some(backup))
}

fn commit(staged: &Path, target: &Path) -> Result<(), CompilerError> {
    fs::rename(staged, target).map_err(|e| CompilerError::Io(target.to_path_buf(), e))
}

/// Puts the previous output back, or removes the new one if there was none.
fn restore(previous: Option<&Path>, target: &Path) {
    let result = match previous {
        Some(previous) => fs::rename(previous, target),
        None if target.exists() => fs::remove_file(target),
        None => Ok(()),
    };
    if let Err(err) = result {
        log::warn!("failed to restore {}: {err}", target.display());
    }
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        log::warn!("failed to remove {}: {err}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROCK_MODEL: &str = r#"{
        "center": [0, 0],
        "strips": [{ "points": [[-8, -8], [8, -8], [8, 8], [-8, 8]], "closed": true, "class": "hull" }]
    }"#;

    const SHIP_MODEL: &str = r##"{
        "center": [0, 0],
        "strips": [{ "points": [[-6, -6], [6, -6], [0, 9]], "closed": true, "class": "hull",
                     "color": "#40c0ff" }],
        "slots": [{ "name": "engine", "position": [0, -6] }]
    }"##;

    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "data/models/rock.json", ROCK_MODEL);
        write(&dir, "data/models/ship.json", SHIP_MODEL);
        dir
    }

    fn write(dir: &TempDir, rel: &str, contents: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    // -------------------- Full run --------------------

    #[test]
    fn compiles_project_and_writes_artifacts() {
        let dir = project();
        write(
            &dir,
            "data/prelude.lua",
            r#"function Rock(t) return entities.rock(t) end"#,
        );
        write(
            &dir,
            "data/entities/rock.lua",
            r#"return Entity { type = "ENTITY_TYPEREF_ASTEROID", model = models.rock, mass = 100 }"#,
        );
        write(
            &dir,
            "data/parts/thruster.lua",
            r#"return Part { kind = "engine", type = "PART_TYPEREF_ENGINE", model = models.rock }"#,
        );
        write(
            &dir,
            "data/worlds/belt.lua",
            r#"
            spawn(Rock { position = vec(10, 0) })
            local ship = spawn(Entity { kind = "slotted", type = "ENTITY_TYPEREF_SHIP",
                                        model = models.ship, slots = { engine = parts.thruster } })
            control(ship)
            "#,
        );
        write(
            &dir,
            "data/worlds/empty_field.lua",
            r#"spawn(entities.rock)"#,
        );

        let summary = compile_project(dir.path(), &ProjectConfig::default()).unwrap();
        assert_eq!(summary.worlds, 2);
        assert_eq!(summary.entities, 3);
        assert_eq!(summary.models, 2);
        assert_eq!(summary.surfaces, 0);

        let header = fs::read_to_string(&summary.header).unwrap();
        let source = fs::read_to_string(&summary.source).unwrap();
        assert!(header.contains("#define MODEL_ROCK_IDX    ((uint16_t)0)"));
        assert!(header.contains("#define MODEL_SHIP_IDX    ((uint16_t)1)"));
        assert!(header.contains("#define WORLD_BELT_IDX ((uint16_t)0)"));
        assert!(header.contains("#define WORLD_EMPTY_FIELD_IDX ((uint16_t)1)"));

        assert!(source.contains("static void _world_belt("));
        assert!(source.contains("  od->position_orientation.position_x[new_idx] = 10.0f;"));
        assert!(source.contains("  od->position_orientation.radius[new_idx] = 12;"));
        assert!(source.contains("  od->mass[new_idx] = 100;"));
        assert!(source.contains("  pd->type[new_pidx] = PART_TYPEREF_ENGINE;"));
        assert!(source.contains(
            "  hud_set_entity(OBJECT_ID_WITH_TYPE(new_idx, ENTITY_TYPEREF_SHIP._));"
        ));
        assert!(!source.contains("_generated_get_surface(uint16_t index) {"));
    }

    #[test]
    fn failed_world_writes_nothing() {
        let dir = project();
        write(&dir, "data/worlds/broken.lua", r#"spawn(entities.missing)"#);

        let err = compile_project(dir.path(), &ProjectConfig::default()).unwrap_err();
        assert!(matches!(err, CompilerError::Script(ScriptError::FileNotFound { .. })));

        let paths = ProjectConfig::default().resolve(dir.path());
        assert!(!paths.header.exists());
        assert!(!paths.source.exists());
    }

    #[test]
    fn project_without_worlds_fails() {
        let dir = project();
        fs::create_dir_all(dir.path().join("data/worlds")).unwrap();
        let err = compile_project(dir.path(), &ProjectConfig::default()).unwrap_err();
        assert!(matches!(err, CompilerError::Project(ProjectError::NoWorlds(_))));
    }

    #[test]
    fn configured_output_paths_are_used() {
        let dir = project();
        write(&dir, "data/entities/rock.lua",
            r#"return Entity { type = "ENTITY_TYPEREF_ASTEROID", model = models.rock }"#);
        write(&dir, "data/worlds/solo.lua", "spawn(entities.rock)");
        let config =
            ProjectConfig::parse("[paths]\nheader = \"out/gen.h\"\nsource = \"out/gen.c\"\n").unwrap();

        let summary = compile_project(dir.path(), &config).unwrap();
        assert_eq!(summary.header, dir.path().join("out/gen.h"));
        assert!(dir.path().join("out/gen.c").is_file());
        assert!(!dir.path().join("out/gen.c.tmp").exists());
    }

    // -------------------- Artifact writing --------------------

    fn artifacts(header: &str, source: &str) -> GeneratedArtifacts {
        GeneratedArtifacts {
            header: header.to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn rewriting_replaces_both_outputs_and_leaves_no_side_files() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("gen/out.h");
        let source = dir.path().join("gen/out.c");
        write_artifacts(&artifacts("old h", "old c"), &header, &source).unwrap();
        write_artifacts(&artifacts("new h", "new c"), &header, &source).unwrap();

        assert_eq!(fs::read_to_string(&header).unwrap(), "new h");
        assert_eq!(fs::read_to_string(&source).unwrap(), "new c");
        let mut names: Vec<_> = fs::read_dir(dir.path().join("gen"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["out.c", "out.h"]);
    }

    #[test]
    fn failed_source_write_keeps_previous_header() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("out.h");
        fs::write(&header, "old h").unwrap();
        // a regular file where the source directory should be
        fs::write(dir.path().join("blocked"), "").unwrap();
        let source = dir.path().join("blocked/out.c");

        let err = write_artifacts(&artifacts("new h", "new c"), &header, &source).unwrap_err();
        assert!(matches!(err, CompilerError::Io(ref path, _) if path == &source));
        assert_eq!(fs::read_to_string(&header).unwrap(), "old h");
        assert!(!dir.path().join("out.h.tmp").exists());
        assert!(!dir.path().join("out.h.bak").exists());
    }

    #[test]
    fn restore_puts_previous_output_back() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("out.h");
        fs::write(&header, "old h").unwrap();
        let previous = set_aside(&header).unwrap().unwrap();
        fs::write(&header, "new h").unwrap();

        restore(Some(&previous), &header);
        assert_eq!(fs::read_to_string(&header).unwrap(), "old h");
        assert!(!previous.exists());
    }
}
