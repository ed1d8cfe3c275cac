mod scan;

pub use scan::files_with_extension;

use serde::Deserialize;
use std::{
    fmt::{Display, Formatter},
    fs,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE: &str = "stellar.toml";
pub const WORLDS_DIR: &str = "worlds";
pub const WORLD_EXT: &str = "lua";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Holds `entities/`, `parts/` and `worlds/`.
    pub data: String,
    pub models: String,
    pub surfaces: String,
    /// Optional; a missing file is skipped.
    pub prelude: String,
    pub header: String,
    pub source: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data: "data".to_string(),
            models: "data/models".to_string(),
            surfaces: "data/surfaces".to_string(),
            prelude: "data/prelude.lua".to_string(),
            header: "engine/generated/renderer.gen.h".to_string(),
            source: "engine/generated/models.gen.c".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub paths: PathsConfig,
}

/// Config paths resolved against the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub data: PathBuf,
    pub models: PathBuf,
    pub surfaces: PathBuf,
    pub prelude: PathBuf,
    pub header: PathBuf,
    pub source: PathBuf,
}

impl ProjectPaths {
    pub fn worlds_dir(&self) -> PathBuf {
        self.data.join(WORLDS_DIR)
    }
}

#[derive(Debug)]
pub enum ProjectError {
    Io(std::io::Error),
    ParseToml(toml::de::Error),
    InvalidField(&'static str, String),
    MissingDir(PathBuf),
    NoWorlds(PathBuf),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::ParseToml(err) => write!(f, "{err}"),
            Self::InvalidField(field, reason) => write!(f, "invalid field `{field}`: {reason}"),
            Self::MissingDir(path) => write!(f, "directory not found: {}", path.display()),
            Self::NoWorlds(path) => write!(f, "no world files found in {}", path.display()),
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ProjectError {
    fn from(value: toml::de::Error) -> Self {
        Self::ParseToml(value)
    }
}

impl ProjectConfig {
    pub fn parse(text: &str) -> Result<Self, ProjectError> {
        let config: ProjectConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ProjectError> {
        let p = &self.paths;
        for (field, value) in [
            ("paths.data", &p.data),
            ("paths.models", &p.models),
            ("paths.surfaces", &p.surfaces),
            ("paths.header", &p.header),
            ("paths.source", &p.source),
        ] {
            if value.trim().is_empty() {
                return Err(ProjectError::InvalidField(field, "must not be empty".into()));
            }
        }
        if p.header == p.source {
            return Err(ProjectError::InvalidField(
                "paths.source",
                "must differ from paths.header".into(),
            ));
        }
        Ok(())
    }

    /// Resolves every configured path against `root`.
    pub fn resolve(&self, root: &Path) -> ProjectPaths {
        let p = &self.paths;
        ProjectPaths {
            root: root.to_path_buf(),
            data: resolve_path(&p.data, root),
            models: resolve_path(&p.models, root),
            surfaces: resolve_path(&p.surfaces, root),
            prelude: resolve_path(&p.prelude, root),
            header: resolve_path(&p.header, root),
            source: resolve_path(&p.source, root),
        }
    }
}

/// Relative paths are taken from `root`; absolute paths are kept.
pub fn resolve_path(input: &str, root: &Path) -> PathBuf {
    let path = Path::new(input);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Reads `path`, or returns the defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ProjectError> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(ProjectConfig::default());
    }
    let text = fs::read_to_string(path)?;
    ProjectConfig::parse(&text)
}

/// Every `<data>/worlds/**/*.lua`, sorted by relative path.
pub fn discover_worlds(paths: &ProjectPaths) -> Result<Vec<PathBuf>, ProjectError> {
    let dir = paths.worlds_dir();
    if !dir.is_dir() {
        return Err(ProjectError::MissingDir(dir));
    }
    let worlds = scan::files_with_extension(&dir, WORLD_EXT)?;
    if worlds.is_empty() {
        return Err(ProjectError::NoWorlds(dir));
    }
    log::debug!("found {} world files in {}", worlds.len(), dir.display());
    Ok(worlds)
}

pub fn default_stellar_toml() -> String {
    let p = PathsConfig::default();
    format!(
        r#"[paths]
data = "{}"
models = "{}"
surfaces = "{}"
prelude = "{}"
header = "{}"
source = "{}"
"#,
        p.data, p.models, p.surfaces, p.prelude, p.header, p.source
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------- Config --------------------

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(ProjectConfig::parse("").unwrap(), ProjectConfig::default());
    }

    #[test]
    fn default_toml_round_trips() {
        assert_eq!(
            ProjectConfig::parse(&default_stellar_toml()).unwrap(),
            ProjectConfig::default()
        );
    }

    #[test]
    fn partial_paths_keep_other_defaults() {
        let config = ProjectConfig::parse("[paths]\nmodels = \"art/models\"\n").unwrap();
        assert_eq!(config.paths.models, "art/models");
        assert_eq!(config.paths.data, "data");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ProjectConfig::parse("[paths]\nmodel = \"x\"\n").unwrap_err();
        assert!(matches!(err, ProjectError::ParseToml(_)));
    }

    #[test]
    fn header_and_source_must_differ() {
        let err = ProjectConfig::parse("[paths]\nheader = \"out.c\"\nsource = \"out.c\"\n")
            .unwrap_err();
        assert!(matches!(err, ProjectError::InvalidField("paths.source", _)));
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let root = Path::new("/game");
        let paths = ProjectConfig::default().resolve(root);
        assert_eq!(paths.data, PathBuf::from("/game/data"));
        assert_eq!(paths.worlds_dir(), PathBuf::from("/game/data/worlds"));
        assert_eq!(
            paths.header,
            PathBuf::from("/game/engine/generated/renderer.gen.h")
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        let abs = std::env::temp_dir().join("models");
        let resolved = resolve_path(abs.to_str().unwrap(), Path::new("relative-root"));
        assert_eq!(resolved, abs);
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    // -------------------- Discovery --------------------

    #[test]
    fn worlds_are_found_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectConfig::default().resolve(dir.path());
        let worlds = paths.worlds_dir();
        fs::create_dir_all(worlds.join("b")).unwrap();
        fs::write(worlds.join("z.lua"), "").unwrap();
        fs::write(worlds.join("b/a.lua"), "").unwrap();
        fs::write(worlds.join("a.lua"), "").unwrap();
        fs::write(worlds.join("notes.txt"), "").unwrap();

        let found: Vec<PathBuf> = discover_worlds(&paths)
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(&worlds).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![
                PathBuf::from("a.lua"),
                PathBuf::from("b/a.lua"),
                PathBuf::from("z.lua")
            ]
        );
    }

    #[test]
    fn extension_must_match_exactly() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested.lua")).unwrap();
        fs::write(dir.path().join("nested.lua/inner.lua"), "").unwrap();
        fs::write(dir.path().join("world.luac"), "").unwrap();
        fs::write(dir.path().join("lua"), "").unwrap();

        let found = files_with_extension(dir.path(), WORLD_EXT).unwrap();
        assert_eq!(found, vec![dir.path().join("nested.lua/inner.lua")]);
    }

    #[test]
    fn empty_worlds_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectConfig::default().resolve(dir.path());
        fs::create_dir_all(paths.worlds_dir()).unwrap();
        assert!(matches!(discover_worlds(&paths), Err(ProjectError::NoWorlds(_))));
    }

    #[test]
    fn missing_worlds_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectConfig::default().resolve(dir.path());
        assert!(matches!(discover_worlds(&paths), Err(ProjectError::MissingDir(_))));
    }
}
