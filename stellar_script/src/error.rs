use std::path::{Path, PathBuf};
use std::sync::Arc;
use stellar_data::DataError;
use stellar_geometry::GeometryError;
use thiserror::Error;

/// Everything that can abort a script run. Host errors raised inside Lua
/// callbacks travel as external errors and come back out as their own variant.
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("failed to load {}: {message}", path.display())]
    ScriptLoad { path: PathBuf, message: String },

    #[error("script error in {}: {message}", path.display())]
    ScriptRuntime { path: PathBuf, message: String },

    #[error("{0}")]
    Argument(String),

    #[error("{}: {source}", path.display())]
    Data {
        path: PathBuf,
        #[source]
        source: DataError,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl ScriptError {
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(source),
            }
        }
    }

    pub fn data(path: &Path, source: DataError) -> Self {
        Self::Data {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The data error behind this failure, if any.
    pub fn data_error(&self) -> Option<&DataError> {
        match self {
            Self::Data { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Maps an interpreter failure for the chunk at `path`, recovering host
    /// errors that were raised from inside callbacks.
    pub fn from_lua(path: &Path, err: mlua::Error) -> Self {
        if let Some(host) = find_host_error(&err) {
            return host;
        }
        match err {
            mlua::Error::SyntaxError { message, .. } => Self::ScriptLoad {
                path: path.to_path_buf(),
                message,
            },
            mlua::Error::RuntimeError(message) => Self::ScriptRuntime {
                path: path.to_path_buf(),
                message,
            },
            other => Self::ScriptRuntime {
                path: path.to_path_buf(),
                message: other.to_string(),
            },
        }
    }
}

fn find_host_error(err: &mlua::Error) -> Option<ScriptError> {
    match err {
        mlua::Error::ExternalError(inner) => inner.downcast_ref::<ScriptError>().cloned(),
        mlua::Error::CallbackError { cause, .. } => find_host_error(cause),
        mlua::Error::WithContext { cause, .. } => find_host_error(cause),
        _ => None,
    }
}

/// Wraps a host error for the trip through the interpreter.
pub(crate) fn raise(err: ScriptError) -> mlua::Error {
    mlua::Error::external(err)
}
