#![forbid(unsafe_code)]

pub mod arena;
mod bindings;
pub mod error;
pub mod resolver;
pub mod session;
pub mod surface;

pub use arena::{Arena, Library, Template};
pub use bindings::{ScriptHandle, ScriptPoint};
pub use error::ScriptError;
pub use resolver::{ResolverState, WorldResolver};
pub use session::{AssetKind, CompilationSession, SessionPaths};
pub use surface::LuaSurfaceProvider;
