#![forbid(unsafe_code)]

pub mod emit;
pub mod entity;
pub mod error;
mod fields;
pub mod part;
pub mod record;
pub mod resolve;
pub mod value;
pub mod world;

pub use emit::c_float;
pub use entity::*;
pub use error::DataError;
pub use part::*;
pub use record::*;
pub use resolve::ResolveContext;
pub use value::{FieldValue, Mismatch, RecordTag, ScriptType};
pub use world::World;
