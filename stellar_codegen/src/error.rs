use stellar_data::DataError;
use thiserror::Error;

/// Failures while turning resolved worlds into C tables.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("model `{model}`: vertex coordinate {value} does not fit int16")]
    VertexOutOfRange { model: String, value: f32 },

    #[error("model `{model}` has {count} vertices, more than a draw command can address")]
    TooManyVertices { model: String, count: usize },

    #[error("model `{model}` has radius {radius}, greater than 65535")]
    RadiusOutOfRange { model: String, radius: u32 },

    #[error("two different models map to the constant name `{name}`")]
    DuplicateModelName { name: String },

    #[error("two surfaces map to the constant name `{name}`")]
    DuplicateSurfaceName { name: String },

    #[error("two worlds map to the routine name `{name}`")]
    DuplicateWorldName { name: String },

    #[error("more distinct model colors than the palette can index")]
    ColorPaletteOverflow,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("formatting generated code failed")]
    Fmt(#[from] std::fmt::Error),
}
