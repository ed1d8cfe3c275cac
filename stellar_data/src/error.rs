use thiserror::Error;

/// Failures while building or resolving records. Every variant is fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("field `{field}` of {type_tag} expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        type_tag: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown field `{field}` for {type_tag}")]
    UnknownField { field: String, type_tag: &'static str },

    #[error("unknown {constructor} kind `{kind}`")]
    UnknownDataType {
        kind: String,
        constructor: &'static str,
    },

    #[error("model `{model}` has no slot named `{slot}`")]
    MissingSlot { model: String, slot: String },

    #[error("orbit target {target} has not been spawned yet; spawn it before its satellites")]
    OrbitTargetNotSpawned { target: String },

    #[error("{handle} was never spawned")]
    MissingSpawnId { handle: String },

    #[error("{arena} index {index} out of range (len {len})")]
    IndexOutOfRange {
        arena: &'static str,
        index: u32,
        len: usize,
    },

    #[error("{type_tag} is missing required field `{field}`")]
    MissingField {
        field: &'static str,
        type_tag: &'static str,
    },
}
