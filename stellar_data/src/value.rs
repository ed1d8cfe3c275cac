use stellar_geometry::Point;
use stellar_ids::{ModelHandle, SurfaceHandle, TemplateHandle};

/// Handle type tag visible to scripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordTag {
    Entity,
    Part,
}

impl RecordTag {
    pub const fn name(self) -> &'static str {
        match self {
            RecordTag::Entity => "Entity",
            RecordTag::Part => "Part",
        }
    }
}

/// Script-side value type, as reported in type errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptType {
    Nil,
    Boolean,
    Integer,
    Number,
    String,
    Table,
    Function,
    UserData,
    Thread,
}

impl ScriptType {
    pub const fn name(self) -> &'static str {
        match self {
            ScriptType::Nil => "nil",
            ScriptType::Boolean => "boolean",
            ScriptType::Integer => "integer",
            ScriptType::Number => "number",
            ScriptType::String => "string",
            ScriptType::Table => "table",
            ScriptType::Function => "function",
            ScriptType::UserData => "userdata",
            ScriptType::Thread => "thread",
        }
    }
}

/// A script value after the binding layer has unwrapped host handles.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Point(Point),
    Model(ModelHandle),
    Template { handle: TemplateHandle, tag: RecordTag },
    Surface(SurfaceHandle),
    /// Table entries, sorted by key.
    Table(Vec<(String, FieldValue)>),
    Unsupported(ScriptType),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => ScriptType::Boolean.name(),
            FieldValue::Integer(_) => ScriptType::Integer.name(),
            FieldValue::Number(_) => ScriptType::Number.name(),
            FieldValue::String(_) => ScriptType::String.name(),
            FieldValue::Point(_) => "Point",
            FieldValue::Model(_) => "Model",
            FieldValue::Template { tag, .. } => tag.name(),
            FieldValue::Surface(_) => "Surface",
            FieldValue::Table(_) => ScriptType::Table.name(),
            FieldValue::Unsupported(ty) => ty.name(),
        }
    }
}

/// Setter-level type error; the dispatcher adds the field name and type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub expected: &'static str,
    pub found: &'static str,
}

impl Mismatch {
    pub fn new(expected: &'static str, value: &FieldValue) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

pub(crate) fn integer(value: &FieldValue) -> Result<i64, Mismatch> {
    match *value {
        FieldValue::Integer(v) => Ok(v),
        FieldValue::Number(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(Mismatch::new("integer", value)),
    }
}

/// Integer that fits a `uint16_t` field.
pub(crate) fn uint16(value: &FieldValue) -> Result<i64, Mismatch> {
    match integer(value)? {
        v if (0..=i64::from(u16::MAX)).contains(&v) => Ok(v),
        _ => Err(Mismatch {
            expected: "integer in 0..=65535",
            found: "out-of-range integer",
        }),
    }
}

pub(crate) fn number(value: &FieldValue) -> Result<f64, Mismatch> {
    match *value {
        FieldValue::Integer(v) => Ok(v as f64),
        FieldValue::Number(v) if v.is_finite() => Ok(v),
        _ => Err(Mismatch::new("number", value)),
    }
}

pub(crate) fn string(value: &FieldValue) -> Result<String, Mismatch> {
    match value {
        FieldValue::String(v) => Ok(v.clone()),
        _ => Err(Mismatch::new("string", value)),
    }
}

/// Coordinates must be finite; they are written out as C float literals.
pub(crate) fn point(value: &FieldValue) -> Result<Point, Mismatch> {
    match *value {
        FieldValue::Point(v) if v.x.is_finite() && v.y.is_finite() => Ok(v),
        FieldValue::Point(_) => Err(Mismatch {
            expected: "finite Point",
            found: "non-finite Point",
        }),
        _ => Err(Mismatch::new("Point", value)),
    }
}

pub(crate) fn model(value: &FieldValue) -> Result<ModelHandle, Mismatch> {
    match *value {
        FieldValue::Model(v) => Ok(v),
        _ => Err(Mismatch::new("Model", value)),
    }
}

pub(crate) fn surface(value: &FieldValue) -> Result<SurfaceHandle, Mismatch> {
    match *value {
        FieldValue::Surface(v) => Ok(v),
        _ => Err(Mismatch::new("Surface", value)),
    }
}

pub(crate) fn template(value: &FieldValue, expected: RecordTag) -> Result<TemplateHandle, Mismatch> {
    match *value {
        FieldValue::Template { handle, tag } if tag == expected => Ok(handle),
        _ => Err(Mismatch::new(expected.name(), value)),
    }
}
