use crate::error::raise;
use crate::session::{AssetKind, Host};
use crate::ScriptError;
use mlua::{
    AnyUserData, Lua, MetaMethod, Table, UserData, UserDataFields, UserDataMethods, UserDataRef,
    Value, Variadic,
};
use std::ffi::c_void;
use stellar_data::{FieldValue, Record, RecordTag, ScriptType};
use stellar_geometry::Point;
use stellar_ids::{ModelHandle, SurfaceHandle, TemplateHandle};

/// Opaque script-side reference into one of the session arenas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptHandle {
    Model(ModelHandle),
    Template { handle: TemplateHandle, tag: RecordTag },
    Surface(SurfaceHandle),
}

impl ScriptHandle {
    pub const fn type_name(self) -> &'static str {
        match self {
            ScriptHandle::Model(_) => "Model",
            ScriptHandle::Template { tag, .. } => tag.name(),
            ScriptHandle::Surface(_) => "Surface",
        }
    }

    fn field_value(self) -> FieldValue {
        match self {
            ScriptHandle::Model(handle) => FieldValue::Model(handle),
            ScriptHandle::Template { handle, tag } => FieldValue::Template { handle, tag },
            ScriptHandle::Surface(handle) => FieldValue::Surface(handle),
        }
    }
}

impl UserData for ScriptHandle {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        // handle { ... } extends the template into a new one
        methods.add_meta_method(MetaMethod::Call, |lua, this, fields: Value| {
            let ScriptHandle::Template { handle, tag } = *this else {
                return Err(argument(format!("{} handles cannot be extended", this.type_name())));
            };
            let entries = table_entries(&expect_table(fields, tag.name())?)?;
            let host = Host::of(lua)?;
            let extended = host.extend(handle, entries).map_err(raise)?;
            Ok(ScriptHandle::Template {
                handle: extended,
                tag,
            })
        });

        methods.add_meta_method(MetaMethod::Index, |lua, this, key: String| {
            match (*this, key.as_str()) {
                (ScriptHandle::Model(handle), "radius") => {
                    let model = Host::of(lua)?.model(handle).map_err(raise)?;
                    Ok(model.radius())
                }
                _ => Err(argument(format!(
                    "{} has no readable field `{key}`",
                    this.type_name()
                ))),
            }
        });

        methods.add_meta_method(MetaMethod::ToString, |lua, this, ()| {
            let host = Host::of(lua)?;
            Ok(match *this {
                ScriptHandle::Model(handle) => {
                    format!("Model#{}", host.model(handle).map_err(raise)?.file_name)
                }
                ScriptHandle::Template { handle, tag } => format!("{}#{}", tag.name(), handle.index()),
                ScriptHandle::Surface(handle) => {
                    format!("Surface#{}", host.surface(handle).map_err(raise)?.name)
                }
            })
        });
    }
}

/// `vec(x, y)` value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptPoint(pub Point);

impl UserData for ScriptPoint {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.0.x));
        fields.add_field_method_get("y", |_, this| Ok(this.0.y));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Add, |_, this, rhs: UserDataRef<ScriptPoint>| {
            Ok(ScriptPoint(this.0 + rhs.0))
        });
        methods.add_meta_method(MetaMethod::Sub, |_, this, rhs: UserDataRef<ScriptPoint>| {
            Ok(ScriptPoint(this.0 - rhs.0))
        });
        methods.add_meta_method(MetaMethod::Mul, |_, this, k: f32| Ok(ScriptPoint(this.0 * k)));
        methods.add_meta_method(MetaMethod::Unm, |_, this, ()| Ok(ScriptPoint(-this.0)));
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("vec({}, {})", this.0.x, this.0.y))
        });
    }
}

/// Read-only global whose keys load assets on first access.
#[derive(Clone, Copy, Debug)]
struct AssetTable(AssetKind);

impl UserData for AssetTable {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, name: String| {
            let host = Host::of(lua)?;
            let handle = match this.0 {
                AssetKind::Model => ScriptHandle::Model(host.load_model(&name).map_err(raise)?),
                AssetKind::Surface => {
                    ScriptHandle::Surface(host.load_surface(&name).map_err(raise)?)
                }
                AssetKind::Entity => ScriptHandle::Template {
                    handle: host
                        .load_template(lua, RecordTag::Entity, &name)
                        .map_err(raise)?,
                    tag: RecordTag::Entity,
                },
                AssetKind::Part => ScriptHandle::Template {
                    handle: host.load_template(lua, RecordTag::Part, &name).map_err(raise)?,
                    tag: RecordTag::Part,
                },
            };
            Ok(handle)
        });

        methods.add_meta_method(
            MetaMethod::NewIndex,
            |_, this, (name, _): (String, Value)| -> mlua::Result<()> {
                Err(argument(format!(
                    "`{}` is read-only (assigned `{name}`)",
                    this.0.global()
                )))
            },
        );

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.global()));
    }
}

/// Installs every global into a fresh host.
pub(crate) fn install(lua: &Lua, host: Host) -> mlua::Result<()> {
    lua.set_app_data(host);
    let globals = lua.globals();

    for kind in [
        AssetKind::Model,
        AssetKind::Entity,
        AssetKind::Part,
        AssetKind::Surface,
    ] {
        globals.set(kind.global(), lua.create_userdata(AssetTable(kind))?)?;
    }

    globals.set("vec", lua.create_function(vec)?)?;
    globals.set(
        "Entity",
        lua.create_function(|lua, fields: Value| construct(lua, RecordTag::Entity, fields))?,
    )?;
    globals.set(
        "Part",
        lua.create_function(|lua, fields: Value| construct(lua, RecordTag::Part, fields))?,
    )?;
    globals.set("spawn", lua.create_function(spawn)?)?;
    globals.set("control", lua.create_function(control)?)?;
    globals.set("require_model", lua.create_function(require_model)?)?;
    Ok(())
}

fn argument(message: String) -> mlua::Error {
    raise(ScriptError::Argument(message))
}

fn number_of(value: &Value) -> Option<f64> {
    match *value {
        Value::Integer(v) => Some(v as f64),
        Value::Number(v) => Some(v),
        _ => None,
    }
}

fn point_of(x: &Value, y: &Value) -> Option<Point> {
    Some(Point::new(number_of(x)? as f32, number_of(y)? as f32))
}

fn finite_point(point: Point) -> mlua::Result<ScriptPoint> {
    if point.x.is_finite() && point.y.is_finite() {
        Ok(ScriptPoint(point))
    } else {
        Err(argument(format!(
            "vec coordinates must be finite numbers, got ({}, {})",
            point.x, point.y
        )))
    }
}

fn vec(_: &Lua, args: Variadic<Value>) -> mlua::Result<ScriptPoint> {
    let point = match &args[..] {
        [x, y] => point_of(x, y),
        [Value::Table(table)] => {
            let x = table.get::<Value>("x")?;
            if x.is_nil() {
                point_of(&table.get::<Value>(1)?, &table.get::<Value>(2)?)
            } else {
                point_of(&x, &table.get::<Value>("y")?)
            }
        }
        _ => None,
    };
    let point = point.ok_or_else(|| {
        argument("vec expects vec(x, y), vec { x = .., y = .. } or vec { x, y }".to_string())
    })?;
    finite_point(point)
}

fn construct(lua: &Lua, tag: RecordTag, fields: Value) -> mlua::Result<ScriptHandle> {
    let entries = table_entries(&expect_table(fields, tag.name())?)?;
    let host = Host::of(lua)?;
    let record = Record::construct(tag, entries).map_err(|e| raise(host.data(e)))?;
    let handle = host.add_template(record).map_err(raise)?;
    Ok(ScriptHandle::Template { handle, tag })
}

fn spawn(lua: &Lua, args: Variadic<Value>) -> mlua::Result<Variadic<AnyUserData>> {
    if args.is_empty() {
        return Err(argument("spawn expects at least one Entity or Part handle".to_string()));
    }
    let host = Host::of(lua)?;
    let mut spawned = Vec::with_capacity(args.len());
    for value in args.iter() {
        let (ud, handle, tag) = match value {
            Value::UserData(ud) => match handle_of(value) {
                Some(ScriptHandle::Template { handle, tag }) => (ud, handle, tag),
                _ => return Err(spawn_argument(value)),
            },
            _ => return Err(spawn_argument(value)),
        };
        let resolved = host.spawn(handle).map_err(raise)?;
        // later statements in the script see the spawned record
        *ud.borrow_mut::<ScriptHandle>()? = ScriptHandle::Template {
            handle: resolved,
            tag,
        };
        spawned.push(ud.clone());
    }
    Ok(Variadic::from_iter(spawned))
}

fn spawn_argument(value: &Value) -> mlua::Error {
    argument(format!(
        "spawn expects Entity or Part handles, got {}",
        describe_value(value)
    ))
}

fn control(lua: &Lua, value: Value) -> mlua::Result<()> {
    match handle_of(&value) {
        Some(ScriptHandle::Template {
            handle,
            tag: RecordTag::Entity,
        }) => Host::of(lua)?.control(handle).map_err(raise),
        _ => Err(argument(format!(
            "control expects a spawned Entity handle, got {}",
            describe_value(&value)
        ))),
    }
}

fn require_model(lua: &Lua, value: Value) -> mlua::Result<()> {
    match handle_of(&value) {
        Some(ScriptHandle::Model(handle)) => Host::of(lua)?.require_model(handle).map_err(raise),
        _ => Err(argument(format!(
            "require_model expects a Model handle, got {}",
            describe_value(&value)
        ))),
    }
}

pub(crate) fn handle_of(value: &Value) -> Option<ScriptHandle> {
    match value {
        Value::UserData(ud) => ud.borrow::<ScriptHandle>().ok().map(|h| *h),
        _ => None,
    }
}

/// Type name for error messages, naming host handles by their tag.
pub(crate) fn describe_value(value: &Value) -> String {
    match handle_of(value) {
        Some(handle) => handle.type_name().to_string(),
        None => value.type_name().to_string(),
    }
}

fn expect_table(value: Value, constructor: &str) -> mlua::Result<Table> {
    match value {
        Value::Table(table) => Ok(table),
        other => Err(argument(format!(
            "{constructor} expects a table of fields, got {}",
            describe_value(&other)
        ))),
    }
}

/// Deepest table nesting accepted as a field value.
const MAX_TABLE_DEPTH: usize = 32;

/// Reads a table into field entries sorted by key.
pub(crate) fn table_entries(table: &Table) -> mlua::Result<Vec<(String, FieldValue)>> {
    table_entries_within(table, &mut Vec::new())
}

/// `open` holds the tables currently being read, outermost first.
fn table_entries_within(
    table: &Table,
    open: &mut Vec<*const c_void>,
) -> mlua::Result<Vec<(String, FieldValue)>> {
    let ptr = table.to_pointer();
    if open.contains(&ptr) {
        return Err(argument("field tables must not contain themselves".to_string()));
    }
    if open.len() >= MAX_TABLE_DEPTH {
        return Err(argument(format!(
            "field tables nest deeper than {MAX_TABLE_DEPTH} levels"
        )));
    }
    open.push(ptr);
    let mut entries = Vec::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) = pair?;
        let key = match key {
            Value::String(s) => s.to_str()?.to_string(),
            Value::Integer(i) => i.to_string(),
            other => {
                return Err(argument(format!(
                    "table keys must be strings, got {}",
                    other.type_name()
                )));
            }
        };
        entries.push((key, field_value(&value, open)?));
    }
    open.pop();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn field_value(value: &Value, open: &mut Vec<*const c_void>) -> mlua::Result<FieldValue> {
    Ok(match value {
        Value::Nil => FieldValue::Unsupported(ScriptType::Nil),
        Value::Boolean(b) => FieldValue::Bool(*b),
        Value::Integer(i) => FieldValue::Integer(*i),
        Value::Number(n) => FieldValue::Number(*n),
        Value::String(s) => FieldValue::String(s.to_str()?.to_string()),
        Value::Table(table) => FieldValue::Table(table_entries_within(table, open)?),
        Value::UserData(ud) => {
            if let Some(handle) = handle_of(value) {
                handle.field_value()
            } else if let Ok(point) = ud.borrow::<ScriptPoint>() {
                FieldValue::Point(point.0)
            } else {
                FieldValue::Unsupported(ScriptType::UserData)
            }
        }
        Value::Function(_) => FieldValue::Unsupported(ScriptType::Function),
        Value::Thread(_) => FieldValue::Unsupported(ScriptType::Thread),
        _ => FieldValue::Unsupported(ScriptType::UserData),
    })
}
