use mlua::{Lua, Table, Value};
use std::fs;
use std::path::Path;
use stellar_geometry::{
    Color, DEFAULT_CRATER_SEGMENTS, DEFAULT_SURFACE_COLOR, GeometryError, SpherePoint,
    SurfaceAsset, SurfacePolyline, SurfaceProvider, generate_crater, lon_lat_to_sphere,
};

/// Upper bound on the points generated for one crater outline.
pub const MAX_CRATER_SEGMENTS: u32 = 360;

/// Reads surface overlays from Lua data files:
///
/// ```lua
/// return {
///   color = { 90, 160, 255, 200 },
///   polylines = { { {0, 0}, {10, 5}, {20, 0} } },
///   craters = { { 45, -10, 6 }, { 120, 30, 3, 8 } },
/// }
/// ```
///
/// Polylines come first, then craters, then legacy polylines stored directly
/// at the numeric keys of the returned table.
#[derive(Debug, Default, Clone, Copy)]
pub struct LuaSurfaceProvider;

impl SurfaceProvider for LuaSurfaceProvider {
    fn parse(&self, path: &Path) -> Result<SurfaceAsset, GeometryError> {
        let source = fs::read_to_string(path).map_err(|e| GeometryError::from_io(path, e))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GeometryError::parse(path, "surface path has no file name"))?
            .to_string();

        let lua = Lua::new();
        let lua_err = |e: mlua::Error| GeometryError::parse(path, e.to_string());
        let root = match lua
            .load(source.as_str())
            .set_name(format!("@{}", path.display()))
            .eval::<Value>()
            .map_err(lua_err)?
        {
            Value::Table(table) => table,
            other => {
                return Err(GeometryError::parse(
                    path,
                    format!("surface file must return a table, got {}", other.type_name()),
                ));
            }
        };

        let color = read_color(&root.get::<Value>("color").map_err(lua_err)?).map_err(lua_err)?;

        let mut polylines = Vec::new();
        if let Value::Table(lines) = root.get::<Value>("polylines").map_err(lua_err)? {
            for line in tables(&lines).map_err(lua_err)? {
                polylines.push(read_polyline(&line).map_err(lua_err)?);
            }
        }
        if let Value::Table(craters) = root.get::<Value>("craters").map_err(lua_err)? {
            for crater in tables(&craters).map_err(lua_err)? {
                polylines.push(read_crater(&crater).map_err(lua_err)?);
            }
        }
        for line in tables(&root).map_err(lua_err)? {
            polylines.push(read_polyline(&line).map_err(lua_err)?);
        }

        Ok(SurfaceAsset {
            name,
            polylines,
            color,
        })
    }
}

/// Table entries of the sequence part, skipping anything else.
fn tables(table: &Table) -> mlua::Result<Vec<Table>> {
    let mut out = Vec::new();
    for value in table.sequence_values::<Value>() {
        if let Value::Table(entry) = value? {
            out.push(entry);
        }
    }
    Ok(out)
}

fn number(table: &Table, index: i64) -> mlua::Result<Option<f64>> {
    Ok(match table.raw_get::<Value>(index)? {
        Value::Integer(v) => Some(v as f64),
        Value::Number(v) => Some(v),
        _ => None,
    })
}

fn channel(table: &Table, index: i64, default: u8) -> mlua::Result<u8> {
    Ok(number(table, index)?
        .map(|v| v.clamp(0.0, 255.0) as u8)
        .unwrap_or(default))
}

fn read_color(value: &Value) -> mlua::Result<Color> {
    let Value::Table(table) = value else {
        return Ok(DEFAULT_SURFACE_COLOR);
    };
    Ok(Color::new(
        channel(table, 1, DEFAULT_SURFACE_COLOR.r)?,
        channel(table, 2, DEFAULT_SURFACE_COLOR.g)?,
        channel(table, 3, DEFAULT_SURFACE_COLOR.b)?,
        channel(table, 4, DEFAULT_SURFACE_COLOR.a)?,
    ))
}

fn read_polyline(line: &Table) -> mlua::Result<SurfacePolyline> {
    let mut points: Vec<SpherePoint> = Vec::new();
    for point in tables(line)? {
        let lon = number(&point, 1)?.unwrap_or(0.0);
        let lat = number(&point, 2)?.unwrap_or(0.0);
        points.push(lon_lat_to_sphere(lon, lat));
    }
    Ok(SurfacePolyline { points })
}

fn read_crater(crater: &Table) -> mlua::Result<SurfacePolyline> {
    let lon = number(crater, 1)?.unwrap_or(0.0);
    let lat = number(crater, 2)?.unwrap_or(0.0);
    let radius = number(crater, 3)?.unwrap_or(0.0);
    let segments = match number(crater, 4)? {
        Some(v) if v > f64::from(MAX_CRATER_SEGMENTS) => {
            return Err(mlua::Error::runtime(format!(
                "crater segments must be at most {MAX_CRATER_SEGMENTS}, got {v}"
            )));
        }
        Some(v) => v as u32,
        None => DEFAULT_CRATER_SEGMENTS,
    };
    Ok(SurfacePolyline {
        points: generate_crater(lon, lat, radius, segments),
    })
}
