//! Model tables: packed vertices, the shared color palette, per-model draw
//! command streams and the lookups keyed by model index.

use crate::{CodegenError, write_pointer_rows};
use rustc_hash::FxHashMap;
use std::fmt::Write;
use std::sync::Arc;
use stellar_geometry::{Color, LineStrip, Model, Point};

pub const GL_LINE_LOOP: u16 = 2;
pub const GL_LINE_STRIP: u16 = 3;
pub const GL_TRIANGLE_FAN: u16 = 6;

/// Opaque black, used by hull fill.
pub const COLOR_HULL_FILL: u16 = 0xFFFE;
/// Color passed to the draw call (`heat` strips).
pub const COLOR_DRAW_TIME: u16 = 0xFFFD;
pub const COLOR_UNCHANGED: u16 = 0xFFFF;
pub const WIDTH_UNCHANGED: u16 = 0;

/// One `{mode, start, count, colorRef, widthRef}` quintuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub mode: u16,
    pub start: u16,
    pub count: u16,
    pub color_ref: u16,
    pub width_ref: u16,
}

fn color_ref_literal(color_ref: u16) -> String {
    if color_ref >= COLOR_DRAW_TIME {
        format!("0x{color_ref:04X}")
    } else {
        color_ref.to_string()
    }
}

/// Distinct strip colors in first-seen order.
#[derive(Debug, Default)]
pub struct Palette {
    colors: Vec<Color>,
    index: FxHashMap<Color, u16>,
}

impl Palette {
    pub fn build(models: &[Arc<Model>]) -> Result<Self, CodegenError> {
        let mut palette = Palette::default();
        let strips = models.iter().flat_map(|m| m.line_strips.iter());
        for strip in strips.filter(|s| !s.is_heat()) {
            if palette.index.contains_key(&strip.color) {
                continue;
            }
            let next = u16::try_from(palette.colors.len())
                .ok()
                .filter(|&i| i < COLOR_DRAW_TIME)
                .ok_or(CodegenError::ColorPaletteOverflow)?;
            palette.index.insert(strip.color, next);
            palette.colors.push(strip.color);
        }
        Ok(palette)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn index_of(&self, color: Color) -> Option<u16> {
        self.index.get(&color).copied()
    }

    fn write(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "static const uint8_t _model_colors[] = {{")?;
        if self.colors.is_empty() {
            writeln!(out, "  0, 0, 0, 0,")?;
        }
        for (i, c) in self.colors.iter().enumerate() {
            writeln!(out, "  {}, {}, {}, {}, // idx {i}", c.r, c.g, c.b, c.a)?;
        }
        writeln!(out, "}};")?;
        writeln!(out)
    }
}

fn pack(model: &Model, value: f32) -> Result<i16, CodegenError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < i16::MIN as f32 || rounded > i16::MAX as f32 {
        return Err(CodegenError::VertexOutOfRange {
            model: model.file_name.clone(),
            value,
        });
    }
    Ok(rounded as i16)
}

fn pack_points(model: &Model, points: &[Point]) -> Result<Vec<i16>, CodegenError> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for p in points {
        out.push(pack(model, p.x)?);
        out.push(pack(model, p.y)?);
    }
    Ok(out)
}

/// `x, y` pairs of every strip, in strip order.
pub fn pack_vertices(model: &Model) -> Result<Vec<i16>, CodegenError> {
    let mut out = Vec::with_capacity(model.vertex_count() * 2);
    for strip in &model.line_strips {
        out.extend(pack_points(model, &strip.points)?);
    }
    Ok(out)
}

fn width_ref(strip: &LineStrip) -> u16 {
    (strip.stroke_width * 10.0).round().clamp(1.0, u16::MAX as f32) as u16
}

/// Hull fill fans for closed hull strips, then one line command per strip.
/// Color and width are only set when they change.
pub fn draw_commands(model: &Model, palette: &Palette) -> Result<Vec<DrawCommand>, CodegenError> {
    let too_many = || CodegenError::TooManyVertices {
        model: model.file_name.clone(),
        count: model.vertex_count(),
    };
    let mut spans = Vec::with_capacity(model.line_strips.len());
    let mut start = 0usize;
    for strip in &model.line_strips {
        let count = strip.points.len();
        spans.push((
            u16::try_from(start).map_err(|_| too_many())?,
            u16::try_from(count).map_err(|_| too_many())?,
        ));
        start += count;
    }
    if start > u16::MAX as usize {
        return Err(too_many());
    }

    let mut commands = Vec::new();
    let mut color = None;
    for (strip, &(start, count)) in model.line_strips.iter().zip(&spans) {
        if strip.is_hull() && strip.is_closed {
            commands.push(DrawCommand {
                mode: GL_TRIANGLE_FAN,
                start,
                count,
                color_ref: if color == Some(COLOR_HULL_FILL) {
                    COLOR_UNCHANGED
                } else {
                    COLOR_HULL_FILL
                },
                width_ref: WIDTH_UNCHANGED,
            });
            color = Some(COLOR_HULL_FILL);
        }
    }

    let mut width = None;
    for (strip, &(start, count)) in model.line_strips.iter().zip(&spans) {
        let wanted = if strip.is_heat() {
            COLOR_DRAW_TIME
        } else {
            palette
                .index_of(strip.color)
                .ok_or(CodegenError::ColorPaletteOverflow)?
        };
        let color_ref = if color == Some(wanted) {
            COLOR_UNCHANGED
        } else {
            color = Some(wanted);
            wanted
        };
        let wanted_width = width_ref(strip);
        let width_ref = if width == Some(wanted_width) {
            WIDTH_UNCHANGED
        } else {
            width = Some(wanted_width);
            wanted_width
        };
        commands.push(DrawCommand {
            mode: if strip.is_closed { GL_LINE_LOOP } else { GL_LINE_STRIP },
            start,
            count,
            color_ref,
            width_ref,
        });
    }
    Ok(commands)
}

/// Everything emitted per model, in model index order.
pub struct ModelTables<'a> {
    models: &'a [Arc<Model>],
    palette: Palette,
    /// Vertex array symbol per model; identical data shares one array.
    vertex_symbols: Vec<String>,
    /// Arrays to emit: symbol plus packed data, first-seen order.
    vertex_arrays: Vec<(String, Vec<i16>)>,
}

impl<'a> ModelTables<'a> {
    pub fn new(models: &'a [Arc<Model>]) -> Result<Self, CodegenError> {
        let mut names: FxHashMap<String, &Arc<Model>> = FxHashMap::default();
        for model in models {
            let name = model.constant_name();
            if let Some(previous) = names.insert(name.clone(), model) {
                if !Arc::ptr_eq(previous, model) {
                    return Err(CodegenError::DuplicateModelName { name });
                }
            }
            if model.radius() > u16::MAX as u32 {
                return Err(CodegenError::RadiusOutOfRange {
                    model: model.file_name.clone(),
                    radius: model.radius(),
                });
            }
        }

        let mut shared: FxHashMap<Vec<i16>, String> = FxHashMap::default();
        let mut vertex_symbols = Vec::with_capacity(models.len());
        let mut vertex_arrays = Vec::new();
        for model in models {
            let packed = pack_vertices(model)?;
            let symbol = match shared.get(&packed) {
                Some(symbol) => {
                    log::debug!("model {} shares vertex data {}", model.file_name, symbol);
                    symbol.clone()
                }
                None => {
                    let symbol = format!("_model_{}_vertices", model.c_name());
                    shared.insert(packed.clone(), symbol.clone());
                    vertex_arrays.push((symbol.clone(), packed));
                    symbol
                }
            };
            vertex_symbols.push(symbol);
        }

        Ok(Self {
            models,
            palette: Palette::build(models)?,
            vertex_symbols,
            vertex_arrays,
        })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn write_header(&self, h: &mut String) -> std::fmt::Result {
        for (i, model) in self.models.iter().enumerate() {
            writeln!(h, "#define {}    ((uint16_t){i})", model.constant_name())?;
        }
        Ok(())
    }

    pub fn write_source(&self, c: &mut String) -> Result<(), CodegenError> {
        self.write_vertices(c)?;
        self.palette.write(c)?;
        for model in self.models {
            self.write_commands(c, model)?;
        }
        self.write_interpreter(c)?;
        self.write_radius(c)?;
        self.write_radial_profiles(c)?;
        self.write_collision_hulls(c)?;
        log::info!(
            "generated {} models ({} vertex arrays, {} colors)",
            self.models.len(),
            self.vertex_arrays.len(),
            self.palette.len()
        );
        Ok(())
    }

    fn write_vertices(&self, c: &mut String) -> std::fmt::Result {
        for (symbol, packed) in &self.vertex_arrays {
            writeln!(c, "static const int16_t {symbol}[] = {{")?;
            if packed.is_empty() {
                writeln!(c, "  0,")?;
            }
            for row in packed.chunks(16) {
                write!(c, " ")?;
                for pair in row.chunks(2) {
                    write!(c, " {}, {},", pair[0], pair[1])?;
                }
                writeln!(c)?;
            }
            writeln!(c, "}};")?;
            writeln!(c)?;
        }
        Ok(())
    }

    fn write_commands(&self, c: &mut String, model: &Model) -> Result<(), CodegenError> {
        let commands = draw_commands(model, &self.palette)?;
        writeln!(c, "static const uint16_t _model_{}_cmds[] = {{", model.c_name())?;
        for cmd in &commands {
            writeln!(
                c,
                "  {}, {}, {}, {}, {},",
                cmd.mode,
                cmd.start,
                cmd.count,
                color_ref_literal(cmd.color_ref),
                cmd.width_ref
            )?;
        }
        writeln!(c, "  0")?;
        writeln!(c, "}};")?;
        writeln!(c)?;
        log::debug!("model {}: {} draw commands", model.file_name, commands.len());
        Ok(())
    }

    fn write_interpreter(&self, c: &mut String) -> std::fmt::Result {
        let count = self.models.len();
        let cmds: Vec<String> = self
            .models
            .iter()
            .map(|m| format!("_model_{}_cmds", m.c_name()))
            .collect();

        writeln!(c, "void _generated_draw_model(color_t color, uint16_t index) {{")?;
        writeln!(c, "  static const int16_t* _vtx[] = {{")?;
        write_pointer_rows(c, &self.vertex_symbols)?;
        writeln!(c, "  }};")?;
        writeln!(c, "  static const uint16_t* _cmds[] = {{")?;
        write_pointer_rows(c, &cmds)?;
        writeln!(c, "  }};")?;
        writeln!(c, "  _ASSERT(index >= 0 && index < {count});")?;
        writeln!(c, "  glEnableClientState(GL_VERTEX_ARRAY);")?;
        writeln!(c, "  glVertexPointer(2, GL_SHORT, 0, _vtx[index]);")?;
        writeln!(c, "  const uint16_t* c = _cmds[index];")?;
        writeln!(c, "  while (*c) {{")?;
        writeln!(c, "    if (c[3] == 0xFFFE) glColor4ub(0, 0, 0, 255);")?;
        writeln!(c, "    else if (c[3] == 0xFFFD) glColor4ubv((GLubyte*)(&color));")?;
        writeln!(
            c,
            "    else if (c[3] != 0xFFFF) glColor4ubv((GLubyte*)(_model_colors + c[3] * 4));"
        )?;
        writeln!(c, "    if (c[4]) glLineWidth(c[4] * 0.1f);")?;
        writeln!(c, "    glDrawArrays(c[0], c[1], c[2]);")?;
        writeln!(c, "    c += 5;")?;
        writeln!(c, "  }}")?;
        writeln!(c, "  glDisableClientState(GL_VERTEX_ARRAY);")?;
        writeln!(c, "}}")?;
        writeln!(c)
    }

    fn write_radius(&self, c: &mut String) -> std::fmt::Result {
        writeln!(c, "uint16_t _generated_get_model_radius(uint16_t index) {{")?;
        writeln!(c, "  static uint16_t _data[] = {{")?;
        if self.models.is_empty() {
            writeln!(c, "    0,")?;
        }
        for model in self.models {
            writeln!(c, "    {},", model.radius())?;
        }
        writeln!(c, "  }};")?;
        writeln!(c, "  _ASSERT(index >= 0 && index < {});", self.models.len())?;
        writeln!(c, "  return _data[index];")?;
        writeln!(c, "}}")?;
        writeln!(c)
    }

    fn write_radial_profiles(&self, c: &mut String) -> std::fmt::Result {
        writeln!(c, "static const uint8_t _radial_profiles[][16] = {{")?;
        if self.models.is_empty() {
            writeln!(c, "  {{ 0 }},")?;
        }
        for (j, model) in self.models.iter().enumerate() {
            match model.radial_profile() {
                Some(profile) => {
                    let row: Vec<String> = profile.iter().map(u8::to_string).collect();
                    writeln!(c, "  {{ {} }}, // {j}: {}", row.join(", "), model.file_name)?;
                }
                None => writeln!(c, "  {{ 0 }}, // {j}: {} (no profile)", model.file_name)?,
            }
        }
        writeln!(c, "}};")?;
        writeln!(c)?;

        writeln!(c, "const uint8_t* _generated_get_radial_profile(uint16_t model_idx) {{")?;
        writeln!(c, "  if (model_idx >= {}) return 0;", self.models.len())?;
        writeln!(c, "  return _radial_profiles[model_idx];")?;
        writeln!(c, "}}")?;
        writeln!(c)
    }

    fn write_collision_hulls(&self, c: &mut String) -> Result<(), CodegenError> {
        let mut symbols = Vec::with_capacity(self.models.len());
        let mut counts = Vec::with_capacity(self.models.len());
        for model in self.models {
            match model.collision_hull() {
                Some(hull) if !hull.is_empty() => {
                    let symbol = format!("_model_{}_hull", model.c_name());
                    let packed: Vec<String> =
                        pack_points(model, hull)?.iter().map(i16::to_string).collect();
                    writeln!(c, "static const int16_t {symbol}[] = {{ {} }};", packed.join(", "))?;
                    symbols.push(symbol);
                    counts.push(hull.len());
                }
                _ => {
                    symbols.push(format!("0 /* {} (no hull) */", model.file_name));
                    counts.push(0);
                }
            }
        }
        writeln!(c)?;

        writeln!(
            c,
            "const int16_t* _generated_get_collision_hull(uint16_t model_idx, uint16_t* count) {{"
        )?;
        writeln!(c, "  static const int16_t* _hulls[] = {{")?;
        write_pointer_rows(c, &symbols)?;
        writeln!(c, "  }};")?;
        writeln!(c, "  static const uint16_t _counts[] = {{")?;
        let counts: Vec<String> = counts.iter().map(usize::to_string).collect();
        write_pointer_rows(c, &counts)?;
        writeln!(c, "  }};")?;
        writeln!(c, "  if (model_idx >= {}) {{", self.models.len())?;
        writeln!(c, "    *count = 0;")?;
        writeln!(c, "    return 0;")?;
        writeln!(c, "  }}")?;
        writeln!(c, "  *count = _counts[model_idx];")?;
        writeln!(c, "  return _hulls[model_idx];")?;
        writeln!(c, "}}")?;
        writeln!(c)?;
        Ok(())
    }
}
