use crate::{CodegenError, c_ident};
use rustc_hash::FxHashSet;
use std::fmt::Write;
use std::sync::Arc;
use stellar_geometry::SurfaceAsset;

pub fn surface_constant_name(surface: &SurfaceAsset) -> String {
    format!("SURFACE_{}_IDX", c_ident(&surface.name).to_ascii_uppercase())
}

/// Surface tables. Position in `surfaces` is the surface index, which is
/// also the handle index entities were resolved against.
pub struct SurfaceTables<'a> {
    surfaces: &'a [Arc<SurfaceAsset>],
}

impl<'a> SurfaceTables<'a> {
    pub fn new(surfaces: &'a [Arc<SurfaceAsset>]) -> Result<Self, CodegenError> {
        let mut seen = FxHashSet::default();
        for surface in surfaces {
            let name = surface_constant_name(surface);
            if !seen.insert(name.clone()) {
                return Err(CodegenError::DuplicateSurfaceName { name });
            }
        }
        Ok(Self { surfaces })
    }

    pub fn write_header(&self, h: &mut String) -> std::fmt::Result {
        if self.surfaces.is_empty() {
            return Ok(());
        }
        for (i, surface) in self.surfaces.iter().enumerate() {
            writeln!(h, "#define {} ((uint16_t){i})", surface_constant_name(surface))?;
        }
        writeln!(h)
    }

    pub fn write_source(&self, c: &mut String) -> std::fmt::Result {
        if self.surfaces.is_empty() {
            return Ok(());
        }

        for (si, surface) in self.surfaces.iter().enumerate() {
            for (pi, poly) in surface.polylines.iter().enumerate() {
                let coords: Vec<String> = poly
                    .points
                    .iter()
                    .map(|p| format!("{}, {}, {}", p.x, p.y, p.z))
                    .collect();
                let coords = if coords.is_empty() { vec!["0".to_string()] } else { coords };
                writeln!(
                    c,
                    "static const int16_t _surf_{si}_poly_{pi}[] = {{ {} }};",
                    coords.join(", ")
                )?;
            }
            writeln!(c)?;
        }

        for (si, surface) in self.surfaces.iter().enumerate() {
            writeln!(c, "static const struct surface_polyline _surf_{si}_polys[] = {{")?;
            if surface.polylines.is_empty() {
                writeln!(c, "  {{ 0, 0 }},")?;
            }
            for (pi, poly) in surface.polylines.iter().enumerate() {
                writeln!(c, "  {{ _surf_{si}_poly_{pi}, {} }},", poly.points.len())?;
            }
            writeln!(c, "}};")?;
            writeln!(c)?;
        }

        writeln!(c, "static const struct surface_data _surfaces[] = {{")?;
        for (si, surface) in self.surfaces.iter().enumerate() {
            let color = surface.color;
            writeln!(
                c,
                "  {{ _surf_{si}_polys, {}, {{ {}, {}, {}, {} }} }},  // {si}: {}",
                surface.polylines.len(),
                color.r,
                color.g,
                color.b,
                color.a,
                surface.name
            )?;
        }
        writeln!(c, "}};")?;
        writeln!(c)?;

        writeln!(c, "const struct surface_data* _generated_get_surface(uint16_t index) {{")?;
        writeln!(c, "  if (index >= {}) return 0;", self.surfaces.len())?;
        writeln!(c, "  return &_surfaces[index];")?;
        writeln!(c, "}}")?;
        writeln!(c)?;

        log::info!(
            "generated {} surfaces with {} polylines, {} vertices",
            self.surfaces.len(),
            self.surfaces.iter().map(|s| s.polylines.len()).sum::<usize>(),
            self.surfaces.iter().map(|s| s.vertex_count()).sum::<usize>()
        );
        Ok(())
    }
}
