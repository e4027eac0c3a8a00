//! Material script writer and texture copying
//!
//! Scripts use the engine's text material syntax:
//!
//! ```text
//! material Brick
//! {
//!     technique Default
//!     {
//!         pass Main
//!         {
//!             ambient 0 0 0
//!             diffuse 1 0 0 1
//!             ...
//!             texture_unit diffuse
//!             {
//!                 texture brick.png
//!             }
//!         }
//!     }
//! }
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use glam::Vec3;
use hashbrown::HashSet;

use crate::material::{IntermediateMaterial, TextureMapInfo};
use crate::report::ExportLog;

fn rgb(c: Vec3) -> String {
    format!("{} {} {}", c.x, c.y, c.z)
}

/// File name component of a texture path as written by the host
fn texture_file_name(filename: &str) -> &str {
    filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename)
}

fn write_texture_unit<W: Write>(w: &mut W, map: &TextureMapInfo) -> io::Result<()> {
    writeln!(w, "            texture_unit {}", map.map_type)?;
    writeln!(w, "            {{")?;
    writeln!(w, "                texture {}", texture_file_name(&map.filename))?;
    writeln!(w, "                tex_coord_set {}", map.coord_set.saturating_sub(1))?;
    writeln!(w, "                tex_address_mode {}", map.addressing.as_str())?;
    if map.offset.x != 0.0 || map.offset.y != 0.0 {
        writeln!(w, "                scroll {} {}", map.offset.x, map.offset.y)?;
    }
    // Host tiling is the inverse of texture scale
    if map.scale.x != 1.0 || map.scale.y != 1.0 {
        let sx = if map.scale.x != 0.0 { 1.0 / map.scale.x } else { 1.0 };
        let sy = if map.scale.y != 0.0 { 1.0 / map.scale.y } else { 1.0 };
        writeln!(w, "                scale {} {}", sx, sy)?;
    }
    if map.angle != 0.0 {
        writeln!(w, "                rotate {}", map.angle)?;
    }
    if map.amount < 1.0 {
        writeln!(
            w,
            "                colour_op_ex blend_manual src_texture src_current {}",
            map.amount
        )?;
    }
    writeln!(w, "            }}")?;
    Ok(())
}

/// Write one material block
pub fn write_material<W: Write>(w: &mut W, material: &IntermediateMaterial) -> io::Result<()> {
    writeln!(w, "material {}", material.name)?;
    writeln!(w, "{{")?;
    writeln!(w, "    technique Default")?;
    writeln!(w, "    {{")?;
    writeln!(w, "        pass Main")?;
    writeln!(w, "        {{")?;
    writeln!(w, "            ambient {}", rgb(material.ambient))?;
    writeln!(w, "            diffuse {} {}", rgb(material.diffuse), material.opacity)?;
    writeln!(
        w,
        "            specular {} 1 {}",
        rgb(material.specular),
        material.glossiness
    )?;
    writeln!(w, "            emissive {}", rgb(material.emissive))?;
    writeln!(
        w,
        "            cull_hardware {}",
        if material.two_sided { "none" } else { "clockwise" }
    )?;
    writeln!(
        w,
        "            shading {}",
        if material.faceted { "flat" } else { "gouraud" }
    )?;
    if material.wire {
        writeln!(w, "            polygon_mode wireframe")?;
    }
    if material.opacity < 1.0 {
        writeln!(w, "            scene_blend alpha_blend")?;
        writeln!(w, "            depth_write off")?;
    }

    if let Some(diffuse) = material.map("diffuse") {
        write_texture_unit(w, diffuse)?;
    }
    for map in material.maps().filter(|m| m.map_type != "diffuse") {
        write_texture_unit(w, map)?;
    }

    writeln!(w, "        }}")?;
    writeln!(w, "    }}")?;
    writeln!(w, "}}")?;
    Ok(())
}

/// Write a material script holding every material in `materials`
pub fn write_material_script<W: Write>(
    w: &mut W,
    materials: &[&IntermediateMaterial],
) -> io::Result<()> {
    for (i, material) in materials.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        write_material(w, material)?;
    }
    Ok(())
}

/// Copy every referenced texture next to the material script
///
/// Relative texture paths resolve against `source_dir`. A missing source is a
/// warning. Returns the number of files copied.
pub fn copy_texture_maps(
    log: &mut ExportLog,
    materials: &[&IntermediateMaterial],
    source_dir: &Path,
    out_dir: &Path,
) -> usize {
    let mut seen = HashSet::new();
    let mut copied = 0;

    for map in materials.iter().flat_map(|m| m.maps()) {
        if !seen.insert(map.filename.clone()) {
            continue;
        }
        let source = {
            let path = PathBuf::from(&map.filename);
            if path.is_absolute() {
                path
            } else {
                source_dir.join(path)
            }
        };
        let target = out_dir.join(texture_file_name(&map.filename));

        if !source.is_file() {
            log.warn(format!("Texture {:?} not found, not copied", source));
            continue;
        }
        if source == target {
            continue;
        }
        match std::fs::copy(&source, &target) {
            Ok(_) => {
                log.debug(format!("Copied texture {:?}", target));
                copied += 1;
            }
            Err(err) => log.warn(format!("Failed to copy texture {:?}: {}", source, err)),
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::AddressingMode;
    use glam::Vec2;

    fn map(slot: &str, filename: &str) -> TextureMapInfo {
        TextureMapInfo {
            filename: filename.to_string(),
            map_type: slot.to_string(),
            coord_set: 2,
            addressing: AddressingMode::Clamp,
            offset: Vec2::ZERO,
            scale: Vec2::new(2.0, 2.0),
            angle: 0.0,
            amount: 1.0,
            alpha_from_file: false,
        }
    }

    fn brick() -> IntermediateMaterial {
        let mut material = IntermediateMaterial::new("Brick");
        material.diffuse = Vec3::new(1.0, 0.0, 0.0);
        material.two_sided = true;
        material.faceted = true;
        material.set_map(map("bump", "maps/brick_n.png"));
        material.set_map(map("diffuse", "C:\\textures\\brick.png"));
        material
    }

    fn script(materials: &[&IntermediateMaterial]) -> String {
        let mut out = Vec::new();
        write_material_script(&mut out, materials).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_material_block() {
        let text = script(&[&brick()]);
        assert!(text.starts_with("material Brick\n{"));
        assert!(text.contains("diffuse 1 0 0 1"));
        assert!(text.contains("cull_hardware none"));
        assert!(text.contains("shading flat"));
        assert!(!text.contains("polygon_mode"));
        assert!(!text.contains("scene_blend"));
        assert!(text.contains("tex_coord_set 1"));
        assert!(text.contains("tex_address_mode clamp"));
        assert!(text.contains("scale 0.5 0.5"));
    }

    #[test]
    fn test_diffuse_unit_first() {
        let text = script(&[&brick()]);
        let diffuse = text.find("texture brick.png").unwrap();
        let bump = text.find("texture brick_n.png").unwrap();
        assert!(diffuse < bump);
    }

    #[test]
    fn test_defaults_and_transparency() {
        let mut glass = IntermediateMaterial::new("Glass");
        glass.opacity = 0.5;
        glass.wire = true;
        let text = script(&[&brick(), &glass]);
        assert_eq!(text.matches("material ").count(), 2);
        let glass_block = &text[text.find("material Glass").unwrap()..];
        assert!(glass_block.contains("cull_hardware clockwise"));
        assert!(glass_block.contains("shading gouraud"));
        assert!(glass_block.contains("polygon_mode wireframe"));
        assert!(glass_block.contains("scene_blend alpha_blend"));
    }

    #[test]
    fn test_copy_texture_maps() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("maps")).unwrap();
        std::fs::write(src.path().join("maps/brick_n.png"), b"png").unwrap();

        let mut log = ExportLog::new();
        let material = brick();
        let copied = copy_texture_maps(&mut log, &[&material, &material], src.path(), out.path());

        assert_eq!(copied, 1);
        assert!(out.path().join("brick_n.png").is_file());
        // The diffuse map is missing on disk
        assert_eq!(log.problems().count(), 1);
    }
}
