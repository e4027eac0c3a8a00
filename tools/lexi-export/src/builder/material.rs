//! Host material → intermediate material conversion

use glam::Vec2;

use crate::context::ExportContext;
use crate::material::{
    AddressingMode, IntermediateMaterial, MaterialId, TextureMapInfo, map_channel_bit,
};
use crate::scene::{HostBitmap, HostMaterial, HostMesh, NodeHandle, SceneSource, StandardMaterial};

/// Material of every face of `mesh`, in face order
pub fn resolve_face_materials(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    node: NodeHandle,
    mesh: &HostMesh,
) -> Vec<Option<MaterialId>> {
    match scene.material(node) {
        None => {
            let id = default_material(ctx, scene, node);
            vec![Some(id); mesh.faces.len()]
        }
        Some(HostMaterial::Standard(standard)) => {
            let id = convert_standard(ctx, standard);
            vec![Some(id); mesh.faces.len()]
        }
        Some(HostMaterial::Multi { materials }) => {
            let subs: Vec<Option<MaterialId>> = materials
                .iter()
                .map(|m| m.as_ref().map(|m| convert_standard(ctx, m)))
                .collect();
            let fallback = if subs.iter().any(|s| s.is_none()) || subs.is_empty() {
                Some(default_material(ctx, scene, node))
            } else {
                None
            };
            mesh.faces
                .iter()
                .map(|f| {
                    if subs.is_empty() {
                        return fallback;
                    }
                    subs[f.material as usize % subs.len()].or(fallback)
                })
                .collect()
        }
        Some(HostMaterial::Other { name }) => {
            ctx.log.warn(format!(
                "Material '{}' is not a standard material; faces exported without material",
                name
            ));
            vec![None; mesh.faces.len()]
        }
    }
}

/// White material named after the node, for nodes without one
pub fn default_material(
    ctx: &mut ExportContext,
    scene: &dyn SceneSource,
    node: NodeHandle,
) -> MaterialId {
    let name = format!(
        "{}{}_material",
        scene.node_name(node).unwrap_or("Node"),
        node.0
    );
    ctx.materials
        .get_or_insert_with(&name, || IntermediateMaterial::new(""))
}

fn convert_standard(ctx: &mut ExportContext, host: &StandardMaterial) -> MaterialId {
    if let Some(id) = ctx.materials.find(&host.name) {
        return id;
    }

    let mut material = IntermediateMaterial::new(host.name.as_str());
    material.ambient = host.ambient;
    material.diffuse = host.diffuse;
    material.specular = host.specular;
    material.emissive = host.emissive;
    material.glossiness = host.glossiness;
    material.specular_level = host.specular_level;
    material.opacity = host.opacity;
    material.two_sided = host.two_sided;
    material.wire = host.wire;
    material.faceted = host.faceted;

    for map in host.maps.iter().filter(|m| m.enabled) {
        if map_channel_bit(&map.slot).is_none() {
            ctx.log.warn(format!(
                "Material '{}': unknown map slot '{}'",
                host.name, map.slot
            ));
            continue;
        }
        let Some(bitmap) = &map.bitmap else {
            ctx.log.warn(format!(
                "Material '{}': map '{}' is not a bitmap and is skipped",
                host.name, map.slot
            ));
            continue;
        };
        let coord_set = bitmap.channel.unwrap_or_else(|| {
            ctx.log.warn(format!(
                "Material '{}': map '{}' has no explicit map channel, using 1",
                host.name, map.slot
            ));
            1
        });
        material.set_map(TextureMapInfo {
            filename: bitmap.filename.clone(),
            map_type: map.slot.clone(),
            coord_set,
            addressing: addressing_mode(bitmap),
            offset: Vec2::from_array(bitmap.offset),
            scale: Vec2::from_array(bitmap.scale),
            angle: bitmap.angle,
            amount: bitmap.amount,
            alpha_from_file: bitmap.alpha_from_file,
        });
    }

    ctx.log.debug(format!(
        "Created material '{}' (maps 0x{:03x})",
        material.name,
        material.map_mask()
    ));
    ctx.materials
        .get_or_insert_with(&host.name, move || material)
}

fn addressing_mode(bitmap: &HostBitmap) -> AddressingMode {
    if bitmap.u_wrap || bitmap.v_wrap {
        AddressingMode::Wrap
    } else if bitmap.u_mirror || bitmap.v_mirror {
        AddressingMode::Mirror
    } else {
        AddressingMode::Clamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::DIFFUSE_MAP_BIT;
    use crate::scene::{
        HostFace, HostTextureMap, MemoryScene, NodeDesc, NodeKind, SceneDesc,
    };
    use glam::Vec3;

    fn two_face_mesh() -> HostMesh {
        HostMesh {
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            faces: vec![
                HostFace {
                    vertices: [0, 1, 2],
                    material: 0,
                    smoothing: 0,
                },
                HostFace {
                    vertices: [0, 2, 3],
                    material: 3,
                    smoothing: 0,
                },
            ],
            ..Default::default()
        }
    }

    fn standard(name: &str) -> StandardMaterial {
        StandardMaterial {
            name: name.to_string(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::new(1.0, 0.0, 0.0),
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            glossiness: 0.2,
            specular_level: 0.0,
            opacity: 1.0,
            two_sided: true,
            wire: false,
            faceted: false,
            maps: Vec::new(),
        }
    }

    fn scene_with(material: Option<HostMaterial>) -> MemoryScene {
        let mut node = NodeDesc::new(7, "Box", NodeKind::Geometry);
        node.mesh = Some(two_face_mesh());
        node.material = material;
        MemoryScene::new(SceneDesc {
            frame_rate: 30,
            nodes: vec![node],
        })
        .unwrap()
    }

    #[test]
    fn test_missing_material_gets_default() {
        let scene = scene_with(None);
        let mut ctx = ExportContext::new();
        let ids = resolve_face_materials(&mut ctx, &scene, NodeHandle(7), &two_face_mesh());
        let material = ctx.materials.get(ids[0].unwrap()).unwrap();
        assert_eq!(material.name, "Box7_material");
        assert_eq!(material.diffuse, Vec3::ONE);
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn test_multi_material_wraps_index() {
        let scene = scene_with(Some(HostMaterial::Multi {
            materials: vec![Some(standard("A")), Some(standard("B")), Some(standard("C"))],
        }));
        let mut ctx = ExportContext::new();
        let ids = resolve_face_materials(&mut ctx, &scene, NodeHandle(7), &two_face_mesh());
        let names: Vec<_> = ids
            .iter()
            .map(|id| ctx.materials.get(id.unwrap()).unwrap().name.clone())
            .collect();
        // Face 1 uses slot 3, which wraps to slot 0
        assert_eq!(names, vec!["A", "A"]);
        assert_eq!(ctx.materials.len(), 3);
    }

    #[test]
    fn test_other_material_leaves_faces_unassigned() {
        let scene = scene_with(Some(HostMaterial::Other {
            name: "Raytrace".to_string(),
        }));
        let mut ctx = ExportContext::new();
        let ids = resolve_face_materials(&mut ctx, &scene, NodeHandle(7), &two_face_mesh());
        assert_eq!(ids, vec![None, None]);
        assert_eq!(ctx.log.problems().count(), 1);
    }

    #[test]
    fn test_texture_maps_converted() {
        let mut host = standard("Brick");
        host.maps.push(HostTextureMap {
            slot: "diffuse".to_string(),
            enabled: true,
            bitmap: Some(HostBitmap {
                filename: "brick.png".to_string(),
                channel: None,
                u_wrap: false,
                v_wrap: false,
                u_mirror: true,
                v_mirror: false,
                offset: [0.5, 0.0],
                scale: [2.0, 2.0],
                angle: 45.0,
                amount: 1.0,
                alpha_from_file: false,
            }),
        });
        host.maps.push(HostTextureMap {
            slot: "bump".to_string(),
            enabled: true,
            bitmap: None,
        });

        let scene = scene_with(Some(HostMaterial::Standard(host)));
        let mut ctx = ExportContext::new();
        let ids = resolve_face_materials(&mut ctx, &scene, NodeHandle(7), &two_face_mesh());
        let material = ctx.materials.get(ids[0].unwrap()).unwrap();

        assert_eq!(material.map_mask(), DIFFUSE_MAP_BIT);
        let map = material.map("diffuse").unwrap();
        assert_eq!(map.coord_set, 1);
        assert_eq!(map.addressing, AddressingMode::Mirror);
        assert_eq!(map.scale, Vec2::new(2.0, 2.0));
        // Missing channel and non-bitmap map both warn
        assert_eq!(ctx.log.problems().count(), 2);
    }

    #[test]
    fn test_material_cached_across_nodes() {
        let scene = scene_with(Some(HostMaterial::Standard(standard("Shared"))));
        let mut ctx = ExportContext::new();
        let a = resolve_face_materials(&mut ctx, &scene, NodeHandle(7), &two_face_mesh());
        let b = resolve_face_materials(&mut ctx, &scene, NodeHandle(7), &two_face_mesh());
        assert_eq!(a, b);
        assert_eq!(ctx.materials.len(), 1);
    }
}
