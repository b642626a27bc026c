//! Wavefront OBJ frame loading.

use std::io::BufReader;
use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::{debug, warn};

use super::{Corner, RawFrameMesh};
use crate::util::{BBox3d, Error, Result};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: false,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load one frame file. The file must hold exactly one shape.
///
/// A missing or broken material library is only a warning: faces then
/// carry no material id. Bounds cover every `v` record in the file, so
/// positions no face references still count.
pub fn load_frame(path: &Path) -> Result<RawFrameMesh> {
    let load_error = |message: String| Error::MeshLoad {
        path: path.to_path_buf(),
        message,
    };
    let text = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut reader = BufReader::new(text.as_bytes());
    let (models, materials) = tobj::load_obj_buf(&mut reader, &load_options(), |mtl| tobj::load_mtl(base.join(mtl)))
        .map_err(|e| load_error(e.to_string()))?;

    match materials {
        Ok(materials) => debug!(path = %path.display(), materials = materials.len(), "material library loaded"),
        Err(e) => warn!(path = %path.display(), error = %e, "material library could not be loaded"),
    }

    let mut frame = mesh_from_models(path, models)?;
    frame.source_bounds.expand_by_box(&scan_position_bounds(&text));
    Ok(frame)
}

/// Bounds of every `v` record, whether or not a face references it.
fn scan_position_bounds(text: &str) -> BBox3d {
    let mut bounds = BBox3d::EMPTY;
    for line in text.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some("v") {
            continue;
        }
        let mut xyz = words.map(|w| w.parse::<f32>());
        if let (Some(Ok(x)), Some(Ok(y)), Some(Ok(z))) = (xyz.next(), xyz.next(), xyz.next()) {
            bounds.expand_by_point(Vec3::new(x, y, z).as_dvec3());
        }
    }
    bounds
}

/// Merge parser models into one frame mesh.
///
/// The parser starts a new model whenever the active material changes,
/// so models sharing a name are pieces of one shape. Distinct names are
/// distinct shapes.
pub fn mesh_from_models(path: &Path, models: Vec<tobj::Model>) -> Result<RawFrameMesh> {
    let mut names: Vec<&str> = Vec::new();
    for model in &models {
        if !names.contains(&model.name.as_str()) {
            names.push(&model.name);
        }
    }
    match names.len() {
        0 => return Err(Error::NoMesh(path.to_path_buf())),
        1 => {}
        count => {
            return Err(Error::MultipleMeshes {
                path: path.to_path_buf(),
                count,
            })
        }
    }

    let mut frame = RawFrameMesh::default();
    for model in &models {
        append_model(path, &mut frame, &model.mesh)?;
    }
    frame.validate()?;
    frame.source_bounds = BBox3d::from_points(&frame.positions);

    debug!(
        path = %path.display(),
        pieces = models.len(),
        positions = frame.positions.len(),
        faces = frame.num_faces(),
        "frame loaded"
    );
    Ok(frame)
}

fn append_model(path: &Path, frame: &mut RawFrameMesh, mesh: &tobj::Mesh) -> Result<()> {
    let malformed = |message: String| Error::MeshLoad {
        path: path.to_path_buf(),
        message,
    };

    let corner_count = mesh.indices.len();
    if mesh.normal_indices.is_empty() && corner_count > 0 {
        return Err(Error::MissingAttribute {
            path: path.to_path_buf(),
            attribute: "normal",
        });
    }
    if mesh.normal_indices.len() != corner_count {
        return Err(malformed(format!(
            "{} normal indices for {} corners",
            mesh.normal_indices.len(),
            corner_count
        )));
    }
    let has_texcoords = !mesh.texcoord_indices.is_empty();
    if has_texcoords && mesh.texcoord_indices.len() != corner_count {
        return Err(malformed(format!(
            "{} texcoord indices for {} corners",
            mesh.texcoord_indices.len(),
            corner_count
        )));
    }

    let counts: Vec<u32> = if mesh.face_arities.is_empty() {
        if corner_count % 3 != 0 {
            return Err(malformed(format!("{} corners do not form triangles", corner_count)));
        }
        vec![3; corner_count / 3]
    } else {
        mesh.face_arities.clone()
    };

    let position_base = frame.positions.len() as u32;
    let normal_base = frame.normals.len() as u32;
    let texcoord_base = frame.texcoords.len() as u32;

    frame
        .positions
        .extend(mesh.positions.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2])));
    frame
        .normals
        .extend(mesh.normals.chunks_exact(3).map(|n| Vec3::new(n[0], n[1], n[2])));
    frame
        .texcoords
        .extend(mesh.texcoords.chunks_exact(2).map(|t| Vec2::new(t[0], t[1])));

    for (i, (&position, &normal)) in mesh.indices.iter().zip(&mesh.normal_indices).enumerate() {
        frame.corners.push(Corner {
            position: position_base + position,
            normal: normal_base + normal,
            texcoord: has_texcoords.then(|| texcoord_base + mesh.texcoord_indices[i]),
        });
    }

    let material = mesh.material_id.map(|m| m as u32);
    frame.material_ids.extend(std::iter::repeat(material).take(counts.len()));
    frame.face_vertex_counts.extend(counts);
    Ok(())
}
