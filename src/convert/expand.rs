//! Final per-frame mesh attributes.

use std::path::Path;

use glam::{Vec2, Vec3};

use super::unwrap::UnwrapResult;
use crate::core::GeometryScope;
use crate::mesh::RawFrameMesh;
use crate::util::{Error, Result};
use crate::writer::{OGeomParamSample, OPolyMeshSample};

/// A write-ready mesh sample plus the material of each of its faces.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandedFrame {
    pub sample: OPolyMeshSample,
    pub face_materials: Vec<Option<u32>>,
}

fn lookup<T: Copy>(what: &'static str, values: &[T], index: u32) -> Result<T> {
    values
        .get(index as usize)
        .copied()
        .ok_or_else(|| Error::out_of_range(what, index as usize, values.len()))
}

fn to_i32(what: &'static str, index: u32, len: usize) -> Result<i32> {
    if index as usize >= len {
        return Err(Error::out_of_range(what, index as usize, len));
    }
    i32::try_from(index).map_err(|_| Error::out_of_range(what, index as usize, i32::MAX as usize))
}

/// Attributes after unwrap: one point per atlas vertex.
///
/// Positions and normals follow each atlas vertex back to the corner
/// that produced it; UVs and normals are `Varying`. Triangles come from
/// the atlas. Bounds cover every position of the source frame.
pub fn expand_generated(mesh: &RawFrameMesh, unwrap: &UnwrapResult) -> Result<ExpandedFrame> {
    let count = unwrap.vertices.len();
    let mut positions = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(count);
    let mut uvs = Vec::with_capacity(count);
    for vertex in &unwrap.vertices {
        let corner = lookup("corner", &mesh.corners, vertex.corner)?;
        positions.push(lookup("position", &mesh.positions, corner.position)?);
        normals.push(lookup("normal", &mesh.normals, corner.normal)?);
        uvs.push(vertex.uv);
    }

    let face_indices = unwrap
        .indices
        .iter()
        .map(|&i| to_i32("atlas vertex", i, count))
        .collect::<Result<Vec<_>>>()?;
    let face_counts = vec![3; face_indices.len() / 3];

    let mut sample = OPolyMeshSample::new(positions, face_indices, face_counts);
    sample.normals = Some(OGeomParamSample::new(normals, GeometryScope::Varying));
    sample.uvs = Some(OGeomParamSample::new(uvs, GeometryScope::Varying));
    sample.self_bounds = Some(mesh.bounds());

    Ok(ExpandedFrame {
        sample,
        face_materials: unwrap.face_materials.clone(),
    })
}

/// Attributes without unwrap: source positions and topology, with the
/// parser's texcoords and normals per corner (`FaceVarying`).
pub fn expand_pass_through(path: &Path, mesh: &RawFrameMesh) -> Result<ExpandedFrame> {
    let corners = mesh.corners.len();
    let mut face_indices = Vec::with_capacity(corners);
    let mut uvs: Vec<Vec2> = Vec::with_capacity(corners);
    let mut normals: Vec<Vec3> = Vec::with_capacity(corners);
    for corner in &mesh.corners {
        face_indices.push(to_i32("position", corner.position, mesh.positions.len())?);
        let texcoord = corner.texcoord.ok_or_else(|| Error::MissingAttribute {
            path: path.to_path_buf(),
            attribute: "texcoord",
        })?;
        uvs.push(lookup("texcoord", &mesh.texcoords, texcoord)?);
        normals.push(lookup("normal", &mesh.normals, corner.normal)?);
    }

    let face_counts = mesh
        .face_vertex_counts
        .iter()
        .map(|&c| i32::try_from(c).map_err(|_| Error::InconsistentSample(format!("face with {} corners", c))))
        .collect::<Result<Vec<_>>>()?;

    let mut sample = OPolyMeshSample::new(mesh.positions.clone(), face_indices, face_counts);
    sample.normals = Some(OGeomParamSample::new(normals, GeometryScope::FaceVarying));
    sample.uvs = Some(OGeomParamSample::new(uvs, GeometryScope::FaceVarying));
    sample.self_bounds = Some(mesh.bounds());

    Ok(ExpandedFrame {
        sample,
        face_materials: mesh.material_ids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{ChartOptions, PackOptions};
    use crate::convert::unwrap::{unwrap_frame, UnwrappedVertex};
    use crate::mesh::Corner;
    use crate::util::BBox3d;

    /// Two triangles of a folded quad. The source file also held a far
    /// point no face references.
    fn frame() -> RawFrameMesh {
        let corners = [(0u32, 0u32), (1, 0), (2, 0), (0, 1), (2, 1), (3, 1)]
            .iter()
            .enumerate()
            .map(|(i, &(p, n))| Corner { position: p, normal: n, texcoord: Some(i as u32) })
            .collect();
        RawFrameMesh {
            positions: vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            normals: vec![Vec3::Z, Vec3::new(0.0, -1.0, 1.0).normalize()],
            texcoords: vec![Vec2::ZERO; 6],
            corners,
            face_vertex_counts: vec![3, 3],
            material_ids: vec![Some(0), Some(1)],
            source_bounds: BBox3d::from_points(&[Vec3::ZERO, Vec3::splat(10.0)]),
        }
    }

    #[test]
    fn test_generated_lengths_and_scopes() {
        let mesh = frame();
        let unwrap = unwrap_frame(&mesh, &ChartOptions::default(), &PackOptions::default()).unwrap();
        let expanded = expand_generated(&mesh, &unwrap).unwrap();
        let sample = &expanded.sample;

        assert!(sample.validate().is_ok());
        assert_eq!(sample.positions.len(), unwrap.vertices.len());
        assert_eq!(sample.face_counts, vec![3, 3]);
        let normals = sample.normals.as_ref().unwrap();
        assert_eq!(normals.scope, GeometryScope::Varying);
        assert_eq!(normals.values.len(), sample.positions.len());
        assert_eq!(expanded.face_materials, vec![Some(0), Some(1)]);

        // bounds come from the source records, not the atlas vertices
        let bounds = sample.self_bounds.unwrap();
        assert_eq!(bounds.max, glam::DVec3::splat(10.0));
        assert!(sample.positions.iter().all(|p| p.x <= 1.0));
    }

    #[test]
    fn test_generated_positions_follow_xref() {
        let mesh = frame();
        let unwrap = unwrap_frame(&mesh, &ChartOptions::default(), &PackOptions::default()).unwrap();
        let expanded = expand_generated(&mesh, &unwrap).unwrap();
        for (v, p) in unwrap.vertices.iter().zip(&expanded.sample.positions) {
            let corner = mesh.corners[v.corner as usize];
            assert_eq!(*p, mesh.positions[corner.position as usize]);
        }
    }

    #[test]
    fn test_generated_bad_xref() {
        let mesh = frame();
        let mut unwrap = unwrap_frame(&mesh, &ChartOptions::default(), &PackOptions::default()).unwrap();
        unwrap.vertices.push(UnwrappedVertex { uv: Vec2::ZERO, corner: 6 });
        assert!(matches!(
            expand_generated(&mesh, &unwrap),
            Err(Error::IndexOutOfRange { what: "corner", index: 6, len: 6 })
        ));
    }

    #[test]
    fn test_pass_through() {
        let mesh = frame();
        let expanded = expand_pass_through(Path::new("f.obj"), &mesh).unwrap();
        let sample = &expanded.sample;
        assert!(sample.validate().is_ok());
        assert_eq!(sample.positions.len(), 4);
        assert_eq!(sample.self_bounds.unwrap().max, glam::DVec3::splat(10.0));
        assert_eq!(sample.face_indices, vec![0, 1, 2, 0, 2, 3]);
        let uvs = sample.uvs.as_ref().unwrap();
        assert_eq!(uvs.scope, GeometryScope::FaceVarying);
        assert_eq!(uvs.values.len(), 6);
    }

    #[test]
    fn test_pass_through_needs_texcoords() {
        let mut mesh = frame();
        mesh.corners[2].texcoord = None;
        assert!(matches!(
            expand_pass_through(Path::new("f.obj"), &mesh),
            Err(Error::MissingAttribute { attribute: "texcoord", .. })
        ));
    }
}
