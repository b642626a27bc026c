//! UV unwrap of one frame through the atlas generator.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use tracing::trace;

use crate::atlas::{Atlas, ChartOptions, MeshDecl, PackOptions};
use crate::mesh::RawFrameMesh;
use crate::util::{Error, Result};

/// Material id declared for faces without a material.
const NO_MATERIAL: u32 = u32::MAX;

/// Atlas vertex with its UV normalized to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnwrappedVertex {
    pub uv: Vec2,
    /// First corner of the input mesh that produced this vertex.
    pub corner: u32,
}

/// Atlas layout of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct UnwrapResult {
    pub vertices: Vec<UnwrappedVertex>,
    /// Three atlas vertices per triangle.
    pub indices: Vec<u32>,
    /// Material of each triangle.
    pub face_materials: Vec<Option<u32>>,
    pub width: u32,
    pub height: u32,
    pub chart_count: usize,
}

/// Triangulated atlas input built from a frame's corners.
///
/// One input vertex per distinct (position, normal) pair.
pub(crate) struct AtlasInput {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Corner that first produced each input vertex.
    pub first_corner: Vec<u32>,
    pub indices: Vec<u32>,
    pub face_materials: Vec<Option<u32>>,
}

impl AtlasInput {
    pub(crate) fn from_frame(mesh: &RawFrameMesh) -> Result<Self> {
        let mut input = Self {
            positions: Vec::new(),
            normals: Vec::new(),
            first_corner: Vec::new(),
            indices: Vec::new(),
            face_materials: Vec::new(),
        };

        let mut vertex_of: HashMap<(u32, u32), u32> = HashMap::new();
        let mut corner_vertex = Vec::with_capacity(mesh.corners.len());
        for (index, corner) in mesh.corners.iter().enumerate() {
            let key = (corner.position, corner.normal);
            let vertex = match vertex_of.get(&key) {
                Some(&v) => v,
                None => {
                    let position = *mesh
                        .positions
                        .get(corner.position as usize)
                        .ok_or_else(|| Error::out_of_range("position", corner.position as usize, mesh.positions.len()))?;
                    let normal = *mesh
                        .normals
                        .get(corner.normal as usize)
                        .ok_or_else(|| Error::out_of_range("normal", corner.normal as usize, mesh.normals.len()))?;
                    let v = input.positions.len() as u32;
                    input.positions.push(position);
                    input.normals.push(normal);
                    input.first_corner.push(index as u32);
                    vertex_of.insert(key, v);
                    v
                }
            };
            corner_vertex.push(vertex);
        }

        // Fan-triangulate; the parser already delivers triangles.
        let mut start = 0usize;
        for (face, &count) in mesh.face_vertex_counts.iter().enumerate() {
            let count = count as usize;
            if count < 3 {
                return Err(Error::InconsistentSample(format!(
                    "face {} has {} corners",
                    face, count
                )));
            }
            let corners = corner_vertex
                .get(start..start + count)
                .ok_or_else(|| Error::out_of_range("corner", start + count - 1, corner_vertex.len()))?;
            let material = mesh.material_ids.get(face).copied().flatten();
            for i in 1..count - 1 {
                input.indices.extend([corners[0], corners[i], corners[i + 1]]);
                input.face_materials.push(material);
            }
            start += count;
        }
        Ok(input)
    }

    /// Declare the input to the generator, lay it out and map the result
    /// back onto corners.
    pub(crate) fn unwrap(&self, chart: &ChartOptions, pack: &PackOptions) -> Result<UnwrapResult> {
        let materials: Vec<u32> = self
            .face_materials
            .iter()
            .map(|m| m.unwrap_or(NO_MATERIAL))
            .collect();

        let mut atlas = Atlas::new();
        atlas.add_mesh(
            &MeshDecl::new(&self.positions, &self.indices)
                .with_normals(&self.normals)
                .with_face_materials(&materials),
        )?;
        atlas.generate(chart, pack)?;

        let mesh = atlas
            .meshes()
            .first()
            .ok_or_else(|| Error::other("atlas produced no mesh"))?;
        let size = Vec2::new(atlas.width() as f32, atlas.height() as f32);

        let vertices = mesh
            .vertices
            .iter()
            .map(|v| {
                let corner = *self
                    .first_corner
                    .get(v.xref as usize)
                    .ok_or_else(|| Error::out_of_range("atlas xref", v.xref as usize, self.first_corner.len()))?;
                Ok(UnwrappedVertex { uv: v.uv / size, corner })
            })
            .collect::<Result<Vec<_>>>()?;

        trace!(
            input_vertices = self.positions.len(),
            atlas_vertices = vertices.len(),
            charts = atlas.chart_count(),
            "frame unwrapped"
        );

        Ok(UnwrapResult {
            vertices,
            indices: mesh.indices.clone(),
            face_materials: self.face_materials.clone(),
            width: atlas.width(),
            height: atlas.height(),
            chart_count: atlas.chart_count(),
        })
    }
}

/// Unwrap one frame.
pub fn unwrap_frame(mesh: &RawFrameMesh, chart: &ChartOptions, pack: &PackOptions) -> Result<UnwrapResult> {
    AtlasInput::from_frame(mesh)?.unwrap(chart, pack)
}
