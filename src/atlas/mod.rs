//! UV atlas generation.
//!
//! Declared meshes are split into charts (connected regions of similar
//! orientation that never cross a material seam), each chart is
//! projected flat, and the charts are packed into one atlas in pixel
//! space.
//!
//! ```ignore
//! let mut atlas = Atlas::new();
//! atlas.add_mesh(&MeshDecl::new(&positions, &indices))?;
//! atlas.generate(&ChartOptions::default(), &PackOptions::default())?;
//! let mesh = &atlas.meshes()[0];
//! ```
//!
//! Output UVs are in pixels; divide by [`Atlas::width`] and
//! [`Atlas::height`] for normalized coordinates.

mod charts;
mod pack;

use glam::{Vec2, Vec3};
use thiserror::Error;
use tracing::debug;

use charts::Chart;

pub use pack::MAX_ATLAS_SIZE;

/// Mesh declaration rejected by [`Atlas::add_mesh`].
///
/// Messages start with the error code name.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddMeshError {
    /// An index is not smaller than the vertex count.
    #[error("IndexOutOfRange: index {index} >= vertex count {vertex_count}")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// The index count is not a multiple of three.
    #[error("InvalidIndexCount: {count} indices do not form whole triangles")]
    InvalidIndexCount { count: usize },

    /// A per-vertex attribute array has the wrong length.
    #[error("InvalidVertexAttributeCount: {attribute} has {count} entries, expected {vertex_count}")]
    InvalidVertexAttributeCount {
        attribute: &'static str,
        count: usize,
        vertex_count: usize,
    },

    /// The face material array has the wrong length.
    #[error("InvalidFaceMaterialCount: {count} face materials for {face_count} faces")]
    InvalidFaceMaterialCount { count: usize, face_count: usize },
}

/// Triangle mesh declaration.
#[derive(Clone, Copy, Debug)]
pub struct MeshDecl<'a> {
    pub positions: &'a [Vec3],
    /// Per-vertex normals, or empty.
    pub normals: &'a [Vec3],
    /// Three indices per triangle.
    pub indices: &'a [u32],
    /// One material per triangle, or empty. Charts never cross materials.
    pub face_materials: &'a [u32],
}

impl<'a> MeshDecl<'a> {
    pub fn new(positions: &'a [Vec3], indices: &'a [u32]) -> Self {
        Self {
            positions,
            normals: &[],
            indices,
            face_materials: &[],
        }
    }

    pub fn with_normals(mut self, normals: &'a [Vec3]) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_face_materials(mut self, face_materials: &'a [u32]) -> Self {
        self.face_materials = face_materials;
        self
    }

    fn validate(&self) -> Result<(), AddMeshError> {
        let vertex_count = self.positions.len();
        if self.indices.len() % 3 != 0 {
            return Err(AddMeshError::InvalidIndexCount {
                count: self.indices.len(),
            });
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(AddMeshError::IndexOutOfRange { index, vertex_count });
        }
        if !self.normals.is_empty() && self.normals.len() != vertex_count {
            return Err(AddMeshError::InvalidVertexAttributeCount {
                attribute: "normals",
                count: self.normals.len(),
                vertex_count,
            });
        }
        let face_count = self.indices.len() / 3;
        if !self.face_materials.is_empty() && self.face_materials.len() != face_count {
            return Err(AddMeshError::InvalidFaceMaterialCount {
                count: self.face_materials.len(),
                face_count,
            });
        }
        Ok(())
    }
}

/// Chart generation options.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartOptions {
    /// Largest angle in degrees between a face and its chart's seed face.
    pub max_normal_deviation: f32,
    /// Mirror charts whose projection came out clockwise.
    pub fix_winding: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            max_normal_deviation: 60.0,
            fix_winding: true,
        }
    }
}

/// Chart packing options.
#[derive(Clone, Debug, PartialEq)]
pub struct PackOptions {
    /// Target atlas width in pixels; 0 picks one from the chart area.
    pub resolution: u32,
    /// Empty pixels around every chart.
    pub padding: u32,
    /// Pixels per world unit; 0 derives it from the resolution.
    pub texels_per_unit: f32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            resolution: 0,
            padding: 1,
            texels_per_unit: 0.0,
        }
    }
}

/// Output vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasVertex {
    /// Position in the atlas, in pixels.
    pub uv: Vec2,
    /// Input vertex this vertex was created from.
    pub xref: u32,
    pub chart_index: u32,
}

/// Output mesh, one per declared mesh.
///
/// Triangles keep the order of the declared triangles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AtlasMesh {
    pub vertices: Vec<AtlasVertex>,
    pub indices: Vec<u32>,
}

struct InputMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    face_materials: Vec<u32>,
}

impl InputMesh {
    fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn face_material(&self, face: usize) -> u32 {
        self.face_materials.get(face).copied().unwrap_or(0)
    }
}

/// Atlas generator.
#[derive(Default)]
pub struct Atlas {
    meshes: Vec<InputMesh>,
    charts: Vec<Chart>,
    charts_computed: bool,
    output: Vec<AtlasMesh>,
    width: u32,
    height: u32,
    texels_per_unit: f32,
}

impl Atlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a mesh. Invalidates charts computed so far.
    pub fn add_mesh(&mut self, decl: &MeshDecl<'_>) -> Result<(), AddMeshError> {
        decl.validate()?;
        self.meshes.push(InputMesh {
            positions: decl.positions.to_vec(),
            normals: decl.normals.to_vec(),
            indices: decl.indices.to_vec(),
            face_materials: decl.face_materials.to_vec(),
        });
        self.charts.clear();
        self.charts_computed = false;
        self.output.clear();
        Ok(())
    }

    /// Split every declared mesh into flat-projected charts.
    pub fn compute_charts(&mut self, options: &ChartOptions) {
        self.charts = self
            .meshes
            .iter()
            .enumerate()
            .flat_map(|(index, mesh)| charts::build_charts(mesh, index, options))
            .collect();
        self.charts_computed = true;
        self.output.clear();
        debug!(charts = self.charts.len(), "charts computed");
    }

    /// Pack charts into the atlas and build the output meshes.
    ///
    /// Computes charts with default options if that has not happened yet.
    /// Fails if the packed atlas would exceed [`MAX_ATLAS_SIZE`] pixels
    /// on a side.
    pub fn pack_charts(&mut self, options: &PackOptions) -> crate::Result<()> {
        if !self.charts_computed {
            self.compute_charts(&ChartOptions::default());
        }
        let layout = pack::pack(&self.charts, options)?;
        self.width = layout.width;
        self.height = layout.height;
        self.texels_per_unit = layout.texels_per_unit;
        self.output = self.build_output(&layout);
        debug!(
            width = self.width,
            height = self.height,
            texels_per_unit = self.texels_per_unit,
            "charts packed"
        );
        Ok(())
    }

    /// Compute charts and pack them.
    pub fn generate(&mut self, chart_options: &ChartOptions, pack_options: &PackOptions) -> crate::Result<()> {
        self.compute_charts(chart_options);
        self.pack_charts(pack_options)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }

    pub fn texels_per_unit(&self) -> f32 {
        self.texels_per_unit
    }

    /// Output meshes, in declaration order. Empty until packed.
    pub fn meshes(&self) -> &[AtlasMesh] {
        &self.output
    }

    fn build_output(&self, layout: &pack::Layout) -> Vec<AtlasMesh> {
        let mut output: Vec<AtlasMesh> = self.meshes.iter().map(|_| AtlasMesh::default()).collect();
        // (chart, position of the face within the chart) per face
        let mut face_slots: Vec<Vec<(u32, u32)>> = self
            .meshes
            .iter()
            .map(|m| vec![(0, 0); m.face_count()])
            .collect();
        for (chart_index, chart) in self.charts.iter().enumerate() {
            for (slot, &face) in chart.faces.iter().enumerate() {
                face_slots[chart.mesh][face as usize] = (chart_index as u32, slot as u32);
            }
        }

        let mut atlas_ids: Vec<Vec<Option<u32>>> =
            self.charts.iter().map(|c| vec![None; c.vertices.len()]).collect();
        for (mesh_index, out) in output.iter_mut().enumerate() {
            for &(chart_index, slot) in &face_slots[mesh_index] {
                let chart = &self.charts[chart_index as usize];
                let offset = layout.offsets[chart_index as usize];
                for corner in 0..3 {
                    let local = chart.local_indices[slot as usize * 3 + corner] as usize;
                    let id = match atlas_ids[chart_index as usize][local] {
                        Some(id) => id,
                        None => {
                            let id = out.vertices.len() as u32;
                            out.vertices.push(AtlasVertex {
                                uv: offset + chart.uvs[local] * layout.texels_per_unit,
                                xref: chart.vertices[local],
                                chart_index,
                            });
                            atlas_ids[chart_index as usize][local] = Some(id);
                            id
                        }
                    };
                    out.indices.push(id);
                }
            }
        }
        output
    }
}
