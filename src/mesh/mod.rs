//! Raw frame meshes as read from disk.
//!
//! Positions, normals and texcoords are indexed independently per
//! corner, the way OBJ stores them.

mod obj;

pub use obj::{load_frame, mesh_from_models};

use glam::{Vec2, Vec3};

use crate::util::{BBox3d, Error, Result};

/// One face corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Corner {
    pub position: u32,
    pub normal: u32,
    pub texcoord: Option<u32>,
}

/// A frame's mesh, before any UV or attribute processing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawFrameMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub texcoords: Vec<Vec2>,
    /// Corners of all faces, face after face.
    pub corners: Vec<Corner>,
    pub face_vertex_counts: Vec<u32>,
    /// Index into the frame's active material list; `None` when the
    /// parser could not resolve the face's material.
    pub material_ids: Vec<Option<u32>>,
    /// Bounds of every position record in the source file, referenced
    /// by a face or not.
    pub source_bounds: BBox3d,
}

impl RawFrameMesh {
    pub fn num_faces(&self) -> usize {
        self.face_vertex_counts.len()
    }

    pub fn num_corners(&self) -> usize {
        self.corners.len()
    }

    /// Check that arrays agree in length and every corner index resolves.
    pub fn validate(&self) -> Result<()> {
        let corners: usize = self.face_vertex_counts.iter().map(|&c| c as usize).sum();
        if corners != self.corners.len() {
            return Err(Error::InconsistentSample(format!(
                "face vertex counts sum to {} but the mesh has {} corners",
                corners,
                self.corners.len()
            )));
        }
        if self.material_ids.len() != self.num_faces() {
            return Err(Error::InconsistentSample(format!(
                "{} material ids for {} faces",
                self.material_ids.len(),
                self.num_faces()
            )));
        }
        for corner in &self.corners {
            check_index("position", corner.position, self.positions.len())?;
            check_index("normal", corner.normal, self.normals.len())?;
            if let Some(t) = corner.texcoord {
                check_index("texcoord", t, self.texcoords.len())?;
            }
        }
        Ok(())
    }

    /// Whether every corner carries a texcoord index.
    pub fn has_texcoords(&self) -> bool {
        self.corners.iter().all(|c| c.texcoord.is_some())
    }

    /// Bounds of the source positions together with the mesh positions.
    pub fn bounds(&self) -> BBox3d {
        let mut bounds = BBox3d::from_points(&self.positions);
        bounds.expand_by_box(&self.source_bounds);
        bounds
    }
}

fn check_index(what: &'static str, index: u32, len: usize) -> Result<()> {
    if index as usize >= len {
        return Err(Error::out_of_range(what, index as usize, len));
    }
    Ok(())
}
