//! PolyMesh schema writer.

use glam::{Vec2, Vec3};

use crate::core::{MetaData, SampleData};
use crate::util::{BBox3d, DataType, Error, Result};

use super::super::object::OObject;
use super::super::property::{OProperty, OPropertyData};
use super::faceset::OFaceSet;
use super::geom_param::{OGeomParam, OGeomParamSample};

const POLYMESH_SCHEMA: &str = "AbcGeom_PolyMesh_v1";

/// PolyMesh sample data.
#[derive(Clone, Debug, PartialEq)]
pub struct OPolyMeshSample {
    pub positions: Vec<Vec3>,
    pub face_indices: Vec<i32>,
    pub face_counts: Vec<i32>,
    pub normals: Option<OGeomParamSample<Vec3>>,
    pub uvs: Option<OGeomParamSample<Vec2>>,
    /// Explicit self bounds (if None, computed from positions).
    pub self_bounds: Option<BBox3d>,
}

impl OPolyMeshSample {
    /// Create new sample with required data.
    pub fn new(positions: Vec<Vec3>, face_indices: Vec<i32>, face_counts: Vec<i32>) -> Self {
        Self {
            positions,
            face_indices,
            face_counts,
            normals: None,
            uvs: None,
            self_bounds: None,
        }
    }

    /// Check topology and geom param lengths against each other.
    pub fn validate(&self) -> Result<()> {
        let mut corners = 0usize;
        for &count in &self.face_counts {
            if count < 1 {
                return Err(Error::InconsistentSample(format!("face count {} is not positive", count)));
            }
            corners += count as usize;
        }
        if corners != self.face_indices.len() {
            return Err(Error::InconsistentSample(format!(
                "face counts sum to {} but there are {} face indices",
                corners,
                self.face_indices.len()
            )));
        }

        let num_points = self.positions.len();
        for &index in &self.face_indices {
            if index < 0 || index as usize >= num_points {
                return Err(Error::out_of_range("face", index.max(0) as usize, num_points));
            }
        }

        let num_faces = self.face_counts.len();
        if let Some(n) = &self.normals {
            check_param_len("N", n.values.len(), n.scope.expected_len(num_points, num_faces, corners))?;
        }
        if let Some(uv) = &self.uvs {
            check_param_len("uv", uv.values.len(), uv.scope.expected_len(num_points, num_faces, corners))?;
        }
        Ok(())
    }

    /// Number of faces.
    pub fn num_faces(&self) -> usize {
        self.face_counts.len()
    }
}

fn check_param_len(name: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::InconsistentSample(format!(
            "{} has {} values, its scope requires {}",
            name, actual, expected
        )));
    }
    Ok(())
}

/// PolyMesh schema writer.
///
/// Face sets are child objects of the mesh and share its sample slots.
pub struct OPolyMesh {
    object: OObject,
    self_bnds: OProperty,
    child_bnds: OProperty,
    positions: OProperty,
    face_indices: OProperty,
    face_counts: OProperty,
    normals: OGeomParam,
    uvs: OGeomParam,
    face_sets: Vec<OFaceSet>,
    max_faces: usize,
    time_sampling_index: u32,
}

impl OPolyMesh {
    /// Create a new PolyMesh.
    pub fn new(name: &str) -> Self {
        let object = OObject::new(name).with_meta_data(MetaData::for_schema(
            POLYMESH_SCHEMA,
            Some("AbcGeom_GeomBase_v1"),
            ".geom",
        ));

        let mut p_meta = MetaData::new();
        p_meta.set(MetaData::INTERPRETATION_KEY, "point");
        let mut bnds_meta = MetaData::new();
        bnds_meta.set(MetaData::INTERPRETATION_KEY, "box");

        Self {
            object,
            self_bnds: OProperty::scalar(".selfBnds", DataType::BOX3D).with_meta_data(bnds_meta.clone()),
            child_bnds: OProperty::scalar(".childBnds", DataType::BOX3D).with_meta_data(bnds_meta),
            positions: OProperty::array("P", DataType::VEC3F).with_meta_data(p_meta),
            face_indices: OProperty::array(".faceIndices", DataType::INT32),
            face_counts: OProperty::array(".faceCounts", DataType::INT32),
            normals: OGeomParam::new("N", "normal", DataType::VEC3F),
            uvs: OGeomParam::new("uv", "vector", DataType::VEC2F),
            face_sets: Vec::new(),
            max_faces: 0,
            time_sampling_index: 0,
        }
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.object.name
    }

    /// Set time sampling index. Must happen before the first sample.
    pub fn set_time_sampling(&mut self, index: u32) -> Result<()> {
        if self.positions.num_samples() > 0 {
            return Err(Error::other(format!(
                "PolyMesh {}: time sampling must be set before the first sample",
                self.object.name
            )));
        }
        self.time_sampling_index = index;
        Ok(())
    }

    /// Time sampling index.
    pub fn time_sampling(&self) -> u32 {
        self.time_sampling_index
    }

    /// Name the UV set; readers use it as the source name of `uv`.
    pub fn set_uv_source_name(&mut self, name: &str) {
        self.uvs.set_meta("uvSourceName", name);
    }

    /// Slot the next sample must target.
    pub fn next_slot(&self) -> u32 {
        self.positions.next_slot()
    }

    /// Add a sample at `slot`.
    ///
    /// The sample is validated and every slot checked before anything is
    /// appended, so a rejected sample leaves the mesh unchanged.
    pub fn add_sample(&mut self, slot: u32, sample: &OPolyMeshSample) -> Result<()> {
        sample.validate()?;
        self.positions.check_slot(slot)?;
        self.check_param_presence(slot, sample)?;
        if let Some(n) = &sample.normals {
            self.normals.check_scope(n.scope)?;
        }
        if let Some(uv) = &sample.uvs {
            self.uvs.check_scope(uv.scope)?;
        }

        let bounds = sample
            .self_bounds
            .unwrap_or_else(|| BBox3d::from_points(&sample.positions));
        let bounds = SampleData::Float64(bounds.to_array().to_vec());
        self.self_bnds.append(slot, bounds.clone())?;
        self.child_bnds.append(slot, bounds)?;
        self.positions.append(
            slot,
            SampleData::Vec3f(sample.positions.iter().map(|p| p.to_array()).collect()),
        )?;
        self.face_indices
            .append(slot, SampleData::Int32(sample.face_indices.clone()))?;
        self.face_counts
            .append(slot, SampleData::Int32(sample.face_counts.clone()))?;
        if let Some(n) = &sample.normals {
            self.normals.append(
                slot,
                n.scope,
                SampleData::Vec3f(n.values.iter().map(|v| v.to_array()).collect()),
            )?;
        }
        if let Some(uv) = &sample.uvs {
            self.uvs.append(
                slot,
                uv.scope,
                SampleData::Vec2f(uv.values.iter().map(|v| v.to_array()).collect()),
            )?;
        }
        self.max_faces = self.max_faces.max(sample.num_faces());
        Ok(())
    }

    /// Optional params are either written for every sample or never.
    fn check_param_presence(&self, slot: u32, sample: &OPolyMeshSample) -> Result<()> {
        let check = |name: &str, written: usize, present: bool| -> Result<()> {
            let consistent = if present { written == slot as usize } else { written == 0 };
            if !consistent {
                return Err(Error::InconsistentSample(format!(
                    "{} must be present in every sample or in none",
                    name
                )));
            }
            Ok(())
        };
        check("N", self.normals.num_samples(), sample.normals.is_some())?;
        check("uv", self.uvs.num_samples(), sample.uvs.is_some())?;
        if sample.normals.is_some() {
            self.normals.check_slot(slot)?;
        }
        if sample.uvs.is_some() {
            self.uvs.check_slot(slot)?;
        }
        Ok(())
    }

    /// Create a face set child. Its time sampling follows the mesh.
    pub fn create_face_set(&mut self, name: &str) -> Result<&mut OFaceSet> {
        if self.face_sets.iter().any(|fs| fs.name() == name) {
            return Err(Error::other(format!(
                "PolyMesh {} already has a face set named {}",
                self.object.name, name
            )));
        }
        let mut face_set = OFaceSet::new(name);
        face_set.set_time_sampling(self.time_sampling_index)?;
        self.face_sets.push(face_set);
        let index = self.face_sets.len() - 1;
        Ok(&mut self.face_sets[index])
    }

    /// Get a face set by name.
    pub fn face_set_mut(&mut self, name: &str) -> Option<&mut OFaceSet> {
        self.face_sets.iter_mut().find(|fs| fs.name() == name)
    }

    /// Face sets in creation order.
    pub fn face_sets(&self) -> &[OFaceSet] {
        &self.face_sets
    }

    /// Build the object.
    ///
    /// Fails if a face set selects a face past the largest face count
    /// written to the mesh.
    pub fn build(mut self) -> Result<OObject> {
        for fs in &self.face_sets {
            if let Some(max) = fs.max_face_index() {
                if max as usize >= self.max_faces {
                    return Err(Error::out_of_range("face set face", max as usize, self.max_faces));
                }
            }
        }

        let ts = self.time_sampling_index;
        let mut children = Vec::new();
        for mut prop in [
            self.self_bnds,
            self.child_bnds,
            self.positions,
            self.face_indices,
            self.face_counts,
        ] {
            prop.time_sampling_index = ts;
            children.push(prop);
        }
        children.extend(self.normals.into_property(ts));
        children.extend(self.uvs.into_property(ts));

        let mut meta = MetaData::new();
        meta.set(MetaData::SCHEMA_KEY, POLYMESH_SCHEMA);
        meta.set(MetaData::SCHEMA_BASE_KEY, "AbcGeom_GeomBase_v1");
        let mut geom = OProperty::compound(".geom").with_meta_data(meta);
        geom.data = OPropertyData::Compound { children };
        self.object.add_property(geom);

        for fs in self.face_sets {
            self.object.add_child(fs.build());
        }
        Ok(self.object)
    }
}
