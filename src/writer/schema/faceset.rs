//! FaceSet schema writer.

use crate::core::{MetaData, SampleData};
use crate::util::{DataType, Error, Result};

use super::super::object::OObject;
use super::super::property::{OProperty, OPropertyData};

/// Material assignment property name.
pub const MATERIAL_ASSIGN_PROPERTY: &str = ".material.assign";

const FACESET_SCHEMA: &str = "AbcGeom_FaceSet_v1";

/// FaceSet sample data for output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OFaceSetSample {
    pub faces: Vec<i32>,
}

impl OFaceSetSample {
    /// Create new FaceSet sample.
    pub fn new(faces: Vec<i32>) -> Self {
        Self { faces }
    }

    /// A sample selecting no faces.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// FaceSet schema writer.
pub struct OFaceSet {
    object: OObject,
    faces: OProperty,
    material_assign: Option<String>,
    time_sampling_index: u32,
}

impl OFaceSet {
    /// Create new FaceSet.
    pub fn new(name: &str) -> Self {
        let object = OObject::new(name)
            .with_meta_data(MetaData::for_schema(FACESET_SCHEMA, Some("AbcGeom_GeomBase_v1"), ".faceset"));
        Self {
            object,
            faces: OProperty::array(".faces", DataType::INT32),
            material_assign: None,
            time_sampling_index: 0,
        }
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.object.name
    }

    /// Set time sampling index. Must happen before the first sample.
    pub fn set_time_sampling(&mut self, index: u32) -> Result<()> {
        if self.faces.num_samples() > 0 {
            return Err(Error::other(format!(
                "FaceSet {}: time sampling must be set before the first sample",
                self.object.name
            )));
        }
        self.time_sampling_index = index;
        Ok(())
    }

    /// Slot the next sample must target.
    pub fn next_slot(&self) -> u32 {
        self.faces.next_slot()
    }

    /// Assign a material by archive path.
    pub fn set_material_assignment(&mut self, material_path: &str) {
        self.material_assign = Some(material_path.to_string());
    }

    /// Add a sample at `slot`.
    pub fn add_sample(&mut self, slot: u32, sample: &OFaceSetSample) -> Result<()> {
        if let Some(bad) = sample.faces.iter().find(|&&f| f < 0) {
            return Err(Error::InconsistentSample(format!(
                "FaceSet {} has negative face index {}",
                self.object.name, bad
            )));
        }
        self.faces.append(slot, SampleData::Int32(sample.faces.clone()))
    }

    /// Largest face index over all samples, if any face was written.
    pub fn max_face_index(&self) -> Option<i32> {
        (0..self.faces.num_samples())
            .filter_map(|i| self.faces.sample(i))
            .filter_map(|s| s.as_i32())
            .flat_map(|faces| faces.iter().copied())
            .max()
    }

    /// Build the object.
    pub fn build(mut self) -> OObject {
        let mut faces = self.faces;
        faces.time_sampling_index = self.time_sampling_index;
        let mut children = vec![faces];

        if let Some(path) = self.material_assign {
            let mut assign = OProperty::scalar(MATERIAL_ASSIGN_PROPERTY, DataType::STRING);
            assign.data = OPropertyData::Scalar {
                data_type: DataType::STRING,
                samples: vec![SampleData::String(vec![path])],
            };
            children.push(assign);
        }

        let mut meta = MetaData::new();
        meta.set(MetaData::SCHEMA_KEY, FACESET_SCHEMA);
        meta.set(MetaData::SCHEMA_BASE_KEY, "AbcGeom_GeomBase_v1");
        let mut faceset = OProperty::compound(".faceset").with_meta_data(meta);
        faceset.data = OPropertyData::Compound { children };

        self.object.add_property(faceset);
        self.object
    }
}
