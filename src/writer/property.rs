//! Output property types.
//!
//! Every scalar and array property owns an explicit next-sample slot.
//! A sample is only accepted at that slot, so a writer that receives
//! frames out of order fails loudly instead of silently shifting every
//! later sample onto the wrong time.

use serde::Serialize;

use crate::core::{MetaData, SampleData};
use crate::util::{DataType, Error, Result};

/// Property data variants.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OPropertyData {
    /// One value of `data_type` per sample.
    Scalar { data_type: DataType, samples: Vec<SampleData> },
    /// One array of `data_type` elements per sample.
    Array { data_type: DataType, samples: Vec<SampleData> },
    /// Child properties.
    Compound { children: Vec<OProperty> },
}

/// Property for writing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OProperty {
    /// Property name.
    pub name: String,
    /// Metadata.
    #[serde(skip_serializing_if = "MetaData::is_empty")]
    pub meta_data: MetaData,
    /// Time sampling index into the archive's sampling table.
    pub time_sampling_index: u32,
    /// Property data.
    #[serde(flatten)]
    pub data: OPropertyData,
}

impl OProperty {
    fn with_data(name: &str, data: OPropertyData) -> Self {
        Self {
            name: name.to_string(),
            meta_data: MetaData::new(),
            time_sampling_index: 0,
            data,
        }
    }

    /// Create a scalar property.
    pub fn scalar(name: &str, data_type: DataType) -> Self {
        Self::with_data(name, OPropertyData::Scalar { data_type, samples: Vec::new() })
    }

    /// Create an array property.
    pub fn array(name: &str, data_type: DataType) -> Self {
        Self::with_data(name, OPropertyData::Array { data_type, samples: Vec::new() })
    }

    /// Create a compound property.
    pub fn compound(name: &str) -> Self {
        Self::with_data(name, OPropertyData::Compound { children: Vec::new() })
    }

    /// Set metadata.
    pub fn with_meta_data(mut self, md: MetaData) -> Self {
        self.meta_data = md;
        self
    }

    /// Element type, `None` for compounds.
    pub fn data_type(&self) -> Option<DataType> {
        match &self.data {
            OPropertyData::Scalar { data_type, .. } | OPropertyData::Array { data_type, .. } => {
                Some(*data_type)
            }
            OPropertyData::Compound { .. } => None,
        }
    }

    /// Slot the next appended sample must target.
    pub fn next_slot(&self) -> u32 {
        self.num_samples() as u32
    }

    /// Get number of samples (0 for compounds).
    pub fn num_samples(&self) -> usize {
        match &self.data {
            OPropertyData::Scalar { samples, .. } | OPropertyData::Array { samples, .. } => samples.len(),
            OPropertyData::Compound { .. } => 0,
        }
    }

    /// Borrow a written sample.
    pub fn sample(&self, index: usize) -> Option<&SampleData> {
        match &self.data {
            OPropertyData::Scalar { samples, .. } | OPropertyData::Array { samples, .. } => {
                samples.get(index)
            }
            OPropertyData::Compound { .. } => None,
        }
    }

    /// Check that `slot` is this property's next slot.
    pub fn check_slot(&self, slot: u32) -> Result<()> {
        let expected = self.next_slot();
        if slot != expected {
            return Err(Error::SampleSlot {
                property: self.name.clone(),
                expected,
                actual: slot,
            });
        }
        Ok(())
    }

    /// Append a sample at `slot`, advancing the next slot by one.
    ///
    /// The sample must hold values of the property's type: a scalar
    /// takes exactly one element, an array any number.
    pub fn append(&mut self, slot: u32, sample: SampleData) -> Result<()> {
        self.check_slot(slot)?;
        let name = &self.name;
        let mismatch = |data_type: &DataType, sample: &SampleData| {
            Error::InconsistentSample(format!(
                "property {} holds {}, got {} x{} values",
                name,
                data_type,
                sample.pod(),
                sample.len() * sample.pod_extent()
            ))
        };
        match &mut self.data {
            OPropertyData::Scalar { data_type, samples } => {
                let extent = sample.len() * sample.pod_extent();
                if sample.pod() != data_type.pod || extent != data_type.extent as usize {
                    return Err(mismatch(data_type, &sample));
                }
                samples.push(sample);
                Ok(())
            }
            OPropertyData::Array { data_type, samples } => {
                if sample.pod() != data_type.pod || sample.pod_extent() != data_type.extent as usize {
                    return Err(mismatch(data_type, &sample));
                }
                samples.push(sample);
                Ok(())
            }
            OPropertyData::Compound { .. } => Err(Error::other(format!(
                "Cannot append a sample to compound property {}",
                self.name
            ))),
        }
    }

    /// Add a child property (compounds only).
    pub fn add_child(&mut self, prop: OProperty) -> Result<()> {
        match &mut self.data {
            OPropertyData::Compound { children } => {
                children.push(prop);
                Ok(())
            }
            _ => Err(Error::other(format!("Property {} is not a compound", self.name))),
        }
    }

    /// Find a child property by name (compounds only).
    pub fn child(&self, name: &str) -> Option<&OProperty> {
        match &self.data {
            OPropertyData::Compound { children } => children.iter().find(|p| p.name == name),
            _ => None,
        }
    }
}
