//! Non-indexed geometry parameters (normals, UVs).

use crate::core::{GeometryScope, MetaData, SampleData};
use crate::util::{DataType, Error, Result};

use super::super::property::OProperty;

/// One sample of a geometry parameter: values plus the scope that says
/// how they map onto the mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct OGeomParamSample<T> {
    pub values: Vec<T>,
    pub scope: GeometryScope,
}

impl<T> OGeomParamSample<T> {
    /// Create a new sample.
    pub fn new(values: Vec<T>, scope: GeometryScope) -> Self {
        Self { values, scope }
    }
}

/// Geometry parameter writer, stored as a simple array property.
///
/// The scope is fixed by the first sample; later samples must agree.
pub(crate) struct OGeomParam {
    prop: OProperty,
    interpretation: &'static str,
    scope: Option<GeometryScope>,
}

impl OGeomParam {
    pub(crate) fn new(name: &str, interpretation: &'static str, data_type: DataType) -> Self {
        Self {
            prop: OProperty::array(name, data_type),
            interpretation,
            scope: None,
        }
    }

    pub(crate) fn num_samples(&self) -> usize {
        self.prop.num_samples()
    }

    pub(crate) fn check_slot(&self, slot: u32) -> Result<()> {
        self.prop.check_slot(slot)
    }

    /// Check that `scope` agrees with the scope fixed by earlier samples.
    pub(crate) fn check_scope(&self, scope: GeometryScope) -> Result<()> {
        match self.scope {
            Some(fixed) if fixed != scope => Err(Error::InconsistentSample(format!(
                "{} scope changed from {} to {}",
                self.prop.name,
                fixed.as_str(),
                scope.as_str()
            ))),
            _ => Ok(()),
        }
    }

    /// Set an extra metadata entry (e.g. the UV source name).
    pub(crate) fn set_meta(&mut self, key: &str, value: &str) {
        self.prop.meta_data.set(key, value);
    }

    pub(crate) fn append(&mut self, slot: u32, scope: GeometryScope, data: SampleData) -> Result<()> {
        self.check_scope(scope)?;
        self.prop.check_slot(slot)?;
        if self.scope.is_none() {
            let mut meta = MetaData::new();
            meta.set("arrayExtent", "1");
            meta.set("geoScope", scope.as_str());
            meta.set(MetaData::INTERPRETATION_KEY, self.interpretation);
            meta.set("isGeomParam", "true");
            meta.set("podExtent", data.pod_extent().to_string());
            meta.set("podName", data.pod().name());
            // Keep entries set before the first sample.
            for (k, v) in self.prop.meta_data.iter() {
                meta.set(k, v);
            }
            self.prop.meta_data = meta;
            self.scope = Some(scope);
        }
        self.prop.append(slot, data)
    }

    /// Finish into a property, or `None` if it was never sampled.
    pub(crate) fn into_property(self, time_sampling_index: u32) -> Option<OProperty> {
        if self.prop.num_samples() == 0 {
            return None;
        }
        let mut prop = self.prop;
        prop.time_sampling_index = time_sampling_index;
        Some(prop)
    }
}
