//! Material schema writer.

use crate::core::{MetaData, SampleData};
use crate::util::DataType;

use super::super::object::OObject;
use super::super::property::{OProperty, OPropertyData};

const MATERIAL_SCHEMA: &str = "AbcMaterial_Material_v1";

/// Shader binding: target renderer, shader type and shader name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderBinding {
    pub target: String,
    pub shader_type: String,
    pub shader_name: String,
}

impl ShaderBinding {
    pub fn new(target: &str, shader_type: &str, shader_name: &str) -> Self {
        Self {
            target: target.to_string(),
            shader_type: shader_type.to_string(),
            shader_name: shader_name.to_string(),
        }
    }
}

impl Default for ShaderBinding {
    /// Standard surface shader for the Unity target.
    fn default() -> Self {
        Self::new("unity", "surface", "standard")
    }
}

/// Material schema writer.
pub struct OMaterial {
    object: OObject,
    shaders: Vec<ShaderBinding>,
}

impl OMaterial {
    /// Create new Material.
    pub fn new(name: &str) -> Self {
        let object = OObject::new(name)
            .with_meta_data(MetaData::for_schema(MATERIAL_SCHEMA, None, ".material"));
        Self { object, shaders: Vec::new() }
    }

    /// Add a shader, replacing an existing one with the same target and type.
    pub fn add_shader(&mut self, target: &str, shader_type: &str, shader_name: &str) {
        let binding = ShaderBinding::new(target, shader_type, shader_name);
        match self
            .shaders
            .iter_mut()
            .find(|s| s.target == target && s.shader_type == shader_type)
        {
            Some(existing) => *existing = binding,
            None => self.shaders.push(binding),
        }
    }

    /// Shader bindings in insertion order.
    pub fn shaders(&self) -> &[ShaderBinding] {
        &self.shaders
    }

    /// Build the object.
    pub fn build(mut self) -> OObject {
        let mut targets: Vec<&str> = Vec::new();
        for s in &self.shaders {
            if !targets.contains(&s.target.as_str()) {
                targets.push(&s.target);
            }
        }

        let mut children = Vec::new();
        if !targets.is_empty() {
            children.push(string_scalar(".targets", targets.join(";")));
            for target in &targets {
                let types: Vec<&str> = self
                    .shaders
                    .iter()
                    .filter(|s| s.target == *target)
                    .map(|s| s.shader_type.as_str())
                    .collect();
                children.push(string_scalar(&format!(".{}.shaderTypes", target), types.join(";")));
            }
            for s in &self.shaders {
                children.push(string_scalar(
                    &format!(".{}.{}.shaderName", s.target, s.shader_type),
                    s.shader_name.clone(),
                ));
            }
        }

        let mut meta = MetaData::new();
        meta.set(MetaData::SCHEMA_KEY, MATERIAL_SCHEMA);
        let mut mat = OProperty::compound(".material").with_meta_data(meta);
        mat.data = OPropertyData::Compound { children };

        self.object.add_property(mat);
        self.object
    }
}

fn string_scalar(name: &str, value: String) -> OProperty {
    let mut prop = OProperty::scalar(name, DataType::STRING);
    prop.data = OPropertyData::Scalar {
        data_type: DataType::STRING,
        samples: vec![SampleData::String(vec![value])],
    };
    prop
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_string<'a>(prop: &'a OProperty, name: &str) -> Option<&'a str> {
        prop.child(name)
            .and_then(|p| p.sample(0))
            .and_then(|s| s.as_strings())
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    #[test]
    fn test_material_shader_binding() {
        let mut mat = OMaterial::new("red");
        let b = ShaderBinding::default();
        mat.add_shader(&b.target, &b.shader_type, &b.shader_name);

        let obj = mat.build();
        assert_eq!(obj.meta_data.schema(), Some("AbcMaterial_Material_v1"));
        let compound = obj.property(".material").unwrap();
        assert_eq!(scalar_string(compound, ".targets"), Some("unity"));
        assert_eq!(scalar_string(compound, ".unity.shaderTypes"), Some("surface"));
        assert_eq!(scalar_string(compound, ".unity.surface.shaderName"), Some("standard"));
    }

    #[test]
    fn test_shader_replaced() {
        let mut mat = OMaterial::new("red");
        mat.add_shader("unity", "surface", "standard");
        mat.add_shader("unity", "surface", "unlit");
        assert_eq!(mat.shaders().len(), 1);
        assert_eq!(mat.shaders()[0].shader_name, "unlit");
    }
}
