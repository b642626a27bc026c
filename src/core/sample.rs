//! Sample payloads and geometry scopes.

use serde::{Deserialize, Serialize};

use crate::util::{DataType, Error, PlainOldDataType, Result};

/// Geometry scope for geom params (how values map onto the mesh).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GeometryScope {
    /// Constant for entire object.
    #[default]
    Constant,
    /// Per-face.
    Uniform,
    /// Per-vertex, interpolated across faces.
    Varying,
    /// Per-vertex.
    Vertex,
    /// Per-face-vertex (corner).
    FaceVarying,
}

impl GeometryScope {
    /// Parse from string (as stored in metadata).
    pub fn parse(s: &str) -> Self {
        match s {
            "uni" | "uniform" => Self::Uniform,
            "var" | "varying" => Self::Varying,
            "vtx" | "vertex" => Self::Vertex,
            "fvr" | "facevarying" => Self::FaceVarying,
            _ => Self::Constant,
        }
    }

    /// Convert to short string for metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "con",
            Self::Uniform => "uni",
            Self::Varying => "var",
            Self::Vertex => "vtx",
            Self::FaceVarying => "fvr",
        }
    }

    /// Expected element count for a mesh with the given shape.
    pub fn expected_len(&self, num_points: usize, num_faces: usize, num_corners: usize) -> usize {
        match self {
            Self::Constant => 1,
            Self::Uniform => num_faces,
            Self::Varying | Self::Vertex => num_points,
            Self::FaceVarying => num_corners,
        }
    }
}

/// Typed payload of one property sample.
///
/// Tagged by POD name so the archive document is self-describing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pod", content = "values", rename_all = "snake_case")]
pub enum SampleData {
    Int32(Vec<i32>),
    Float64(Vec<f64>),
    Vec2f(Vec<[f32; 2]>),
    Vec3f(Vec<[f32; 3]>),
    String(Vec<String>),
}

impl SampleData {
    /// Number of elements (not scalars) in the sample.
    pub fn len(&self) -> usize {
        match self {
            Self::Int32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Vec2f(v) => v.len(),
            Self::Vec3f(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    /// Check for an empty sample.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// POD type of the values.
    pub fn pod(&self) -> PlainOldDataType {
        match self {
            Self::Int32(_) => PlainOldDataType::Int32,
            Self::Float64(_) => PlainOldDataType::Float64,
            Self::Vec2f(_) | Self::Vec3f(_) => PlainOldDataType::Float32,
            Self::String(_) => PlainOldDataType::String,
        }
    }

    /// Number of PODs per element.
    pub fn pod_extent(&self) -> usize {
        match self {
            Self::Vec2f(_) => 2,
            Self::Vec3f(_) => 3,
            _ => 1,
        }
    }

    /// Raw little-endian payload. Strings are NUL terminated one after
    /// another.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Int32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Float64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Vec2f(v) => v.iter().flatten().flat_map(|x| x.to_le_bytes()).collect(),
            Self::Vec3f(v) => v.iter().flatten().flat_map(|x| x.to_le_bytes()).collect(),
            Self::String(v) => {
                let mut out = Vec::new();
                for s in v {
                    out.extend_from_slice(s.as_bytes());
                    out.push(0);
                }
                out
            }
        }
    }

    /// Decode a payload written by [`SampleData::to_bytes`].
    pub fn from_bytes(data_type: DataType, bytes: &[u8]) -> Result<Self> {
        let pod_size = data_type.pod.num_bytes();
        if bytes.len() % pod_size != 0 {
            return Err(Error::invalid_archive(format!(
                "{} byte payload is not a whole number of {} values",
                bytes.len(),
                data_type.pod
            )));
        }
        let sample = match (data_type.pod, data_type.extent) {
            (PlainOldDataType::Int32, _) => Self::Int32(
                bytes.chunks_exact(4).map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect(),
            ),
            (PlainOldDataType::Float64, _) => Self::Float64(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            (PlainOldDataType::Float32, 2) => Self::Vec2f(
                f32_values(bytes).chunks_exact(2).map(|c| [c[0], c[1]]).collect(),
            ),
            (PlainOldDataType::Float32, 3) => Self::Vec3f(
                f32_values(bytes).chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
            ),
            (PlainOldDataType::String, _) => {
                let body = bytes.strip_suffix(&[0]).unwrap_or(bytes);
                let strings = if bytes.is_empty() {
                    Vec::new()
                } else {
                    body.split(|&b| b == 0)
                        .map(|s| String::from_utf8_lossy(s).into_owned())
                        .collect()
                };
                Self::String(strings)
            }
            _ => {
                return Err(Error::invalid_archive(format!("unsupported data type {}", data_type)));
            }
        };
        Ok(sample)
    }

    /// Borrow as int32 values.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            Self::Int32(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as float64 values.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as 2-component float values.
    pub fn as_vec2f(&self) -> Option<&[[f32; 2]]> {
        match self {
            Self::Vec2f(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as 3-component float values.
    pub fn as_vec3f(&self) -> Option<&[[f32; 3]]> {
        match self {
            Self::Vec3f(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as strings.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

fn f32_values(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_strings() {
        for scope in [
            GeometryScope::Constant,
            GeometryScope::Uniform,
            GeometryScope::Varying,
            GeometryScope::Vertex,
            GeometryScope::FaceVarying,
        ] {
            assert_eq!(GeometryScope::parse(scope.as_str()), scope);
        }
        assert_eq!(GeometryScope::parse("facevarying"), GeometryScope::FaceVarying);
    }

    #[test]
    fn test_scope_expected_len() {
        assert_eq!(GeometryScope::Varying.expected_len(8, 12, 36), 8);
        assert_eq!(GeometryScope::FaceVarying.expected_len(8, 12, 36), 36);
        assert_eq!(GeometryScope::Uniform.expected_len(8, 12, 36), 12);
    }

    #[test]
    fn test_sample_data_json() {
        let data = SampleData::Vec2f(vec![[0.0, 1.0]]);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"pod":"vec2f","values":[[0.0,1.0]]}"#);
        assert_eq!(data.pod().name(), "float32_t");
        assert_eq!(data.pod_extent(), 2);
    }

    #[test]
    fn test_payload_layout() {
        let strings = SampleData::String(vec!["/materials/red".into(), String::new()]);
        assert_eq!(strings.to_bytes(), b"/materials/red\0\0".to_vec());
        assert_eq!(SampleData::from_bytes(DataType::STRING, &strings.to_bytes()).unwrap(), strings);

        let points = SampleData::Vec3f(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(points.to_bytes().len(), 24);
        assert_eq!(SampleData::from_bytes(DataType::VEC3F, &points.to_bytes()).unwrap(), points);

        assert_eq!(
            SampleData::from_bytes(DataType::STRING, &[]).unwrap(),
            SampleData::String(vec![])
        );
        assert!(SampleData::from_bytes(DataType::INT32, &[0, 0, 0]).is_err());
    }
}
