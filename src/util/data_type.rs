//! DataType - the element type of a property.

use std::fmt;

use super::pod::PlainOldDataType;

/// DataType describes how an element of a sample is stored.
///
/// It combines a [`PlainOldDataType`] with an extent. A Vec3f is
/// Float32 with extent 3, a double precision box is Float64 with extent 6.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// The base plain old data type
    pub pod: PlainOldDataType,
    /// Number of POD values per element
    pub extent: u8,
}

impl DataType {
    /// Create a new DataType with given POD and extent.
    #[inline]
    pub const fn new(pod: PlainOldDataType, extent: u8) -> Self {
        Self { pod, extent }
    }

    /// Create a scalar DataType (extent = 1).
    #[inline]
    pub const fn scalar(pod: PlainOldDataType) -> Self {
        Self { pod, extent: 1 }
    }

    /// Size in bytes of one element.
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.pod.num_bytes() * self.extent as usize
    }

    pub const INT32: Self = Self::scalar(PlainOldDataType::Int32);
    pub const FLOAT64: Self = Self::scalar(PlainOldDataType::Float64);
    pub const STRING: Self = Self::scalar(PlainOldDataType::String);

    pub const VEC2F: Self = Self::new(PlainOldDataType::Float32, 2);
    pub const VEC3F: Self = Self::new(PlainOldDataType::Float32, 3);

    /// Box (min + max = 2 * vec3)
    pub const BOX3D: Self = Self::new(PlainOldDataType::Float64, 6);
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extent == 1 {
            write!(f, "{}", self.pod.name())
        } else {
            write!(f, "{}[{}]", self.pod.name(), self.extent)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl serde::Serialize for DataType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
