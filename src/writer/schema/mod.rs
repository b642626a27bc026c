//! Schema writers for the objects a sequence archive contains.

mod faceset;
mod geom_param;
mod material;
mod polymesh;

pub use faceset::{OFaceSet, OFaceSetSample, MATERIAL_ASSIGN_PROPERTY};
pub use geom_param::OGeomParamSample;
pub use material::{OMaterial, ShaderBinding};
pub use polymesh::{OPolyMesh, OPolyMeshSample};
