//! Time-sampled writing of one object's keyframes.

use tracing::trace;

use crate::manifest::{Manifest, ObjectSpec};
use crate::util::{Chrono, Error, Result};
use crate::writer::{OFaceSetSample, OObject, OPolyMesh, OPolyMeshSample};

/// UV set name readers see for the generated UVs.
pub const UV_SOURCE_NAME: &str = "uv0";

/// Archive path of a material record.
pub fn material_path(name: &str) -> String {
    format!("/materials/{}", name)
}

/// Sample times of an object's keyframes, in manifest order.
pub fn keyframe_times(manifest: &Manifest, object: &ObjectSpec) -> Vec<Chrono> {
    object
        .keyframes
        .iter()
        .map(|k| manifest.frame_time(k.frame))
        .collect()
}

/// Everything written for one keyframe.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltFrame {
    /// Keyframe index; also the sample slot.
    pub slot: u32,
    pub frame: i64,
    pub sample: OPolyMeshSample,
    /// Faces per active material, in the keyframe's material order.
    pub face_sets: Vec<(String, Vec<i32>)>,
}

/// Writes one mesh object and its face sets, one keyframe at a time.
pub struct ObjectWriter {
    mesh: OPolyMesh,
}

impl ObjectWriter {
    /// Create the mesh with one face set per material, all on the
    /// time sampling at `time_sampling_index`.
    pub fn new(name: &str, materials: &[String], time_sampling_index: u32) -> Result<Self> {
        let mut mesh = OPolyMesh::new(name);
        mesh.set_time_sampling(time_sampling_index)?;
        mesh.set_uv_source_name(UV_SOURCE_NAME);
        for material in materials {
            mesh.create_face_set(material)?
                .set_material_assignment(&material_path(material));
        }
        Ok(Self { mesh })
    }

    /// Slot the next frame must carry.
    pub fn next_slot(&self) -> u32 {
        self.mesh.next_slot()
    }

    /// Write a frame's mesh sample and one sample for every face set.
    ///
    /// Face sets the frame does not list get an empty sample so that
    /// sample `i` of every face set belongs to keyframe `i`.
    pub fn write_frame(&mut self, frame: &BuiltFrame) -> Result<()> {
        let num_faces = frame.sample.num_faces();
        for (name, faces) in &frame.face_sets {
            if !self.mesh.face_sets().iter().any(|fs| fs.name() == name) {
                return Err(Error::other(format!(
                    "Object {} has no face set named {}",
                    self.mesh.name(),
                    name
                )));
            }
            if let Some(&bad) = faces.iter().find(|&&f| f < 0 || f as usize >= num_faces) {
                return Err(Error::out_of_range("face set face", bad.max(0) as usize, num_faces));
            }
        }

        self.mesh.add_sample(frame.slot, &frame.sample)?;

        let names: Vec<String> = self.mesh.face_sets().iter().map(|fs| fs.name().to_string()).collect();
        for name in names {
            let sample = match frame.face_sets.iter().find(|(n, _)| *n == name) {
                Some((_, faces)) => OFaceSetSample::new(faces.clone()),
                None => OFaceSetSample::empty(),
            };
            let count = sample.faces.len();
            if let Some(face_set) = self.mesh.face_set_mut(&name) {
                face_set.add_sample(frame.slot, &sample)?;
            }
            trace!(object = %self.mesh.name(), face_set = %name, faces = count, slot = frame.slot, "face set sample");
        }
        Ok(())
    }

    /// Finish into the mesh object.
    pub fn finish(self) -> Result<OObject> {
        self.mesh.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SampleData;
    use glam::Vec3;

    fn frame(slot: u32, face_sets: Vec<(&str, Vec<i32>)>) -> BuiltFrame {
        BuiltFrame {
            slot,
            frame: slot as i64 * 12,
            sample: OPolyMeshSample::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2], vec![3]),
            face_sets: face_sets.into_iter().map(|(n, f)| (n.to_string(), f)).collect(),
        }
    }

    fn faces_of(obj: &OObject, set: &str) -> Vec<SampleData> {
        let faces = obj.child(set).unwrap().property(".faceset").unwrap().child(".faces").unwrap();
        (0..faces.num_samples()).map(|i| faces.sample(i).unwrap().clone()).collect()
    }

    #[test]
    fn test_inactive_face_sets_get_empty_samples() {
        let materials = vec!["red".to_string(), "blue".to_string()];
        let mut writer = ObjectWriter::new("cube", &materials, 1).unwrap();
        writer.write_frame(&frame(0, vec![("red", vec![0]), ("blue", vec![])])).unwrap();
        writer.write_frame(&frame(1, vec![("blue", vec![0])])).unwrap();
        let obj = writer.finish().unwrap();

        assert_eq!(faces_of(&obj, "red"), vec![SampleData::Int32(vec![0]), SampleData::Int32(vec![])]);
        assert_eq!(faces_of(&obj, "blue"), vec![SampleData::Int32(vec![]), SampleData::Int32(vec![0])]);

        let assign = obj
            .child("red")
            .and_then(|c| c.property(".faceset"))
            .and_then(|p| p.child(".material.assign"))
            .and_then(|p| p.sample(0))
            .cloned();
        assert_eq!(assign, Some(SampleData::String(vec!["/materials/red".to_string()])));
    }

    #[test]
    fn test_out_of_order_frame_rejected() {
        let mut writer = ObjectWriter::new("cube", &[], 1).unwrap();
        assert!(matches!(writer.write_frame(&frame(1, vec![])), Err(Error::SampleSlot { .. })));
        assert_eq!(writer.next_slot(), 0);
    }

    #[test]
    fn test_face_past_last_face_rejected() {
        let mut writer = ObjectWriter::new("cube", &["red".to_string()], 1).unwrap();
        let err = writer.write_frame(&frame(0, vec![("red", vec![1])])).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 1, len: 1, .. }));
        assert_eq!(writer.next_slot(), 0);
    }

    #[test]
    fn test_keyframe_times() {
        let manifest = Manifest::parse(
            "seq.json",
            r#"{"materials": [], "objects": [{"name": "o", "keyframes": [{"frame": 0}, {"frame": 12}, {"frame": 12}]}]}"#,
        )
        .unwrap();
        assert_eq!(keyframe_times(&manifest, &manifest.objects[0]), vec![0.0, 0.5, 0.5]);
    }
}
