//! Sequence manifest.
//!
//! A JSON document naming the materials and, per object, the keyframes
//! to read. Frame meshes live next to the manifest and are named
//! `{stem}_{object}_{frame}.obj`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::util::{Chrono, Error, Result};

/// Frame rate used when the manifest does not name one.
pub const DEFAULT_FRAME_RATE: u32 = 24;

/// One authored mesh snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Keyframe {
    #[serde(default)]
    pub frame: i64,
    /// Active materials, in the order the frame mesh's material ids use.
    #[serde(default)]
    pub materials: Vec<String>,
}

/// One animated mesh object.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ObjectSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    frame_start: i64,
    #[serde(default)]
    frame_end: i64,
    #[serde(default = "default_frame_rate")]
    frame_rate: i64,
    #[serde(default, rename = "loop")]
    looping: bool,
}

fn default_frame_rate() -> i64 {
    DEFAULT_FRAME_RATE as i64
}

/// A loaded and validated manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct Manifest {
    /// Path the manifest was read from.
    pub path: PathBuf,
    pub frame_start: i64,
    pub frame_end: i64,
    pub frame_rate: u32,
    pub looping: bool,
    pub materials: Vec<String>,
    pub objects: Vec<ObjectSpec>,
}

impl Manifest {
    /// Read and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parse and validate manifest text. `path` locates the frame files.
    pub fn parse(path: impl AsRef<Path>, text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text).map_err(Error::ManifestParse)?;
        if !root.is_object() {
            return Err(Error::invalid_manifest("top level is not an object"));
        }
        let header = Header::deserialize(&root).map_err(Error::ManifestParse)?;

        let materials = match root.get("materials") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(Error::MalformedField { field: "materials" })?,
            _ => return Err(Error::MalformedField { field: "materials" }),
        };

        let objects = match root.get("objects") {
            Some(Value::Array(items)) => items
                .iter()
                .map(ObjectSpec::deserialize)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::invalid_manifest(format!("objects: {}", e)))?,
            _ => return Err(Error::MalformedField { field: "objects" }),
        };

        if header.frame_rate <= 0 || header.frame_rate > u32::MAX as i64 {
            return Err(Error::invalid_manifest(format!(
                "frame_rate must be a positive integer, got {}",
                header.frame_rate
            )));
        }

        let manifest = Self {
            path: path.as_ref().to_path_buf(),
            frame_start: header.frame_start,
            frame_end: header.frame_end,
            frame_rate: header.frame_rate as u32,
            looping: header.looping,
            materials,
            objects,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in &self.materials {
            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_manifest(format!("material {:?} is listed twice", name)));
            }
        }
        let declared = seen;

        let mut object_names = HashSet::new();
        for object in &self.objects {
            if object.name.is_empty() {
                return Err(Error::invalid_manifest("object without a name"));
            }
            if !object_names.insert(object.name.as_str()) {
                return Err(Error::invalid_manifest(format!(
                    "object {:?} is listed twice",
                    object.name
                )));
            }
            if object.keyframes.is_empty() {
                warn!(object = %object.name, "object has no keyframes");
            }

            for keyframe in &object.keyframes {
                let mut active = HashSet::new();
                for material in &keyframe.materials {
                    if !declared.contains(material.as_str()) {
                        return Err(Error::invalid_manifest(format!(
                            "object {:?} frame {} uses undeclared material {:?}",
                            object.name, keyframe.frame, material
                        )));
                    }
                    if !active.insert(material.as_str()) {
                        return Err(Error::invalid_manifest(format!(
                            "object {:?} frame {} lists material {:?} twice",
                            object.name, keyframe.frame, material
                        )));
                    }
                }
            }

            if object.keyframes.windows(2).any(|w| w[1].frame <= w[0].frame) {
                warn!(object = %object.name, "keyframes are not in increasing frame order");
            }
        }
        Ok(())
    }

    /// Manifest file name with up to two extensions removed.
    pub fn stem(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let once = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Path::new(&once)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(once)
    }

    /// Directory holding the manifest and its frame files.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Frame mesh path for one object and frame.
    pub fn frame_path(&self, object: &str, frame: i64) -> PathBuf {
        self.directory()
            .join(format!("{}_{}_{}.obj", self.stem(), object, frame))
    }

    /// Sample time of a frame number.
    pub fn frame_time(&self, frame: i64) -> Chrono {
        (1.0 / self.frame_rate as f64) * frame as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = r#"{
        "frame_start": 0,
        "frame_end": 12,
        "materials": ["red", "blue"],
        "objects": [
            {"name": "cube", "keyframes": [
                {"frame": 0, "materials": ["red", "blue"]},
                {"frame": 12, "materials": ["blue"]}
            ]}
        ]
    }"#;

    fn parse(text: &str) -> Result<Manifest> {
        Manifest::parse("/seq/walk.objseq.json", text)
    }

    #[test]
    fn test_parse_defaults() {
        let m = parse(CUBE).unwrap();
        assert_eq!(m.frame_rate, 24);
        assert!(!m.looping);
        assert_eq!(m.materials, vec!["red", "blue"]);
        assert_eq!(m.objects[0].keyframes[1].frame, 12);
        assert_eq!(m.frame_time(12), 0.5);
    }

    #[test]
    fn test_frame_path() {
        let m = parse(CUBE).unwrap();
        assert_eq!(m.stem(), "walk");
        assert_eq!(m.frame_path("cube", 12), PathBuf::from("/seq/walk_cube_12.obj"));

        let m = Manifest::parse("scene.json", CUBE).unwrap();
        assert_eq!(m.stem(), "scene");
        assert_eq!(m.frame_path("cube", 0), PathBuf::from("scene_cube_0.obj"));
    }

    #[test]
    fn test_malformed_fields() {
        let err = parse(r#"{"objects": []}"#).unwrap_err();
        assert_eq!(err.to_string(), "File contains malformed materials field");

        let err = parse(r#"{"materials": [], "objects": {}}"#).unwrap_err();
        assert_eq!(err.to_string(), "File contains malformed objects field");

        let err = parse(r#"{"materials": [1], "objects": []}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedField { field: "materials" }));
    }

    #[test]
    fn test_validation() {
        assert!(parse(r#"{"frame_rate": 0, "materials": [], "objects": []}"#).is_err());
        assert!(parse(r#"{"materials": ["a", "a"], "objects": []}"#).is_err());
        assert!(parse(r#"{"materials": [], "objects": [{"name": ""}]}"#).is_err());
        assert!(parse(r#"{"materials": [], "objects": [{"name": "a"}, {"name": "a"}]}"#).is_err());
        assert!(parse(
            r#"{"materials": ["a"], "objects": [{"name": "o", "keyframes": [{"materials": ["b"]}]}]}"#
        )
        .is_err());
        assert!(parse(
            r#"{"materials": ["a"], "objects": [{"name": "o", "keyframes": [{"materials": ["a", "a"]}]}]}"#
        )
        .is_err());
    }

    #[test]
    fn test_duplicate_frames_kept() {
        let m = parse(
            r#"{"materials": [], "objects": [{"name": "o", "keyframes": [{"frame": 3}, {"frame": 3}]}]}"#,
        )
        .unwrap();
        assert_eq!(m.objects[0].keyframes.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = Manifest::load("/nonexistent/seq.json").unwrap_err();
        assert!(matches!(err, Error::ManifestRead { .. }));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(parse("not json"), Err(Error::ManifestParse(_))));
    }
}
