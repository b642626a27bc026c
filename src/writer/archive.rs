//! Archive writer.
//!
//! Objects and properties are assembled in memory and written in one
//! step by [`OArchive::write_archive`]. Nothing touches the output path
//! before that call, and the encoded file is moved into place only once
//! it is complete, so an aborted conversion leaves no partial archive.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::object::OObject;
use super::property::{OProperty, OPropertyData};
use crate::core::{MetaData, TimeSampling};
use crate::ogawa::encode_archive;
use crate::util::{Error, Result};

/// Archive writer.
pub struct OArchive {
    path: PathBuf,
    frozen: bool,
    time_samplings: Vec<TimeSampling>,
    max_samples: Vec<u32>,
    archive_metadata: MetaData,
}

impl OArchive {
    /// Create a new archive that will be written to `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(Error::other("Archive path is empty"));
        }

        Ok(Self {
            path,
            frozen: false,
            // Default identity time sampling at index 0.
            time_samplings: vec![TimeSampling::IDENTITY],
            max_samples: vec![0],
            archive_metadata: MetaData::new(),
        })
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the application name (stored as `_ai_Application`).
    pub fn set_app_name(&mut self, name: &str) {
        self.archive_metadata.set("_ai_Application", name);
    }

    /// Set the DCC frame rate (stored as `_ai_DCC_FPS`).
    pub fn set_dcc_fps(&mut self, fps: f64) {
        self.archive_metadata.set("_ai_DCC_FPS", fps.to_string());
    }

    /// Set an arbitrary archive metadata entry.
    pub fn set_metadata(&mut self, key: &str, value: &str) {
        self.archive_metadata.set(key, value);
    }

    /// Archive level metadata.
    pub fn archive_metadata(&self) -> &MetaData {
        &self.archive_metadata
    }

    /// Add a time sampling and return its index.
    ///
    /// Equivalent samplings share one index.
    pub fn add_time_sampling(&mut self, ts: TimeSampling) -> u32 {
        if let Some(i) = self.time_samplings.iter().position(|t| t.is_equivalent(&ts)) {
            return i as u32;
        }
        let index = self.time_samplings.len() as u32;
        self.time_samplings.push(ts);
        self.max_samples.push(0);
        index
    }

    /// Get the number of time samplings.
    pub fn num_time_samplings(&self) -> usize {
        self.time_samplings.len()
    }

    /// Get a time sampling by index.
    pub fn time_sampling(&self, index: usize) -> Option<&TimeSampling> {
        self.time_samplings.get(index)
    }

    /// Check if the archive was already written.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Largest stored sample count per time sampling, filled in by
    /// [`OArchive::write_archive`].
    pub fn max_samples(&self) -> &[u32] {
        &self.max_samples
    }

    /// Write the object tree and freeze the archive.
    pub fn write_archive(&mut self, root: &OObject) -> Result<()> {
        if self.frozen {
            return Err(Error::Frozen);
        }

        self.check_object(root)?;
        let encoded = encode_archive(root, &self.archive_metadata, &self.time_samplings)?;

        let partial = self.partial_path();
        if let Err(err) = std::fs::write(&partial, &encoded.bytes).and_then(|_| std::fs::rename(&partial, &self.path)) {
            let _ = std::fs::remove_file(&partial);
            return Err(err.into());
        }
        self.max_samples = encoded.max_samples;
        self.frozen = true;

        debug!(
            path = %self.path.display(),
            bytes = encoded.bytes.len(),
            time_samplings = self.time_samplings.len(),
            "archive written"
        );
        Ok(())
    }

    /// Sibling file the archive is written to before it is renamed.
    fn partial_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".partial");
        self.path.with_file_name(name)
    }

    /// Every property must reference a registered time sampling.
    fn check_object(&self, obj: &OObject) -> Result<()> {
        for prop in &obj.properties {
            self.check_property(prop)?;
        }
        obj.children.iter().try_for_each(|c| self.check_object(c))
    }

    fn check_property(&self, prop: &OProperty) -> Result<()> {
        if prop.time_sampling_index as usize >= self.time_samplings.len() {
            return Err(Error::out_of_range(
                "time sampling",
                prop.time_sampling_index as usize,
                self.time_samplings.len(),
            ));
        }
        if let OPropertyData::Compound { children } = &prop.data {
            children.iter().try_for_each(|c| self.check_property(c))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SampleData;
    use crate::util::DataType;
    use crate::writer::ArchiveDocument;

    #[test]
    fn test_time_sampling_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = OArchive::create(dir.path().join("a.abc")).unwrap();
        let a = archive.add_time_sampling(TimeSampling::acyclic(vec![0.0, 0.5]));
        let b = archive.add_time_sampling(TimeSampling::acyclic(vec![0.0, 0.5]));
        let c = archive.add_time_sampling(TimeSampling::acyclic(vec![0.0]));
        assert_eq!(a, 1);
        assert_eq!(b, 1);
        assert_eq!(c, 2);
        assert_eq!(archive.add_time_sampling(TimeSampling::IDENTITY), 0);
    }

    #[test]
    fn test_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.abc");
        let mut archive = OArchive::create(&path).unwrap();
        assert!(!path.exists());

        let root = OObject::new("ABC");
        archive.write_archive(&root).unwrap();
        assert!(path.exists());
        assert!(archive.is_frozen());
        assert!(matches!(archive.write_archive(&root), Err(Error::Frozen)));
    }

    #[test]
    fn test_unregistered_time_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.abc");
        let mut archive = OArchive::create(&path).unwrap();

        let mut prop = OProperty::array("P", DataType::VEC3F);
        prop.time_sampling_index = 3;
        prop.append(0, SampleData::Vec3f(vec![[0.0; 3]])).unwrap();
        let mut root = OObject::new("ABC");
        root.add_property(prop);

        assert!(matches!(archive.write_archive(&root), Err(Error::IndexOutOfRange { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_written_file_is_ogawa() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.abc");
        let mut archive = OArchive::create(&path).unwrap();
        archive.set_app_name("objseq");
        let ts = archive.add_time_sampling(TimeSampling::acyclic(vec![0.0, 1.0, 2.0]));

        let mut prop = OProperty::array("P", DataType::VEC3F);
        prop.time_sampling_index = ts;
        let still = SampleData::Vec3f(vec![[0.0, 1.0, 2.0]]);
        prop.append(0, still.clone()).unwrap();
        prop.append(1, still.clone()).unwrap();
        prop.append(2, SampleData::Vec3f(vec![[5.0, 1.0, 2.0]])).unwrap();
        let mut mesh = OObject::new("mesh");
        mesh.add_property(prop);
        let mut root = OObject::new("ABC");
        root.add_child(mesh);
        archive.write_archive(&root).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..5], b"Ogawa");
        assert_eq!(bytes[5], 0xff);
        assert!(!dir.path().join("a.abc.partial").exists());
        assert_eq!(archive.max_samples(), &[0, 3]);

        let doc = ArchiveDocument::open(&path).unwrap();
        assert_eq!(doc.archive_metadata.get("_ai_Application"), Some("objseq"));
        assert!(doc.archive_metadata.get("_ai_AlembicVersion").is_some());
        assert_eq!(doc.time_sampling(ts), Some(&TimeSampling::acyclic(vec![0.0, 1.0, 2.0])));
        assert_eq!(doc.time_samplings[ts as usize].max_samples, 3);

        let p = doc.find("/mesh").unwrap().property("P").unwrap();
        assert_eq!(p.num_samples(), 3);
        assert_eq!(p.sample(1), Some(&still));
        assert_eq!(p.sample(2), Some(&SampleData::Vec3f(vec![[5.0, 1.0, 2.0]])));
    }

    #[test]
    fn test_missing_directory_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.abc");
        let mut archive = OArchive::create(&path).unwrap();
        assert!(matches!(archive.write_archive(&OObject::new("ABC")), Err(Error::Io(_))));
        assert!(!archive.is_frozen());
        assert!(!path.exists());
    }
}
