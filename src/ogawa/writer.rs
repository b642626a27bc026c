//! Ogawa archive encoder.
//!
//! Encodes an object tree, the archive metadata and the time sampling
//! table into the Ogawa layout: a header, then data blocks and groups
//! written bottom-up, then the root group whose position is patched
//! into the header last.
//!
//! Every sample payload is keyed by its MurmurHash3 digest. Identical
//! payloads are stored once and referenced from every property that
//! uses them, and a property whose value stops changing stores only
//! the samples up to its last change.

use std::collections::HashMap;

use spooky_hash::SpookyHash;
use tracing::debug;

use super::format::*;
use super::stream::OStream;
use super::write_util::*;
use crate::core::{MetaData, TimeSampling};
use crate::util::{DataType, PlainOldDataType, Result};
use crate::writer::{OObject, OProperty, OPropertyData};

static IDENTITY: TimeSampling = TimeSampling::IDENTITY;

/// Result of encoding an archive.
pub struct EncodedArchive {
    /// The complete file contents.
    pub bytes: Vec<u8>,
    /// Largest stored sample count per time sampling.
    pub max_samples: Vec<u32>,
}

/// Encode a complete archive.
pub fn encode_archive(
    root: &OObject,
    archive_metadata: &MetaData,
    time_samplings: &[TimeSampling],
) -> Result<EncodedArchive> {
    let mut writer = OgawaWriter::new(time_samplings)?;

    let version_pos = writer.write_data(&OGAWA_FILE_VERSION.to_le_bytes())?;
    let library_version_pos = writer.write_data(&ALEMBIC_LIBRARY_VERSION.to_le_bytes())?;
    let (root_pos, _) = writer.write_object(root)?;

    let mut archive_meta = archive_metadata.clone();
    if archive_meta.get("_ai_AlembicVersion").is_none() {
        archive_meta.set("_ai_AlembicVersion", format_alembic_version(ALEMBIC_LIBRARY_VERSION));
    }
    let archive_meta_pos = writer.write_data(archive_meta.serialize().as_bytes())?;

    let ts_data = writer.serialize_time_samplings();
    let ts_pos = writer.write_data(&ts_data)?;

    let idx_meta_data = writer.serialize_indexed_metadata();
    let idx_meta_pos = writer.write_data(&idx_meta_data)?;

    let root_children = [
        make_data_offset(version_pos),
        make_data_offset(library_version_pos),
        make_group_offset(root_pos),
        make_data_offset(archive_meta_pos),
        make_data_offset(ts_pos),
        make_data_offset(idx_meta_pos),
    ];
    let group_pos = writer.write_group(&root_children)?;

    debug!(
        size = writer.stream.pos(),
        deduplicated = writer.dedup_count,
        indexed_metadata = writer.indexed_metadata.len(),
        "archive encoded"
    );
    writer.finish(group_pos)
}

/// Identity of a stored payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct ContentKey {
    digest: [u8; 16],
    size: usize,
    pod: u8,
}

/// Samples of one property after they were written.
struct PropertyState {
    children: Vec<u64>,
    sample_hash: Option<(u64, u64)>,
    first_changed: u32,
    last_changed: u32,
    homogenous: bool,
    scalar_like: bool,
}

impl Default for PropertyState {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            sample_hash: None,
            first_changed: 0,
            last_changed: 0,
            homogenous: true,
            scalar_like: true,
        }
    }
}

/// Child headers an object group carries after its properties.
struct ObjectHeadersContext<'a> {
    children: &'a [OObject],
    child_hash: (u64, u64),
}

struct WrittenProperties {
    pos: u64,
    data_hash: (u64, u64),
    object_headers_pos: u64,
    prop_hashes: Vec<u64>,
}

struct OgawaWriter<'a> {
    stream: OStream,
    time_samplings: &'a [TimeSampling],
    max_samples: Vec<u32>,
    /// Serialized metadata; entry 0 is the empty string.
    indexed_metadata: Vec<String>,
    metadata_map: HashMap<String, u8>,
    dedup_map: HashMap<ContentKey, u64>,
    dedup_count: usize,
}

impl<'a> OgawaWriter<'a> {
    fn new(time_samplings: &'a [TimeSampling]) -> Result<Self> {
        let mut stream = OStream::new();
        stream.write_bytes(OGAWA_MAGIC)?;
        stream.write_u8(NOT_FROZEN_FLAG)?;
        stream.write_u16_be(CURRENT_VERSION)?;
        stream.write_u64(0)?;

        Ok(Self {
            stream,
            time_samplings,
            max_samples: vec![0; time_samplings.len()],
            indexed_metadata: vec![String::new()],
            metadata_map: HashMap::new(),
            dedup_map: HashMap::new(),
            dedup_count: 0,
        })
    }

    /// Patch the header and hand out the bytes.
    fn finish(mut self, root_group_pos: u64) -> Result<EncodedArchive> {
        self.stream.seek(FROZEN_OFFSET as u64)?;
        self.stream.write_u8(FROZEN_FLAG)?;
        self.stream.seek(ROOT_POS_OFFSET as u64)?;
        self.stream.write_u64(root_group_pos)?;
        self.stream.seek_end()?;
        Ok(EncodedArchive {
            bytes: self.stream.into_inner(),
            max_samples: self.max_samples,
        })
    }

    fn update_max_samples(&mut self, ts_index: u32, num_samples: u32) {
        if let Some(max) = self.max_samples.get_mut(ts_index as usize) {
            *max = (*max).max(num_samples);
        }
    }

    /// Index of `meta` in the indexed metadata table, or the inline marker.
    fn add_indexed_metadata(&mut self, meta: &str) -> u8 {
        if meta.is_empty() {
            return 0;
        }
        if let Some(&idx) = self.metadata_map.get(meta) {
            return idx;
        }
        if self.indexed_metadata.len() >= INLINE_METADATA as usize || meta.len() > 255 {
            return INLINE_METADATA;
        }
        let idx = self.indexed_metadata.len() as u8;
        self.indexed_metadata.push(meta.to_string());
        self.metadata_map.insert(meta.to_string(), idx);
        idx
    }

    /// Write a raw data block and return its position (0 when empty).
    fn write_data(&mut self, data: &[u8]) -> Result<u64> {
        if data.is_empty() {
            return Ok(0);
        }
        let pos = self.stream.pos();
        self.stream.write_u64(data.len() as u64)?;
        self.stream.write_bytes(data)?;
        Ok(pos)
    }

    /// Write a sample payload behind its digest, reusing an earlier
    /// copy of the same payload.
    fn write_keyed_data(&mut self, data: &[u8], pod: PlainOldDataType, digest: [u8; 16]) -> Result<u64> {
        if data.is_empty() {
            return Ok(0);
        }
        let key_pod = if pod.is_string() { pod } else { PlainOldDataType::Int8 };
        let key = ContentKey {
            digest,
            size: data.len(),
            pod: key_pod.tag(),
        };
        if let Some(&pos) = self.dedup_map.get(&key) {
            self.dedup_count += 1;
            return Ok(pos);
        }

        let pos = self.stream.pos();
        self.stream.write_u64((DATA_KEY_SIZE + data.len()) as u64)?;
        self.stream.write_bytes(&digest)?;
        self.stream.write_bytes(data)?;
        self.dedup_map.insert(key, pos);
        Ok(pos)
    }

    /// Write a group and return its position (0 when empty).
    fn write_group(&mut self, children: &[u64]) -> Result<u64> {
        if children.is_empty() {
            return Ok(0);
        }
        let pos = self.stream.pos();
        self.stream.write_u64(children.len() as u64)?;
        for &child in children {
            self.stream.write_u64(child)?;
        }
        Ok(pos)
    }

    fn write_dimensions(&mut self, dims: &[u64], data_type: DataType) -> Result<u64> {
        if dims.len() <= 1 && !data_type.pod.is_string() {
            return Ok(EMPTY_DATA);
        }
        let bytes: Vec<u8> = dims.iter().flat_map(|d| d.to_le_bytes()).collect();
        Ok(make_data_offset(self.write_data(&bytes)?))
    }

    fn serialize_time_samplings(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, ts) in self.time_samplings.iter().enumerate() {
            let max_samples = self.max_samples.get(i).copied().unwrap_or(0);
            buf.extend_from_slice(&max_samples.to_le_bytes());
            let (tpc, times) = time_sampling_cycle(ts);
            buf.extend_from_slice(&tpc.to_le_bytes());
            buf.extend_from_slice(&(times.len() as u32).to_le_bytes());
            for t in times {
                buf.extend_from_slice(&t.to_le_bytes());
            }
        }
        buf
    }

    fn serialize_indexed_metadata(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for meta in self.indexed_metadata.iter().skip(1) {
            buf.push(meta.len() as u8);
            buf.extend_from_slice(meta.as_bytes());
        }
        buf
    }

    /// Write an object and its subtree; returns the group position and
    /// the object hash.
    fn write_object(&mut self, obj: &OObject) -> Result<(u64, (u64, u64))> {
        let mut child_positions = Vec::with_capacity(obj.children.len());
        let mut child_hashes: Vec<u64> = Vec::with_capacity(obj.children.len() * 2);
        for child in &obj.children {
            let (pos, (h1, h2)) = self.write_object(child)?;
            child_positions.push(pos);
            child_hashes.push(h1);
            child_hashes.push(h2);
        }
        let child_hash_bytes: Vec<u8> = child_hashes.iter().flat_map(|h| h.to_le_bytes()).collect();

        let child_hash = if child_hashes.is_empty() {
            (0, 0)
        } else {
            let mut hasher = SpookyHash::new(0, 0);
            hasher.update(&child_hash_bytes);
            hasher.finalize()
        };

        let ctx = ObjectHeadersContext {
            children: &obj.children,
            child_hash,
        };
        let written = self.write_properties(&obj.properties, Some(ctx))?;

        let mut children = Vec::with_capacity(child_positions.len() + 2);
        children.push(make_group_offset(written.pos));
        children.extend(child_positions.into_iter().map(make_group_offset));
        if written.object_headers_pos != 0 {
            children.push(make_data_offset(written.object_headers_pos));
        }
        let pos = self.write_group(&children)?;

        let mut hasher = SpookyHash::new(0, 0);
        hasher.update(&child_hash_bytes);
        hasher.update(&written.data_hash.0.to_le_bytes());
        hasher.update(&written.data_hash.1.to_le_bytes());
        let meta = obj.meta_data.serialize();
        if !meta.is_empty() {
            hasher.update(meta.as_bytes());
        }
        hasher.update(obj.name.as_bytes());
        Ok((pos, hasher.finalize()))
    }

    fn write_properties(
        &mut self,
        props: &[OProperty],
        obj_ctx: Option<ObjectHeadersContext<'_>>,
    ) -> Result<WrittenProperties> {
        if props.is_empty() {
            let data_hash = SpookyHash::new(0, 0).finalize();
            let object_headers_pos = match obj_ctx {
                Some(ctx) => {
                    let headers = self.serialize_object_headers(&ctx, data_hash);
                    self.write_data(&headers)?
                }
                None => 0,
            };
            return Ok(WrittenProperties {
                pos: 0,
                data_hash,
                object_headers_pos,
                prop_hashes: Vec::new(),
            });
        }

        let mut states = props
            .iter()
            .map(|p| self.collect_samples(p))
            .collect::<Result<Vec<_>>>()?;

        let mut prop_positions = vec![0u64; props.len()];
        let mut prop_hashes = vec![0u64; props.len() * 2];
        for idx in (0..props.len()).rev() {
            let children = std::mem::take(&mut states[idx].children);
            let (pos, (h1, h2)) = self.finalize_property_group(&props[idx], children, states[idx].sample_hash)?;
            prop_positions[idx] = pos;
            prop_hashes[idx * 2] = h1;
            prop_hashes[idx * 2 + 1] = h2;
        }

        let hash_bytes: Vec<u8> = prop_hashes.iter().flat_map(|h| h.to_le_bytes()).collect();
        let mut hasher = SpookyHash::new(0, 0);
        hasher.update(&hash_bytes);
        let data_hash = hasher.finalize();

        let object_headers_pos = match obj_ctx {
            Some(ctx) => {
                let headers = self.serialize_object_headers(&ctx, data_hash);
                self.write_data(&headers)?
            }
            None => 0,
        };

        let headers_data = self.serialize_property_headers(props, &states);
        let headers_pos = self.write_data(&headers_data)?;

        let mut children: Vec<u64> = prop_positions.into_iter().map(make_group_offset).collect();
        children.push(make_data_offset(headers_pos));
        let pos = self.write_group(&children)?;

        Ok(WrittenProperties {
            pos,
            data_hash,
            object_headers_pos,
            prop_hashes,
        })
    }

    /// Write the payloads of a scalar or array property.
    ///
    /// A sample equal to its predecessor is not stored. Once a second
    /// distinct value appears, the unchanged samples in between are
    /// stored as references to the previous payload so stored indices
    /// stay contiguous up to the last change.
    fn collect_samples(&mut self, prop: &OProperty) -> Result<PropertyState> {
        let (data_type, samples, is_array) = match &prop.data {
            OPropertyData::Scalar { data_type, samples } => (*data_type, samples, false),
            OPropertyData::Array { data_type, samples } => (*data_type, samples, true),
            OPropertyData::Compound { .. } => return Ok(PropertyState::default()),
        };

        let mut state = PropertyState::default();
        let mut previous: Option<((u64, u64), usize, Vec<u64>)> = None;
        for (index, sample) in samples.iter().enumerate() {
            let index = index as u32;
            let bytes = sample.to_bytes();
            let digest = content_digest(&bytes)?;
            let dims = [sample.len() as u64];

            let mut key = digest_words(&digest);
            if is_array {
                key = hash_dimensions(&dims, key);
                if sample.len() != 1 {
                    state.scalar_like = false;
                }
                if let Some(first) = samples.first() {
                    if first.len() != sample.len() {
                        state.homogenous = false;
                    }
                }
            }
            state.sample_hash = Some(match state.sample_hash {
                None => key,
                Some((h0, h1)) => SpookyHash::short_end_mix(h0, h1, key.0, key.1),
            });

            let unchanged = matches!(&previous, Some((k, size, _)) if *k == key && *size == bytes.len());
            if unchanged {
                continue;
            }

            if state.first_changed != 0 {
                if let Some((_, _, written)) = &previous {
                    for _ in state.last_changed + 1..index {
                        state.children.extend_from_slice(written);
                    }
                }
            }

            let data_pos = self.write_keyed_data(&bytes, data_type.pod, digest)?;
            let mut written = vec![make_data_offset(data_pos)];
            if is_array {
                written.push(self.write_dimensions(&dims, data_type)?);
            }
            state.children.extend_from_slice(&written);

            if index != 0 && state.first_changed == 0 {
                state.first_changed = index;
            }
            state.last_changed = index;
            previous = Some((key, bytes.len(), written));
        }

        let num_samples = samples.len() as u32;
        let stored = if state.last_changed == 0 && num_samples > 0 { 1 } else { num_samples };
        self.update_max_samples(prop.time_sampling_index, stored);
        Ok(state)
    }

    fn finalize_property_group(
        &mut self,
        prop: &OProperty,
        children: Vec<u64>,
        sample_hash: Option<(u64, u64)>,
    ) -> Result<(u64, (u64, u64))> {
        let time_samplings = self.time_samplings;
        let time_sampling = time_samplings
            .get(prop.time_sampling_index as usize)
            .unwrap_or(&IDENTITY);

        match &prop.data {
            OPropertyData::Scalar { .. } | OPropertyData::Array { .. } => {
                let pos = self.write_group(&children)?;
                let mut hasher = SpookyHash::new(0, 0);
                hash_property_header(&mut hasher, prop, time_sampling);
                if let Some((h0, h1)) = sample_hash {
                    let mut bytes = [0u8; 16];
                    bytes[..8].copy_from_slice(&h0.to_le_bytes());
                    bytes[8..].copy_from_slice(&h1.to_le_bytes());
                    hasher.update(&bytes);
                }
                Ok((pos, hasher.finalize()))
            }
            OPropertyData::Compound { children: sub_props } => {
                let written = self.write_properties(sub_props, None)?;
                let mut hasher = SpookyHash::new(0, 0);
                let hash_bytes: Vec<u8> = written.prop_hashes.iter().flat_map(|h| h.to_le_bytes()).collect();
                hasher.update(&hash_bytes);
                hash_property_header(&mut hasher, prop, time_sampling);
                Ok((written.pos, hasher.finalize()))
            }
        }
    }

    /// Child object headers followed by the data and child hashes.
    fn serialize_object_headers(&mut self, ctx: &ObjectHeadersContext<'_>, data_hash: (u64, u64)) -> Vec<u8> {
        let mut buf = Vec::new();
        for child in ctx.children {
            let name = child.name.as_bytes();
            write_with_hint(&mut buf, name.len() as u32, 2);
            buf.extend_from_slice(name);

            let meta = child.meta_data.serialize();
            let meta_idx = self.add_indexed_metadata(&meta);
            write_with_hint(&mut buf, meta_idx as u32, 0);
            if meta_idx == INLINE_METADATA {
                write_with_hint(&mut buf, meta.len() as u32, 2);
                buf.extend_from_slice(meta.as_bytes());
            }
        }
        buf.extend_from_slice(&data_hash.0.to_le_bytes());
        buf.extend_from_slice(&data_hash.1.to_le_bytes());
        buf.extend_from_slice(&ctx.child_hash.0.to_le_bytes());
        buf.extend_from_slice(&ctx.child_hash.1.to_le_bytes());
        buf
    }

    fn serialize_property_headers(&mut self, props: &[OProperty], states: &[PropertyState]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (prop, state) in props.iter().zip(states) {
            let meta = prop.meta_data.serialize();
            let meta_idx = self.add_indexed_metadata(&meta);
            let num_samples = prop.num_samples() as u32;
            let ts_index = prop.time_sampling_index;
            let hint = size_hint(&[prop.name.len() as u32, meta.len() as u32, num_samples, ts_index]);

            let mut info = (hint as u32) << 2;
            info |= match &prop.data {
                OPropertyData::Compound { .. } => PTYPE_COMPOUND,
                OPropertyData::Scalar { .. } => PTYPE_SCALAR,
                OPropertyData::Array { .. } if state.scalar_like => PTYPE_SCALAR_LIKE,
                OPropertyData::Array { .. } => PTYPE_ARRAY,
            };
            if let Some(data_type) = prop.data_type() {
                info |= (data_type.pod.tag() as u32 & 0x0f) << 4;
                info |= (data_type.extent as u32) << 12;
                if state.homogenous {
                    info |= INFO_HOMOGENOUS;
                }
                if ts_index != 0 {
                    info |= INFO_HAS_TIME_SAMPLING;
                }
                if state.first_changed == 0 && state.last_changed == 0 {
                    info |= INFO_CONSTANT;
                } else if state.first_changed != 1 || state.last_changed != num_samples.saturating_sub(1) {
                    info |= INFO_HAS_CHANGE_RANGE;
                }
            }
            info |= (meta_idx as u32) << 20;
            buf.extend_from_slice(&info.to_le_bytes());

            if prop.data_type().is_some() {
                write_with_hint(&mut buf, num_samples, hint);
                if info & INFO_HAS_CHANGE_RANGE != 0 {
                    write_with_hint(&mut buf, state.first_changed, hint);
                    write_with_hint(&mut buf, state.last_changed, hint);
                }
                if info & INFO_HAS_TIME_SAMPLING != 0 {
                    write_with_hint(&mut buf, ts_index, hint);
                }
            }

            write_with_hint(&mut buf, prop.name.len() as u32, hint);
            buf.extend_from_slice(prop.name.as_bytes());
            if meta_idx == INLINE_METADATA {
                write_with_hint(&mut buf, meta.len() as u32, hint);
                buf.extend_from_slice(meta.as_bytes());
            }
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SampleData;

    fn mesh_with(samples: &[SampleData]) -> OObject {
        let mut prop = OProperty::array("P", DataType::VEC3F);
        prop.time_sampling_index = 1;
        for (i, s) in samples.iter().enumerate() {
            prop.append(i as u32, s.clone()).unwrap();
        }
        let mut mesh = OObject::new("mesh");
        mesh.add_property(prop);
        let mut root = OObject::new("ABC");
        root.add_child(mesh);
        root
    }

    fn times(n: usize) -> Vec<TimeSampling> {
        vec![TimeSampling::IDENTITY, TimeSampling::acyclic((0..n).map(|i| i as f64).collect())]
    }

    #[test]
    fn test_header_frozen_and_root() {
        let root = OObject::new("ABC");
        let encoded = encode_archive(&root, &MetaData::new(), &[TimeSampling::IDENTITY]).unwrap();
        let bytes = &encoded.bytes;
        assert_eq!(&bytes[..5], OGAWA_MAGIC);
        assert_eq!(bytes[FROZEN_OFFSET], FROZEN_FLAG);
        assert_eq!(&bytes[VERSION_OFFSET..VERSION_OFFSET + 2], &[0, 1]);

        let mut pos = [0u8; 8];
        pos.copy_from_slice(&bytes[ROOT_POS_OFFSET..ROOT_POS_OFFSET + 8]);
        let root_pos = u64::from_le_bytes(pos) as usize;
        assert!(root_pos >= HEADER_SIZE && root_pos < bytes.len());
        // six children: versions, root object, metadata, time samplings, indexed metadata
        assert_eq!(bytes[root_pos], 6);
    }

    #[test]
    fn test_identical_payloads_stored_once() {
        let a = SampleData::Vec3f(vec![[1.0, 2.0, 3.0]; 64]);
        let b = SampleData::Vec3f(vec![[4.0, 5.0, 6.0]; 64]);
        let alternating = mesh_with(&[a.clone(), b.clone(), a.clone(), b.clone()]);
        let distinct = mesh_with(&[a.clone(), b.clone()]);

        let big = encode_archive(&alternating, &MetaData::new(), &times(4)).unwrap();
        let small = encode_archive(&distinct, &MetaData::new(), &times(2)).unwrap();
        // two more samples cost child pointers, not payloads
        assert!(big.bytes.len() < small.bytes.len() + 200);
        assert_eq!(big.max_samples, vec![0, 4]);
    }

    #[test]
    fn test_constant_property_counts_one_sample() {
        let a = SampleData::Vec3f(vec![[1.0, 2.0, 3.0]]);
        let encoded = encode_archive(&mesh_with(&[a.clone(), a.clone(), a]), &MetaData::new(), &times(3)).unwrap();
        assert_eq!(encoded.max_samples, vec![0, 1]);
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = SampleData::Vec3f(vec![[1.0, 2.0, 3.0]]);
        let b = SampleData::Vec3f(vec![]);
        let root = mesh_with(&[a, b]);
        let first = encode_archive(&root, &MetaData::new(), &times(2)).unwrap();
        let second = encode_archive(&root, &MetaData::new(), &times(2)).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn test_long_metadata_goes_inline() {
        let mut writer = OgawaWriter::new(&[]).unwrap();
        assert_eq!(writer.add_indexed_metadata(""), 0);
        assert_eq!(writer.add_indexed_metadata("schema=A"), 1);
        assert_eq!(writer.add_indexed_metadata("schema=A"), 1);
        assert_eq!(writer.add_indexed_metadata(&"x".repeat(300)), INLINE_METADATA);
        for i in 0..300 {
            writer.add_indexed_metadata(&format!("k={}", i));
        }
        assert_eq!(writer.indexed_metadata.len(), 255);
        assert_eq!(writer.add_indexed_metadata("k=299"), INLINE_METADATA);
    }
}
