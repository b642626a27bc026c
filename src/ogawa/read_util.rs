//! Parsing of Ogawa tables and headers, and rebuilding of the object tree.

use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::format::*;
use super::reader::{IArchive, IGroup};
use crate::core::{MetaData, SampleData, TimeSampling};
use crate::util::{DataType, Error, PlainOldDataType, Result};
use crate::writer::{ArchiveDocument, OObject, OProperty, OPropertyData, TimeSamplingEntry};

/// Name readers give the unnamed top object.
pub const ROOT_OBJECT_NAME: &str = "ABC";

fn truncated(what: &str) -> Error {
    Error::invalid_archive(format!("truncated {}", what))
}

fn read_string(cursor: &mut Cursor<&[u8]>, len: usize, what: &str) -> Result<String> {
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes).map_err(|_| truncated(what))?;
    String::from_utf8(bytes).map_err(|_| Error::invalid_archive(format!("{} is not UTF-8", what)))
}

fn read_with_hint(cursor: &mut Cursor<&[u8]>, hint: u32, what: &str) -> Result<u32> {
    let value = match hint {
        0 => cursor.read_u8().map(u32::from),
        1 => cursor.read_u16::<LittleEndian>().map(u32::from),
        _ => cursor.read_u32::<LittleEndian>(),
    };
    value.map_err(|_| truncated(what))
}

fn has_remaining(cursor: &Cursor<&[u8]>) -> bool {
    (cursor.position() as usize) < cursor.get_ref().len()
}

/// Parse the time sampling table.
pub fn read_time_samplings(data: &[u8]) -> Result<Vec<TimeSamplingEntry>> {
    let mut cursor = Cursor::new(data);
    let mut entries = Vec::new();
    while has_remaining(&cursor) {
        let what = "time sampling table";
        let max_samples = cursor.read_u32::<LittleEndian>().map_err(|_| truncated(what))?;
        let tpc = cursor.read_f64::<LittleEndian>().map_err(|_| truncated(what))?;
        let count = cursor.read_u32::<LittleEndian>().map_err(|_| truncated(what))?;
        if count as usize > data.len() / 8 {
            return Err(truncated(what));
        }
        let times = (0..count)
            .map(|_| cursor.read_f64::<LittleEndian>().map_err(|_| truncated(what)))
            .collect::<Result<Vec<_>>>()?;

        let sampling = if tpc == ACYCLIC_TIME_PER_CYCLE {
            TimeSampling::acyclic(times)
        } else if tpc == 1.0 && times == [0.0] {
            TimeSampling::IDENTITY
        } else {
            return Err(Error::invalid_archive(format!(
                "unsupported time sampling (time per cycle {}, {} times)",
                tpc, count
            )));
        };
        entries.push(TimeSamplingEntry { sampling, max_samples });
    }
    Ok(entries)
}

/// Parse the indexed metadata table; entry 0 is always empty.
pub fn read_indexed_metadata(data: &[u8]) -> Result<Vec<MetaData>> {
    let mut cursor = Cursor::new(data);
    let mut entries = vec![MetaData::new()];
    while has_remaining(&cursor) {
        let len = cursor.read_u8().map_err(|_| truncated("indexed metadata"))?;
        let text = read_string(&mut cursor, len as usize, "indexed metadata")?;
        entries.push(MetaData::parse(&text));
    }
    Ok(entries)
}

fn indexed(table: &[MetaData], index: u32) -> Result<MetaData> {
    table
        .get(index as usize)
        .cloned()
        .ok_or_else(|| Error::invalid_archive(format!("metadata index {} past the table ({})", index, table.len())))
}

/// Parse child object headers (name and metadata per child).
///
/// `data` excludes the trailing 32 bytes of data and child hashes.
pub fn read_object_headers(data: &[u8], table: &[MetaData]) -> Result<Vec<(String, MetaData)>> {
    let mut cursor = Cursor::new(data);
    let mut headers = Vec::new();
    while has_remaining(&cursor) {
        let name_len = read_with_hint(&mut cursor, 2, "object header")?;
        let name = read_string(&mut cursor, name_len as usize, "object name")?;
        let meta_idx = read_with_hint(&mut cursor, 0, "object header")?;
        let meta = if meta_idx == INLINE_METADATA as u32 {
            let len = read_with_hint(&mut cursor, 2, "object metadata")?;
            MetaData::parse(&read_string(&mut cursor, len as usize, "object metadata")?)
        } else {
            indexed(table, meta_idx)?
        };
        headers.push((name, meta));
    }
    Ok(headers)
}

/// A parsed property header.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyHeader {
    pub name: String,
    pub meta_data: MetaData,
    /// Compound, scalar, array or scalar-like array.
    pub property_type: u32,
    /// `None` for compounds.
    pub data_type: Option<DataType>,
    pub num_samples: u32,
    pub first_changed: u32,
    pub last_changed: u32,
    pub time_sampling_index: u32,
}

impl PropertyHeader {
    /// Stored sample that holds the value of sample `index`.
    pub fn stored_index(&self, index: u32) -> u32 {
        if index < self.first_changed || (self.first_changed == 0 && self.last_changed == 0) {
            0
        } else if index >= self.last_changed {
            self.last_changed - self.first_changed + 1
        } else {
            index - self.first_changed + 1
        }
    }
}

/// Parse the property headers of one compound.
pub fn read_property_headers(data: &[u8], table: &[MetaData]) -> Result<Vec<PropertyHeader>> {
    let mut cursor = Cursor::new(data);
    let mut headers = Vec::new();
    while has_remaining(&cursor) {
        let info = cursor.read_u32::<LittleEndian>().map_err(|_| truncated("property header"))?;
        let hint = (info >> 2) & 0x03;
        let property_type = info & 0x03;

        let mut header = PropertyHeader {
            name: String::new(),
            meta_data: MetaData::new(),
            property_type,
            data_type: None,
            num_samples: 0,
            first_changed: 0,
            last_changed: 0,
            time_sampling_index: 0,
        };

        if property_type != PTYPE_COMPOUND {
            let tag = ((info >> 4) & 0x0f) as u8;
            let pod = PlainOldDataType::from_u8(tag)
                .ok_or_else(|| Error::invalid_archive(format!("unsupported POD tag {}", tag)))?;
            header.data_type = Some(DataType::new(pod, ((info >> 12) & 0xff) as u8));
            header.num_samples = read_with_hint(&mut cursor, hint, "property header")?;

            if info & INFO_HAS_CHANGE_RANGE != 0 {
                header.first_changed = read_with_hint(&mut cursor, hint, "property header")?;
                header.last_changed = read_with_hint(&mut cursor, hint, "property header")?;
                if header.first_changed > header.last_changed && header.last_changed != 0 {
                    return Err(Error::invalid_archive("change range is reversed"));
                }
            } else if info & INFO_CONSTANT == 0 {
                header.first_changed = 1;
                header.last_changed = header.num_samples.saturating_sub(1);
            }
            if info & INFO_HAS_TIME_SAMPLING != 0 {
                header.time_sampling_index = read_with_hint(&mut cursor, hint, "property header")?;
            }
        }

        let name_len = read_with_hint(&mut cursor, hint, "property name")?;
        header.name = read_string(&mut cursor, name_len as usize, "property name")?;

        let meta_idx = (info >> 20) & 0xff;
        header.meta_data = if meta_idx == INLINE_METADATA as u32 {
            let len = read_with_hint(&mut cursor, hint, "property metadata")?;
            MetaData::parse(&read_string(&mut cursor, len as usize, "property metadata")?)
        } else {
            indexed(table, meta_idx)?
        };
        headers.push(header);
    }
    Ok(headers)
}

/// Read a whole archive back into an object tree.
pub fn read_archive(path: impl AsRef<Path>) -> Result<ArchiveDocument> {
    let archive = IArchive::open(path)?;
    if !archive.is_frozen() {
        return Err(Error::invalid_archive("archive was never finished"));
    }
    if archive.version() != CURRENT_VERSION {
        return Err(Error::invalid_archive(format!("unsupported Ogawa version {}", archive.version())));
    }
    let root = archive.root();
    if root.num_children() < 6 {
        return Err(Error::invalid_archive(format!(
            "root group has {} children, expected 6",
            root.num_children()
        )));
    }

    let file_version = read_i32(root, 0)?;
    let library_version = read_i32(root, 1)?;
    let archive_metadata = MetaData::parse(&root.data(3)?.read_string()?);
    let time_samplings = read_time_samplings(root.data(4)?.slice()?)?;
    let metadata_table = read_indexed_metadata(root.data(5)?.slice()?)?;

    let reader = TreeReader {
        metadata_table: &metadata_table,
        num_time_samplings: time_samplings.len(),
    };
    let top = reader.read_object(&root.group(2)?, ROOT_OBJECT_NAME, MetaData::new())?;

    Ok(ArchiveDocument {
        file_version,
        library_version,
        archive_metadata,
        time_samplings,
        root: top,
    })
}

fn read_i32(group: &IGroup, index: u64) -> Result<i32> {
    let data = group.data(index)?;
    let bytes = data.slice()?;
    if bytes.len() != 4 {
        return Err(Error::invalid_archive(format!("version block holds {} bytes", data.size())));
    }
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

struct TreeReader<'a> {
    metadata_table: &'a [MetaData],
    num_time_samplings: usize,
}

impl TreeReader<'_> {
    fn read_object(&self, group: &IGroup, name: &str, meta: MetaData) -> Result<OObject> {
        let mut obj = OObject::new(name).with_meta_data(meta);
        let n = group.num_children();
        if n == 0 {
            return Ok(obj);
        }

        let headers = if n > 1 && group.is_child_data(n - 1)? {
            let data = group.data(n - 1)?;
            let bytes = data.slice()?;
            let body_len = bytes
                .len()
                .checked_sub(32)
                .ok_or_else(|| truncated("object headers"))?;
            read_object_headers(&bytes[..body_len], self.metadata_table)?
        } else {
            Vec::new()
        };

        obj.properties = self.read_properties(&group.group(0)?)?;
        for (i, (child_name, child_meta)) in headers.into_iter().enumerate() {
            let child_group = group.group(i as u64 + 1)?;
            obj.add_child(self.read_object(&child_group, &child_name, child_meta)?);
        }
        Ok(obj)
    }

    fn read_properties(&self, group: &IGroup) -> Result<Vec<OProperty>> {
        let n = group.num_children();
        if n == 0 {
            return Ok(Vec::new());
        }
        let headers = read_property_headers(group.data(n - 1)?.slice()?, self.metadata_table)?;
        if headers.len() as u64 != n - 1 {
            return Err(Error::invalid_archive(format!(
                "{} property headers for {} property groups",
                headers.len(),
                n - 1
            )));
        }

        let mut props = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let prop_group = group.group(i as u64)?;
            let mut prop = match header.data_type {
                None => {
                    let mut prop = OProperty::compound(&header.name);
                    prop.data = OPropertyData::Compound {
                        children: self.read_properties(&prop_group)?,
                    };
                    prop
                }
                Some(data_type) => self.read_samples(&prop_group, header, data_type)?,
            };
            prop.meta_data = header.meta_data.clone();
            if header.time_sampling_index as usize >= self.num_time_samplings {
                return Err(Error::out_of_range(
                    "time sampling",
                    header.time_sampling_index as usize,
                    self.num_time_samplings,
                ));
            }
            prop.time_sampling_index = header.time_sampling_index;
            props.push(prop);
        }
        Ok(props)
    }

    /// Expand the stored samples of a scalar or array property back to
    /// one sample per index.
    fn read_samples(&self, group: &IGroup, header: &PropertyHeader, data_type: DataType) -> Result<OProperty> {
        let is_array = header.property_type != PTYPE_SCALAR;
        let mut prop = if is_array {
            OProperty::array(&header.name, data_type)
        } else {
            OProperty::scalar(&header.name, data_type)
        };

        let mut cached: Option<(u32, SampleData)> = None;
        for index in 0..header.num_samples {
            let stored = header.stored_index(index);
            if cached.as_ref().map(|(s, _)| *s) != Some(stored) {
                let child = if is_array { stored as u64 * 2 } else { stored as u64 };
                let data = group.data(child)?;
                let bytes = data.slice()?;
                let payload = if bytes.is_empty() {
                    bytes
                } else {
                    bytes.get(DATA_KEY_SIZE..).ok_or_else(|| truncated("sample key"))?
                };
                cached = Some((stored, SampleData::from_bytes(data_type, payload)?));
            }
            if let Some((_, sample)) = &cached {
                prop.append(index, sample.clone())?;
            }
        }
        Ok(prop)
    }
}
