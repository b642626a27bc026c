//! Ogawa writer helper utilities.

use std::io::Cursor;

use spooky_hash::SpookyHash;

use super::format::ACYCLIC_TIME_PER_CYCLE;
use crate::core::{TimeSampling, TimeSamplingType};
use crate::util::{DataType, Result};
use crate::writer::{OProperty, OPropertyData};

/// Write value with size hint (1, 2, or 4 bytes).
pub(crate) fn write_with_hint(buf: &mut Vec<u8>, value: u32, hint: u8) {
    match hint {
        0 => buf.push(value as u8),
        1 => buf.extend_from_slice(&(value as u16).to_le_bytes()),
        _ => buf.extend_from_slice(&value.to_le_bytes()),
    }
}

/// Size hint covering every value in `values`.
pub(crate) fn size_hint(values: &[u32]) -> u8 {
    match values.iter().copied().max().unwrap_or(0) {
        0..=255 => 0,
        256..=65535 => 1,
        _ => 2,
    }
}

/// Time per cycle and stored times, as written to disk.
pub(crate) fn time_sampling_cycle(ts: &TimeSampling) -> (f64, &[f64]) {
    match &ts.sampling_type {
        TimeSamplingType::Identity => (1.0, &[0.0]),
        TimeSamplingType::Acyclic { times } => (ACYCLIC_TIME_PER_CYCLE, times),
    }
}

/// 128-bit MurmurHash3 digest of a sample payload, low word first.
pub(crate) fn content_digest(bytes: &[u8]) -> Result<[u8; 16]> {
    let hash = murmur3::murmur3_x64_128(&mut Cursor::new(bytes), 0)?;
    Ok(hash.to_le_bytes())
}

/// Split a digest into its two little-endian words.
pub(crate) fn digest_words(digest: &[u8; 16]) -> (u64, u64) {
    let mut lo = [0u8; 8];
    let mut hi = [0u8; 8];
    lo.copy_from_slice(&digest[..8]);
    hi.copy_from_slice(&digest[8..]);
    (u64::from_le_bytes(lo), u64::from_le_bytes(hi))
}

/// Fold array dimensions into a sample digest.
pub(crate) fn hash_dimensions(dims: &[u64], digest: (u64, u64)) -> (u64, u64) {
    if dims.is_empty() {
        return digest;
    }
    let mut hasher = SpookyHash::new(0, 0);
    let dims_bytes: Vec<u8> = dims.iter().flat_map(|d| d.to_le_bytes()).collect();
    hasher.update(&dims_bytes);
    let mut digest_bytes = [0u8; 16];
    digest_bytes[..8].copy_from_slice(&digest.0.to_le_bytes());
    digest_bytes[8..].copy_from_slice(&digest.1.to_le_bytes());
    hasher.update(&digest_bytes);
    hasher.finalize()
}

/// Hash a property header.
///
/// Non-compound properties also hash their type, a scalar marker and
/// the time sampling they use.
pub(crate) fn hash_property_header(hasher: &mut SpookyHash, prop: &OProperty, time_sampling: &TimeSampling) {
    let mut data = Vec::new();
    data.extend_from_slice(prop.name.as_bytes());
    data.extend_from_slice(prop.meta_data.serialize().as_bytes());

    if let Some(DataType { pod, extent }) = prop.data_type() {
        data.push(pod.tag());
        data.push(extent);
        if matches!(prop.data, OPropertyData::Scalar { .. }) {
            data.push(0);
        }
        let (tpc, times) = time_sampling_cycle(time_sampling);
        data.extend_from_slice(&tpc.to_le_bytes());
        data.extend_from_slice(&(times.len() as u32).to_le_bytes());
        for t in times {
            data.extend_from_slice(&t.to_le_bytes());
        }
    }

    if !data.is_empty() {
        hasher.update(&data);
    }
}

/// Version string stored as `_ai_AlembicVersion`.
pub(crate) fn format_alembic_version(version: i32) -> String {
    let major = version / 10000;
    let minor = (version / 100) % 100;
    let patch = version % 100;
    let date = option_env!("OBJSEQ_BUILD_DATE").unwrap_or("unknown");
    format!("Alembic {}.{}.{} (built {})", major, minor, patch, date)
}
