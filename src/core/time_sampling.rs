//! Time sampling types.
//!
//! Archive properties are sampled over time. The TimeSampling struct
//! describes when each sample was recorded.

use serde::{Deserialize, Serialize};

use crate::util::Chrono;

/// Type of time sampling.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimeSamplingType {
    /// Single static sample at time 0 (identity sampling).
    #[default]
    Identity,

    /// Acyclic sampling: explicit time for each sample, no wrap-around
    /// from the last sample back to the first.
    Acyclic {
        times: Vec<Chrono>,
    },
}

/// Time sampling information for a property.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSampling {
    /// The type of sampling.
    pub sampling_type: TimeSamplingType,
}

impl TimeSampling {
    /// Identity time sampling (single sample at time 0).
    pub const IDENTITY: Self = Self {
        sampling_type: TimeSamplingType::Identity,
    };

    /// Create acyclic time sampling from explicit times.
    pub fn acyclic(times: Vec<Chrono>) -> Self {
        Self {
            sampling_type: TimeSamplingType::Acyclic { times },
        }
    }

    /// Check if this is identity (static) sampling.
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self.sampling_type, TimeSamplingType::Identity)
    }

    /// Check if this is acyclic sampling.
    #[inline]
    pub fn is_acyclic(&self) -> bool {
        matches!(self.sampling_type, TimeSamplingType::Acyclic { .. })
    }

    /// Explicitly stored sample times (empty for identity).
    pub fn stored_times(&self) -> &[Chrono] {
        match &self.sampling_type {
            TimeSamplingType::Identity => &[],
            TimeSamplingType::Acyclic { times } => times,
        }
    }

    /// Number of explicitly stored times.
    pub fn num_stored_times(&self) -> usize {
        match &self.sampling_type {
            TimeSamplingType::Identity => 1,
            TimeSamplingType::Acyclic { times } => times.len(),
        }
    }

    /// Get the time for a specific sample index.
    ///
    /// Acyclic sampling has no extrapolation: indices past the last
    /// stored time clamp to it.
    pub fn sample_time(&self, index: usize) -> Chrono {
        match &self.sampling_type {
            TimeSamplingType::Identity => 0.0,
            TimeSamplingType::Acyclic { times } => times
                .get(index)
                .or_else(|| times.last())
                .copied()
                .unwrap_or(0.0),
        }
    }

    /// Check whether two samplings describe the same sample times.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        self.sampling_type == other.sampling_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acyclic_sampling() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5, 1.0, 2.0]);

        assert!(ts.is_acyclic());
        assert_eq!(ts.num_stored_times(), 4);
        assert_eq!(ts.sample_time(0), 0.0);
        assert_eq!(ts.sample_time(1), 0.5);
        assert_eq!(ts.sample_time(3), 2.0);
        assert_eq!(ts.sample_time(9), 2.0);
    }

    #[test]
    fn test_identity_sampling() {
        let ts = TimeSampling::default();
        assert!(ts.is_identity());
        assert_eq!(ts.sample_time(5), 0.0);
        assert!(ts.stored_times().is_empty());
    }

    #[test]
    fn test_equivalence() {
        let a = TimeSampling::acyclic(vec![0.0, 0.5]);
        let b = TimeSampling::acyclic(vec![0.0, 0.5]);
        let c = TimeSampling::acyclic(vec![0.0, 0.25]);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
        assert!(!a.is_equivalent(&TimeSampling::IDENTITY));
    }

    #[test]
    fn test_serde_shape() {
        let ts = TimeSampling::acyclic(vec![0.0, 0.5]);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#"{"type":"acyclic","times":[0.0,0.5]}"#);
        let back: TimeSampling = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}
