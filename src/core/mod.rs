//! Core layer - fundamental archive types.
//!
//! This module provides:
//! - [`TimeSampling`] - Time sampling for animated properties
//! - [`MetaData`] - Key-value metadata storage
//! - [`GeometryScope`] / [`SampleData`] - Scopes and typed sample payloads

mod time_sampling;
mod metadata;
mod sample;

pub use time_sampling::{TimeSampling, TimeSamplingType};
pub use metadata::MetaData;
pub use sample::{GeometryScope, SampleData};
