//! Config composition: defaults, merge order, deserialization.

pub mod merge_policy;
pub mod service;
