//! Implementations of traits from this module using third-party crates

pub mod fields;
pub mod json;
pub mod memory;
pub mod redis;
