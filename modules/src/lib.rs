//! Runnable modules each bundling multiple services and providing a unified configuration

#![deny(missing_docs)]

pub mod options;

pub mod content;
pub mod identity;
pub mod interaction;
