//! Runtime harness to execute services in the context of modules

#![deny(missing_docs)]

mod bus;
mod heart;
mod module;
mod service;

pub use bus::*;
pub use heart::*;
pub use module::*;
pub use service::*;
