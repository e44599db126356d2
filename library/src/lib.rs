//! Independent and project agnostic libraries
//!
//! Everything in here has been written with the switchboard in mind, however, nothing is bound to
//! the content platform it serves. Domain specific types and keys live in the `domain` crate.
#![deny(missing_docs)]

pub mod cache;
pub mod communication;
pub mod helpers;

/// Generic error type
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result with no value and a [`BoxedError`]
pub type EmptyResult = Result<(), BoxedError>;
