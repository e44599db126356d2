//! Notifications exchanged over the bus
//!
//! Producers live outside of this workspace (the board, comment and like services), which is why
//! every event tolerates additional fields and textual numbers.

mod auth;
mod content;
mod like;

pub use auth::*;
pub use content::*;
pub use like::*;

/// Retention of the request queue, requests are short-lived by nature
const QUEUE_SIZE_REQUESTS: usize = 10_000;

/// Retention of entity change and interaction events
const QUEUE_SIZE_EVENTS: usize = 100_000;
