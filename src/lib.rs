// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod content;
pub mod context;
pub mod metrics;
pub mod pwa;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::cache::{CacheEngine, ControlMessage, LifecycleState, MessageOutcome};
pub use crate::config::SiteConfig;
pub use crate::content::{Aggregator, Entry, Lookup, Source};
pub use crate::context::SiteContext;
pub use crate::pwa::{ClientEvent, PwaSession};
