//! SnapChef - photo-to-recipe backend.
//!
//! Turns a photo of food or ingredients into a generated recipe, gated by a
//! free/premium entitlement model: weekly free-use caps, per-action
//! cooldowns, and a one-regeneration limit for free scans.

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod generation;
pub mod jobs;
pub mod media;
pub mod metrics;
pub mod quota;
pub mod scans;
pub mod server;
pub mod store;
