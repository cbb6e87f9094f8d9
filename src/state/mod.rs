//! State module for tracking mirror progress
//!
//! # Components
//!
//! - `MirrorStage`: the stage a mirror operation is in (validating, fetching, writing, etc.)

mod mirror_stage;

// Re-export main types
pub use mirror_stage::MirrorStage;
