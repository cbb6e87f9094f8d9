//! URL handling module for Page-Mirror
//!
//! This module turns raw command-line input into a validated, fetchable
//! http(s) URL and extracts the pieces of it the naming policy needs.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, is_valid_host};
pub use normalize::{has_scheme_marker, normalize_input, MirrorRequest};
