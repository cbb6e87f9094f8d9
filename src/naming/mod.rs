//! Naming policy for mirrored files
//!
//! This module decides where everything lands on disk:
//! - `NameCounter`: persisted counter handing out fallback page names
//! - file and folder naming rules, including sanitizing
//! - `MirrorTarget`: the resolved destination of one mirror operation

mod counter;
mod namer;
mod target;

pub use counter::{CounterStore, FileCounterStore, MemoryCounterStore, NameCounter};
pub use namer::{
    ensure_folder, file_name_for, host_folder, image_file_name, is_valid_file_name, sanitize,
    FORBIDDEN_CHARS,
};
pub use target::MirrorTarget;
