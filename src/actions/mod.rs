//! File actions module.
//!
//! This module provides the filesystem mutation that finishes archiving a
//! file: swapping the source path for a symlink into the store.
//!
//! ```no_run
//! use rustvault::actions::replace_with_link;
//! use std::path::Path;
//!
//! replace_with_link(Path::new("/data/a.bin"), Path::new("/archive/ab/ab12...")).unwrap();
//! ```

pub mod rewire;

pub use rewire::{replace_with_link, RewireError};
