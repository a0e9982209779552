//! Workspace placeholder crate.
//!
//! Host applications depend on `vibetag-workspace` to pull in the composed
//! core (`core-service`) without wiring each workspace crate individually.

pub use core_service::*;
