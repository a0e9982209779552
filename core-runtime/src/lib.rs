//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the library engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the sync and analysis crates
//! depend on. It establishes the logging conventions, the fail-fast
//! configuration builder and the event broadcasting used throughout the
//! workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
