//! # Repository Pattern Implementation
//!
//! Persistence seam for the library store. The store keeps the authoritative
//! state in memory and writes every committed mutation through a
//! [`LibraryRepository`]; `SqliteLibraryRepository` is the bundled
//! implementation.

pub mod library;

pub use library::{LibraryRepository, LibrarySnapshot, SqliteLibraryRepository, StoredSong};
