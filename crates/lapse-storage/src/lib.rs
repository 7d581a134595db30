//! Object storage for skylapse.
//!
//! This crate provides:
//! - The [`ObjectStore`] port used by the capture and timelapse pipelines
//! - A DigitalOcean Spaces (S3-compatible) adapter
//! - An in-memory adapter for tests and dry runs

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{SpacesClient, SpacesConfig};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use store::{content_type_for, ObjectStore, PutOptions};
