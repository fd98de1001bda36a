//! Annotation versioning, search expansion and ontology mapping curation.
//!
//! * [`annotation`] resolves incoming annotations against stored versions,
//!   one at a time or as concurrent batches.
//! * [`search`] composes annotation summary searches into a staged pipeline.
//! * [`curation`] turns search results into automatic mappings or curation
//!   candidates.

pub mod annotation;
pub mod config;
pub mod curation;
pub mod errors;
pub mod logger;
pub mod search;

pub use errors::{Error, Result};
