//! Imported-application records and registry persistence for Winepak.
//!
//! This crate holds the [`AppRecord`] data model for one imported
//! PortableApp and the [`AppRegistry`] collection that is loaded in full at
//! startup and rewritten in full at shutdown.

pub mod record;
pub mod registry;

pub use record::{fresh_record_id, AppRecord};
pub use registry::AppRegistry;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse registry file: {0}")]
    Json(#[from] serde_json::Error),
}
