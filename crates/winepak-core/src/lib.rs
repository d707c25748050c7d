//! Build orchestration for Winepak.
//!
//! This crate ties the manifest model and the app registry together into the
//! [`Orchestrator`] — the pipeline state machine that imports PortableApp
//! directories, generates flatpak-builder manifests, and drives the external
//! build process. It also provides the build-tree layout, payload staging,
//! prerequisite checks, Wine prefix preparation, and cross-process locking.

pub mod layout;
pub mod lifecycle;
pub mod lock;
pub mod orchestrator;
pub mod prereq;
pub mod scan;
pub mod staging;
pub mod wineprefix;

pub use layout::{BuildLayout, MANIFEST_FILE};
pub use lifecycle::{validate_transition, BuildState};
pub use lock::BuildLock;
pub use orchestrator::{AppEdits, BuildConfig, BuildOutcome, LogSink, Orchestrator};
pub use prereq::{check_build_prereqs, format_missing, MissingPrereq};
pub use wineprefix::{prepare_wine_prefix, PREFIX_INIT_TIMEOUT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] winepak_manifest::ManifestError),
    #[error("registry error: {0}")]
    Registry(#[from] winepak_registry::RegistryError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no application selected")]
    NoAppSelected,
    #[error("application not found: {0}")]
    AppNotFound(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("a build is already in progress")]
    BuildInProgress,
    #[error("no build is in progress")]
    NoActiveBuild,
    #[error("failed to start {tool}: {source}")]
    ToolStart {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed with exit code {code}")]
    ToolFailed { tool: String, code: i32 },
    #[error("timeout waiting for {tool} after {seconds}s")]
    Timeout { tool: String, seconds: u64 },
}
