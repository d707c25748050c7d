//! Flatpak manifest model and build-module generators for Winepak.
//!
//! This crate defines the descriptor layer: the mutable
//! [`FlatpakManifest`] document builder, the Wine/DXVK build-module
//! generators, and the identifier newtypes shared across the workspace.

pub mod manifest;
pub mod modules;
pub mod types;

pub use manifest::{
    FlatpakManifest, ManifestError, DEFAULT_RUNTIME, DEFAULT_RUNTIME_VERSION, DEFAULT_SDK,
};
pub use modules::{dxvk_module, wine_modules, BuildModule, ShellCommands};
pub use types::{AppId, RecordId, WineArch, WineVersion, APP_ID_PREFIX};
