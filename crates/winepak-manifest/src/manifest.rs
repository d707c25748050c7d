use crate::modules::BuildModule;
use crate::types::AppId;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Default runtime the generated package targets.
pub const DEFAULT_RUNTIME: &str = "org.freedesktop.Platform";
/// Default runtime branch.
pub const DEFAULT_RUNTIME_VERSION: &str = "22.08";
/// Default SDK matching [`DEFAULT_RUNTIME`].
pub const DEFAULT_SDK: &str = "org.freedesktop.Sdk";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to write manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

/// Mutable flatpak-builder manifest under construction.
///
/// One manifest is current per generation cycle: [`reset`](Self::reset) at
/// the start, populate through the setters, project with
/// [`to_json`](Self::to_json), serialize with
/// [`save_to_file`](Self::save_to_file) immediately before the build, then
/// discard. Setters perform no validation; empty strings are legal and are
/// simply omitted from the output where the document contract allows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatpakManifest {
    app_id: AppId,
    app_name: String,
    app_version: String,
    app_description: String,
    app_icon: String,

    runtime: String,
    runtime_version: String,
    sdk: String,

    command: String,
    command_args: Vec<String>,
    environment: BTreeMap<String, String>,

    filesystem_access: Vec<String>,

    allow_network: bool,
    allow_audio: bool,

    modules: Vec<BuildModule>,
    extensions: Vec<String>,
}

impl Default for FlatpakManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatpakManifest {
    pub fn new() -> Self {
        let mut manifest = Self {
            app_id: AppId::new(""),
            app_name: String::new(),
            app_version: String::new(),
            app_description: String::new(),
            app_icon: String::new(),
            runtime: String::new(),
            runtime_version: String::new(),
            sdk: String::new(),
            command: String::new(),
            command_args: Vec::new(),
            environment: BTreeMap::new(),
            filesystem_access: Vec::new(),
            allow_network: true,
            allow_audio: true,
            modules: Vec::new(),
            extensions: Vec::new(),
        };
        manifest.reset();
        manifest
    }

    /// Restore every field to its documented default. Idempotent and safe on
    /// a fresh instance; the runtime triple is restored to the freedesktop
    /// defaults, not cleared.
    pub fn reset(&mut self) {
        self.app_id = AppId::new("");
        self.app_name.clear();
        self.app_version.clear();
        self.app_description.clear();
        self.app_icon.clear();

        self.runtime = DEFAULT_RUNTIME.to_owned();
        self.runtime_version = DEFAULT_RUNTIME_VERSION.to_owned();
        self.sdk = DEFAULT_SDK.to_owned();

        self.command.clear();
        self.command_args.clear();
        self.environment.clear();

        self.filesystem_access.clear();

        self.allow_network = true;
        self.allow_audio = true;

        self.modules.clear();
        self.extensions.clear();
    }

    pub fn set_app_id(&mut self, app_id: AppId) {
        self.app_id = app_id;
    }

    pub fn set_app_name(&mut self, name: impl Into<String>) {
        self.app_name = name.into();
    }

    pub fn set_app_version(&mut self, version: impl Into<String>) {
        self.app_version = version.into();
    }

    pub fn set_app_description(&mut self, description: impl Into<String>) {
        self.app_description = description.into();
    }

    pub fn set_app_icon(&mut self, icon_path: impl Into<String>) {
        self.app_icon = icon_path.into();
    }

    pub fn set_runtime(&mut self, runtime: impl Into<String>) {
        self.runtime = runtime.into();
    }

    pub fn set_runtime_version(&mut self, version: impl Into<String>) {
        self.runtime_version = version.into();
    }

    pub fn set_sdk(&mut self, sdk: impl Into<String>) {
        self.sdk = sdk.into();
    }

    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command = command.into();
    }

    pub fn add_command_arg(&mut self, arg: impl Into<String>) {
        self.command_args.push(arg.into());
    }

    pub fn set_environment(&mut self, env: BTreeMap<String, String>) {
        self.environment = env;
    }

    pub fn add_filesystem_access(&mut self, path: impl Into<String>) {
        self.filesystem_access.push(path.into());
    }

    pub fn set_allow_network(&mut self, allow: bool) {
        self.allow_network = allow;
    }

    pub fn set_allow_audio(&mut self, allow: bool) {
        self.allow_audio = allow;
    }

    pub fn add_module(&mut self, module: BuildModule) {
        self.modules.push(module);
    }

    pub fn add_extension(&mut self, extension_name: impl Into<String>) {
        self.extensions.push(extension_name.into());
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    /// Icon path recorded for the staging step. Carried in the model but
    /// never serialized into the manifest document.
    pub fn app_icon(&self) -> &str {
        &self.app_icon
    }

    /// Sandbox permission list in the exact order flatpak-builder receives
    /// it. The second unconditional `--share=network` reproduces observed
    /// behavior of the original generator; see DESIGN.md before changing it.
    fn finish_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.push("--share=ipc".to_owned());

        if self.allow_network {
            args.push("--share=network".to_owned());
        } else {
            args.push("--unshare=network".to_owned());
        }

        if self.allow_audio {
            args.push("--socket=pulseaudio".to_owned());
        }

        // X11 access for Wine
        args.push("--socket=x11".to_owned());
        args.push("--share=network".to_owned());

        args.push("--device=dri".to_owned());

        for path in &self.filesystem_access {
            args.push(format!("--filesystem={path}"));
        }

        args
    }

    /// Pure projection to the manifest document. Collections that are empty
    /// (`command-args`, `environment`, `modules`) and empty metadata are
    /// omitted entirely; flatpak-builder rejects some empty constructs.
    pub fn to_json(&self) -> Value {
        let mut manifest = Map::new();

        manifest.insert("app-id".to_owned(), json!(self.app_id.as_str()));
        manifest.insert("runtime".to_owned(), json!(self.runtime));
        manifest.insert("runtime-version".to_owned(), json!(self.runtime_version));
        manifest.insert("sdk".to_owned(), json!(self.sdk));

        manifest.insert("command".to_owned(), json!(self.command));
        if !self.command_args.is_empty() {
            manifest.insert("command-args".to_owned(), json!(self.command_args));
        }

        manifest.insert("finish-args".to_owned(), json!(self.finish_args()));

        if !self.environment.is_empty() {
            manifest.insert("environment".to_owned(), json!(self.environment));
        }

        let mut metadata = Map::new();
        if !self.app_name.is_empty() {
            metadata.insert("name".to_owned(), json!(self.app_name));
        }
        if !self.app_description.is_empty() {
            metadata.insert("comments".to_owned(), json!({ "C": self.app_description }));
        }
        if !metadata.is_empty() {
            manifest.insert("metadata".to_owned(), Value::Object(metadata));
        }

        if !self.modules.is_empty() {
            manifest.insert("modules".to_owned(), json!(self.modules));
        }

        Value::Object(manifest)
    }

    /// Serialize [`to_json`](Self::to_json) to `path`, atomically via a
    /// sibling temp file. Does not validate semantic completeness; a
    /// manifest with no command still serializes.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(&self.to_json())?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| ManifestError::Io(e.error))?;

        Ok(())
    }
}
