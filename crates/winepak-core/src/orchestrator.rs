use crate::layout::BuildLayout;
use crate::lifecycle::{validate_transition, BuildState};
use crate::scan;
use crate::staging::{stage_app_tree, stage_icon};
use crate::CoreError;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};
use winepak_manifest::{
    dxvk_module, wine_modules, AppId, FlatpakManifest, RecordId, WineArch, WineVersion,
    DEFAULT_RUNTIME, DEFAULT_RUNTIME_VERSION, DEFAULT_SDK,
};
use winepak_registry::{fresh_record_id, AppRecord, AppRegistry};

/// Receives build log lines and progress messages from the orchestrator.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Transient configuration for one manifest-generation cycle. Folded into
/// the selected [`AppRecord`] by [`Orchestrator::configure`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub wine_version: WineVersion,
    pub wine_arch: WineArch,
    pub dll_overrides: String,
    pub enable_dxvk: bool,
    pub dxvk_version: String,
    pub allow_network: bool,
    pub allow_documents: bool,
    pub allow_downloads: bool,
    pub allow_audio: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            wine_version: WineVersion::Stable,
            wine_arch: WineArch::Win64,
            dll_overrides: String::new(),
            enable_dxvk: false,
            dxvk_version: "latest".to_owned(),
            allow_network: true,
            allow_documents: true,
            allow_downloads: true,
            allow_audio: true,
        }
    }
}

/// User edits applied to the selected record by the analyze step. `None`
/// leaves the detected value untouched.
#[derive(Debug, Clone, Default)]
pub struct AppEdits {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub executable_path: Option<PathBuf>,
    pub icon_path: Option<PathBuf>,
}

/// Result of a finished external build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    pub exit_code: i32,
}

struct ActiveBuild {
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
}

/// Drives the packaging pipeline: Import → Analyze → Configure → Generate →
/// Build → Succeeded/Failed.
///
/// One orchestrator owns one registry, one manifest under construction, and
/// at most one live builder process. All transition methods report
/// precondition violations without changing state; a second build while one
/// is in flight is rejected, never queued.
pub struct Orchestrator {
    layout: BuildLayout,
    registry: AppRegistry,
    manifest: FlatpakManifest,
    state: BuildState,
    current: Option<RecordId>,
    dxvk: Option<String>,
    builder_program: String,
    active: Option<ActiveBuild>,
    log: LogSink,
}

impl Orchestrator {
    pub fn new(layout: BuildLayout, registry: AppRegistry) -> Self {
        Self {
            layout,
            registry,
            manifest: FlatpakManifest::new(),
            state: BuildState::Empty,
            current: None,
            dxvk: None,
            builder_program: "flatpak-builder".to_owned(),
            active: None,
            log: Arc::new(|msg: &str| info!("{msg}")),
        }
    }

    pub fn set_log_sink(&mut self, sink: LogSink) {
        self.log = sink;
    }

    /// Override the builder executable. Exists so tests can substitute a
    /// stand-in process for flatpak-builder.
    pub fn set_builder_program(&mut self, program: impl Into<String>) {
        self.builder_program = program.into();
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn current_id(&self) -> Option<&RecordId> {
        self.current.as_ref()
    }

    pub fn current_record(&self) -> Option<&AppRecord> {
        self.current.as_ref().and_then(|id| self.registry.get(id))
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AppRegistry {
        &mut self.registry
    }

    pub fn manifest(&self) -> &FlatpakManifest {
        &self.manifest
    }

    fn emit(&self, msg: &str) {
        (self.log.as_ref())(msg);
    }

    fn require_current(&self) -> Result<RecordId, CoreError> {
        self.current.clone().ok_or(CoreError::NoAppSelected)
    }

    fn current_record_cloned(&self, id: &RecordId) -> Result<AppRecord, CoreError> {
        self.registry
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::AppNotFound(id.to_string()))
    }

    /// Import a PortableApp directory: generate a fresh record id, seed the
    /// name from the directory leaf, detect the launch executable and an
    /// icon, register the record, and select it.
    pub fn import(&mut self, dir: &Path) -> Result<RecordId, CoreError> {
        validate_transition(self.state, BuildState::AppSelected)?;

        let id = fresh_record_id(dir);
        let mut record = AppRecord::new(id.clone(), dir);
        record.executable_path = scan::find_executable(dir);
        record.icon_path = scan::find_icon(dir, &record.name);

        debug!(
            "imported '{}' from {} (exe: {:?}, icon: {:?})",
            record.name,
            dir.display(),
            record.executable_path,
            record.icon_path
        );

        self.registry.insert(record);
        self.current = Some(id.clone());
        self.state = BuildState::AppSelected;
        Ok(id)
    }

    /// Select an already-imported record.
    pub fn select(&mut self, id: &RecordId) -> Result<(), CoreError> {
        validate_transition(self.state, BuildState::AppSelected)?;
        if !self.registry.contains(id) {
            return Err(CoreError::AppNotFound(id.to_string()));
        }
        self.current = Some(id.clone());
        self.state = BuildState::AppSelected;
        Ok(())
    }

    /// Remove a record from the registry. Removing the selected record
    /// resets the pipeline; removal during a build is rejected.
    pub fn remove(&mut self, id: &RecordId) -> Result<AppRecord, CoreError> {
        if self.state == BuildState::Building {
            return Err(CoreError::BuildInProgress);
        }
        let record = self
            .registry
            .remove(id)
            .ok_or_else(|| CoreError::AppNotFound(id.to_string()))?;
        if self.current.as_ref() == Some(id) {
            self.current = None;
            self.state = BuildState::Empty;
        }
        Ok(record)
    }

    /// Overwrite the selected record's editable fields with user edits.
    pub fn analyze(&mut self, edits: &AppEdits) -> Result<(), CoreError> {
        let id = self.require_current()?;
        validate_transition(self.state, BuildState::Analyzed)?;

        let record = self
            .registry
            .get_mut(&id)
            .ok_or_else(|| CoreError::AppNotFound(id.to_string()))?;
        if let Some(name) = &edits.name {
            record.name.clone_from(name);
        }
        if let Some(version) = &edits.version {
            record.version.clone_from(version);
        }
        if let Some(description) = &edits.description {
            record.description.clone_from(description);
        }
        if let Some(category) = &edits.category {
            record.category.clone_from(category);
        }
        if let Some(exe) = &edits.executable_path {
            record.executable_path = Some(exe.clone());
        }
        if let Some(icon) = &edits.icon_path {
            record.icon_path = Some(icon.clone());
        }
        record.touch();

        self.state = BuildState::Analyzed;
        Ok(())
    }

    /// Fold the Wine/DXVK/permission configuration into the selected record.
    pub fn configure(&mut self, config: &BuildConfig) -> Result<(), CoreError> {
        let id = self.require_current()?;
        validate_transition(self.state, BuildState::Configured)?;

        let record = self
            .registry
            .get_mut(&id)
            .ok_or_else(|| CoreError::AppNotFound(id.to_string()))?;
        record.wine_version = config.wine_version;
        record.wine_arch = config.wine_arch;
        record.wine_dll_overrides.clone_from(&config.dll_overrides);
        record.allow_network = config.allow_network;
        record.allow_documents = config.allow_documents;
        record.allow_downloads = config.allow_downloads;
        record.allow_audio = config.allow_audio;
        record.touch();

        self.dxvk = config.enable_dxvk.then(|| config.dxvk_version.clone());

        self.state = BuildState::Configured;
        Ok(())
    }

    /// Launch argument for Wine: the executable path relative to the app's
    /// source tree, rewritten to Windows separators under `Z:\app\`.
    fn launch_arg(record: &AppRecord) -> String {
        let exe = record.executable_path.as_deref().unwrap_or(Path::new(""));
        let relative = exe.strip_prefix(&record.source_dir).unwrap_or(exe);
        let windows_path = relative.to_string_lossy().replace('/', "\\");
        format!("Z:\\app\\{windows_path}")
    }

    /// Build the manifest for the selected record.
    ///
    /// A precondition failure (no app selected, wrong phase) leaves the
    /// existing manifest untouched.
    pub fn generate_manifest(&mut self) -> Result<AppId, CoreError> {
        let id = self.require_current()?;
        validate_transition(self.state, BuildState::ManifestGenerated)?;
        let record = self.current_record_cloned(&id)?;

        self.manifest.reset();

        let app_id = AppId::derive(&record.name);
        self.manifest.set_app_id(app_id.clone());
        self.manifest.set_app_name(&record.name);
        self.manifest.set_app_version(&record.version);
        self.manifest.set_app_description(&record.description);

        if let Some(icon) = &record.icon_path {
            if icon.exists() {
                self.manifest.set_app_icon(icon.to_string_lossy());
            }
        }

        self.manifest.set_runtime(DEFAULT_RUNTIME);
        self.manifest.set_runtime_version(DEFAULT_RUNTIME_VERSION);
        self.manifest.set_sdk(DEFAULT_SDK);

        for module in wine_modules(record.wine_version, record.wine_arch) {
            self.manifest.add_module(module);
        }
        if let Some(version) = &self.dxvk {
            self.manifest.add_module(dxvk_module(version));
        }

        let mut env = BTreeMap::new();
        env.insert("WINEPREFIX".to_owned(), "/var/data/wine".to_owned());
        if !record.wine_dll_overrides.is_empty() {
            env.insert(
                "WINEDLLOVERRIDES".to_owned(),
                record.wine_dll_overrides.clone(),
            );
        }
        self.manifest.set_environment(env);

        self.manifest.set_command("wine");
        self.manifest.add_command_arg(Self::launch_arg(&record));

        self.manifest.set_allow_network(record.allow_network);
        self.manifest.set_allow_audio(record.allow_audio);

        self.manifest
            .add_filesystem_access(format!("~/.local/share/winepak/{app_id}:create"));
        self.manifest.add_filesystem_access("xdg-documents");
        self.manifest.add_filesystem_access("xdg-download");

        self.emit(&format!("manifest generated for {}", record.name));
        self.emit(&format!("app id: {app_id}"));
        self.emit(&format!("wine version: {}", record.wine_version));

        self.state = BuildState::ManifestGenerated;
        Ok(app_id)
    }

    /// Serialize the manifest into the build tree, stage the app payload and
    /// icon, and launch flatpak-builder. Any failure before the launch
    /// aborts with no state change; after a successful launch the pipeline
    /// is `Building` until [`poll_build`](Self::poll_build) or
    /// [`wait_build`](Self::wait_build) observes completion.
    pub fn build(&mut self) -> Result<(), CoreError> {
        if self.active.is_some() {
            return Err(CoreError::BuildInProgress);
        }
        let id = self.require_current()?;
        validate_transition(self.state, BuildState::Building)?;
        let record = self.current_record_cloned(&id)?;

        let app_id = self.manifest.app_id().clone();
        self.layout.initialize(&app_id)?;

        let manifest_path = self.layout.manifest_path(&app_id);
        self.manifest.save_to_file(&manifest_path)?;

        stage_app_tree(&record.source_dir, &self.layout.app_dir(&app_id))?;
        if let Some(icon) = &record.icon_path {
            if icon.exists() {
                stage_icon(icon, &self.layout.icon_dir(&app_id))?;
            }
        }

        self.emit("starting flatpak build process...");
        let mut child = Command::new(&self.builder_program)
            .current_dir(self.layout.build_dir(&app_id))
            .args(["--force-clean", "--user", "--install", "build"])
            .arg(&manifest_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::ToolStart {
                tool: self.builder_program.clone(),
                source: e,
            })?;

        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(spawn_forwarder(stdout, Arc::clone(&self.log)));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(spawn_forwarder(stderr, Arc::clone(&self.log)));
        }

        self.active = Some(ActiveBuild { child, forwarders });
        self.state = BuildState::Building;
        self.emit("building flatpak... this may take several minutes");
        Ok(())
    }

    /// Non-blocking completion check for the running build. `Ok(None)` means
    /// the builder is still running.
    pub fn poll_build(&mut self) -> Result<Option<BuildOutcome>, CoreError> {
        let status = {
            let active = self.active.as_mut().ok_or(CoreError::NoActiveBuild)?;
            active.child.try_wait()?
        };
        match status {
            None => Ok(None),
            Some(status) => {
                if let Some(finished) = self.active.take() {
                    for handle in finished.forwarders {
                        let _ = handle.join();
                    }
                }
                Ok(Some(self.complete(status)))
            }
        }
    }

    /// Block until the running build completes.
    pub fn wait_build(&mut self) -> Result<BuildOutcome, CoreError> {
        let mut finished = self.active.take().ok_or(CoreError::NoActiveBuild)?;
        let status = finished.child.wait()?;
        for handle in finished.forwarders {
            let _ = handle.join();
        }
        Ok(self.complete(status))
    }

    fn complete(&mut self, status: ExitStatus) -> BuildOutcome {
        let exit_code = status.code().unwrap_or(-1);
        if status.success() {
            self.emit("flatpak built and installed successfully");
            self.state = BuildState::Succeeded;
        } else {
            self.emit(&format!("flatpak build failed with exit code: {exit_code}"));
            self.state = BuildState::Failed;
        }
        BuildOutcome {
            success: status.success(),
            exit_code,
        }
    }
}

fn spawn_forwarder(stream: impl Read + Send + 'static, sink: LogSink) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            match line {
                Ok(line) => (sink.as_ref())(&line),
                Err(_) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, Orchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let layout = BuildLayout::new(dir.path().join("data"));
        (dir, Orchestrator::new(layout, AppRegistry::new()))
    }

    fn make_app_dir(root: &Path, name: &str) -> PathBuf {
        let app = root.join(name);
        std::fs::create_dir_all(app.join("sub")).unwrap();
        std::fs::write(app.join("sub").join("app.exe"), b"MZ").unwrap();
        std::fs::write(app.join("icon.png"), b"png").unwrap();
        app
    }

    #[test]
    fn import_detects_executable_and_icon() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo App");

        let id = orch.import(&app).unwrap();
        assert_eq!(orch.state(), BuildState::AppSelected);

        let record = orch.registry().get(&id).unwrap();
        assert_eq!(record.name, "Demo App");
        assert_eq!(
            record.executable_path.as_deref(),
            Some(app.join("sub/app.exe").as_path())
        );
        assert_eq!(record.icon_path.as_deref(), Some(app.join("icon.png").as_path()));
    }

    #[test]
    fn analyze_without_selection_is_a_precondition_error() {
        let (_dir, mut orch) = fixture();
        let err = orch.analyze(&AppEdits::default()).unwrap_err();
        assert!(matches!(err, CoreError::NoAppSelected));
        assert_eq!(orch.state(), BuildState::Empty);
    }

    #[test]
    fn analyze_overwrites_edited_fields_only() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo");
        let id = orch.import(&app).unwrap();

        orch.analyze(&AppEdits {
            name: Some("Renamed".to_owned()),
            version: Some("3.1".to_owned()),
            ..AppEdits::default()
        })
        .unwrap();

        let record = orch.registry().get(&id).unwrap();
        assert_eq!(record.name, "Renamed");
        assert_eq!(record.version, "3.1");
        // Untouched detected fields survive.
        assert!(record.executable_path.is_some());
        assert_eq!(orch.state(), BuildState::Analyzed);
    }

    #[test]
    fn configure_folds_settings_into_record() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo");
        let id = orch.import(&app).unwrap();
        orch.analyze(&AppEdits::default()).unwrap();

        orch.configure(&BuildConfig {
            wine_version: WineVersion::Staging,
            wine_arch: WineArch::Win32,
            dll_overrides: "mscoree=n,b".to_owned(),
            allow_network: false,
            ..BuildConfig::default()
        })
        .unwrap();

        let record = orch.registry().get(&id).unwrap();
        assert_eq!(record.wine_version, WineVersion::Staging);
        assert_eq!(record.wine_arch, WineArch::Win32);
        assert_eq!(record.wine_dll_overrides, "mscoree=n,b");
        assert!(!record.allow_network);
        assert_eq!(orch.state(), BuildState::Configured);
    }

    #[test]
    fn generate_without_selection_leaves_manifest_unchanged() {
        let (_dir, mut orch) = fixture();
        let before = orch.manifest().clone();
        let err = orch.generate_manifest().unwrap_err();
        assert!(matches!(err, CoreError::NoAppSelected));
        assert_eq!(*orch.manifest(), before);
    }

    #[test]
    fn generate_out_of_phase_is_rejected() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo");
        orch.import(&app).unwrap();
        // AppSelected, not Configured
        let err = orch.generate_manifest().unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    fn run_through_generate(orch: &mut Orchestrator, app: &Path) -> AppId {
        orch.import(app).unwrap();
        orch.analyze(&AppEdits {
            version: Some("1.0".to_owned()),
            description: Some("A demo app".to_owned()),
            ..AppEdits::default()
        })
        .unwrap();
        orch.configure(&BuildConfig::default()).unwrap();
        orch.generate_manifest().unwrap()
    }

    #[test]
    fn generate_produces_expected_document() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo App");
        let app_id = run_through_generate(&mut orch, &app);

        assert_eq!(app_id.as_str(), "org.winepak.demo_app");
        assert_eq!(orch.state(), BuildState::ManifestGenerated);

        let doc = orch.manifest().to_json();
        assert_eq!(doc["app-id"], "org.winepak.demo_app");
        assert_eq!(doc["command"], "wine");
        assert_eq!(doc["command-args"][0], "Z:\\app\\sub\\app.exe");
        assert_eq!(doc["environment"]["WINEPREFIX"], "/var/data/wine");
        assert!(doc["environment"].get("WINEDLLOVERRIDES").is_none());
        assert_eq!(doc["modules"].as_array().unwrap().len(), 2);

        let args: Vec<&str> = doc["finish-args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(
            args.last().copied().unwrap_or_default(),
            "--filesystem=xdg-download"
        );
        assert!(args.contains(&"--filesystem=~/.local/share/winepak/org.winepak.demo_app:create"));
    }

    #[test]
    fn launch_arg_strips_source_prefix_without_leading_separator() {
        let mut record = AppRecord::new(RecordId::new("test-record"), "/a/b");
        record.executable_path = Some(PathBuf::from("/a/b/sub/app.exe"));
        assert_eq!(Orchestrator::launch_arg(&record), "Z:\\app\\sub\\app.exe");
    }

    #[test]
    fn launch_arg_with_no_executable_is_bare_prefix() {
        let record = AppRecord::new(RecordId::new("test-record"), "/a/b");
        assert_eq!(Orchestrator::launch_arg(&record), "Z:\\app\\");
    }

    #[test]
    fn dxvk_module_appended_when_enabled() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo");
        orch.import(&app).unwrap();
        orch.analyze(&AppEdits::default()).unwrap();
        orch.configure(&BuildConfig {
            enable_dxvk: true,
            dxvk_version: "2.1".to_owned(),
            ..BuildConfig::default()
        })
        .unwrap();
        orch.generate_manifest().unwrap();

        let doc = orch.manifest().to_json();
        let modules = doc["modules"].as_array().unwrap();
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[2]["name"], "dxvk");
    }

    #[test]
    fn dll_overrides_flow_into_environment() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo");
        orch.import(&app).unwrap();
        orch.analyze(&AppEdits::default()).unwrap();
        orch.configure(&BuildConfig {
            dll_overrides: "mscoree=n,b".to_owned(),
            ..BuildConfig::default()
        })
        .unwrap();
        orch.generate_manifest().unwrap();

        let doc = orch.manifest().to_json();
        assert_eq!(doc["environment"]["WINEDLLOVERRIDES"], "mscoree=n,b");
    }

    #[test]
    fn missing_icon_is_not_set_on_manifest() {
        let (dir, mut orch) = fixture();
        let app = dir.path().join("NoIcon");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join("run.exe"), b"MZ").unwrap();

        orch.import(&app).unwrap();
        orch.analyze(&AppEdits {
            icon_path: Some(PathBuf::from("/definitely/missing.png")),
            ..AppEdits::default()
        })
        .unwrap();
        orch.configure(&BuildConfig::default()).unwrap();
        orch.generate_manifest().unwrap();

        assert!(orch.manifest().app_icon().is_empty());
    }

    #[test]
    fn remove_selected_record_resets_pipeline() {
        let (dir, mut orch) = fixture();
        let app = make_app_dir(dir.path(), "Demo");
        let id = orch.import(&app).unwrap();
        orch.remove(&id).unwrap();
        assert_eq!(orch.state(), BuildState::Empty);
        assert!(orch.current_id().is_none());
        assert!(orch.registry().is_empty());
    }

    #[test]
    fn remove_unknown_record_fails() {
        let (_dir, mut orch) = fixture();
        let err = orch.remove(&RecordId::new("missing")).unwrap_err();
        assert!(matches!(err, CoreError::AppNotFound(_)));
    }

    #[test]
    fn select_unknown_record_fails() {
        let (_dir, mut orch) = fixture();
        let err = orch.select(&RecordId::new("missing")).unwrap_err();
        assert!(matches!(err, CoreError::AppNotFound(_)));
    }

    #[test]
    fn poll_without_build_reports_no_active_build() {
        let (_dir, mut orch) = fixture();
        assert!(matches!(
            orch.poll_build().unwrap_err(),
            CoreError::NoActiveBuild
        ));
        assert!(matches!(
            orch.wait_build().unwrap_err(),
            CoreError::NoActiveBuild
        ));
    }
}
