//! End-to-end pipeline tests driving the orchestrator against a stand-in
//! builder process instead of the real flatpak-builder.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use winepak_core::{AppEdits, BuildConfig, BuildLayout, BuildState, CoreError, Orchestrator};
use winepak_registry::AppRegistry;

fn make_app_dir(root: &Path, name: &str) -> PathBuf {
    let app = root.join(name);
    std::fs::create_dir_all(app.join("bin")).unwrap();
    std::fs::write(app.join("bin").join("run.exe"), b"MZ").unwrap();
    std::fs::write(app.join("icon.png"), b"png").unwrap();
    app
}

#[cfg(unix)]
fn write_fake_builder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-builder.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn capture_sink() -> (Arc<Mutex<Vec<String>>>, winepak_core::LogSink) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = Arc::clone(&lines);
    let sink: winepak_core::LogSink = Arc::new(move |msg: &str| {
        sink_lines.lock().unwrap().push(msg.to_owned());
    });
    (lines, sink)
}

fn orchestrator_through_generate(root: &Path, app: &Path) -> Orchestrator {
    let layout = BuildLayout::new(root.join("data"));
    let mut orch = Orchestrator::new(layout, AppRegistry::new());
    orch.import(app).unwrap();
    orch.analyze(&AppEdits {
        version: Some("1.0".to_owned()),
        ..AppEdits::default()
    })
    .unwrap();
    orch.configure(&BuildConfig::default()).unwrap();
    orch.generate_manifest().unwrap();
    orch
}

#[cfg(unix)]
#[test]
fn successful_build_stages_tree_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app_dir(dir.path(), "Demo App");
    let mut orch = orchestrator_through_generate(dir.path(), &app);
    let builder = write_fake_builder(dir.path(), "echo building; echo done; exit 0");
    orch.set_builder_program(builder.to_string_lossy());

    let (lines, sink) = capture_sink();
    orch.set_log_sink(sink);

    orch.build().unwrap();
    assert_eq!(orch.state(), BuildState::Building);

    let outcome = orch.wait_build().unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(orch.state(), BuildState::Succeeded);

    // Build tree was created and populated before launch.
    let build_dir = dir.path().join("data").join("org.winepak.demo_app");
    assert!(build_dir.join("manifest.json").exists());
    assert!(build_dir.join("app").join("bin").join("run.exe").exists());
    assert!(build_dir.join("icon").join("icon.png").exists());

    // Builder output was forwarded line by line, in order.
    let captured = lines.lock().unwrap();
    let building = captured.iter().position(|l| l == "building").unwrap();
    let done = captured.iter().position(|l| l == "done").unwrap();
    assert!(building < done);
}

#[cfg(unix)]
#[test]
fn failing_build_surfaces_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app_dir(dir.path(), "Demo");
    let mut orch = orchestrator_through_generate(dir.path(), &app);
    let builder = write_fake_builder(dir.path(), "echo boom >&2; exit 7");
    orch.set_builder_program(builder.to_string_lossy());

    let (lines, sink) = capture_sink();
    orch.set_log_sink(sink);

    orch.build().unwrap();
    let outcome = orch.wait_build().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, 7);
    assert_eq!(orch.state(), BuildState::Failed);

    let captured = lines.lock().unwrap();
    assert!(captured.iter().any(|l| l == "boom"));
    assert!(captured
        .iter()
        .any(|l| l.contains("failed with exit code: 7")));
}

#[cfg(unix)]
#[test]
fn second_build_is_rejected_not_queued() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app_dir(dir.path(), "Demo");
    let mut orch = orchestrator_through_generate(dir.path(), &app);
    let builder = write_fake_builder(dir.path(), "sleep 2; exit 0");
    orch.set_builder_program(builder.to_string_lossy());

    orch.build().unwrap();
    assert!(matches!(orch.build(), Err(CoreError::BuildInProgress)));

    // Importing while building is also rejected.
    assert!(matches!(
        orch.import(&app),
        Err(CoreError::InvalidTransition { .. })
    ));

    let outcome = orch.wait_build().unwrap();
    assert!(outcome.success);
}

#[cfg(unix)]
#[test]
fn poll_reports_running_then_completion() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app_dir(dir.path(), "Demo");
    let mut orch = orchestrator_through_generate(dir.path(), &app);
    let builder = write_fake_builder(dir.path(), "sleep 1; exit 0");
    orch.set_builder_program(builder.to_string_lossy());

    orch.build().unwrap();
    // Immediately after launch the builder is still running.
    assert!(orch.poll_build().unwrap().is_none());

    let outcome = loop {
        if let Some(outcome) = orch.poll_build().unwrap() {
            break outcome;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    };
    assert!(outcome.success);
    assert_eq!(orch.state(), BuildState::Succeeded);
}

#[test]
fn staging_failure_aborts_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app_dir(dir.path(), "Demo");
    let mut orch = orchestrator_through_generate(dir.path(), &app);

    // Source tree disappears between generate and build.
    std::fs::remove_dir_all(&app).unwrap();

    let err = orch.build().unwrap_err();
    assert!(matches!(err, CoreError::ToolFailed { .. }));
    // No process was launched; the pipeline did not enter Building.
    assert_eq!(orch.state(), BuildState::ManifestGenerated);
    assert!(matches!(
        orch.poll_build().unwrap_err(),
        CoreError::NoActiveBuild
    ));
}

#[test]
fn missing_builder_reports_start_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = make_app_dir(dir.path(), "Demo");
    let mut orch = orchestrator_through_generate(dir.path(), &app);
    orch.set_builder_program("/no/such/flatpak-builder");

    let err = orch.build().unwrap_err();
    assert!(matches!(err, CoreError::ToolStart { .. }));
    assert_eq!(orch.state(), BuildState::ManifestGenerated);
}

#[test]
fn import_then_keyword_icon_end_to_end() {
    // Directory with one .exe and one icon.png: the keyword match wins over
    // the first-found fallback.
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("Player");
    std::fs::create_dir_all(&app).unwrap();
    std::fs::write(app.join("aaa_cover.png"), b"png").unwrap();
    std::fs::write(app.join("icon.png"), b"png").unwrap();
    std::fs::write(app.join("player.exe"), b"MZ").unwrap();

    let layout = BuildLayout::new(dir.path().join("data"));
    let mut orch = Orchestrator::new(layout, AppRegistry::new());
    let id = orch.import(&app).unwrap();

    let record = orch.registry().get(&id).unwrap();
    assert_eq!(
        record.executable_path.as_deref(),
        Some(app.join("player.exe").as_path())
    );
    assert_eq!(record.icon_path.as_deref(), Some(app.join("icon.png").as_path()));
}
