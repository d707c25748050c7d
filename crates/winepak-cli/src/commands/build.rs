use super::{config_from_record, json_pretty, resolve_record_id, EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use std::sync::Arc;
use winepak_core::{AppEdits, BuildLayout, BuildLock, LogSink, Orchestrator};
use winepak_registry::AppRegistry;

pub fn run(
    data_dir: &Path,
    id: &str,
    dxvk: bool,
    dxvk_version: &str,
    json: bool,
) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let _lock =
        BuildLock::acquire(&layout.lock_file()).map_err(|e| format!("build lock: {e}"))?;

    let registry_file = layout.registry_file();
    let registry = AppRegistry::load(&registry_file).map_err(|e| e.to_string())?;
    let record_id = resolve_record_id(&registry, id)?;

    let config = {
        let stored = registry
            .get(&record_id)
            .ok_or_else(|| format!("record '{record_id}' vanished"))?;
        config_from_record(stored, dxvk, dxvk_version)
    };

    let mut orch = Orchestrator::new(layout, registry);
    if !json {
        let sink: LogSink = Arc::new(|msg: &str| eprintln!("[winepak] {msg}"));
        orch.set_log_sink(sink);
    }

    orch.select(&record_id).map_err(|e| e.to_string())?;
    orch.analyze(&AppEdits::default()).map_err(|e| e.to_string())?;
    orch.configure(&config).map_err(|e| e.to_string())?;
    let app_id = orch.generate_manifest().map_err(|e| e.to_string())?;
    orch.build().map_err(|e| e.to_string())?;
    let outcome = orch.wait_build().map_err(|e| e.to_string())?;

    orch.registry()
        .save(&registry_file)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "app_id": app_id,
            "success": outcome.success,
            "exit_code": outcome.exit_code,
        });
        println!("{}", json_pretty(&payload)?);
    } else if outcome.success {
        println!("built and installed {app_id}");
    } else {
        println!(
            "build of {app_id} failed with exit code {}",
            outcome.exit_code
        );
    }
    Ok(if outcome.success {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
