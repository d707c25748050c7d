use super::{config_from_record, json_pretty, resolve_record_id, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::{AppEdits, BuildLayout, Orchestrator};
use winepak_registry::AppRegistry;

pub fn run(
    data_dir: &Path,
    id: &str,
    dxvk: bool,
    dxvk_version: &str,
    json: bool,
) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry_file = layout.registry_file();
    let registry = AppRegistry::load(&registry_file).map_err(|e| e.to_string())?;
    let record_id = resolve_record_id(&registry, id)?;

    let config = {
        let stored = registry
            .get(&record_id)
            .ok_or_else(|| format!("record '{record_id}' vanished"))?;
        config_from_record(stored, dxvk, dxvk_version)
    };

    let mut orch = Orchestrator::new(layout.clone(), registry);
    orch.select(&record_id).map_err(|e| e.to_string())?;
    orch.analyze(&AppEdits::default()).map_err(|e| e.to_string())?;
    orch.configure(&config).map_err(|e| e.to_string())?;
    let app_id = orch.generate_manifest().map_err(|e| e.to_string())?;

    layout
        .initialize(&app_id)
        .map_err(|e| format!("failed to create build directory: {e}"))?;
    let manifest_path = layout.manifest_path(&app_id);
    orch.manifest()
        .save_to_file(&manifest_path)
        .map_err(|e| e.to_string())?;
    orch.registry()
        .save(&registry_file)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "app_id": app_id,
            "manifest_path": manifest_path,
            "document": orch.manifest().to_json(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("generated manifest for {app_id}");
        println!("manifest: {}", manifest_path.display());
    }
    Ok(EXIT_SUCCESS)
}
