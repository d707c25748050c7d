use super::{json_pretty, resolve_record_id, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::{AppEdits, BuildLayout, Orchestrator};
use winepak_registry::AppRegistry;

pub fn run(data_dir: &Path, id: &str, edits: AppEdits, json: bool) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry_file = layout.registry_file();
    let registry = AppRegistry::load(&registry_file).map_err(|e| e.to_string())?;
    let record_id = resolve_record_id(&registry, id)?;

    let mut orch = Orchestrator::new(layout, registry);
    orch.select(&record_id).map_err(|e| e.to_string())?;
    orch.analyze(&edits).map_err(|e| e.to_string())?;
    orch.registry()
        .save(&registry_file)
        .map_err(|e| e.to_string())?;

    let record = orch
        .registry()
        .get(&record_id)
        .ok_or_else(|| format!("record '{record_id}' vanished"))?;

    if json {
        println!("{}", json_pretty(&record)?);
    } else {
        println!("updated '{}' ({})", record.name, record.id);
        println!("version: {}", record.version);
        if let Some(exe) = &record.executable_path {
            println!("executable: {}", exe.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
