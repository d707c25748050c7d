use super::{json_pretty, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::{BuildLayout, Orchestrator};
use winepak_registry::AppRegistry;

pub fn run(data_dir: &Path, dir: &Path, json: bool) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry_file = layout.registry_file();
    let registry = AppRegistry::load(&registry_file).map_err(|e| e.to_string())?;

    let mut orch = Orchestrator::new(layout, registry);
    let id = orch.import(dir).map_err(|e| e.to_string())?;
    orch.registry()
        .save(&registry_file)
        .map_err(|e| e.to_string())?;

    let record = orch
        .registry()
        .get(&id)
        .ok_or_else(|| format!("imported record '{id}' vanished"))?;

    if json {
        let payload = serde_json::json!({
            "id": record.id,
            "name": record.name,
            "source_dir": record.source_dir,
            "executable_path": record.executable_path,
            "icon_path": record.icon_path,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("imported '{}' ({})", record.name, record.id);
        match &record.executable_path {
            Some(exe) => println!("executable: {}", exe.display()),
            None => println!("executable: none detected — set one with 'winepak analyze'"),
        }
        if let Some(icon) = &record.icon_path {
            println!("icon: {}", icon.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
