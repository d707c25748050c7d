use super::{resolve_record_id, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::BuildLayout;
use winepak_registry::AppRegistry;

pub fn run(data_dir: &Path, id: &str) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry_file = layout.registry_file();
    let mut registry = AppRegistry::load(&registry_file).map_err(|e| e.to_string())?;

    let record_id = resolve_record_id(&registry, id)?;
    let record = registry
        .remove(&record_id)
        .ok_or_else(|| format!("no application matching '{id}'"))?;
    registry.save(&registry_file).map_err(|e| e.to_string())?;

    println!("removed '{}' ({})", record.name, record.id);
    Ok(EXIT_SUCCESS)
}
