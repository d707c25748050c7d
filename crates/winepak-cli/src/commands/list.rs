use super::{json_pretty, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::BuildLayout;
use winepak_registry::AppRegistry;

pub fn run(data_dir: &Path, json: bool) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry = AppRegistry::load(layout.registry_file()).map_err(|e| e.to_string())?;

    if json {
        let records: Vec<_> = registry.iter().collect();
        println!("{}", json_pretty(&records)?);
    } else if registry.is_empty() {
        println!("no applications imported");
    } else {
        println!(
            "{:<14} {:<20} {:<10} {:<9} SOURCE",
            "ID", "NAME", "VERSION", "WINE"
        );
        for record in registry.iter() {
            let short = &record.id.as_str()[..12.min(record.id.len())];
            println!(
                "{:<14} {:<20} {:<10} {:<9} {}",
                short,
                record.name,
                record.version,
                record.wine_version.to_string(),
                record.source_dir.display()
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
