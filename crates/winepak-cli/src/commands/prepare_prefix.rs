use super::{resolve_record_id, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use std::path::{Path, PathBuf};
use winepak_core::{prepare_wine_prefix, BuildLayout};
use winepak_registry::AppRegistry;

pub fn run(
    data_dir: &Path,
    id: &str,
    prefix_dir: Option<&Path>,
    json: bool,
) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry = AppRegistry::load(layout.registry_file()).map_err(|e| e.to_string())?;
    let record_id = resolve_record_id(&registry, id)?;
    let record = registry
        .get(&record_id)
        .ok_or_else(|| format!("record '{record_id}' vanished"))?;

    let prefix: PathBuf = prefix_dir.map_or_else(
        || data_dir.join("prefix").join(record_id.as_str()),
        Path::to_path_buf,
    );

    let pb = if json {
        None
    } else {
        Some(spinner("initializing wine prefix..."))
    };

    match prepare_wine_prefix(record, &prefix) {
        Ok(()) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "wine prefix ready");
            }
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "wine prefix initialization failed");
            }
            return Err(e.to_string());
        }
    }

    if json {
        println!(
            "{}",
            super::json_pretty(&serde_json::json!({
                "id": record.id,
                "prefix": prefix,
            }))?
        );
    } else {
        println!("prefix: {}", prefix.display());
        println!(
            "run the app with: WINEPREFIX={} wine 'C:\\Program Files\\PortableApp\\...'",
            prefix.display()
        );
    }
    Ok(EXIT_SUCCESS)
}
