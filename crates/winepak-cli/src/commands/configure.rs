use super::{json_pretty, resolve_record_id, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::{AppEdits, BuildConfig, BuildLayout, Orchestrator};
use winepak_manifest::{WineArch, WineVersion};
use winepak_registry::AppRegistry;

/// Flag overrides for the stored Wine/sandbox configuration. `None` keeps
/// the record's current value.
#[derive(Debug, Default)]
pub struct ConfigureArgs {
    pub wine_version: Option<String>,
    pub arch: Option<String>,
    pub dll_overrides: Option<String>,
    pub network: Option<bool>,
    pub documents: Option<bool>,
    pub downloads: Option<bool>,
    pub audio: Option<bool>,
}

pub fn run(data_dir: &Path, id: &str, args: &ConfigureArgs, json: bool) -> Result<u8, String> {
    let layout = BuildLayout::new(data_dir);
    let registry_file = layout.registry_file();
    let registry = AppRegistry::load(&registry_file).map_err(|e| e.to_string())?;
    let record_id = resolve_record_id(&registry, id)?;

    let stored = registry
        .get(&record_id)
        .ok_or_else(|| format!("record '{record_id}' vanished"))?;
    let config = BuildConfig {
        wine_version: args
            .wine_version
            .as_deref()
            .map_or(stored.wine_version, WineVersion::from_tag),
        wine_arch: args
            .arch
            .as_deref()
            .map_or(stored.wine_arch, WineArch::from_tag),
        dll_overrides: args
            .dll_overrides
            .clone()
            .unwrap_or_else(|| stored.wine_dll_overrides.clone()),
        allow_network: args.network.unwrap_or(stored.allow_network),
        allow_documents: args.documents.unwrap_or(stored.allow_documents),
        allow_downloads: args.downloads.unwrap_or(stored.allow_downloads),
        allow_audio: args.audio.unwrap_or(stored.allow_audio),
        ..BuildConfig::default()
    };

    let mut orch = Orchestrator::new(layout, registry);
    orch.select(&record_id).map_err(|e| e.to_string())?;
    orch.analyze(&AppEdits::default()).map_err(|e| e.to_string())?;
    orch.configure(&config).map_err(|e| e.to_string())?;
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
        println!("configured '{}' ({})", record.name, record.id);
        println!("wine version: {}", record.wine_version);
        println!("architecture: {}", record.wine_arch);
        if !record.wine_dll_overrides.is_empty() {
            println!("dll overrides: {}", record.wine_dll_overrides);
        }
        println!(
            "permissions: network={} documents={} downloads={} audio={}",
            record.allow_network, record.allow_documents, record.allow_downloads, record.allow_audio
        );
    }
    Ok(EXIT_SUCCESS)
}
