pub mod analyze;
pub mod build;
pub mod completions;
pub mod configure;
pub mod doctor;
pub mod generate;
pub mod import;
pub mod list;
pub mod man_pages;
pub mod prepare_prefix;
pub mod remove;

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use winepak_core::BuildConfig;
use winepak_manifest::RecordId;
use winepak_registry::{AppRecord, AppRegistry};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MANIFEST_ERROR: u8 = 2;
pub const EXIT_REGISTRY_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: &str) -> String {
    use console::Style;
    match state {
        "succeeded" => Style::new().green().apply_to(state).to_string(),
        "building" => Style::new().cyan().bold().apply_to(state).to_string(),
        "generated" => Style::new().yellow().apply_to(state).to_string(),
        "failed" => Style::new().red().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

/// Resolve user input to a record id: exact id, exact app name, or an
/// unambiguous id prefix.
pub fn resolve_record_id(registry: &AppRegistry, input: &str) -> Result<RecordId, String> {
    for record in registry.iter() {
        if *record.id == *input || record.name == input {
            return Ok(record.id.clone());
        }
    }

    let matches: Vec<&RecordId> = registry
        .iter()
        .map(|r| &r.id)
        .filter(|id| id.starts_with(input))
        .collect();

    match matches.len() {
        0 => Err(format!("no application matching '{input}'")),
        1 => Ok(matches[0].clone()),
        n => Err(format!(
            "ambiguous id prefix '{input}': matches {n} applications"
        )),
    }
}

/// Per-cycle build configuration replayed from a stored record, with the
/// transient DXVK choice supplied by command flags.
pub fn config_from_record(record: &AppRecord, dxvk: bool, dxvk_version: &str) -> BuildConfig {
    BuildConfig {
        wine_version: record.wine_version,
        wine_arch: record.wine_arch,
        dll_overrides: record.wine_dll_overrides.clone(),
        enable_dxvk: dxvk,
        dxvk_version: dxvk_version.to_owned(),
        allow_network: record.allow_network,
        allow_documents: record.allow_documents,
        allow_downloads: record.allow_downloads,
        allow_audio: record.allow_audio,
    }
}
