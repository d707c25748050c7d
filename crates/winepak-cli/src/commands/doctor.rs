use super::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use winepak_core::BuildLayout;
use winepak_registry::AppRegistry;

pub fn run(data_dir: &Path, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_prereqs(&mut checks, &mut all_pass);

    let layout = BuildLayout::new(data_dir);
    if data_dir.exists() {
        checks.push(Check::pass("data_dir", "Data directory exists"));
        check_registry(&layout, &mut checks, &mut all_pass);
        check_lock(&layout, &mut checks);
        check_disk_space(data_dir, &mut checks);
    } else {
        checks.push(Check::info(
            "data_dir",
            "Data directory not initialized (will be created on first import)",
        ));
    }

    print_results(&checks, all_pass, json_output)
}

fn check_prereqs(checks: &mut Vec<Check>, all_pass: &mut bool) {
    let missing = winepak_core::check_build_prereqs();
    if missing.is_empty() {
        checks.push(Check::pass(
            "build_prereqs",
            "Build prerequisites satisfied",
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "build_prereqs",
            &format!(
                "Missing prerequisites: {}",
                winepak_core::format_missing(&missing)
            ),
        ));
    }
}

fn check_registry(layout: &BuildLayout, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match AppRegistry::load(layout.registry_file()) {
        Ok(registry) => {
            checks.push(Check::info(
                "registry",
                &format!("{} applications imported", registry.len()),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "registry",
                &format!("Cannot read registry: {e}"),
            ));
        }
    }
}

fn check_lock(layout: &BuildLayout, checks: &mut Vec<Check>) {
    match winepak_core::BuildLock::try_acquire(&layout.lock_file()) {
        Ok(Some(_)) => checks.push(Check::pass("build_lock", "Build lock is free")),
        Ok(None) => checks.push(Check::warn(
            "build_lock",
            "Build lock is held by another process",
        )),
        Err(e) => checks.push(Check::warn(
            "build_lock",
            &format!("Cannot check build lock: {e}"),
        )),
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Winepak Doctor\n");
        for check in checks {
            let icon = match check.status.as_str() {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: String,
    status: String,
    message: String,
}

impl Check {
    fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "pass".to_owned(),
            message: message.to_owned(),
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "fail".to_owned(),
            message: message.to_owned(),
        }
    }

    fn warn(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "warn".to_owned(),
            message: message.to_owned(),
        }
    }

    fn info(name: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status: "info".to_owned(),
            message: message.to_owned(),
        }
    }
}

fn check_disk_space(data_dir: &Path, checks: &mut Vec<Check>) {
    let Ok(c_path) = std::ffi::CString::new(data_dir.to_string_lossy().as_bytes()) else {
        return;
    };

    // SAFETY: zeroed statvfs is a valid initial state for the struct.
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: statvfs with a valid, NUL-terminated path and a properly
    // zeroed output struct is well-defined. The struct is stack-allocated
    // and only read after the call succeeds (ret == 0).
    #[allow(unsafe_code, clippy::undocumented_unsafe_blocks)]
    let ret = unsafe { libc::statvfs(c_path.as_ptr(), &raw mut stat) };
    if ret != 0 {
        return;
    }

    let avail_bytes = stat.f_bavail * stat.f_frsize;
    let avail_mb = avail_bytes / (1024 * 1024);

    if avail_mb < 500 {
        checks.push(Check::fail(
            "disk_space",
            &format!("Low disk space: {avail_mb} MB available (flatpak builds need several GB)"),
        ));
    } else if avail_mb < 4096 {
        checks.push(Check::warn(
            "disk_space",
            &format!("Disk space: {avail_mb} MB available (consider freeing space)"),
        ));
    } else {
        let free_gb = avail_mb / 1024;
        checks.push(Check::pass(
            "disk_space",
            &format!("Disk space: {free_gb} GB available"),
        ));
    }
}
