use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

/// Blocking version probe: the tool is considered present when
/// `<name> --version` starts and exits zero.
fn tool_version_ok(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the external tools a Flatpak build needs.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_build_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !tool_version_ok("flatpak-builder") {
        missing.push(MissingPrereq {
            name: "flatpak-builder",
            purpose: "building and installing the Flatpak package",
            install_hint: "zypper install flatpak-builder | apt install flatpak-builder | dnf install flatpak-builder | pacman -S flatpak-builder",
        });
    }

    if !tool_version_ok("wine") {
        missing.push(MissingPrereq {
            name: "wine",
            purpose: "running the Windows executable",
            install_hint: "zypper install wine | apt install wine | dnf install wine | pacman -S wine",
        });
    }

    if !tool_version_ok("bsdtar") {
        missing.push(MissingPrereq {
            name: "bsdtar",
            purpose: "extracting application archives",
            install_hint: "zypper install bsdtar | apt install libarchive-tools | dnf install bsdtar | pacman -S libarchive",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nWinepak requires these tools to package Windows applications.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "wine",
            purpose: "running apps",
            install_hint: "apt install wine",
        };
        let s = format!("{m}");
        assert!(s.contains("wine"));
        assert!(s.contains("running apps"));
        assert!(s.contains("apt install wine"));
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let items = vec![
            MissingPrereq {
                name: "wine",
                purpose: "runtime",
                install_hint: "apt install wine",
            },
            MissingPrereq {
                name: "bsdtar",
                purpose: "archives",
                install_hint: "apt install libarchive-tools",
            },
        ];
        let output = format_missing(&items);
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("wine"));
        assert!(output.contains("bsdtar"));
    }

    #[test]
    fn absent_tool_is_not_ok() {
        assert!(!tool_version_ok("winepak-no-such-tool-a1b2c3"));
    }
}
