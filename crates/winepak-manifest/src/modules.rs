//! Build-module generators for the Wine runtime and the DXVK translation layer.
//!
//! These are pure data constructors: malformed version tags fall back to the
//! default install source instead of erroring, and nothing here can fail.

use crate::types::{WineArch, WineVersion};
use serde::{Deserialize, Serialize};

/// One ordered unit of the flatpak-builder manifest describing an
/// installation stage. Serializes with the exact `buildsystem` and
/// `build-commands` keys flatpak-builder expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildModule {
    pub name: String,
    pub buildsystem: String,
    #[serde(rename = "build-commands")]
    pub build_commands: Vec<ShellCommands>,
}

/// A group of shell commands inside a build module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommands {
    #[serde(rename = "type")]
    pub kind: String,
    pub commands: Vec<String>,
}

impl BuildModule {
    /// A `buildsystem: simple` module with a single shell command group.
    pub fn simple(name: impl Into<String>, commands: Vec<String>) -> Self {
        Self {
            name: name.into(),
            buildsystem: "simple".to_owned(),
            build_commands: vec![ShellCommands {
                kind: "shell".to_owned(),
                commands,
            }],
        }
    }
}

fn wine_package(version: WineVersion) -> &'static str {
    match version {
        WineVersion::Staging => "wine-staging",
        WineVersion::Devel => "wine-devel",
        WineVersion::Stable => "wine",
    }
}

/// Build the two modules installing the Wine runtime and the app payload.
///
/// The first module installs Wine from the distribution repository into
/// `${FLATPAK_DEST}/wine`, selecting the package by release channel. The
/// second copies the build working tree into `${FLATPAK_DEST}/app`.
/// `arch` is recorded by callers for reproducibility; the install commands
/// are arch-independent today.
pub fn wine_modules(version: WineVersion, _arch: WineArch) -> [BuildModule; 2] {
    let install = format!(
        "mkdir -p ${{FLATPAK_DEST}}/wine && dnf install -y --installroot=${{FLATPAK_DEST}}/wine {}",
        wine_package(version)
    );
    let wine = BuildModule::simple("wine", vec![install]);

    let app = BuildModule::simple(
        "app",
        vec![
            "mkdir -p ${FLATPAK_DEST}/app".to_owned(),
            "cp -r * ${FLATPAK_DEST}/app/".to_owned(),
        ],
    );

    [wine, app]
}

/// Build the module downloading and unpacking DXVK into the package.
///
/// `"latest"` resolves to the fixed latest-release URL; any other value is
/// interpolated into the versioned release URL. The archive is not checksum
/// verified here; that belongs to the consuming builder, not this model.
pub fn dxvk_module(version: &str) -> BuildModule {
    let url = if version == "latest" {
        "https://github.com/doitsujin/dxvk/releases/latest/download/dxvk-latest.tar.gz".to_owned()
    } else {
        format!(
            "https://github.com/doitsujin/dxvk/releases/download/v{version}/dxvk-{version}.tar.gz"
        )
    };

    let command = format!(
        "mkdir -p ${{FLATPAK_DEST}}/dxvk && curl -L {url} -o dxvk.tar.gz \
         && tar -xf dxvk.tar.gz -C ${{FLATPAK_DEST}}/dxvk --strip-components=1"
    );

    BuildModule::simple("dxvk", vec![command])
}
