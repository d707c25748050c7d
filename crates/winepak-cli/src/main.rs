mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR, EXIT_REGISTRY_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;
use winepak_core::AppEdits;

#[derive(Debug, Parser)]
#[command(
    name = "winepak",
    version,
    about = "Package Windows PortableApps as sandboxed Flatpaks that run under Wine"
)]
struct Cli {
    /// Path to the winepak data directory.
    #[arg(long, default_value = "~/.local/share/winepak")]
    data_dir: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import a PortableApp directory, detecting its executable and icon.
    Import {
        /// Directory containing the portable application.
        dir: PathBuf,
    },
    /// List imported applications.
    List,
    /// Remove an imported application.
    Remove {
        /// Application id, name, or unambiguous id prefix.
        id: String,
    },
    /// Edit application metadata detected at import.
    Analyze {
        /// Application id, name, or unambiguous id prefix.
        id: String,
        /// New application name.
        #[arg(long)]
        name: Option<String>,
        /// New application version.
        #[arg(long)]
        app_version: Option<String>,
        /// New application description.
        #[arg(long)]
        description: Option<String>,
        /// New application category.
        #[arg(long)]
        category: Option<String>,
        /// Path to the launch executable.
        #[arg(long)]
        executable: Option<PathBuf>,
        /// Path to the application icon.
        #[arg(long)]
        icon: Option<PathBuf>,
    },
    /// Store Wine and sandbox configuration on an application.
    Configure {
        /// Application id, name, or unambiguous id prefix.
        id: String,
        /// Wine release channel: stable, devel, or staging.
        #[arg(long)]
        wine_version: Option<String>,
        /// Wine architecture: win64 or win32.
        #[arg(long)]
        arch: Option<String>,
        /// WINEDLLOVERRIDES value (e.g. "mscoree=n,b").
        #[arg(long)]
        dll_overrides: Option<String>,
        /// Allow network access in the sandbox.
        #[arg(long)]
        network: Option<bool>,
        /// Allow access to the documents folder.
        #[arg(long)]
        documents: Option<bool>,
        /// Allow access to the downloads folder.
        #[arg(long)]
        downloads: Option<bool>,
        /// Allow audio output.
        #[arg(long)]
        audio: Option<bool>,
    },
    /// Generate the flatpak-builder manifest for an application.
    Generate {
        /// Application id, name, or unambiguous id prefix.
        id: String,
        /// Add the DXVK DirectX-to-Vulkan layer (per-build, not persisted).
        #[arg(long, default_value_t = false)]
        dxvk: bool,
        /// DXVK version to download ("latest" or e.g. "2.1").
        #[arg(long, default_value = "latest")]
        dxvk_version: String,
    },
    /// Build and install the Flatpak for an application.
    Build {
        /// Application id, name, or unambiguous id prefix.
        id: String,
        /// Add the DXVK DirectX-to-Vulkan layer (per-build, not persisted).
        #[arg(long, default_value_t = false)]
        dxvk: bool,
        /// DXVK version to download ("latest" or e.g. "2.1").
        #[arg(long, default_value = "latest")]
        dxvk_version: String,
    },
    /// Initialize a throwaway Wine prefix with the app staged into it.
    PreparePrefix {
        /// Application id, name, or unambiguous id prefix.
        id: String,
        /// Prefix location (defaults to <data-dir>/prefix/<id>).
        #[arg(long)]
        prefix_dir: Option<PathBuf>,
    },
    /// Run diagnostic checks on the system and data directory.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WINEPAK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let data_dir = expand_tilde(&cli.data_dir);
    let json_output = cli.json;

    let needs_tools = matches!(
        cli.command,
        Commands::Build { .. } | Commands::PreparePrefix { .. }
    );
    if needs_tools && std::env::var("WINEPAK_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = winepak_core::check_build_prereqs();
        if !missing.is_empty() {
            eprintln!("error: {}", winepak_core::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let result = match cli.command {
        Commands::Import { dir } => commands::import::run(&data_dir, &dir, json_output),
        Commands::List => commands::list::run(&data_dir, json_output),
        Commands::Remove { id } => commands::remove::run(&data_dir, &id),
        Commands::Analyze {
            id,
            name,
            app_version,
            description,
            category,
            executable,
            icon,
        } => commands::analyze::run(
            &data_dir,
            &id,
            AppEdits {
                name,
                version: app_version,
                description,
                category,
                executable_path: executable,
                icon_path: icon,
            },
            json_output,
        ),
        Commands::Configure {
            id,
            wine_version,
            arch,
            dll_overrides,
            network,
            documents,
            downloads,
            audio,
        } => commands::configure::run(
            &data_dir,
            &id,
            &commands::configure::ConfigureArgs {
                wine_version,
                arch,
                dll_overrides,
                network,
                documents,
                downloads,
                audio,
            },
            json_output,
        ),
        Commands::Generate {
            id,
            dxvk,
            dxvk_version,
        } => commands::generate::run(&data_dir, &id, dxvk, &dxvk_version, json_output),
        Commands::Build {
            id,
            dxvk,
            dxvk_version,
        } => commands::build::run(&data_dir, &id, dxvk, &dxvk_version, json_output),
        Commands::PreparePrefix { id, prefix_dir } => {
            commands::prepare_prefix::run(&data_dir, &id, prefix_dir.as_deref(), json_output)
        }
        Commands::Doctor => commands::doctor::run(&data_dir, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("failed to serialize manifest")
                || msg.starts_with("failed to write manifest")
            {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("registry error:")
                || msg.starts_with("failed to parse registry")
            {
                EXIT_REGISTRY_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
