//! apt-changelog-viewer - browse the changelogs of installed packages.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use apt_changelog_viewer::core::{filter_packages, Config, TrustStore};
use apt_changelog_viewer::plugin::PluginError;
use apt_changelog_viewer::{tui, App, ChangelogFetcher, PackageLister, PluginLoader, APP_NAME};

/// Browse the changelogs of installed Debian packages
#[derive(Parser)]
#[command(name = "apt-changelog-viewer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the viewer (default)
    Run,

    /// List installed packages
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Only show packages whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Print the changelog of a package
    Changelog {
        /// Package name
        package: String,

        /// Report where the changelog came from (on stderr)
        #[arg(long)]
        source: bool,
    },

    /// Load plugins and list the ones that succeeded
    Plugins,

    /// Trust a directory so its .apt-changelog-viewer.toml is loaded
    Trust {
        /// Directory to trust (defaults to the current directory)
        directory: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, None | Some(Commands::Run));
    init_logging(cli.verbose, interactive);

    match cli.command {
        None | Some(Commands::Run) => cmd_run()?,
        Some(Commands::List { format, filter }) => cmd_list(format, filter.as_deref())?,
        Some(Commands::Changelog { package, source }) => cmd_changelog(&package, source)?,
        Some(Commands::Plugins) => cmd_plugins()?,
        Some(Commands::Trust { directory }) => cmd_trust(directory)?,
        Some(Commands::Config { path }) => cmd_config(path)?,
        Some(Commands::Completions { shell }) => cmd_completions(shell),
    }

    Ok(())
}

/// Setup logging.
///
/// While the TUI owns the terminal, logs go to a file in the data directory
/// instead of stderr.
fn init_logging(verbose: bool, interactive: bool) {
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    let log_file = if interactive { open_log_file() } else { None };
    let (stderr_layer, file_layer) = match log_file {
        Some(file) => {
            (None, Some(fmt::layer().with_target(false).with_ansi(false).with_writer(Mutex::new(file))))
        }
        None => (Some(fmt::layer().with_target(false).with_writer(io::stderr)), None),
    };

    tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();
}

fn open_log_file() -> Option<File> {
    let dir = Config::data_dir()?;
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new().create(true).append(true).open(dir.join("viewer.log")).ok()
}

/// Run the interactive TUI.
fn cmd_run() -> Result<()> {
    let config = Config::load()?;
    let app = App::new(config);
    tui::run_tui(app)
}

/// List installed packages.
fn cmd_list(format: OutputFormat, filter: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let packages = PackageLister::new(&config.tools).list_installed();

    let selected: Vec<_> = match filter {
        Some(query) => filter_packages(&packages, query, usize::MAX)
            .into_iter()
            .map(|idx| &packages[idx])
            .collect(),
        None => packages.iter().collect(),
    };

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&selected)?;
            println!("{json}");
        }
        OutputFormat::Text => {
            for pkg in &selected {
                println!("{}\t{}\t{}", pkg.name, pkg.version, pkg.description);
            }
            println!("\nTotal: {} packages", selected.len());
        }
    }

    Ok(())
}

/// Print one changelog.
fn cmd_changelog(package: &str, show_source: bool) -> Result<()> {
    let config = Config::load()?;
    let changelog = ChangelogFetcher::new(&config).fetch_changelog_with_source(package);

    println!("{}", changelog.display_text(config.changelog.max_display_chars));
    if show_source {
        eprintln!("source: {}", changelog.source);
    }

    Ok(())
}

/// Load plugins and list them.
fn cmd_plugins() -> Result<()> {
    let config = Config::load()?;
    let loader = PluginLoader::new(&config.plugins);

    if !loader.is_enabled() {
        println!("{}", PluginError::Disabled);
        return Ok(());
    }

    if let Some(dir) = loader.plugins_dir(APP_NAME) {
        println!("Plugins directory: {}", dir.display());
    }

    let plugins = loader.load_plugins(APP_NAME);
    if plugins.is_empty() {
        println!("No plugins loaded");
        return Ok(());
    }

    for plugin in &plugins {
        match plugin.summary() {
            Some(summary) => println!("{}: {summary}", plugin.name),
            None => println!("{}", plugin.name),
        }
    }

    Ok(())
}

/// Trust a directory's local config file.
fn cmd_trust(directory: Option<PathBuf>) -> Result<()> {
    let directory = match directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let path = Config::trust_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let store = TrustStore::new(path);
    let mut trust = store.load();
    if trust.trust(&directory)? {
        store.save(&trust)?;
        println!("Trusted {}", directory.display());
    } else {
        println!("Already trusted: {}", directory.display());
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
}
