mod capture;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use photosphere_config::AppConfig;
use photosphere_store::ProjectsStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// Guided photosphere capture.
#[derive(Debug, Parser)]
#[command(author, version, about = "Guided photosphere capture")]
struct Args {
    /// Config file to use instead of the one in the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a capture session and save it as a project when every target is captured.
    Capture {
        /// Recorded sensor samples to replay. Without it a synthetic sweep aims at each target in turn.
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Project name. Defaults to "Project N".
        #[arg(long)]
        name: Option<String>,
        /// Delay between sensor samples, in milliseconds.
        #[arg(long, default_value_t = capture::DEFAULT_INTERVAL_MS)]
        interval_ms: u64,
    },
    /// Write the synthetic sweep as a replay file.
    Sweep {
        #[arg(long)]
        output: PathBuf,
    },
    /// List stored projects.
    Projects,
    /// Print the effective config.
    Config {
        /// Also write it to the config file.
        #[arg(long)]
        write: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => photosphere_config::load_config_from(path),
        None => Ok(photosphere_config::load_config().unwrap_or_else(|e| {
            warn!(?e, "Failed to load config, using defaults");
            AppConfig::default()
        })),
    }
}

fn list_projects(config: &AppConfig) -> Result<()> {
    let store = ProjectsStore::in_dir(photosphere_config::data_dir(config)?);
    let projects = store.load().context("loading projects")?;
    if projects.is_empty() {
        println!("No projects yet.");
    }
    for project in projects {
        let panorama = match &project.panorama_path {
            Some(path) => format!(", panorama {}", path.display()),
            None => String::new(),
        };
        println!(
            "{}  {}  ({} photos{})",
            project.id,
            project.name,
            project.photos.len(),
            panorama
        );
    }
    Ok(())
}

fn show_config(config: &AppConfig, write: bool, path: Option<PathBuf>) -> Result<()> {
    print!("{}", photosphere_config::to_toml(config)?);
    if write {
        let path = match path {
            Some(path) => path,
            None => photosphere_config::config_path()?,
        };
        photosphere_config::save_config_to(config, &path)?;
        println!("# written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "photosphere=info,photosphere_capture=info,photosphere_guidance=info,photosphere_sensor=info,photosphere_store=info".into()
            }),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    info!(
        radius = config.layout.radius,
        capture_threshold = config.guidance.capture_threshold,
        "Config loaded"
    );

    match args.command {
        Command::Capture {
            replay,
            name,
            interval_ms,
        } => {
            let options = capture::CaptureOptions {
                replay,
                name,
                interval_ms,
            };
            capture::run(&config, options).await
        }
        Command::Sweep { output } => capture::write_sweep(&config, &output),
        Command::Projects => list_projects(&config),
        Command::Config { write } => show_config(&config, write, args.config),
    }
}
