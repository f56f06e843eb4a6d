//! vexillum: banner resolution from the command line
//!
//! Classify a banner value or resolve it against a vault directory.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use vexillum::{BannerConfig, BannerRequest, FsVault, UpdateMode, VexillumBuilder};

/// Vexillum CLI
#[derive(Parser)]
#[command(name = "vexillum")]
#[command(version = vexillum::version::PKG_VERSION)]
#[command(about = "Resolve note banner images")]
struct Args {
    /// Config file (default: ~/.vexillum/config.toml, then /etc/vexillum/config.toml)
    #[arg(short, long, env = "VEXILLUM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how a banner value is interpreted
    Classify {
        /// Banner value; JSON arrays like '["a"]' are accepted
        value: String,
        /// Vault root used to recognise image paths
        #[arg(long, default_value = ".")]
        vault: PathBuf,
    },

    /// Resolve a banner value to an image reference
    Resolve {
        /// Banner value; JSON arrays like '[["image.png"]]' are accepted
        value: String,
        /// Vault root
        #[arg(long, default_value = ".")]
        vault: PathBuf,
        /// Vault-relative path of the document the banner belongs to
        #[arg(long)]
        document: String,
        /// View identifier
        #[arg(long, default_value = "cli")]
        view: String,
        /// Treat the document as shuffle-enabled
        #[arg(long)]
        shuffle: bool,
        /// Update mode
        #[arg(long, value_enum, default_value_t = Mode::Full)]
        mode: Mode,
    },

    /// Print version information
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Full,
    Ensure,
    Shuffle,
}

impl From<Mode> for UpdateMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Full => UpdateMode::FullUpdate,
            Mode::Ensure => UpdateMode::EnsureVisibility,
            Mode::Shuffle => UpdateMode::ShuffleUpdate,
        }
    }
}

/// Frontmatter values are strings or (nested) arrays; accept both.
fn parse_value(raw: &str) -> Value {
    if raw.trim_start().starts_with('[') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    tracing::debug!(version = vexillum::version::version_string(), "vexillum starting");

    match args.command {
        Command::Version => {
            println!("vexillum {}", vexillum::version::version_string());
        }

        Command::Classify { value, vault } => {
            let vault = FsVault::new(vault);
            let descriptor = vexillum::classify(&parse_value(&value), &vault);
            println!("kind: {}", descriptor.kind.as_str());
            println!("value: {}", descriptor.value);
            if let Some(target) = descriptor.link_target() {
                println!("link target: {target}");
            }
        }

        Command::Resolve {
            value,
            vault,
            document,
            view,
            shuffle,
            mode,
        } => {
            let config = BannerConfig::load(args.config.as_deref())?;
            let engine = VexillumBuilder::from_config(&config)
                .fs_vault(vault)
                .build()?;

            let request = BannerRequest::new(document, view, parse_value(&value))
                .shuffle(shuffle)
                .mode(mode.into());

            match engine.resolve_banner(&request).await? {
                Some(image) if image.starts_with("data:") => {
                    let mime = image
                        .split_once(';')
                        .map(|(head, _)| head.trim_start_matches("data:"))
                        .unwrap_or("unknown");
                    println!("data URL ({mime}, {} bytes)", image.len());
                }
                Some(image) => println!("{image}"),
                None => println!("no banner image"),
            }
            engine.shutdown();
        }
    }

    Ok(())
}
