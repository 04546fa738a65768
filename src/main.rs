use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

use swayfader::config::{Config, Overrides};
use swayfader::fader::{MatchKind, RuleSpec};
use swayfader::Daemon;

#[derive(Parser)]
#[command(name = "swayfader")]
#[command(about = "Fades window opacity in sway on focus changes and new windows")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path [default: ~/.config/sway/swayfader.toml]
    #[arg(short, long)]
    config: Option<String>,

    /// Frames per second
    #[arg(long)]
    fps: Option<f64>,

    /// Fade duration, e.g. "200ms" or "1s"
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Opacity windows fade from when no rule matches
    #[arg(long)]
    default_from: Option<f64>,

    /// Opacity windows fade to when no rule matches
    #[arg(long)]
    default_to: Option<f64>,

    /// Easing function (linear, ease-in, ease-out, ...)
    #[arg(long)]
    easing: Option<String>,

    /// Per app_id fade, as "regex:from:to" (repeatable)
    #[arg(long = "app-id", value_name = "TARGET")]
    app_id: Vec<String>,

    /// Per window class fade, as "regex:from:to" (repeatable)
    #[arg(long = "class", value_name = "TARGET")]
    class: Vec<String>,

    /// Sway IPC socket path [default: $SWAYSOCK]
    #[arg(short, long)]
    socket: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Result<Overrides> {
        let targets = self
            .app_id
            .iter()
            .map(|t| (MatchKind::AppId, t))
            .chain(self.class.iter().map(|t| (MatchKind::Class, t)));

        let mut rules = Vec::new();
        for (kind, target) in targets {
            rules.push(RuleSpec::parse_target(kind, target)?);
        }

        Ok(Overrides {
            fps: self.fps,
            duration: self.duration,
            default_from: self.default_from,
            default_to: self.default_to,
            easing: self.easing.clone(),
            socket: self.socket.clone(),
            rules,
        })
    }
}

async fn start(cli: &Cli) -> Result<()> {
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;
    config.apply(cli.overrides()?);

    let mut daemon = Daemon::new(config).await?;
    daemon.run().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("swayfader={log_level}"))
        .with_target(false)
        .init();

    info!("🦀 Starting swayfader v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = start(&cli).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
