use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod replay;
mod terminal;

use config::{load_settings, Settings, SourceKind};

/// Terminal speedometer fed by gpsd or a recorded drive.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    #[arg(long, default_value = "speedometer.toml")]
    config: PathBuf,
    #[arg(long, value_enum)]
    source: Option<SourceKind>,
    #[arg(long)]
    gpsd_addr: Option<String>,
    #[arg(long)]
    replay: Option<PathBuf>,
    #[arg(long)]
    state_file: Option<PathBuf>,
    /// Forget the saved run state before starting.
    #[arg(long)]
    reset_state: bool,
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(source) = self.source {
            settings.source = source;
        }
        if let Some(addr) = self.gpsd_addr {
            settings.gpsd_addr = addr;
        }
        if let Some(path) = self.replay {
            settings.replay_path = Some(path);
        }
        if let Some(path) = self.state_file {
            settings.state_path = path;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let reset_state = args.reset_state;
    let mut settings = load_settings(&args.config);
    args.apply(&mut settings);

    if reset_state {
        app::reset_saved_state(&settings)?;
    }

    app::run(settings).await
}
