mod renderer;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use storyline_core::TimelineSession;
use storyline_core::svg::render_svg;
use tracing_subscriber::EnvFilter;

/// Browse and edit a character timeline in the terminal
#[derive(Parser)]
#[command(name = "storyline")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Project JSON file
    project: PathBuf,

    /// Write the fitted timeline to this SVG file and exit
    #[arg(long)]
    export_svg: Option<PathBuf>,

    /// SVG width in pixels
    #[arg(long, default_value = "1200")]
    width: f64,

    /// SVG height in pixels
    #[arg(long, default_value = "600")]
    height: f64,

    /// Use the light palette for SVG export
    #[arg(long)]
    light: bool,

    /// Write committed edits back to the project file on exit
    #[arg(long)]
    save: bool,

    /// Append logs to this file (level from RUST_LOG, default info)
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log {
        init_logging(path)?;
    }

    let data = std::fs::read(&cli.project)
        .with_context(|| format!("reading {}", cli.project.display()))?;
    let mut session = TimelineSession::from_json(&data)
        .with_context(|| format!("loading {}", cli.project.display()))?;
    tracing::info!(
        path = %cli.project.display(),
        characters = session.project().characters.len(),
        events = session.project().events.len(),
        "project loaded"
    );

    if let Some(out) = &cli.export_svg {
        session.viewport_mut().on_resize(cli.width);
        session.fit_to_events()?;
        let commands = session.render(cli.height)?;
        let svg = render_svg(&commands, cli.width, cli.height, !cli.light);
        std::fs::write(out, svg).with_context(|| format!("writing {}", out.display()))?;
        tracing::info!(path = %out.display(), "svg exported");
        return Ok(());
    }

    renderer::render_tui(&mut session)?;

    if cli.save {
        let json = session.project().to_json_pretty()?;
        std::fs::write(&cli.project, json)
            .with_context(|| format!("saving {}", cli.project.display()))?;
        tracing::info!(path = %cli.project.display(), "project saved");
    }
    Ok(())
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
