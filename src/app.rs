use crate::cli::Cli;
use crate::config::{ConfigStore, Settings};
use crate::discovery::discover;
use crate::logging;
use crate::pipeline::Converter;
use crate::pool::{self, RunSummary};
use crate::status::{LogSurface, StatusSurface, TerminalSurface};
use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use std::io::{self, IsTerminal};
use std::sync::Arc;

pub fn run() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            ConfigStore::at(path)
        }
        None => ConfigStore::new()?,
    };
    let mut config = store.load()?;
    tracing::debug!(path = %store.path().display(), "config loaded");
    cli.apply(&mut config);
    let settings = Settings::from_config(config)?;

    if cli.dry_run {
        run_dry(&settings);
        return Ok(());
    }
    let summary = run_convert(&settings)?;
    println!("{}", summary_line(&summary));
    Ok(())
}

fn run_dry(settings: &Settings) {
    let (tx, rx) = unbounded();
    let report = discover(&settings.layout, tx);
    for item in rx.iter() {
        let destination = settings
            .layout
            .destination_for(&item)
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        println!("{} -> {destination}", item.display());
    }
    println!(
        "{} to convert, {} already converted",
        report.queued, report.already_converted
    );
}

fn run_convert(settings: &Settings) -> Result<RunSummary> {
    tracing::info!(
        workers = settings.workers,
        input = %settings.layout.input_root().display(),
        output = %settings.layout.output_root().display(),
        "starting converter"
    );
    let stages = Arc::new(settings.tools.clone());
    let converter = Arc::new(
        Converter::new(settings.layout.clone(), stages).with_temp_dir(settings.temp_dir.clone()),
    );
    let mut surface: Box<dyn StatusSurface> = if io::stdout().is_terminal() {
        Box::new(TerminalSurface::new())
    } else {
        Box::new(LogSurface::new())
    };
    let summary = pool::run(converter, settings.workers, surface.as_mut())?;
    tracing::info!(
        converted = summary.converted,
        failed = summary.failed,
        already_converted = summary.discovery.already_converted,
        "run complete"
    );
    Ok(summary)
}

fn summary_line(summary: &RunSummary) -> String {
    let mut line = format!(
        "converted {}, failed {}, already converted {}",
        summary.converted, summary.failed, summary.discovery.already_converted
    );
    if summary.discovery.errors > 0 {
        line.push_str(&format!(", {} unreadable entries", summary.discovery.errors));
    }
    line
}
