use crate::config::{load_config, load_config_from_path, LambdamapConfig};
use crate::discovery::{Discoverer, DiscoveryResult, InventoryCatalog, InventoryPackages};
use crate::io::{create_writer, OutputFormat, TopologyReport};
use crate::layout::{layout, PositionedGraph};
use crate::observability::{set_phase, DiscoveryPhase};
use crate::package::PackageDownloader;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info_span;

#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    pub inventory: PathBuf,
    pub config_path: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub no_code_analysis: bool,
    pub no_layout: bool,
    pub page_size: usize,
    pub plain: bool,
}

fn resolve_config(config: &DiscoverConfig) -> Result<LambdamapConfig> {
    let mut resolved = match &config.config_path {
        Some(path) => load_config_from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => load_config(),
    };
    if config.no_code_analysis {
        resolved.analysis.enabled = false;
    }
    if config.no_layout {
        resolved.layout.enabled = false;
    }
    Ok(resolved)
}

/// Command-line format first, then the configured default, then terminal.
pub fn resolve_format(cli: Option<OutputFormat>, config: &LambdamapConfig) -> OutputFormat {
    cli.or_else(|| {
        config
            .output
            .as_ref()
            .and_then(|o| o.default_format.as_deref())
            .and_then(|value| {
                let parsed = OutputFormat::parse(value);
                if parsed.is_none() {
                    log::warn!("Unknown default_format {:?}; using terminal", value);
                }
                parsed
            })
    })
    .unwrap_or(OutputFormat::Terminal)
}

fn configure_color(config: &DiscoverConfig, resolved: &LambdamapConfig) {
    let configured = resolved.output.as_ref().and_then(|o| o.use_color);
    if config.plain || config.output.is_some() || configured == Some(false) {
        colored::control::set_override(false);
    } else if configured == Some(true) {
        colored::control::set_override(true);
    }
}

fn run_layout(result: &DiscoveryResult, config: &LambdamapConfig) -> Option<PositionedGraph> {
    if !config.layout.enabled || result.is_fatal() {
        return None;
    }
    let _phase = set_phase(DiscoveryPhase::Layout);
    let span = info_span!("layout", nodes = result.graph.nodes.len());
    let _span = span.enter();
    Some(layout(&result.graph, &config.layout))
}

fn write_report(report: &TopologyReport, format: OutputFormat, output: Option<&PathBuf>) -> Result<()> {
    let _phase = set_phase(DiscoveryPhase::OutputGeneration);
    let mut sink: Box<dyn Write> = match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("creating output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };
    write_report_to(report, format, &mut sink)
}

/// Render the report into `sink` and flush it so buffered write errors surface.
fn write_report_to(report: &TopologyReport, format: OutputFormat, sink: &mut dyn Write) -> Result<()> {
    {
        let mut writer = create_writer(format, Box::new(&mut *sink));
        writer.write_report(report)?;
    }
    sink.flush().context("flushing report output")?;
    Ok(())
}

/// Run discovery and write the report.
///
/// Returns `false` when the run ended in a fatal error; the report is still
/// written so the failed step is visible.
pub fn handle_discover(config: DiscoverConfig) -> Result<bool> {
    let resolved = resolve_config(&config)?;
    configure_color(&config, &resolved);

    let catalog = InventoryCatalog::from_path(&config.inventory)
        .with_context(|| format!("loading inventory {}", config.inventory.display()))?
        .with_page_size(config.page_size);
    let downloader = PackageDownloader::from_config(&resolved.analysis)
        .context("building package downloader")?;
    let packages = InventoryPackages::new(&catalog, downloader);

    let result = Discoverer::new(&catalog, &catalog, &packages, &resolved.analysis).discover();
    let succeeded = !result.is_fatal();
    let positioned = run_layout(&result, &resolved);

    let report = TopologyReport::new(result, positioned);
    let format = resolve_format(config.format, &resolved);
    write_report(&report, format, config.output.as_ref())?;

    Ok(succeeded)
}
