use crate::core::CallerIdentity;
use crate::discovery::{DiscoveryResult, StepStatus, ValidationStep};
use crate::layout::PositionedGraph;
use crate::topology::Graph;
use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Dot,
    Terminal,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "dot" | "graphviz" => Some(Self::Dot),
            "terminal" | "text" => Some(Self::Terminal),
            _ => None,
        }
    }
}

/// Everything a run produced, as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyReport {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<CallerIdentity>,
    pub graph: Graph,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PositionedGraph>,
    pub steps: Vec<ValidationStep>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<String>,
}

impl TopologyReport {
    pub fn new(result: DiscoveryResult, layout: Option<PositionedGraph>) -> Self {
        Self {
            generated_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            identity: result.identity,
            graph: result.graph,
            layout,
            steps: result.steps,
            warnings: result.warnings,
            fatal_error: result.fatal_error,
        }
    }

    /// Node count per service tag, sorted by tag.
    pub fn nodes_by_service(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for node in &self.graph.nodes {
            *counts.entry(node.service.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Edge count per relationship type, sorted by type.
    pub fn edges_by_type(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.graph.edges {
            let kind = edge.kind.map_or("untyped", |k| k.as_str());
            *counts.entry(kind).or_insert(0) += 1;
        }
        counts
    }
}

pub trait OutputWriter {
    fn write_report(&mut self, report: &TopologyReport) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Graphviz digraph; node positions are pinned when a layout is present.
pub struct DotWriter<W: Write> {
    writer: W,
}

impl<W: Write> DotWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

fn dot_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl<W: Write> OutputWriter for DotWriter<W> {
    fn write_report(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        writeln!(self.writer, "digraph topology {{")?;
        writeln!(self.writer, "  rankdir=LR;")?;
        writeln!(self.writer, "  node [shape=box, style=rounded];")?;

        for node in &report.graph.nodes {
            let position = report
                .layout
                .as_ref()
                .and_then(|layout| layout.node(&node.id))
                .map(|p| format!(", pos=\"{:.1},{:.1}!\"", p.x, -p.y))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "  \"{}\" [label=\"{}\\n{}\"{}];",
                dot_escape(&node.id),
                dot_escape(&node.label),
                dot_escape(&node.service),
                position
            )?;
        }

        for edge in &report.graph.edges {
            let label = edge
                .kind
                .map(|k| format!(" [label=\"{k}\"]"))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "  \"{}\" -> \"{}\"{};",
                dot_escape(&edge.source),
                dot_escape(&edge.target),
                label
            )?;
        }

        writeln!(self.writer, "}}")?;
        Ok(())
    }
}

/// Colored human-readable summary.
pub struct TerminalWriter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_header(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", "Lambdamap Topology Report".bold().blue())?;
        writeln!(self.writer, "{}", "=========================".blue())?;
        if let Some(identity) = &report.identity {
            writeln!(
                self.writer,
                "  Account {} in {}",
                identity.account, identity.region
            )?;
        }
        writeln!(
            self.writer,
            "  Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_steps(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", "Steps:".bold())?;
        for step in &report.steps {
            let symbol = match step.status {
                StepStatus::Success => "✓".green(),
                StepStatus::Failure => "✗".red(),
            };
            writeln!(self.writer, "  {} {}: {}", symbol, step.action.bold(), step.message)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_counts(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        if report.graph.is_empty() {
            return Ok(());
        }

        writeln!(
            self.writer,
            "{} ({} total):",
            "Nodes".bold(),
            report.graph.nodes.len()
        )?;
        for (service, count) in report.nodes_by_service() {
            writeln!(self.writer, "  {:<20} {}", service, count)?;
        }
        writeln!(self.writer)?;

        writeln!(
            self.writer,
            "{} ({} total):",
            "Relationships".bold(),
            report.graph.edges.len()
        )?;
        for (kind, count) in report.edges_by_type() {
            writeln!(self.writer, "  {:<20} {}", kind, count)?;
        }
        writeln!(self.writer)?;

        if let Some(layout) = &report.layout {
            writeln!(
                self.writer,
                "Layout: {} layers, {} backward edges",
                layout.layer_count,
                layout.backward_edges.len()
            )?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_warnings(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        if report.warnings.is_empty() {
            return Ok(());
        }
        writeln!(
            self.writer,
            "{} ({}):",
            "Warnings".yellow().bold(),
            report.warnings.len()
        )?;
        for warning in &report.warnings {
            writeln!(self.writer, "  - {}", warning)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_report(&mut self, report: &TopologyReport) -> anyhow::Result<()> {
        self.write_header(report)?;
        self.write_steps(report)?;
        self.write_counts(report)?;
        self.write_warnings(report)?;
        if let Some(fatal) = &report.fatal_error {
            writeln!(self.writer, "{} {}", "FATAL:".red().bold(), fatal)?;
        }
        Ok(())
    }
}

pub fn create_writer<'a>(format: OutputFormat, writer: Box<dyn Write + 'a>) -> Box<dyn OutputWriter + 'a> {
    match format {
        OutputFormat::Json => Box::new(JsonWriter::new(writer)),
        OutputFormat::Dot => Box::new(DotWriter::new(writer)),
        OutputFormat::Terminal => Box::new(TerminalWriter::new(writer)),
    }
}
