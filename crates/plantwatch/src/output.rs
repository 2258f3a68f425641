//! Output formatting: table, JSON, plain.
//!
//! Renders snapshots in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde, plain emits one field per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use plantwatch_core::{Classification, Metric, Snapshot, classification_guidance, progress_ratio};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: &'static str,
    #[tabled(rename = "Level")]
    level: String,
}

fn metric_row(snapshot: &Snapshot, metric: Metric) -> MetricRow {
    let raw = snapshot.metric(metric);
    let pct = progress_ratio(raw, metric.scale_max());
    MetricRow {
        metric: metric.label(),
        value: raw.to_owned(),
        unit: metric.unit(),
        level: format!("{pct:>3.0}%"),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a snapshot in the chosen format.
pub fn render_snapshot(format: &OutputFormat, snapshot: &Snapshot, color: bool) -> String {
    match format {
        OutputFormat::Table => render_snapshot_table(snapshot, color),
        OutputFormat::Json => render_json_pretty(snapshot),
        OutputFormat::JsonCompact => render_json_compact(snapshot),
        OutputFormat::Plain => render_snapshot_plain(snapshot),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_snapshot_table(snapshot: &Snapshot, color: bool) -> String {
    let rows: Vec<MetricRow> = Metric::ALL
        .iter()
        .map(|&m| metric_row(snapshot, m))
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();

    let badge = classification_badge(&snapshot.classification, color);
    let guidance = classification_guidance(&snapshot.classification);
    let link = if snapshot.connected {
        "connected"
    } else {
        "disconnected"
    };

    let mut out = table;
    out.push_str(&format!("\nCondition: {badge}\n{guidance}\nBroker: {link}"));
    if let Some(at) = snapshot.last_reading_at {
        out.push_str(&format!("\nLast reading: {}", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    out
}

fn render_snapshot_plain(snapshot: &Snapshot) -> String {
    let mut lines: Vec<String> = Metric::ALL
        .iter()
        .map(|&m| format!("{m}={}", snapshot.metric(m)))
        .collect();
    lines.push(format!("classification={}", snapshot.classification));
    lines.push(format!("connected={}", snapshot.connected));
    lines.join("\n")
}

/// Classification label, colored to match its meaning when enabled.
fn classification_badge(label: &str, color: bool) -> String {
    if !color {
        return label.to_owned();
    }
    match Classification::from_label(label) {
        Classification::Healthy => label.green().bold().to_string(),
        Classification::Dry => label.yellow().bold().to_string(),
        Classification::Overwatered => label.blue().bold().to_string(),
        Classification::Dark => label.purple().bold().to_string(),
        Classification::Unknown => label.dimmed().to_string(),
    }
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_default()
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut snap = Snapshot::new();
        snap.connected = true;
        snap
    }

    #[test]
    fn plain_output_lists_every_metric() {
        let out = render_snapshot_plain(&sample_snapshot());
        assert!(out.contains("temperature=--"));
        assert!(out.contains("humidity=--"));
        assert!(out.contains("light=--"));
        assert!(out.contains("moisture=--"));
        assert!(out.contains("classification=Unknown"));
        assert!(out.contains("connected=true"));
    }

    #[test]
    fn table_output_shows_placeholder_levels() {
        let out = render_snapshot_table(&sample_snapshot(), false);
        assert!(out.contains("Temperature"));
        assert!(out.contains("0%"));
        assert!(out.contains("Broker: connected"));
    }

    #[test]
    fn badge_uncolored_is_verbatim_label() {
        assert_eq!(classification_badge("Healthy", false), "Healthy");
        assert_eq!(classification_badge("Soggy", false), "Soggy");
    }

    #[test]
    fn json_output_round_trips_fields() {
        let out = render_json_compact(&sample_snapshot());
        assert!(out.contains("\"classification\":\"Unknown\""));
        assert!(out.contains("\"connected\":true"));
    }
}
