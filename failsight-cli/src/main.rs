//! failsight-cli: terminal front end for the Failsight demo dashboard
//!
//! Renders what the Failsight HTTP API returns; it never reads the sources itself.
//!
//! # Subcommands
//! - `report [--json]`: failure prediction report
//! - `deep-dive [--work-order <id>] [--json]`: per-sensor charts
//! - `narrative <id> [--json]`: one narrative
//! - `series <id> [--json]`: per-sensor series of one work order
//! - `preview <file> [--rows <n>] [--json]`: first rows of a delimited file
//! - `status`: show server health

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8777";
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 60;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "failsight-cli",
    version,
    about = "Failsight failure prediction demo terminal dashboard"
)]
struct Cli {
    /// Failsight HTTP server URL (overrides FAILSIGHT_HTTP_URL env var)
    #[arg(long, env = "FAILSIGHT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the failure prediction report
    Report {
        /// Output the raw JSON entries
        #[arg(long)]
        json: bool,
    },

    /// Show failure deep dives (per-sensor charts)
    DeepDive {
        /// Limit to one work order instead of all configured ones
        #[arg(long)]
        work_order: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show the narrative for one work order
    Narrative {
        work_order: String,

        #[arg(long)]
        json: bool,
    },

    /// Show the sensor series for one work order
    Series {
        work_order: String,

        #[arg(long)]
        json: bool,
    },

    /// Preview the first rows of a delimited file
    Preview {
        file: PathBuf,

        /// Number of rows to show (server default when omitted)
        #[arg(short = 'n', long)]
        rows: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Show Failsight server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub work_order: String,
    pub narrative: Option<String>,
    pub display_text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportResponse {
    pub count: usize,
    pub entries: Vec<ReportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    /// The server sends a missing (NaN) reading as `null`.
    #[serde(deserialize_with = "null_as_nan")]
    pub value: f64,
}

fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSeries {
    pub sensor_name: String,
    pub sensor_id: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepDive {
    pub work_order: String,
    pub series: Vec<SensorSeries>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeepDiveResponse {
    pub count: usize,
    pub work_orders: Vec<DeepDive>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TablePreview {
    pub encoding: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub truncated: bool,
}

// ============================================================================
// Rendering
// ============================================================================

/// One block of the report, block-quoting the narrative.
pub fn render_report_entry(entry: &ReportEntry) -> String {
    let quoted: Vec<String> = entry
        .display_text
        .lines()
        .map(|l| format!("> {}", l))
        .collect();
    let quoted = if quoted.is_empty() {
        ">".to_string()
    } else {
        quoted.join("\n")
    };
    format!("WorkOrderID {}\n{}\n", entry.work_order, quoted)
}

/// Scale values onto eight block characters; at most `width` samples are drawn.
pub fn sparkline(values: &[f64], width: usize) -> String {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || width == 0 {
        return String::new();
    }

    let sampled: Vec<f64> = if finite.len() <= width {
        finite
    } else {
        (0..width)
            .map(|i| finite[i * (finite.len() - 1) / (width - 1).max(1)])
            .collect()
    };

    let min = sampled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = sampled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    sampled
        .iter()
        .map(|v| {
            if span == 0.0 {
                SPARK_LEVELS[SPARK_LEVELS.len() / 2]
            } else {
                let level = ((v - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
                SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
            }
        })
        .collect()
}

pub fn render_series(series: &SensorSeries) -> String {
    let mut out = format!("{} (sensor_id {})\n", series.sensor_name, series.sensor_id);
    let values: Vec<f64> = series.points.iter().map(|p| p.value).collect();
    out.push_str(&format!("  {}\n", sparkline(&values, SPARK_WIDTH)));

    if let (Some(first), Some(last)) = (series.points.first(), series.points.last()) {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        out.push_str(&format!(
            "  {} → {}  n={} min={} max={} last={}\n",
            first.timestamp.format("%Y-%m-%d %H:%M:%S"),
            last.timestamp.format("%Y-%m-%d %H:%M:%S"),
            series.points.len(),
            min,
            max,
            last.value
        ));
    }
    out
}

pub fn render_deep_dive(dive: &DeepDive) -> String {
    let mut out = format!("WorkOrderID {}\n", dive.work_order);
    if dive.series.is_empty() {
        let message = dive
            .message
            .as_deref()
            .unwrap_or("No data found for this WorkOrderID.");
        out.push_str(&format!("  {}\n", message));
        return out;
    }
    for series in &dive.series {
        out.push_str(&render_series(series));
        out.push('\n');
    }
    out
}

/// Fixed-width text table of an upload preview.
pub fn render_preview(preview: &TablePreview) -> String {
    let columns = preview
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(preview.headers.len()))
        .max()
        .unwrap_or(0);
    let cell = |row: &[String], i: usize| row.get(i).cloned().unwrap_or_default();

    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&preview.headers).chain(preview.rows.iter()) {
        for (i, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(cell(row.as_slice(), i).chars().count());
        }
    }

    let format_row = |row: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let text = cell(row, i);
                let pad = w.saturating_sub(text.chars().count());
                format!("{}{}", text, " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_row(preview.headers.as_slice()));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &preview.rows {
        out.push_str(&format_row(row.as_slice()));
        out.push('\n');
    }
    if preview.truncated {
        out.push_str("…\n");
    }
    out.push_str(&format!("(decoded as {})\n", preview.encoding));
    out
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

/// Server URL with `segments` appended; each segment is percent-encoded.
pub fn endpoint(server: &str, segments: &[&str]) -> anyhow::Result<Url> {
    let mut url = Url::parse(server)?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("{} cannot be used as a base URL", server))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// GET a JSON body, exiting with a message on connection or HTTP failure.
fn get_json<T: serde::de::DeserializeOwned>(server: &str, segments: &[&str]) -> anyhow::Result<T> {
    let url = endpoint(server, segments)?;
    let resp = match client()?.get(url.clone()).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failsight-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };
    parse_response(resp)
}

fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::blocking::Response,
) -> anyhow::Result<T> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body: serde_json::Value = resp.json().unwrap_or_default();
        let msg = body["error"].as_str().unwrap_or("no error message");
        eprintln!("failsight-cli: server returned {}: {}", status, msg);
        std::process::exit(1);
    }
    match resp.json() {
        Ok(r) => Ok(r),
        Err(e) => {
            eprintln!("failsight-cli: failed to parse response: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn do_report(server: &str, json: bool) -> anyhow::Result<()> {
    let report: ReportResponse = get_json(server, &["report"])?;
    if json {
        return print_json(&report.entries);
    }
    println!("Failure Prediction Report ({} work orders)\n", report.count);
    for entry in &report.entries {
        println!("{}", render_report_entry(entry));
    }
    Ok(())
}

fn do_deep_dive(server: &str, work_order: Option<String>, json: bool) -> anyhow::Result<()> {
    let dives = match work_order {
        Some(id) => vec![get_json::<DeepDive>(server, &["series", id.as_str()])?],
        None => get_json::<DeepDiveResponse>(server, &["deep-dives"])?.work_orders,
    };
    if json {
        return print_json(&dives);
    }
    println!("Failure Deep Dives\n");
    for dive in &dives {
        println!("{}", render_deep_dive(dive));
    }
    Ok(())
}

fn do_narrative(server: &str, work_order: &str, json: bool) -> anyhow::Result<()> {
    let entry: ReportEntry = get_json(server, &["narratives", work_order])?;
    if json {
        return print_json(&entry);
    }
    println!("{}", render_report_entry(&entry));
    Ok(())
}

fn do_series(server: &str, work_order: &str, json: bool) -> anyhow::Result<()> {
    let dive: DeepDive = get_json(server, &["series", work_order])?;
    if json {
        return print_json(&dive.series);
    }
    println!("{}", render_deep_dive(&dive));
    Ok(())
}

fn do_preview(server: &str, file: &Path, rows: Option<usize>, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)?;
    let mut url = endpoint(server, &["preview"])?;
    if let Some(n) = rows {
        url.query_pairs_mut().append_pair("rows", &n.to_string());
    }

    let resp = match client()?
        .post(url.clone())
        .header("content-type", "text/csv")
        .body(bytes)
        .send()
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failsight-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };
    let preview: TablePreview = parse_response(resp)?;
    if json {
        return print_json(&preview);
    }
    println!("Uploaded file preview: {}\n", file.display());
    print!("{}", render_preview(&preview));
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = endpoint(server, &["health"])?;
    let resp = client()?.get(url.clone()).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Failsight server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:          {}", body["version"].as_str().unwrap_or("?"));
            println!("Narratives:       {}", body["narratives"]);
            println!("Readings:         {}", body["readings"]);
            if let Some(sources) = body["sources"].as_array() {
                for s in sources {
                    println!(
                        "Source:           {} ({} bytes)",
                        s["path"].as_str().unwrap_or("?"),
                        s["bytes"]
                    );
                }
            }
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("failsight-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("failsight-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Report { json } => do_report(&server, json),
        Commands::DeepDive { work_order, json } => do_deep_dive(&server, work_order, json),
        Commands::Narrative { work_order, json } => do_narrative(&server, &work_order, json),
        Commands::Series { work_order, json } => do_series(&server, &work_order, json),
        Commands::Preview { file, rows, json } => do_preview(&server, &file, rows, json),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("failsight-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
