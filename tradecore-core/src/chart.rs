//! Chart blocks embedded in model replies.
//!
//! The engine is instructed to describe charts as a fenced code block tagged
//! `json-chart`. [`parse_reply`] splits a reply into markdown and chart
//! segments; a block that fails to parse becomes an inline error segment and
//! the rest of the reply is unaffected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fence tag that marks a chart descriptor
pub const CHART_FENCE_TAG: &str = "json-chart";

/// Text shown in place of a chart block that could not be parsed
pub const CHART_ERROR_MARKER: &str = "Failed to render chart: Invalid JSON data.";

const BAR_WIDTH: usize = 30;

/// Chart category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Area,
    Line,
    Bar,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Area => "area",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
        }
    }
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(ChartKind::Area),
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            _ => Err(format!("unknown chart type: {}", s)),
        }
    }
}

/// A scalar cell of a data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartValue {
    Number(f64),
    Text(String),
}

impl ChartValue {
    /// Numeric view; text cells that hold a number also count
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ChartValue::Number(n) => Some(*n),
            ChartValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for ChartValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartValue::Number(n) => write!(f, "{}", n),
            ChartValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One flat record of the series
pub type ChartDataPoint = BTreeMap<String, ChartValue>;

/// Chart descriptor produced by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub title: String,
    pub x_axis_key: String,
    pub data_key: String,
    pub data: Vec<ChartDataPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A piece of a parsed reply
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Plain markdown, passed through as-is
    Markdown(String),
    /// A valid chart descriptor
    Chart(ChartConfig),
    /// A chart block that failed to parse, with the parser's reason
    ChartError(String),
}

/// Split a reply into markdown and chart segments, in order.
pub fn parse_reply(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut markdown = String::new();
    let mut chart_body: Option<String> = None;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        match chart_body.as_mut() {
            Some(body) => {
                if trimmed == "```" {
                    segments.push(parse_chart_block(body));
                    chart_body = None;
                } else {
                    body.push_str(line);
                }
            }
            None => {
                if is_chart_fence(trimmed) {
                    if !markdown.is_empty() {
                        segments.push(Segment::Markdown(std::mem::take(&mut markdown)));
                    }
                    chart_body = Some(String::new());
                } else {
                    markdown.push_str(line);
                }
            }
        }
    }

    // An unterminated fence runs to the end of the reply
    if let Some(body) = chart_body {
        segments.push(parse_chart_block(&body));
    }
    if !markdown.is_empty() {
        segments.push(Segment::Markdown(markdown));
    }

    segments
}

fn is_chart_fence(trimmed_line: &str) -> bool {
    trimmed_line
        .strip_prefix("```")
        .map(|tag| tag.trim() == CHART_FENCE_TAG)
        .unwrap_or(false)
}

fn parse_chart_block(body: &str) -> Segment {
    match serde_json::from_str::<ChartConfig>(body) {
        Ok(config) => Segment::Chart(config),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid chart block in reply");
            Segment::ChartError(e.to_string())
        }
    }
}

/// Render a reply for the terminal.
///
/// `preference` overrides the chart type the engine asked for.
pub fn render_reply(content: &str, preference: Option<ChartKind>) -> String {
    let mut out = String::new();
    for segment in parse_reply(content) {
        match segment {
            Segment::Markdown(text) => out.push_str(&text),
            Segment::Chart(config) => out.push_str(&render_chart(&config, preference)),
            Segment::ChartError(_) => {
                out.push_str("[!] ");
                out.push_str(CHART_ERROR_MARKER);
                out.push('\n');
            }
        }
    }
    out
}

/// Render a chart as a labelled horizontal bar listing.
pub fn render_chart(config: &ChartConfig, preference: Option<ChartKind>) -> String {
    let kind = preference.unwrap_or(config.kind);
    let mut out = format!("[{} chart] {}\n", kind.as_str(), config.title);
    if let Some(description) = &config.description {
        out.push_str(description);
        out.push('\n');
    }

    let rows: Vec<(String, Option<f64>)> = config
        .data
        .iter()
        .map(|point| {
            let label = point
                .get(&config.x_axis_key)
                .map(ToString::to_string)
                .unwrap_or_default();
            let value = point.get(&config.data_key).and_then(ChartValue::as_f64);
            (label, value)
        })
        .collect();

    let label_width = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let max = rows
        .iter()
        .filter_map(|(_, v)| *v)
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    for (label, value) in rows {
        let bar = match value {
            Some(v) if max > 0.0 => {
                let len = ((v.abs() / max) * BAR_WIDTH as f64).round() as usize;
                "#".repeat(len.max(1))
            }
            _ => String::new(),
        };
        let shown = value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:<width$} | {} {}\n",
            label,
            bar,
            shown,
            width = label_width
        ));
    }

    out
}
