//! Output of annotated routes and the per-variant match log.
//!
//! Supports JSON serialization and CSV append.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::matcher::MatchOutcome;
use crate::routing::RouteResponse;

/// One CSV row per trip variant of a matched route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub timestamp: DateTime<Utc>,
    pub variant: usize,
    pub policy: String,
    pub threshold_km: f64,
    pub catalogue_size: usize,
    pub traversed_ids: usize,
    pub trace_degraded: bool,
    pub obstacle_count: usize,
    /// Space-separated obstacle ids.
    pub obstacle_ids: String,
}

impl MatchRecord {
    pub fn from_outcome(outcome: &MatchOutcome, timestamp: DateTime<Utc>) -> Vec<Self> {
        outcome
            .variants
            .iter()
            .map(|v| MatchRecord {
                timestamp,
                variant: v.index,
                policy: outcome.policy.to_string(),
                threshold_km: outcome.threshold_km,
                catalogue_size: outcome.catalogue_size,
                traversed_ids: v.traversed_ids,
                trace_degraded: v.trace_degraded,
                obstacle_count: v.obstacle_ids.len(),
                obstacle_ids: v
                    .obstacle_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            })
            .collect()
    }
}

/// Writes the response as pretty JSON to `path`, or to stdout when `None`.
pub fn write_response(path: Option<&str>, response: &RouteResponse) -> Result<()> {
    let body = serde_json::to_string_pretty(response)?;
    match path {
        Some(path) => {
            std::fs::write(path, body).with_context(|| format!("writing response to {path}"))?;
            info!(path, "Route response written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

/// Appends match records as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_records(path: &str, records: &[MatchRecord]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening match log {path}"))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}
