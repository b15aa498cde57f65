//! What the renderer receives, plus text, JSON and CSV renderings of it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::category::Category;
use crate::collector::{Collection, CollectionStatus};
use crate::normalize::normalize;
use crate::types::{FetchFailure, Row, Table};

/// Everything a dashboard needs for one render.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub unconfigured: bool,
    pub from_cache: bool,
    pub table: Table,
    pub failures: Vec<FetchFailure>,
}

impl Snapshot {
    pub fn from_collection(collection: &Collection) -> Self {
        Self {
            fetched_at: collection.batch.fetched_at,
            unconfigured: collection.is_unconfigured(),
            from_cache: collection.status == CollectionStatus::Cached,
            table: normalize(&collection.batch),
            failures: collection.batch.failures.clone(),
        }
    }
}

/// Plain-text rendering: warnings, a worst-first table, and the legend.
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    if snapshot.unconfigured {
        let _ = writeln!(
            out,
            "FATAL: {} is not set. The application cannot fetch data. \
             Get a token from {} and set it in the environment.",
            crate::config::TOKEN_ENV,
            crate::config::TOKEN_URL
        );
        return out;
    }

    for failure in &snapshot.failures {
        let _ = writeln!(out, "warning: {failure}");
    }
    for discard in &snapshot.table.discarded {
        let _ = writeln!(out, "skipped: {} ({})", discard.city, discard.reason);
    }

    if snapshot.table.is_empty() {
        let _ = writeln!(
            out,
            "No data available to display. The API returned no usable readings."
        );
    } else {
        let _ = writeln!(out, "{:<16} {:>5}  {}", "City", "AQI", "Category");
        for row in snapshot.table.sorted_by_aqi_desc() {
            let _ = writeln!(out, "{:<16} {:>5.0}  {}", row.city, row.aqi, row.category);
        }
    }

    let _ = writeln!(
        out,
        "\nLast updated: {}{}",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
        if snapshot.from_cache { " (cached)" } else { "" }
    );
    out
}

/// Text legend of the AQI bands.
pub fn render_legend() -> String {
    let mut out = String::new();
    for c in Category::ALL {
        let _ = writeln!(
            out,
            "{:>7} {:<30} {}  {}",
            c.range(),
            c.label(),
            c.color(),
            c.advisory()
        );
    }
    out
}

/// Writes the snapshot as pretty JSON.
pub fn write_json<W: Write>(mut writer: W, snapshot: &Snapshot) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writeln!(writer)?;
    Ok(())
}

/// Appends the table rows to a CSV file, writing headers only when the file
/// is new.
pub fn append_rows(path: &str, rows: &[Row]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = rows.len(), "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
