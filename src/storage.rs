use crate::error::FetchError;
use crate::models::{DataPoint, ResultStore};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    Ok(())
}

fn write_pretty_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    create_parent_dirs(path)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {}", path.display()))
}

/// Save a result store as a pretty JSON object keyed by `COUNTRY|INDICATOR`.
pub fn save_json<P: AsRef<Path>>(store: &ResultStore, path: P) -> Result<()> {
    write_pretty_json(store, path.as_ref())
}

/// Load a result store written by [`save_json`].
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<ResultStore> {
    read_json(path.as_ref())
}

/// Save the failed pairs of a run so they can be retried later.
pub fn save_failures<P: AsRef<Path>>(failures: &[FetchError], path: P) -> Result<()> {
    write_pretty_json(failures, path.as_ref())
}

pub fn load_failures<P: AsRef<Path>>(path: P) -> Result<Vec<FetchError>> {
    read_json(path.as_ref())
}

/// Prefix cells that a spreadsheet would evaluate as a formula.
fn sanitize_cell(s: &str) -> String {
    match s.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{}", s),
        _ => s.to_string(),
    }
}

/// Save every observation of the store as tidy CSV rows with header.
pub fn save_csv<P: AsRef<Path>>(store: &ResultStore, path: P) -> Result<()> {
    let path = path.as_ref();
    create_parent_dirs(path)?;
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.serialize((
        "indicator_id",
        "indicator_name",
        "country_id",
        "country_name",
        "country_iso3",
        "date",
        "year",
        "value",
        "unit",
        "obs_status",
        "decimal",
    ))?;
    for p in store.values().flatten().cloned().map(DataPoint::from) {
        if p.year.is_none() {
            debug!("{}/{}: non-annual date {:?}", p.country_iso3, p.indicator_id, p.date);
        }
        wtr.serialize((
            sanitize_cell(&p.indicator_id),
            sanitize_cell(&p.indicator_name),
            sanitize_cell(&p.country_id),
            sanitize_cell(&p.country_name),
            sanitize_cell(&p.country_iso3),
            sanitize_cell(&p.date),
            p.year,
            p.value,
            p.unit.as_deref().map(sanitize_cell),
            p.obs_status.as_deref().map(sanitize_cell),
            p.decimal,
        ))?;
    }
    wtr.flush()?;
    Ok(())
}
