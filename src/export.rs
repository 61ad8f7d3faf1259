//! Export helpers for writing result stores to CSV.
//!
//! - `save_results_csv` writes one `Length,Hash,Password` row per stored
//!   record, in store order. Per-file stores leave `Length` empty.
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use crate::digest::{HashDigest, PasswordLength};
use crate::store::ResultStore;

#[derive(Serialize)]
struct Row<'a> {
    #[serde(rename = "Length")]
    length: Option<PasswordLength>,
    #[serde(rename = "Hash")]
    hash: &'a HashDigest,
    #[serde(rename = "Password")]
    password: &'a str,
}

/// Returns the number of rows written.
pub fn save_results_csv<P: AsRef<Path>>(store: &ResultStore, path: P) -> Result<usize> {
    let path = path.as_ref();
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for r in store.records() {
        wtr.serialize(Row {
            length: r.length,
            hash: &r.hash,
            password: &r.password,
        })?;
    }
    wtr.flush()?;
    Ok(store.len())
}
