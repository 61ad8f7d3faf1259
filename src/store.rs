//! Append-only result stores of cracked hashes.
//!
//! Two layouts share one loader:
//!
//! - per-file store: `<hash> | <password>`
//! - assignment store: `<length> | <hash> | <password>`
//!
//! Only the first one (per-file) or two (assignment) `|` split fields, so a
//! password may itself contain `|`. Lines without `|` or with too few fields
//! are skipped. A missing store file loads as an empty store.
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::digest::{HashDigest, PasswordLength};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("append {}: {source}", .path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreLayout {
    PerFile,
    Assignment,
}

/// One recovered password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedRecord {
    pub hash: HashDigest,
    pub password: String,
    pub length: Option<PasswordLength>,
}

/// Parse one store line. `None` for blank, malformed or unrecognized lines.
pub fn parse_store_line(line: &str, layout: StoreLayout) -> Option<SolvedRecord> {
    let line = line.trim();
    if !line.contains('|') {
        return None;
    }
    let (length, hash, password) = match layout {
        StoreLayout::PerFile => {
            let (hash, password) = line.split_once('|')?;
            (None, hash, password)
        }
        StoreLayout::Assignment => {
            let mut parts = line.splitn(3, '|');
            let length = parts.next()?;
            let hash = parts.next()?;
            let password = parts.next()?;
            (length.parse::<PasswordLength>().ok(), hash, password)
        }
    };
    let hash = HashDigest::parse(hash).ok()?;
    Some(SolvedRecord {
        hash,
        password: password.trim().to_string(),
        length,
    })
}

pub fn format_store_line(record: &SolvedRecord, layout: StoreLayout) -> String {
    match (layout, record.length) {
        (StoreLayout::Assignment, Some(len)) => {
            format!("{} | {} | {}", len, record.hash, record.password)
        }
        // An assignment record without a length still needs three fields.
        (StoreLayout::Assignment, None) => format!("? | {} | {}", record.hash, record.password),
        (StoreLayout::PerFile, _) => format!("{} | {}", record.hash, record.password),
    }
}

/// Durable mapping hash → password backed by an append-only text file.
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
    layout: StoreLayout,
    records: Vec<SolvedRecord>,
    index: HashMap<HashDigest, usize>,
}

impl ResultStore {
    /// Load `path`. A missing file yields an empty store.
    pub fn load<P: AsRef<Path>>(path: P, layout: StoreLayout) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self {
            path,
            layout,
            records: Vec::new(),
            index: HashMap::new(),
        };
        let file = match File::open(&store.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(store),
            Err(source) => {
                return Err(StoreError::Read {
                    path: store.path,
                    source,
                });
            }
        };
        for raw in BufReader::new(file).split(b'\n') {
            let raw = raw.map_err(|source| StoreError::Read {
                path: store.path.clone(),
                source,
            })?;
            // Lines that are not UTF-8 are malformed like any other.
            let Ok(line) = std::str::from_utf8(&raw) else {
                log::debug!("skipping non-UTF-8 line in {}", store.path.display());
                continue;
            };
            if let Some(record) = parse_store_line(line, layout) {
                store.remember(record);
            }
        }
        log::debug!(
            "loaded {} record(s) from {}",
            store.records.len(),
            store.path.display()
        );
        Ok(store)
    }

    fn remember(&mut self, record: SolvedRecord) {
        // Later lines win, matching the append order on disk.
        match self.index.get(&record.hash) {
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.hash.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, hash: &HashDigest) -> bool {
        self.index.contains_key(hash)
    }

    pub fn password(&self, hash: &HashDigest) -> Option<&str> {
        self.index
            .get(hash)
            .map(|&i| self.records[i].password.as_str())
    }

    pub fn records(&self) -> &[SolvedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `records` to disk and to the in-memory view. Records already
    /// present are not written again. Returns how many lines were written.
    pub fn append<'r, I>(&mut self, records: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'r SolvedRecord>,
    {
        let mut seen = HashSet::new();
        let fresh: Vec<SolvedRecord> = records
            .into_iter()
            .filter(|r| !self.contains(&r.hash) && seen.insert(r.hash.clone()))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }
        let err = |source| StoreError::Append {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(err)?;
        let mut w = BufWriter::new(file);
        for r in &fresh {
            writeln!(w, "{}", format_store_line(r, self.layout)).map_err(err)?;
        }
        w.flush().map_err(err)?;
        let written = fresh.len();
        for r in fresh {
            self.remember(r);
        }
        Ok(written)
    }
}
