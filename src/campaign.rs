//! Campaign driver: turns a user request into campaign targets, runs the
//! engine over them and merges what it finds into the right result store.
//!
//! Three request shapes are supported:
//!
//! - a single hash (reported only, nothing persisted),
//! - a file of hashes under the data directory (per-file store),
//! - the fixed assignment, one bucket per password length (shared store).
//!
//! Hashes already present in a store are removed before the engine sees
//! them, so a solved hash is never attempted twice across runs.
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use crate::config::CampaignConfig;
use crate::digest::{HashDigest, PasswordLength};
use crate::engine::{CrackEngine, CrackReport, EngineError};
use crate::events::{EventSink, format_duration};
use crate::store::{ResultStore, SolvedRecord, StoreError, StoreLayout};
use crate::target::{CampaignTarget, TargetError};
use crate::tools::ToolRunner;

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error("file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("read {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CampaignError {
    /// Tool launch failures end the process; everything else only aborts the
    /// current request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CampaignError::Engine(_))
    }
}

#[derive(Debug, Clone)]
pub struct SingleOutcome {
    pub hash: HashDigest,
    pub length: PasswordLength,
    pub report: CrackReport,
}

impl SingleOutcome {
    pub fn password(&self) -> Option<&str> {
        self.report
            .records
            .iter()
            .find(|r| r.hash == self.hash)
            .map(|r| r.password.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub store: PathBuf,
    pub length: PasswordLength,
    /// Distinct well-formed hashes read from the input.
    pub accepted: usize,
    /// Of those, already present in the per-file store.
    pub already_solved: usize,
    /// `None` when nothing was left to crack.
    pub report: Option<CrackReport>,
    pub appended: usize,
}

#[derive(Debug, Clone)]
pub struct BucketOutcome {
    pub length: PasswordLength,
    pub total: usize,
    pub already_solved: usize,
    /// `None` when the bucket was skipped as fully solved.
    pub report: Option<CrackReport>,
    pub appended: usize,
}

impl BucketOutcome {
    pub fn skipped(&self) -> bool {
        self.report.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentOutcome {
    pub store: PathBuf,
    pub previously_solved: usize,
    pub buckets: Vec<BucketOutcome>,
}

pub struct Campaign<'c, R, S> {
    config: &'c CampaignConfig,
    runner: R,
    events: S,
}

impl<'c, R: ToolRunner, S: EventSink> Campaign<'c, R, S> {
    pub fn new(config: &'c CampaignConfig, runner: R, events: S) -> Self {
        Self {
            config,
            runner,
            events,
        }
    }

    pub fn config(&self) -> &CampaignConfig {
        self.config
    }

    fn engine(&mut self) -> CrackEngine<&mut R, &S> {
        CrackEngine::new(&mut self.runner, &self.events, &self.config.session_dir)
            .verbose(self.config.tools.verbose)
            .with_limits(self.config.limits)
    }

    fn target<I>(&self, hashes: I, length: PasswordLength) -> Result<CampaignTarget, TargetError>
    where
        I: IntoIterator<Item = HashDigest>,
    {
        CampaignTarget::new(hashes, length, &self.config.sizes, self.config.tools.threads)
    }

    fn require_size(&self, length: PasswordLength) -> Result<(), TargetError> {
        self.config
            .sizes
            .exponent(length)
            .map(|_| ())
            .ok_or(TargetError::UnmappedLength(length))
    }

    /// Crack one hash. Nothing is persisted.
    pub fn crack_single(
        &mut self,
        hash: HashDigest,
        length: PasswordLength,
    ) -> Result<SingleOutcome, CampaignError> {
        self.events.info("-- Target: Single Hash --");
        let target = self.target([hash.clone()], length)?;
        let report = self.engine().crack(&target)?;
        if report.is_complete() {
            self.events.info("Cracking finished successfully.");
        } else {
            self.events
                .info("Could not crack the hash with the current configuration.");
        }
        Ok(SingleOutcome {
            hash,
            length,
            report,
        })
    }

    /// Crack every well-formed hash in `<data_dir>/<name>`, appending new
    /// results to `<data_dir>/cracked_<name>`.
    pub fn crack_file(
        &mut self,
        name: &str,
        length: PasswordLength,
    ) -> Result<FileOutcome, CampaignError> {
        self.events.info("-- Target: Hashes from File --");
        let input = self.config.input_path(name);
        if !input.is_file() {
            return Err(CampaignError::MissingInput(input));
        }
        self.require_size(length)?;

        let hashes = read_hash_file(&input)?;
        self.events
            .info(&format!("Found {} hashes to crack.", hashes.len()));
        if hashes.is_empty() {
            return Err(TargetError::Empty.into());
        }

        let mut store = ResultStore::load(self.config.file_store_path(name), StoreLayout::PerFile)?;
        let pending: Vec<HashDigest> = hashes
            .iter()
            .filter(|h| !store.contains(h))
            .cloned()
            .collect();
        let mut outcome = FileOutcome {
            input,
            store: store.path().to_path_buf(),
            length,
            accepted: hashes.len(),
            already_solved: hashes.len() - pending.len(),
            report: None,
            appended: 0,
        };
        if pending.is_empty() {
            self.events.info(&format!(
                "All {} hashes already solved in {}. Skipping.",
                hashes.len(),
                store.path().display()
            ));
            return Ok(outcome);
        }
        if outcome.already_solved > 0 {
            self.events.info(&format!(
                "Skipping {} hash(es) already solved in {}.",
                outcome.already_solved,
                store.path().display()
            ));
        }

        let target = self.target(pending, length)?;
        let report = self.engine().crack(&target)?;
        let appended = store.append(&report.records)?;
        if appended > 0 {
            self.events.info(&format!(
                "Results appended to {}",
                store.path().display()
            ));
        }
        outcome.appended = appended;
        outcome.report = Some(report);
        Ok(outcome)
    }

    /// Work through the fixed assignment, one bucket per length in ascending
    /// order, resuming from the shared assignment store.
    pub fn crack_assignment(&mut self) -> Result<AssignmentOutcome, CampaignError> {
        self.events.info("-- Target: Full Assignment --");
        let config = self.config;
        let mut store = ResultStore::load(
            config.assignment_store_path(),
            StoreLayout::Assignment,
        )?;
        let previously_solved = store.len();
        self.events.info(&format!(
            "Loaded {} previously cracked assignment hashes.",
            previously_solved
        ));

        let mut buckets = Vec::new();
        for (length, all) in config.assignment.buckets() {
            let pending: Vec<HashDigest> = all
                .iter()
                .filter(|h| !store.contains(h))
                .cloned()
                .collect();
            let mut bucket = BucketOutcome {
                length,
                total: all.len(),
                already_solved: all.len() - pending.len(),
                report: None,
                appended: 0,
            };
            if pending.is_empty() {
                self.events.info(&format!(
                    "All {}-char hashes already solved. Skipping.",
                    length
                ));
                buckets.push(bucket);
                continue;
            }

            let target = self.target(pending, length)?;
            self.events.info(&format!(
                "==================== PROCESSING {} UNCRACKED {}-CHAR HASHES ====================",
                target.len(),
                length
            ));
            let started = Instant::now();
            let report = self.engine().crack(&target)?;
            self.events.info(&format!(
                "Finished processing all {}-char hashes in {}.",
                length,
                format_duration(started.elapsed())
            ));

            // Persist in the bucket's configured order.
            let ordered: Vec<&SolvedRecord> = all
                .iter()
                .filter_map(|h| report.records.iter().find(|r| &r.hash == h))
                .collect();
            if !ordered.is_empty() {
                self.events.info(&format!(
                    "Appending {} new results to {}",
                    ordered.len(),
                    store.path().display()
                ));
                bucket.appended = store.append(ordered)?;
            }
            bucket.report = Some(report);
            buckets.push(bucket);
        }

        Ok(AssignmentOutcome {
            store: store.path().to_path_buf(),
            previously_solved,
            buckets,
        })
    }
}

/// Read a hash input file: one hash per line, only lines of exactly the
/// digest width, lowercased, duplicates dropped.
pub fn read_hash_file(path: &std::path::Path) -> Result<Vec<HashDigest>, CampaignError> {
    let read_err = |source| CampaignError::ReadInput {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    let mut seen: HashSet<HashDigest> = HashSet::new();
    let mut out: Vec<HashDigest> = Vec::new();
    for raw in BufReader::new(file).split(b'\n') {
        let raw = raw.map_err(read_err)?;
        let Ok(line) = std::str::from_utf8(&raw) else {
            continue;
        };
        if let Some(h) = HashDigest::from_input_line(line) {
            if seen.insert(h.clone()) {
                out.push(h);
            }
        }
    }
    Ok(out)
}
