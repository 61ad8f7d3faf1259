//! Engine: the iterative cracking loop for one campaign target.
//!
//! Each attempt rebuilds the session table from scratch (BUILD), runs the
//! Guesser once per unsolved hash in order (GUESS_ALL), then drops the solved
//! hashes from the working set (EVALUATE). An attempt that solves nothing
//! simply loops; a fresh random table is the retry strategy. Without a
//! [`CrackLimits`] guard the loop only ends when every hash is solved.
//!
//! The session table is removed when `crack` returns, whatever the outcome.
//! A process killed mid-run leaves it behind.
//!
//! Typical usage:
//!
//! ```no_run
//! use std::num::NonZeroU32;
//! use cryptocat::config::{CampaignConfig, ToolSettings};
//! use cryptocat::digest::{HashDigest, PasswordLength};
//! use cryptocat::engine::CrackEngine;
//! use cryptocat::events::EventLog;
//! use cryptocat::target::CampaignTarget;
//! use cryptocat::tools::ProcessRunner;
//! # fn main() -> anyhow::Result<()> {
//! let config = CampaignConfig::default();
//! let target = CampaignTarget::new(
//!     [HashDigest::parse("f8340c836d41f77cd92708bbd5443cbe")?],
//!     "4".parse::<PasswordLength>()?,
//!     &config.sizes,
//!     NonZeroU32::MIN,
//! )?;
//! let events = EventLog::new();
//! let mut engine = CrackEngine::new(ProcessRunner::new(ToolSettings::default()), &events, "./bin");
//! let report = engine.crack(&target)?;
//! println!("{} solved", report.records.len());
//! # Ok(())
//! # }
//! ```
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::CrackLimits;
use crate::digest::{HashDigest, PasswordLength};
use crate::events::{EventSink, format_duration};
use crate::store::SolvedRecord;
use crate::target::CampaignTarget;
use crate::tools::{Invocation, ToolError, ToolOutput, ToolRunner, parse_found};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every hash was solved.
    Converged,
    /// The configured iteration cap was hit with hashes left.
    IterationLimit(u32),
    /// The configured time budget ran out with hashes left.
    TimeBudget(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrackReport {
    /// Solved records in the order they were found.
    pub records: Vec<SolvedRecord>,
    /// Hashes still unsolved, in target order. Empty when converged.
    pub unsolved: Vec<HashDigest>,
    pub iterations: u32,
    pub stop: StopReason,
    pub elapsed: Duration,
}

impl CrackReport {
    pub fn solved(&self) -> BTreeMap<HashDigest, String> {
        self.records
            .iter()
            .map(|r| (r.hash.clone(), r.password.clone()))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unsolved.is_empty()
    }
}

/// Session table location for `length` under `dir`.
pub fn session_table_path(dir: &Path, length: PasswordLength) -> PathBuf {
    dir.join(format!("rainbow_l{}_session.dat", length))
}

/// Owns the session table path; removes the file on drop.
#[derive(Debug)]
struct SessionTable {
    path: PathBuf,
}

impl SessionTable {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionTable {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed session table {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "could not remove session table {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

pub struct CrackEngine<R, S> {
    runner: R,
    events: S,
    session_dir: PathBuf,
    verbose: bool,
    limits: CrackLimits,
}

impl<R: ToolRunner, S: EventSink> CrackEngine<R, S> {
    pub fn new<P: Into<PathBuf>>(runner: R, events: S, session_dir: P) -> Self {
        Self {
            runner,
            events,
            session_dir: session_dir.into(),
            verbose: false,
            limits: CrackLimits::default(),
        }
    }

    /// Pass `--verbose` through to both tools.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_limits(mut self, limits: CrackLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Run the loop until `target` is fully solved or a configured limit
    /// stops it. Only a tool launch failure is an error.
    pub fn crack(&mut self, target: &CampaignTarget) -> Result<CrackReport, EngineError> {
        let length = target.length();
        let chains = target.chain_count();
        let threads = target.threads();
        let table = SessionTable {
            path: session_table_path(&self.session_dir, length),
        };
        let started = Instant::now();

        let mut unsolved: Vec<HashDigest> = target.hashes().to_vec();
        let mut records: Vec<SolvedRecord> = Vec::new();
        let mut iterations: u32 = 0;
        let mut stop = StopReason::Converged;

        while !unsolved.is_empty() {
            iterations += 1;
            self.events.info(&format!(
                "--- [Attempt #{}] Cracking {} remaining hash(es) of length {} ---",
                iterations,
                unsolved.len(),
                length
            ));

            // BUILD
            let build = Invocation::build_table(length, chains, table.path(), threads, self.verbose);
            let out = self.invoke(&build)?;
            self.events.info(&format!(
                "Table generation finished in {}.",
                format_duration(out.elapsed)
            ));

            // GUESS_ALL
            let mut newly_solved: HashSet<HashDigest> = HashSet::new();
            for hash in &unsolved {
                self.events.info(&format!("-> Guessing hash: {}", hash));
                let guess = Invocation::guess(table.path(), hash, threads, self.verbose);
                let out = self.invoke(&guess)?;
                self.events.info(&format!(
                    "Guess attempt finished in {}.",
                    format_duration(out.elapsed)
                ));
                if let Some(password) = parse_found(&out.stdout) {
                    self.events.success(&format!(
                        "SUCCESS! Hash: {}, Password: {}",
                        hash, password
                    ));
                    records.push(SolvedRecord {
                        hash: hash.clone(),
                        password,
                        length: Some(length),
                    });
                    newly_solved.insert(hash.clone());
                }
            }

            // EVALUATE
            if newly_solved.is_empty() {
                self.events
                    .info("No new passwords found in this attempt. Regenerating table...");
            } else {
                unsolved.retain(|h| !newly_solved.contains(h));
            }
            if unsolved.is_empty() {
                break;
            }
            if let Some(reason) = self.limit_reached(iterations, started.elapsed()) {
                self.events.error(&format!(
                    "Stopping after {} attempt(s) with {} hash(es) of length {} unsolved.",
                    iterations,
                    unsolved.len(),
                    length
                ));
                stop = reason;
                break;
            }
        }
        drop(table);

        Ok(CrackReport {
            records,
            unsolved,
            iterations,
            stop,
            elapsed: started.elapsed(),
        })
    }

    fn limit_reached(&self, iterations: u32, elapsed: Duration) -> Option<StopReason> {
        if let Some(max) = self.limits.max_iterations {
            if iterations >= max {
                return Some(StopReason::IterationLimit(max));
            }
        }
        if let Some(budget) = self.limits.time_budget {
            if elapsed >= budget {
                return Some(StopReason::TimeBudget(budget));
            }
        }
        None
    }

    /// Run one tool invocation, surfacing its output as diagnostics.
    fn invoke(&mut self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.events
            .info(&format!("Running: {}", self.runner.describe(invocation)));
        let out = self.runner.run(invocation)?;
        let stdout = out.stdout.trim();
        if !stdout.is_empty() {
            self.events.info(&format!("STDOUT:\n---\n{}\n---", stdout));
        }
        let stderr = out.stderr.trim();
        if !stderr.is_empty() {
            self.events.error(&format!("STDERR:\n---\n{}\n---", stderr));
        }
        if !out.success() {
            let status = out
                .status
                .map_or_else(|| "a signal".to_string(), |c| format!("status {}", c));
            self.events
                .error(&format!("Tool exited with {}.", status));
        }
        Ok(out)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;
    use crate::config::SizeTable;
    use crate::events::{Level, MemorySink};
    use std::num::NonZeroU32;
    use tempfile::tempdir;

    fn target(hashes: &[&str], length: u32) -> CampaignTarget {
        CampaignTarget::new(
            hashes.iter().map(|h| HashDigest::parse(h).unwrap()),
            PasswordLength::new(length).unwrap(),
            &SizeTable::default(),
            NonZeroU32::MIN,
        )
        .unwrap()
    }

    #[test]
    fn converges_in_one_iteration_when_everything_is_found() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 1), ("bb", 1), ("cc", 1)]);
        let sink = MemorySink::new();
        let report = CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["aa", "bb", "cc"], 4))
            .unwrap();

        assert_eq!(report.iterations, 1);
        assert_eq!(report.stop, StopReason::Converged);
        assert!(report.is_complete());
        let solved = report.solved();
        assert_eq!(solved.len(), 3);
        assert_eq!(solved[&HashDigest::parse("bb").unwrap()], "pw-bb");
        assert_eq!(runner.builds, 1);
        assert_eq!(runner.built_lengths, vec![4]);
        assert_eq!(sink.count(Level::Success, "SUCCESS! Hash:"), 3);
    }

    #[test]
    fn partial_progress_rebuilds_until_all_solved() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 1), ("bb", 2), ("cc", 3)]);
        let sink = MemorySink::new();
        let report = CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["aa", "bb", "cc"], 5))
            .unwrap();

        assert_eq!(runner.builds, 3);
        assert_eq!(report.iterations, 3);
        assert_eq!(report.solved().len(), 3);
        let order: Vec<&str> = report.records.iter().map(|r| r.hash.as_str()).collect();
        assert_eq!(order, vec!["aa", "bb", "cc"]);
        assert!(report.records.iter().all(|r| r.length.map(|l| l.get()) == Some(5)));
        // The working set only ever shrinks: 3, then 2, then 1 guesses.
        let per_attempt: Vec<usize> = (1..=3)
            .map(|n| runner.guesses.iter().filter(|(a, _)| *a == n).count())
            .collect();
        assert_eq!(per_attempt, vec![3, 2, 1]);
        assert!(!sink.contains(Level::Info, "No new passwords"));
    }

    #[test]
    fn guesses_follow_target_order_each_attempt() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("cc", 1), ("aa", 2), ("bb", 2)]);
        let sink = MemorySink::new();
        CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["cc", "aa", "bb"], 4))
            .unwrap();
        let calls: Vec<(u32, &str)> = runner
            .guesses
            .iter()
            .map(|(a, h)| (*a, h.as_str()))
            .collect();
        assert_eq!(
            calls,
            vec![(1, "cc"), (1, "aa"), (1, "bb"), (2, "aa"), (2, "bb")]
        );
    }

    #[test]
    fn no_progress_attempt_is_reported_and_retried() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 3)]);
        let sink = MemorySink::new();
        let report = CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["aa"], 4))
            .unwrap();
        assert_eq!(report.iterations, 3);
        assert_eq!(
            sink.count(Level::Info, "No new passwords found in this attempt"),
            2
        );
        assert_eq!(sink.count(Level::Info, "[Attempt #"), 3);
    }

    #[test]
    fn session_table_exists_while_guessing_and_is_removed_after() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 1), ("bb", 2)]);
        let sink = MemorySink::new();
        CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["aa", "bb"], 6))
            .unwrap();
        assert_eq!(runner.table_present_on_guess, vec![true, true, true]);
        let table = session_table_path(dir.path(), PasswordLength::new(6).unwrap());
        assert!(!table.exists());
    }

    #[test]
    fn iteration_limit_stops_with_partial_result() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 1)]);
        let sink = MemorySink::new();
        let report = CrackEngine::new(&mut runner, &sink, dir.path())
            .with_limits(CrackLimits {
                max_iterations: Some(3),
                time_budget: None,
            })
            .crack(&target(&["aa", "zz"], 4))
            .unwrap();
        assert_eq!(report.stop, StopReason::IterationLimit(3));
        assert_eq!(report.iterations, 3);
        assert_eq!(runner.builds, 3);
        assert_eq!(report.unsolved, vec![HashDigest::parse("zz").unwrap()]);
        assert_eq!(report.records.len(), 1);
        assert!(sink.contains(Level::Error, "Stopping after 3 attempt(s)"));
        let table = session_table_path(dir.path(), PasswordLength::new(4).unwrap());
        assert!(!table.exists());
    }

    #[test]
    fn exhausted_time_budget_stops_after_first_attempt() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::default();
        let sink = MemorySink::new();
        let report = CrackEngine::new(&mut runner, &sink, dir.path())
            .with_limits(CrackLimits {
                max_iterations: None,
                time_budget: Some(Duration::ZERO),
            })
            .crack(&target(&["aa"], 4))
            .unwrap();
        assert_eq!(report.stop, StopReason::TimeBudget(Duration::ZERO));
        assert_eq!(report.iterations, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn nonzero_exit_and_stderr_are_diagnostics_only() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 1)]);
        runner.exit_code = 1;
        runner.stderr = "warning: low memory\n".to_string();
        let sink = MemorySink::new();
        let report = CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["aa"], 4))
            .unwrap();
        assert!(report.is_complete());
        assert!(sink.contains(Level::Error, "warning: low memory"));
        assert!(sink.contains(Level::Error, "Tool exited with status 1."));
    }

    #[test]
    fn launch_failure_is_fatal_and_cleans_up_table() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::default();
        // Build succeeds, first guess cannot be launched.
        runner.fail_launch_at = Some(2);
        let sink = MemorySink::new();
        let err = CrackEngine::new(&mut runner, &sink, dir.path())
            .crack(&target(&["aa"], 4))
            .unwrap_err();
        assert!(matches!(err, EngineError::Tool(ToolError::Launch { .. })));
        let table = session_table_path(dir.path(), PasswordLength::new(4).unwrap());
        assert!(!table.exists());
    }

    #[test]
    fn verbose_flag_reaches_tool_command_line() {
        let dir = tempdir().unwrap();
        let mut runner = ScriptedRunner::finding(&[("aa", 1)]);
        let sink = MemorySink::new();
        CrackEngine::new(&mut runner, &sink, dir.path())
            .verbose(true)
            .crack(&target(&["aa"], 4))
            .unwrap();
        assert!(sink.contains(Level::Info, "Running: 4 65536"));
        assert!(sink.contains(Level::Info, "--verbose"));
    }
}
