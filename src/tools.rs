//! Boundary with the two external programs: the Table Builder and the
//! Guesser.
//!
//! The engine describes what it wants as an [`Invocation`] and hands it to a
//! [`ToolRunner`]. [`ProcessRunner`] turns invocations into blocking child
//! processes; tests substitute scripted runners.
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::config::ToolSettings;
use crate::digest::{HashDigest, PasswordLength};

/// Marker the Guesser prints on success, followed by `: <password>`.
pub const FOUND_MARKER: &str = "Password found";

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to launch {}: {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    BuildTable {
        length: PasswordLength,
        chains: u64,
        table: PathBuf,
    },
    Guess {
        table: PathBuf,
        hash: HashDigest,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub request: ToolRequest,
    pub threads: NonZeroU32,
    pub verbose: bool,
}

impl Invocation {
    pub fn build_table(
        length: PasswordLength,
        chains: u64,
        table: &Path,
        threads: NonZeroU32,
        verbose: bool,
    ) -> Self {
        Self {
            request: ToolRequest::BuildTable {
                length,
                chains,
                table: table.to_path_buf(),
            },
            threads,
            verbose,
        }
    }

    pub fn guess(table: &Path, hash: &HashDigest, threads: NonZeroU32, verbose: bool) -> Self {
        Self {
            request: ToolRequest::Guess {
                table: table.to_path_buf(),
                hash: hash.clone(),
            },
            threads,
            verbose,
        }
    }

    /// Positional arguments followed by `--threads N` (omitted for one
    /// thread) and `--verbose`.
    pub fn args(&self) -> Vec<String> {
        let mut args = match &self.request {
            ToolRequest::BuildTable {
                length,
                chains,
                table,
            } => vec![
                length.to_string(),
                chains.to_string(),
                table.display().to_string(),
            ],
            ToolRequest::Guess { table, hash } => {
                vec![table.display().to_string(), hash.to_string()]
            }
        };
        if self.threads.get() != 1 {
            args.push("--threads".to_string());
            args.push(self.threads.to_string());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }

    pub fn program<'a>(&self, tools: &'a ToolSettings) -> &'a Path {
        match self.request {
            ToolRequest::BuildTable { .. } => &tools.table_bin,
            ToolRequest::Guess { .. } => &tools.guess_bin,
        }
    }
}

/// What came back from a finished tool process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait ToolRunner {
    /// Run one invocation to completion. Only a failure to launch is an
    /// error; non-zero exits are reported through [`ToolOutput::status`].
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput, ToolError>;

    /// Command line as it would be shown to the operator.
    fn describe(&self, invocation: &Invocation) -> String {
        invocation.args().join(" ")
    }
}

impl<T: ToolRunner + ?Sized> ToolRunner for &mut T {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        (**self).run(invocation)
    }

    fn describe(&self, invocation: &Invocation) -> String {
        (**self).describe(invocation)
    }
}

/// Runs the real executables as blocking child processes with captured
/// output. No timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tools: ToolSettings,
}

impl ProcessRunner {
    pub fn new(tools: ToolSettings) -> Self {
        Self { tools }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program(&self.tools);
        let start = Instant::now();
        let output = Command::new(program)
            .args(invocation.args())
            .output()
            .map_err(|source| ToolError::Launch {
                program: program.to_path_buf(),
                source,
            })?;
        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed: start.elapsed(),
        })
    }

    fn describe(&self, invocation: &Invocation) -> String {
        let mut parts = vec![invocation.program(&self.tools).display().to_string()];
        parts.extend(invocation.args());
        parts.join(" ")
    }
}

/// Extract the recovered password from Guesser output.
///
/// Grammar: `Password found: <token>` with exactly one space after the colon
/// and `<token>` a non-empty run of non-whitespace characters. The first
/// occurrence carrying a token wins. Anything else means "not found".
pub fn parse_found(stdout: &str) -> Option<String> {
    if !stdout.contains(FOUND_MARKER) {
        return None;
    }
    let prefix = format!("{FOUND_MARKER}: ");
    stdout.match_indices(&prefix).find_map(|(idx, _)| {
        let rest = &stdout[idx + prefix.len()..];
        let token: &str = rest
            .split(char::is_whitespace)
            .next()
            .unwrap_or_default();
        (!token.is_empty()).then(|| token.to_string())
    })
}
