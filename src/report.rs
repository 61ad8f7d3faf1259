//! Human-readable report rendering for terminal output.
//!
//! Produces colored summaries of finished requests and of assignment
//! progress as recorded in the assignment store.
use colored::*;

use crate::campaign::{AssignmentOutcome, FileOutcome, SingleOutcome};
use crate::config::Assignment;
use crate::digest::PasswordLength;
use crate::engine::{CrackReport, StopReason};
use crate::events::format_duration;
use crate::store::ResultStore;

/// Remove ANSI escape sequences (`\x1b[ ... m`).
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn section_header(title: &str) -> String {
    let len = strip_ansi(title).chars().count();
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn pct(n: usize, d: usize) -> String {
    if d == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", (n as f64) / (d as f64) * 100.0)
}

fn stop_line(report: &CrackReport) -> String {
    match report.stop {
        StopReason::Converged => "all solved".green().to_string(),
        StopReason::IterationLimit(n) => format!("stopped at the {} attempt limit", n)
            .yellow()
            .to_string(),
        StopReason::TimeBudget(d) => format!("stopped at the {} time budget", format_duration(d))
            .yellow()
            .to_string(),
    }
}

fn push_run_lines(lines: &mut Vec<String>, report: &CrackReport) {
    lines.push(format!("Attempts: {}", report.iterations));
    lines.push(format!("Elapsed: {}", format_duration(report.elapsed)));
    lines.push(format!("Outcome: {}", stop_line(report)));
    for r in &report.records {
        lines.push(format!("  {}: {}", r.hash, r.password.red()));
    }
    for h in &report.unsolved {
        lines.push(format!("  {}: {}", h, "(Not cracked)".dimmed()));
    }
}

fn finish(out: &mut String, title: String, lines: Vec<String>) {
    out.push_str(&section_header(&title));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_single(outcome: &SingleOutcome) -> String {
    let mut out = String::new();
    let mut lines = Vec::new();
    match outcome.password() {
        Some(pw) => lines.push(format!(
            "{} {} (length {})",
            "Cracked".bold().green(),
            pw.red(),
            outcome.length
        )),
        None => lines.push(format!(
            "{} (length {})",
            "Not cracked".bold().yellow(),
            outcome.length
        )),
    }
    push_run_lines(&mut lines, &outcome.report);
    finish(&mut out, "Single Hash".bold().cyan().to_string(), lines);
    out
}

pub fn render_file(outcome: &FileOutcome) -> String {
    let mut out = String::new();
    let mut lines = vec![
        format!("Input: {}", outcome.input.display()),
        format!("Length: {}", outcome.length),
        format!("Hashes: {}", outcome.accepted),
        format!("Previously cracked: {}", outcome.already_solved),
    ];
    match &outcome.report {
        Some(report) => {
            lines.push(format!(
                "Newly cracked: {} ({})",
                report.records.len(),
                pct(report.records.len(), outcome.accepted)
            ));
            push_run_lines(&mut lines, report);
        }
        None => lines.push("(Nothing left to crack)".to_string()),
    }
    lines.push(format!(
        "Results: {} ({} appended)",
        outcome.store.display(),
        outcome.appended
    ));
    finish(&mut out, "Hashes From File".bold().cyan().to_string(), lines);
    out
}

pub fn render_assignment(outcome: &AssignmentOutcome) -> String {
    let mut out = String::new();
    let mut lines = vec![format!(
        "Previously cracked: {}",
        outcome.previously_solved
    )];
    for b in &outcome.buckets {
        lines.push(format!("{}", format!("{}-char", b.length).bold().blue()));
        match &b.report {
            None => lines.push(format!(
                "  {}/{} already solved, {}",
                b.already_solved,
                b.total,
                "skipped".dimmed()
            )),
            Some(report) => {
                let solved = b.already_solved + report.records.len();
                lines.push(format!(
                    "  Solved: {}/{} ({})",
                    solved,
                    b.total,
                    pct(solved, b.total)
                ));
                lines.push(format!(
                    "  Attempts: {}, elapsed {}, {}",
                    report.iterations,
                    format_duration(report.elapsed),
                    stop_line(report)
                ));
            }
        }
    }
    lines.push(format!("Results: {}", outcome.store.display()));
    finish(&mut out, "Full Assignment".bold().cyan().to_string(), lines);
    out
}

/// Per-bucket solved counts as recorded in the assignment store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketProgress {
    pub length: PasswordLength,
    pub total: usize,
    pub solved: usize,
}

pub fn assignment_progress(assignment: &Assignment, store: &ResultStore) -> Vec<BucketProgress> {
    assignment
        .buckets()
        .map(|(length, hashes)| BucketProgress {
            length,
            total: hashes.len(),
            solved: hashes.iter().filter(|h| store.contains(h)).count(),
        })
        .collect()
}

pub fn render_status(assignment: &Assignment, store: &ResultStore) -> String {
    let progress = assignment_progress(assignment, store);
    let mut out = String::new();
    let mut lines = Vec::new();
    let (mut solved, mut total) = (0, 0);
    for p in &progress {
        solved += p.solved;
        total += p.total;
        let line = format!(
            "  {}-char: {}/{} ({})",
            p.length,
            p.solved,
            p.total,
            pct(p.solved, p.total)
        );
        lines.push(if p.solved == p.total {
            line.green().to_string()
        } else {
            line
        });
    }
    lines.push(format!("Total: {}/{} ({})", solved, total, pct(solved, total)));
    lines.push(format!("Store: {}", store.path().display()));
    finish(&mut out, "Assignment Progress".bold().yellow().to_string(), lines);
    out
}
