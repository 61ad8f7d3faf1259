#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const H1: &str = "8846f7eaee8fb117ad06bdd830b7586c";
const H2: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
// First 4-char hash of the built-in assignment.
const ASSIGNMENT_H1: &str = "f8340c836d41f77cd92708bbd5443cbe";

struct Workspace {
    tmp: TempDir,
    table: PathBuf,
    guess: PathBuf,
}

impl Workspace {
    fn data(&self) -> PathBuf {
        self.tmp.path().join("data")
    }

    fn session(&self) -> PathBuf {
        self.tmp.path().join("session")
    }

    fn builds(&self) -> usize {
        fs::read_to_string(self.session().join("builds.log"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cryptocat").unwrap();
        cmd.arg("--data-dir")
            .arg(self.data())
            .arg("--session-dir")
            .arg(self.session())
            .arg("--table-bin")
            .arg(&self.table)
            .arg("--guess-bin")
            .arg(&self.guess);
        cmd
    }
}

fn script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Fake tools: the builder touches the table and logs each build; the
/// guesser solves every hash except those listed in `unsolvable`.
fn workspace(unsolvable: &[&str]) -> Workspace {
    let tmp = tempdir().unwrap();
    let bin = tmp.path().join("tools");
    fs::create_dir_all(&bin).unwrap();
    fs::create_dir_all(tmp.path().join("data")).unwrap();
    let table = bin.join("table");
    let guess = bin.join("guess");
    script(
        &table,
        r#"touch "$3"
echo "$1 $2" >> "$(dirname "$3")/builds.log"
echo "table ready""#,
    );
    let mut body = String::from("[ -f \"$1\" ] || { echo \"no table\" >&2; exit 1; }\n");
    for h in unsolvable {
        body.push_str(&format!(
            "[ \"$2\" = \"{h}\" ] && {{ echo \"Password not found\"; exit 0; }}\n"
        ));
    }
    body.push_str("echo \"Password found: pw-$2\"");
    script(&guess, &body);
    Workspace { tmp, table, guess }
}

#[test]
fn single_hash_is_cracked_and_table_removed() {
    let ws = workspace(&[]);
    ws.cmd()
        .args(["single", H1, "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("pw-{H1}")));
    assert_eq!(ws.builds(), 1);
    assert!(!ws.session().join("rainbow_l4_session.dat").exists());
}

#[test]
fn file_mode_appends_results_and_resumes() {
    let ws = workspace(&[]);
    fs::write(
        ws.data().join("hashes.txt"),
        format!("{H1}\nnot-a-hash\n{H2}\n{H1}\n"),
    )
    .unwrap();

    ws.cmd()
        .args(["file", "hashes.txt", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hashes: 2"));
    let store = fs::read_to_string(ws.data().join("cracked_hashes.txt")).unwrap();
    assert_eq!(store, format!("{H1} | pw-{H1}\n{H2} | pw-{H2}\n"));

    // Everything is already solved: no tool runs and nothing is appended.
    ws.cmd()
        .args(["file", "hashes.txt", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(Nothing left to crack)"));
    assert_eq!(ws.builds(), 1);
    let again = fs::read_to_string(ws.data().join("cracked_hashes.txt")).unwrap();
    assert_eq!(again, store);
}

#[test]
fn missing_input_file_is_rejected() {
    let ws = workspace(&[]);
    ws.cmd()
        .args(["file", "nope.txt", "4"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file not found"));
    assert_eq!(ws.builds(), 0);
}

#[test]
fn unmapped_length_is_rejected_without_side_effects() {
    let ws = workspace(&[]);
    ws.cmd()
        .args(["single", H1, "11"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no default size for length 11"));
    assert_eq!(ws.builds(), 0);
    assert!(!ws.data().join("assignment_cracked_passwords.txt").exists());
}

#[test]
fn size_override_maps_a_new_length() {
    let ws = workspace(&[]);
    ws.cmd()
        .args(["--size", "11=3", "single", H1, "11"])
        .assert()
        .success();
    let log = fs::read_to_string(ws.session().join("builds.log")).unwrap();
    assert_eq!(log, "11 8\n");
}

#[test]
fn missing_tools_exit_before_any_work() {
    let tmp = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("cryptocat").unwrap();
    cmd.arg("--data-dir")
        .arg(tmp.path())
        .arg("--table-bin")
        .arg(tmp.path().join("absent-table"))
        .arg("--guess-bin")
        .arg(tmp.path().join("absent-guess"))
        .args(["single", H1, "4"]);
    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("executable not found"));
}

#[test]
fn iteration_limit_stops_an_unsolvable_target() {
    let ws = workspace(&[H2]);
    ws.cmd()
        .args(["--max-iterations", "3", "single", H2, "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not cracked"))
        .stdout(predicate::str::contains("stopped at the 3 attempt limit"));
    assert_eq!(ws.builds(), 3);
}

#[test]
fn zero_iteration_limit_is_refused() {
    let ws = workspace(&[]);
    ws.cmd()
        .args(["--max-iterations", "0", "single", H1, "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-iterations"));
    assert_eq!(ws.builds(), 0);
}

#[test]
fn assignment_resumes_and_reports_status() {
    let ws = workspace(&[ASSIGNMENT_H1]);
    ws.cmd()
        .args(["--max-iterations", "2", "assignment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Full Assignment"));
    // Four-char bucket needs both attempts; the other four buckets one each.
    assert_eq!(ws.builds(), 6);
    let store = ws.data().join("assignment_cracked_passwords.txt");
    let content = fs::read_to_string(&store).unwrap();
    assert_eq!(content.lines().count(), 49);
    assert!(content.lines().all(|l| l.split(" | ").count() == 3));

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 49/50 (98.00%)"));

    // A second run only revisits the unfinished bucket.
    ws.cmd()
        .args(["--max-iterations", "1", "assignment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped"));
    assert_eq!(ws.builds(), 7);
}

#[test]
fn export_writes_csv_of_assignment_results() {
    let ws = workspace(&[]);
    fs::write(
        ws.data().join("assignment_cracked_passwords.txt"),
        format!("4 | {ASSIGNMENT_H1} | abcd\n"),
    )
    .unwrap();
    let out = ws.tmp.path().join("out");
    ws.cmd()
        .arg("export")
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 result(s)"));
    let files: Vec<_> = fs::read_dir(&out).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(files.len(), 1);
    let csv = fs::read_to_string(&files[0]).unwrap();
    assert_eq!(csv, format!("Length,Hash,Password\n4,{ASSIGNMENT_H1},abcd\n"));
}

#[test]
fn session_mode_survives_bad_requests() {
    let ws = workspace(&[]);
    ws.cmd()
        .arg("session")
        .write_stdin(format!(
            "bogus request\nsingle {H1} 11\n\nsingle {H1} 4\nexit\nsingle {H2} 4\n"
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("pw-{H1}")))
        .stdout(predicate::str::contains(format!("pw-{H2}")).not())
        .stderr(predicate::str::contains("unknown request"));
    assert_eq!(ws.builds(), 1);
}
