//! End-to-end CLI exercises: append → scan → checkpoint → resume, and a
//! query-facade read, each driven through the `es-store` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_signal_fixture(dir: &Path, name: &str, id: &str, ts: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let body = format!(
        r#"{{"signal_id":"{id}","timestamp":"{ts}","source":"route.worker","payload_type":"RouteInput","payload":{{}},"entity_refs":[],"schema_version":"0.1"}}"#
    );
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn append_then_scan_round_trips() {
    let workspace = tempfile::tempdir().unwrap();
    let fixtures = tempfile::tempdir().unwrap();
    let sig_path = write_signal_fixture(fixtures.path(), "s1.json", "s-1", "2026-02-05T10:00:00Z");

    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args(["append-signal", "--file"])
        .arg(&sig_path)
        .assert()
        .success();

    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args([
            "scan-signals",
            "--start",
            "2026-02-05T00:00:00Z",
            "--end",
            "2026-02-05T23:59:59Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signal_id\":\"s-1\""));
}

#[test]
fn duplicate_raise_fails_second_append() {
    let workspace = tempfile::tempdir().unwrap();
    let fixtures = tempfile::tempdir().unwrap();
    let sig_path = write_signal_fixture(fixtures.path(), "s1.json", "s-dup", "2026-02-05T10:00:00Z");

    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args(["append-signal", "--file"])
        .arg(&sig_path)
        .assert()
        .success();

    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args(["append-signal", "--file"])
        .arg(&sig_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate"));
}

#[test]
fn checkpoint_then_resume_skips_seen_ids() {
    let workspace = tempfile::tempdir().unwrap();
    let fixtures = tempfile::tempdir().unwrap();

    for (name, id, ts) in [
        ("s1.json", "s-c1", "2026-02-05T10:00:00Z"),
        ("s2.json", "s-c2", "2026-02-05T10:01:00Z"),
    ] {
        let path = write_signal_fixture(fixtures.path(), name, id, ts);
        Command::cargo_bin("es-store")
            .unwrap()
            .args(["--workspace"])
            .arg(workspace.path())
            .args(["append-signal", "--file"])
            .arg(&path)
            .assert()
            .success();
    }

    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args([
            "checkpoint",
            "--name",
            "worker-a",
            "--start",
            "2026-02-05T00:00:00Z",
            "--end",
            "2026-02-05T10:01:30Z",
        ])
        .assert()
        .success();

    let s3 = write_signal_fixture(fixtures.path(), "s3.json", "s-c3", "2026-02-05T10:02:00Z");
    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args(["append-signal", "--file"])
        .arg(&s3)
        .assert()
        .success();

    Command::cargo_bin("es-store")
        .unwrap()
        .args(["--workspace"])
        .arg(workspace.path())
        .args([
            "resume",
            "--name",
            "worker-a",
            "--end",
            "2026-02-05T23:59:59Z",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"signal_id\":\"s-c3\"")
                .and(predicate::str::contains("s-c1").not())
                .and(predicate::str::contains("s-c2").not()),
        );
}
