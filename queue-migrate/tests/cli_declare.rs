use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::tempdir;

fn path_as_str(path: &Path) -> &str {
    path.to_str().expect("path should be valid utf-8")
}

fn queue_migrate() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("queue-migrate"));
    cmd.env("NO_COLOR", "1")
        .env_remove("RABBITMQ_HOST")
        .env_remove("RABBITMQ_TIMEOUT_SECS")
        .env_remove("QUEUE_MIGRATE_LOG");
    cmd
}

fn write_queues(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("queues.json");
    fs::write(
        &path,
        r#"[
  {"name": "orders", "vhost": "/", "type": "classic",
   "arguments": {"x-max-priority": 10, "x-message-ttl": 60000, "x-custom": "keep"}},
  {"name": "acb", "vhost": "%2f", "type": "quorum", "arguments": {}},
  {"name": "y", "vhost": "/", "type": "classic", "exclusive": true, "arguments": {}}
]"#,
    )
    .expect("write");
    path
}

fn dry_run(args: &[&str], input: &Path) -> Value {
    let output = queue_migrate()
        .arg("declare")
        .args(args)
        .arg("--dry-run")
        .arg("--input")
        .arg(path_as_str(input))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("json")
}

#[test]
fn dry_run_quorum_drops_flagged_arguments_and_adds_defaults() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    let request = dry_run(&["--queue", "orders", "--to", "quorum"], &input);
    assert_eq!(request["vhost"], "/");
    assert_eq!(request["name"], "orders-quorum");
    assert_eq!(
        request["body"],
        json!({
            "durable": true,
            "auto_delete": false,
            "arguments": {
                "x-custom": "keep",
                "x-message-ttl": 60000,
                "x-queue-leader-locator": "client-local",
                "x-queue-type": "quorum",
                "x-quorum-initial-group-size": 3
            }
        })
    );
}

#[test]
fn dry_run_stream_uses_custom_name() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    let request = dry_run(
        &["--queue", "orders", "--to", "stream", "--as", "orders.log"],
        &input,
    );
    assert_eq!(request["name"], "orders.log");
    let arguments = &request["body"]["arguments"];
    assert_eq!(arguments["x-queue-type"], "stream");
    assert_eq!(arguments["x-max-age"], "1D");
    assert!(arguments.get("x-message-ttl").is_none());
    assert!(arguments.get("x-max-priority").is_none());
}

#[test]
fn declare_prints_target_warnings() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    queue_migrate()
        .args(["declare", "--queue", "orders", "--to", "quorum", "--dry-run"])
        .arg("--input")
        .arg(path_as_str(&input))
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: Setting 'x-max-priority'"))
        .stderr(predicate::str::contains("Argument 'x-custom' is not recognized"));
}

#[test]
fn declare_refuses_blocked_target_without_force() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    queue_migrate()
        .args(["declare", "--queue", "y", "--to", "quorum", "--dry-run"])
        .arg("--input")
        .arg(path_as_str(&input))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is blocked"))
        .stderr(predicate::str::contains("--force"));

    let request = dry_run(&["--queue", "y", "--to", "quorum", "--force"], &input);
    assert_eq!(request["body"]["durable"], true);
}

#[test]
fn declare_refuses_same_type() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    queue_migrate()
        .args(["declare", "--queue", "acb", "--vhost", "%2f", "--to", "quorum"])
        .arg("--input")
        .arg(path_as_str(&input))
        .assert()
        .failure()
        .stderr(predicate::str::contains("already a quorum queue"));
}

#[test]
fn declare_refuses_reusing_source_name() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    queue_migrate()
        .args(["declare", "--queue", "acb", "--to", "stream", "--as", "acb"])
        .arg("--input")
        .arg(path_as_str(&input))
        .assert()
        .failure()
        .stderr(predicate::str::contains("must differ"));
}

#[test]
fn declare_reports_unreachable_broker() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    queue_migrate()
        .args(["--url", "http://127.0.0.1:1"])
        .args(["declare", "--queue", "acb", "--to", "stream"])
        .arg("--input")
        .arg(path_as_str(&input))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to declare queue 'acb-stream'"));
}

#[test]
fn dry_run_does_not_need_broker_settings() {
    let dir = tempdir().expect("tempdir");
    let input = write_queues(dir.path());

    queue_migrate()
        .env("RABBITMQ_HOST", "localhost:15672")
        .args(["declare", "--queue", "orders", "--to", "quorum", "--dry-run"])
        .arg("--input")
        .arg(path_as_str(&input))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"orders-quorum\""));
}
