//! Integration tests for the stdio protocol.
//!
//! These tests run the built binary with piped stdin and stdout.

use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// Run the server over `lines` with extra environment variables.
fn run_server(lines: &[Value], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sgmock-server"));
    command
        .env_remove("SGMOCK_SNAPSHOT")
        .env_remove("SGMOCK_DUMP")
        .env_remove("SGMOCK_BASE_URL")
        .env_remove("SGMOCK_PRETTY_DUMP")
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (name, value) in env {
        command.env(name, value);
    }

    let mut child = command.spawn().expect("server starts");
    {
        let mut stdin = child.stdin.take().expect("stdin is piped");
        for line in lines {
            writeln!(stdin, "{line}").expect("write request");
        }
    }
    child.wait_with_output().expect("server exits")
}

fn responses(output: &Output) -> Vec<Value> {
    assert!(output.status.success(), "server failed: {output:?}");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("response is JSON"))
        .collect()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sgmock-{}-{name}.json", std::process::id()))
}

#[test]
fn test_round_trip_over_stdio() {
    let output = run_server(
        &[
            json!({"method": "create", "entity_type": "Shot", "data": {"code": "001"}, "request_id": "1"}),
            json!({"method": "find", "entity_type": "Shot", "filters": [["code", "is", "001"]], "fields": ["code"], "request_id": "2"}),
            json!({"method": "find", "entity_type": "Shot", "filters": [["code", "is", "002"]], "request_id": "3"}),
        ],
        &[],
    );
    let responses = responses(&output);
    assert_eq!(responses.len(), 3);
    assert_eq!(
        responses[0],
        json!({"status": "ok", "result": {"type": "Shot", "id": 1, "code": "001"}, "request_id": "1"})
    );
    assert_eq!(responses[1]["result"], json!([{"type": "Shot", "id": 1, "code": "001"}]));
    assert_eq!(responses[2]["result"], json!([]));
}

#[test]
fn test_errors_do_not_stop_the_loop() {
    let mut stdin_lines = vec![json!("not an object")];
    stdin_lines.push(json!({"method": "find", "entity_type": "Shot", "filters": [["code", "near", 1]]}));
    stdin_lines.push(json!({"method": "info"}));

    let output = run_server(&stdin_lines, &[("SGMOCK_BASE_URL", "http://mock.test")]);
    let responses = responses(&output);
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["status"], json!("error"));
    assert_eq!(responses[0]["kind"], json!("protocol"));
    assert_eq!(responses[1]["kind"], json!("configuration"));
    assert_eq!(responses[2]["result"]["base_url"], json!("http://mock.test"));
}

#[test]
fn test_snapshot_in_and_dump_out() {
    let snapshot = temp_path("snapshot");
    let dump = temp_path("dump");
    std::fs::write(
        &snapshot,
        json!({"Shot": {"4": {"type": "Shot", "id": 4, "code": "040", "created_at": "2024-01-02T03:04:05Z"}}})
            .to_string(),
    )
    .unwrap();

    let output = run_server(
        &[
            json!({"method": "find", "entity_type": "Shot", "filters": [["created_at", "starts_with", "2024-01-02"]], "fields": ["code"]}),
            json!({"method": "create", "entity_type": "Shot", "data": {"code": "050"}}),
        ],
        &[
            ("SGMOCK_SNAPSHOT", snapshot.to_str().unwrap()),
            ("SGMOCK_DUMP", dump.to_str().unwrap()),
        ],
    );
    let responses = responses(&output);
    assert_eq!(responses[0]["result"], json!([{"type": "Shot", "id": 4, "code": "040"}]));
    assert_eq!(responses[1]["result"]["id"], json!(5));

    let dumped: Value = serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(dumped["Shot"]["4"]["created_at"], json!("2024-01-02T03:04:05Z"));
    assert_eq!(dumped["Shot"]["5"]["code"], json!("050"));

    let _ = std::fs::remove_file(snapshot);
    let _ = std::fs::remove_file(dump);
}
