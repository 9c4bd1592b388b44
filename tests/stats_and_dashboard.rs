use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_coursedeskd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn coursedeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn sum_counts(counts: &serde_json::Value) -> u64 {
    counts
        .as_object()
        .map(|m| m.values().filter_map(|v| v.as_u64()).sum())
        .unwrap_or(0)
}

#[test]
fn platform_counts_come_from_the_stats_endpoint_not_the_page() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.connect",
        json!({ "transport": "mock", "seed": "sample" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "console.open",
        json!({ "kind": "students" }),
    );

    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "stats.get",
        json!({ "kind": "students" }),
    );

    // Authoritative numbers cover all 25 students even though the console
    // only holds a 10-row page.
    assert_eq!(stats["platform"]["total"], 25);
    assert_eq!(sum_counts(&stats["platform"]["byStatus"]), 25);
    assert_eq!(sum_counts(&stats["visiblePage"]), 10);
}

#[test]
fn stats_without_an_open_console_skip_visible_counts() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.connect",
        json!({ "transport": "mock", "seed": "sample" }),
    );

    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "stats.get",
        json!({ "kind": "courses" }),
    );
    assert_eq!(stats["platform"]["total"], 12);
    assert!(stats["visiblePage"].is_null());
}

#[test]
fn dashboard_overview_aggregates_the_per_kind_endpoints() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.connect",
        json!({ "transport": "mock", "seed": "sample" }),
    );

    let overview = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "dashboard.overview",
        json!({}),
    );

    assert_eq!(overview["kinds"]["students"]["total"], 25);
    assert_eq!(overview["kinds"]["instructors"]["total"], 8);
    assert_eq!(overview["kinds"]["courses"]["total"], 12);
    assert_eq!(overview["totals"]["records"], 45);

    // Platform revenue is the course catalog's number.
    let course_revenue = overview["kinds"]["courses"]["revenue"]
        .as_f64()
        .unwrap_or(0.0);
    let total_revenue = overview["totals"]["revenue"].as_f64().unwrap_or(-1.0);
    assert!(course_revenue > 0.0);
    assert!((total_revenue - course_revenue).abs() < 1e-9);
}

#[test]
fn stats_fetch_failure_is_surfaced_not_fabricated() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.connect",
        json!({ "transport": "mock", "seed": "sample" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "mock.configure",
        json!({ "failNext": ["getStats"] }),
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "stats.get",
        json!({ "kind": "students" }),
    );
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "remote_failed");
}
