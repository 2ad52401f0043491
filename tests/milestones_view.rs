use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rapotd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rapotd");
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
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
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
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

const RECEIPT: &str = "data:image/png;base64,iVBORw0KGgo=";

fn verified_package(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    student: &str,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        "pkg-create",
        "payments.create",
        json!({
            "studentName": student,
            "subject": "Math",
            "level": "SD 5",
            "room": "Room A",
            "amount": 450000,
            "date": "2025-01-05",
            "receiptData": RECEIPT,
        }),
    );
    let id = created["payment"]["id"]
        .as_str()
        .expect("payment id")
        .to_string();
    request_ok(stdin, reader, "pkg-verify", "payments.verify", json!({ "id": id }));
    id
}

fn log_sessions(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    package_id: &str,
    student: &str,
    count: i64,
) {
    for n in 1..=count {
        request_ok(
            stdin,
            reader,
            &format!("claim-{}", n),
            "sessions.claimNext",
            json!({
                "packageId": package_id,
                "studentName": student,
                "sessionNumber": n,
                "date": format!("2025-01-{:02}", n + 5),
            }),
        );
    }
}

#[test]
fn milestone_grid_tracks_the_requested_period() {
    let workspace = temp_dir("rapotd-milestones");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Before a workspace is open the ledger is not loaded yet.
    let loading = request_ok(
        &mut stdin,
        &mut reader,
        "0",
        "milestones.view",
        json!({ "packageId": "p", "studentName": "Budi", "periode": 1 }),
    );
    assert_eq!(loading, json!({ "state": "loading" }));

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let package_id = verified_package(&mut stdin, &mut reader, "Budi");
    log_sessions(&mut stdin, &mut reader, &package_id, "Budi", 8);

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "milestones.view",
        json!({ "packageId": package_id, "studentName": "Budi", "periode": 1 }),
    );
    assert_eq!(first["state"], "ready");
    assert_eq!(first["completed"], 6);

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "milestones.view",
        json!({ "packageId": package_id, "studentName": "budi", "periode": 2 }),
    );
    assert_eq!(second["completed"], 2);
    let slots = second["slots"].as_array().expect("slots");
    assert_eq!(slots.len(), 6);
    assert_eq!(slots[0]["sessionNumber"], 7);
    assert_eq!(slots[0]["done"], true);
    assert_eq!(slots[0]["date"], "2025-01-12");
    assert_eq!(slots[0]["teacherName"], "Self Study");
    assert_eq!(slots[2]["sessionNumber"], 9);
    assert_eq!(slots[2]["done"], false);
    assert!(slots[2]["date"].is_null());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn out_of_range_periode_is_refused_and_sidecar_keeps_answering() {
    let workspace = temp_dir("rapotd-milestones-range");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let package_id = verified_package(&mut stdin, &mut reader, "Budi");

    for (i, periode) in [0_i64, 11, i64::MAX, i64::MIN].into_iter().enumerate() {
        let view = request(
            &mut stdin,
            &mut reader,
            &format!("view-{}", i),
            "milestones.view",
            json!({ "packageId": package_id, "studentName": "Budi", "periode": periode }),
        );
        assert_eq!(error_code(&view), "bad_params", "periode {}", periode);
    }

    let draft = request(
        &mut stdin,
        &mut reader,
        "2",
        "inbox.updateDraft",
        json!({ "teacherId": "t1", "periode": i64::MAX }),
    );
    assert_eq!(error_code(&draft), "bad_params");

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert!(health.get("version").is_some());

    let last = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "milestones.view",
        json!({ "packageId": package_id, "studentName": "Budi", "periode": 10 }),
    );
    assert_eq!(last["slots"][5]["sessionNumber"], 60);

    drop(stdin);
    let _ = child.wait();
}
