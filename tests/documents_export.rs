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

fn sent_report(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    package_id: &str,
    send: bool,
) -> String {
    let submitted = request_ok(
        stdin,
        reader,
        "doc-submit",
        "reports.submit",
        json!({ "packageId": package_id, "studentName": "Siti Aminah", "teacherId": "t1", "teacherName": "Bu Ani" }),
    );
    let id = submitted["report"]["id"].as_str().expect("id").to_string();
    request_ok(stdin, reader, "doc-accept", "reports.accept", json!({ "id": id, "teacherId": "t1" }));
    request_ok(
        stdin,
        reader,
        "doc-save",
        "reports.save",
        json!({
            "id": id,
            "teacherId": "t1",
            "topics": ["Reading", "Writing", "Listening", "Speaking", "Grammar", "Review"],
            "narrative": "Confident reader",
        }),
    );
    if send {
        request_ok(stdin, reader, "doc-send", "reports.send", json!({ "id": id, "teacherId": "t1" }));
    }
    id
}

fn read_entry(path: &std::path::Path, name: &str) -> String {
    use std::io::Read;
    let f = std::fs::File::open(path).expect("open export");
    let mut archive = zip::ZipArchive::new(f).expect("zip archive");
    let mut entry = archive.by_name(name).expect("zip entry");
    let mut out = String::new();
    entry.read_to_string(&mut out).expect("read entry");
    out
}

#[test]
fn teacher_export_writes_three_pages_with_manifest() {
    let workspace = temp_dir("rapotd-export-teacher");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let package_id = verified_package(&mut stdin, &mut reader, "Siti Aminah");
    log_sessions(&mut stdin, &mut reader, &package_id, "Siti Aminah", 6);
    let id = sent_report(&mut stdin, &mut reader, &package_id, false);

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "documents.exportReport",
        json!({ "id": id, "audience": "teacher", "teacherId": "t1" }),
    );
    let expected_name = format!("report-siti-aminah-{}.zip", id);
    assert_eq!(exported["fileName"], expected_name.as_str());
    assert_eq!(exported["pages"].as_array().expect("pages").len(), 3);
    assert_eq!(exported["skipped"], json!([]));
    assert_eq!(exported["progress"], json!([5, 20, 47, 75, 95, 100]));

    let path = workspace.join("exports").join(&expected_name);
    assert!(path.is_file());
    let manifest: serde_json::Value =
        serde_json::from_str(&read_entry(&path, "manifest.json")).expect("manifest json");
    assert_eq!(manifest["format"], "rapot-document-v1");
    assert_eq!(manifest["pages"][0]["orientation"], "landscape");
    assert_eq!(manifest["pages"][0]["widthPx"], 2246);
    assert_eq!(manifest["pages"][1]["orientation"], "portrait");
    assert_eq!(manifest["pages"][2]["templateId"], format!("milestone-{}", id).as_str());
    assert_eq!(manifest["pages"][0]["sha256"].as_str().expect("sha").len(), 64);

    let transcript = read_entry(&path, "pages/002.svg");
    assert!(transcript.contains("Session 1"));
    assert!(transcript.contains("Confident reader"));

    // The inbox is free again once the file is written.
    let state = request_ok(&mut stdin, &mut reader, "3", "inbox.state", json!({ "teacherId": "t1" }));
    assert_eq!(state["inbox"]["state"], "idle");

    // An open correction draft is not thrown away by an export.
    request_ok(&mut stdin, &mut reader, "4", "reports.edit", json!({ "id": id, "teacherId": "t1" }));
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "inbox.updateDraft",
        json!({ "teacherId": "t1", "narrative": "Reads fluently" }),
    );
    let blocked = request(
        &mut stdin,
        &mut reader,
        "6",
        "documents.exportReport",
        json!({ "id": id, "audience": "teacher", "teacherId": "t1" }),
    );
    assert_eq!(error_code(&blocked), "conflict");
    let state = request_ok(&mut stdin, &mut reader, "7", "inbox.state", json!({ "teacherId": "t1" }));
    assert_eq!(state["inbox"]["state"], "authoring");
    assert_eq!(state["inbox"]["draft"]["form"]["narrative"], "Reads fluently");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_export_needs_a_sent_report_and_uses_portrait_pages() {
    let workspace = temp_dir("rapotd-export-student");
    let out_dir = workspace.join("downloads");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let package_id = verified_package(&mut stdin, &mut reader, "Siti Aminah");
    log_sessions(&mut stdin, &mut reader, &package_id, "Siti Aminah", 6);
    let id = sent_report(&mut stdin, &mut reader, &package_id, false);

    let unsent = request(
        &mut stdin,
        &mut reader,
        "2",
        "documents.exportReport",
        json!({ "id": id, "audience": "student" }),
    );
    assert_eq!(error_code(&unsent), "not_permitted");

    request_ok(&mut stdin, &mut reader, "3", "reports.send", json!({ "id": id, "teacherId": "t1" }));
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "documents.exportReport",
        json!({ "id": id, "audience": "student", "outDir": out_dir.to_string_lossy() }),
    );
    let path = std::path::PathBuf::from(exported["path"].as_str().expect("path"));
    assert!(path.starts_with(&out_dir));
    let manifest: serde_json::Value =
        serde_json::from_str(&read_entry(&path, "manifest.json")).expect("manifest json");
    for page in manifest["pages"].as_array().expect("pages") {
        assert_eq!(page["orientation"], "portrait");
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn receipt_export_requires_verified_payment() {
    let workspace = temp_dir("rapotd-export-receipt");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let pending = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "payments.create",
        json!({
            "studentName": "Budi",
            "className": "Math",
            "amount": 450000,
            "date": "2025-01-05",
            "receiptData": RECEIPT,
        }),
    );
    let pending_id = pending["payment"]["id"].as_str().expect("id").to_string();
    let refused = request(
        &mut stdin,
        &mut reader,
        "3",
        "documents.exportReceipt",
        json!({ "paymentId": pending_id, "studentName": "Budi" }),
    );
    assert_eq!(error_code(&refused), "invalid_transition");

    request_ok(&mut stdin, &mut reader, "4", "payments.verify", json!({ "id": pending_id }));
    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "documents.exportReceipt",
        json!({ "paymentId": pending_id, "studentName": "Budi" }),
    );
    assert_eq!(exported["fileName"], format!("receipt-budi-{}.zip", pending_id).as_str());
    assert_eq!(exported["progress"], json!([5, 75, 95, 100]));
    let path = std::path::PathBuf::from(exported["path"].as_str().expect("path"));
    let page = read_entry(&path, "pages/001.svg");
    assert!(page.contains("Rp 450.000"));

    drop(stdin);
    let _ = child.wait();
}
