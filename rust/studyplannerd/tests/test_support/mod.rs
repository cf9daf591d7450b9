#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
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

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_studyplannerd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn studyplannerd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn read_line(reader: &mut BufReader<ChildStdout>) -> serde_json::Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

pub fn request(
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

    let value = read_line(reader);
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
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
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Sends a request expected to fail and returns the error code.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn lesson(module: &str, title: &str, duration: u32, weight: f64) -> serde_json::Value {
    json!({ "module": module, "title": title, "durationMin": duration, "weight": weight })
}

pub fn key(module: &str, title: &str) -> serde_json::Value {
    json!({ "module": module, "title": title })
}

/// Titles of a container in a view, in order.
pub fn titles(lessons: &serde_json::Value) -> Vec<String> {
    lessons
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|l| l.get("title").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn week_titles(view: &serde_json::Value, week: u64) -> Vec<String> {
    view["weeks"]
        .as_array()
        .and_then(|weeks| weeks.iter().find(|w| w["week"].as_u64() == Some(week)))
        .map(|w| titles(&w["lessons"]))
        .unwrap_or_default()
}

/// Two weeks and a three-lesson pool, as the scheduling service sends it.
pub fn sample_schedule() -> serde_json::Value {
    json!({
        "weeks": [
            { "week": 1, "lessons": [
                lesson("Algebra", "Linear equations", 40, 5.0),
                lesson("Algebra", "Quadratics", 50, 4.0)
            ]},
            { "week": 2, "lessons": [
                lesson("Geometry", "Triangles", 30, 3.0)
            ]},
            { "week": "remaining", "lessons": [
                lesson("Geometry", "Circles", 45, 2.0),
                lesson("Álgebra", "Funções", 20, 6.0),
                lesson("Statistics", "Mean and median", 25, 1.0)
            ]}
        ],
        "summary": { "totalMinutes": 120, "minutesPerWeek": [90, 30] },
        "params": { "minMinutesPerWeek": 60, "maxMinutesPerWeek": 120 }
    })
}

/// Opens a session and loads `schedule`; returns the session id and the loaded view.
pub fn open_loaded(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    schedule: serde_json::Value,
) -> (String, serde_json::Value) {
    let opened = request_ok(stdin, reader, "open", "session.open", json!({}));
    let session_id = opened["sessionId"].as_str().expect("sessionId").to_string();
    let loaded = request_ok(
        stdin,
        reader,
        "load",
        "session.load",
        json!({ "sessionId": session_id, "schedule": schedule }),
    );
    (session_id, loaded["view"].clone())
}
