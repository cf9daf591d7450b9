mod test_support;

use serde_json::json;
use std::io::Write;
use test_support::{read_line, request, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("studyplanner-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(health["workspacePath"], json!(null));

    let methods = [
        ("workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("setup.get", json!({})),
        ("schedule.generate", json!({ "lessons": [] })),
        ("session.open", json!({})),
        ("session.view", json!({ "sessionId": "missing" })),
        ("session.filter", json!({ "sessionId": "missing" })),
        ("session.filter.reset", json!({ "sessionId": "missing" })),
        ("session.select.clear", json!({ "sessionId": "missing" })),
        ("session.submit", json!({ "sessionId": "missing" })),
        ("session.abandon", json!({ "sessionId": "missing" })),
        ("submissions.list", json!({})),
    ];
    for (i, (method, params)) in methods.into_iter().enumerate() {
        let resp = request(&mut stdin, &mut reader, &format!("m{}", i), method, params);
        if resp["ok"] == json!(false) {
            assert_ne!(
                resp["error"]["code"],
                json!("not_implemented"),
                "unexpected unknown method for {}",
                method
            );
        }
    }

    let code = request_err(&mut stdin, &mut reader, "2", "classes.list", json!({}));
    assert_eq!(code, "not_implemented");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.view",
        json!({ "sessionId": "missing" }),
    );
    assert_eq!(code, "session_not_found");

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let resp = read_line(&mut reader);
    assert_eq!(resp["ok"], json!(false));
    assert_eq!(resp["error"]["code"], json!("bad_json"));

    // Still serving after the bad line.
    let _ = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
