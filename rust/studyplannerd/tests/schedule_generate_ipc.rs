mod test_support;

use serde_json::json;
use test_support::{lesson, request_err, request_ok, spawn_sidecar, temp_dir, titles, week_titles};

#[test]
fn generated_schedule_respects_the_weekly_budget_and_loads_into_a_session() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let generated = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "schedule.generate",
        json!({
            "weeks": 2,
            "minMinutesPerWeek": 60,
            "maxMinutesPerWeek": 100,
            "lessons": [
                lesson("M", "light", 30, 1.0),
                lesson("M", "heavy", 50, 9.0),
                lesson("M", "mid", 40, 5.0),
                lesson("M", "long", 80, 8.0),
                lesson("M", "heavy", 50, 9.0),
                "not a lesson"
            ]
        }),
    );
    let kinds: Vec<&str> = generated["warnings"]
        .as_array()
        .expect("warnings")
        .iter()
        .filter_map(|w| w["kind"].as_str())
        .collect();
    assert_eq!(kinds, vec!["malformedLesson", "duplicateLesson"]);

    let schedule = generated["schedule"].clone();
    assert_eq!(schedule["summary"]["minutesPerWeek"], json!([90, 80]));
    assert_eq!(schedule["params"]["maxMinutesPerWeek"], json!(100));

    let opened = request_ok(&mut stdin, &mut reader, "2", "session.open", json!({}));
    let sid = opened["sessionId"].as_str().expect("sessionId").to_string();
    let loaded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "session.load",
        json!({ "sessionId": sid, "schedule": schedule }),
    );
    assert_eq!(loaded["warnings"], json!([]));
    let view = &loaded["view"];
    assert_eq!(week_titles(view, 1), vec!["heavy", "mid"]);
    assert_eq!(week_titles(view, 2), vec!["long"]);
    assert_eq!(titles(&view["pool"]), vec!["light"]);
}

#[test]
fn generator_falls_back_to_workspace_defaults() {
    let workspace = temp_dir("studyplanner-generate-defaults");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "setup.update",
        json!({ "section": "generator", "patch": { "defaultWeeks": 3 } }),
    );

    let generated = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.generate",
        json!({ "lessons": [lesson("M", "only", 30, 4.0)] }),
    );
    let weeks = generated["schedule"]["weeks"].as_array().expect("weeks");
    // Three weeks plus the remaining pool entry.
    assert_eq!(weeks.len(), 4);
    assert_eq!(generated["schedule"]["params"]["minMinutesPerWeek"], json!(90));
    assert_eq!(generated["schedule"]["summary"]["minutesPerWeek"], json!([30, 0, 0]));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.generate",
        json!({ "lessons": [], "minMinutesPerWeek": 200, "maxMinutesPerWeek": 100 }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.generate",
        json!({ "lessons": "everything" }),
    );
    assert_eq!(code, "bad_params");

    // Out-of-range plans are refused and the daemon keeps serving.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "schedule.generate",
        json!({ "lessons": [], "weeks": 4294967295u64 }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "schedule.generate",
        json!({ "lessons": [], "weeks": 105 }),
    );
    assert_eq!(code, "bad_params");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "schedule.generate",
        json!({ "lessons": [], "maxMinutesPerWeek": 20000 }),
    );
    assert_eq!(code, "bad_params");
    let longest = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "schedule.generate",
        json!({ "lessons": [], "weeks": 104 }),
    );
    assert_eq!(
        longest["schedule"]["summary"]["minutesPerWeek"]
            .as_array()
            .map(|w| w.len()),
        Some(104)
    );
    let health = request_ok(&mut stdin, &mut reader, "10", "health", json!({}));
    assert_eq!(health["openSessions"], json!(0));

    let _ = std::fs::remove_dir_all(workspace);
}
