use crate::db;
use crate::ipc::error::{err, ok, session_err};
use crate::ipc::handlers::setup::editor_defaults;
use crate::ipc::helpers::{
    parse_key, parse_opt_string, required_index, required_week, session_id, session_mut,
};
use crate::ipc::types::{AppState, Request, SessionEntry};
use crate::schedule::{
    Ack, DurationDirection, DurationFilter, EditSession, FilterSpec, LessonKey, MoveOutcome,
    SortKey,
};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};
use uuid::Uuid;

fn view_json(req: &Request, session: &EditSession) -> JsonValue {
    match session.view() {
        Ok(view) => match serde_json::to_value(view) {
            Ok(v) => v,
            Err(e) => err(&req.id, "internal", e.to_string(), None),
        },
        Err(e) => session_err(&req.id, &e),
    }
}

fn respond_view(req: &Request, session: &EditSession, extra: Option<JsonValue>) -> JsonValue {
    let view = view_json(req, session);
    if view.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        return view;
    }
    let mut result = json!({ "view": view });
    if let Some(JsonValue::Object(extra)) = extra {
        for (k, v) in extra {
            result[k] = v;
        }
    }
    ok(&req.id, result)
}

fn move_result(outcome: MoveOutcome) -> JsonValue {
    json!({ "changed": outcome == MoveOutcome::Moved })
}

fn handle_open(state: &mut AppState, req: &Request) -> JsonValue {
    let schedule_id = match parse_opt_string(req.params.get("scheduleId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("scheduleId {}", m), None),
    };
    let email = match parse_opt_string(req.params.get("email")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("email {}", m), None),
    };
    let defaults = editor_defaults(state.db.as_ref());
    let session = EditSession::new(defaults.filter());
    let session_id = Uuid::new_v4().to_string();
    let state_name = session.state().as_str();
    state.sessions.insert(
        session_id.clone(),
        SessionEntry {
            session,
            schedule_id,
            email,
        },
    );
    info!(session = %session_id, "session opened");
    ok(
        &req.id,
        json!({ "sessionId": session_id, "state": state_name }),
    )
}

fn handle_load(state: &mut AppState, req: &Request) -> JsonValue {
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    let Some(schedule) = req.params.get("schedule") else {
        return err(&req.id, "bad_params", "missing schedule", None);
    };
    match entry.session.load(schedule) {
        Ok(warnings) => respond_view(
            req,
            &entry.session,
            Some(json!({ "warnings": warnings })),
        ),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_view(state: &mut AppState, req: &Request) -> JsonValue {
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    respond_view(req, &entry.session, None)
}

fn parse_filter(state: &AppState, req: &Request) -> Result<(String, FilterSpec), JsonValue> {
    let query = match req.params.get("query") {
        None | Some(JsonValue::Null) => String::new(),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| err(&req.id, "bad_params", "query must be string", None))?,
    };
    let module = parse_opt_string(req.params.get("module"))
        .map_err(|m| err(&req.id, "bad_params", format!("module {}", m), None))?;

    let defaults = editor_defaults(state.db.as_ref());
    let duration = match req.params.get("duration") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Object(obj)) => {
            let direction = match obj.get("direction") {
                None | Some(JsonValue::Null) => defaults.duration_direction,
                Some(v) => v.as_str().and_then(DurationDirection::parse).ok_or_else(|| {
                    err(
                        &req.id,
                        "bad_params",
                        "duration.direction must be moreThan or lessThan",
                        None,
                    )
                })?,
            };
            let minutes = match obj.get("minutes") {
                None | Some(JsonValue::Null) => defaults.duration_threshold_minutes,
                Some(v) => v
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| {
                        err(
                            &req.id,
                            "bad_params",
                            "duration.minutes must be a non-negative integer",
                            None,
                        )
                    })?,
            };
            Some(DurationFilter { direction, minutes })
        }
        Some(_) => {
            return Err(err(&req.id, "bad_params", "duration must be an object or null", None))
        }
    };

    let sort = match parse_opt_string(req.params.get("sort")) {
        Ok(None) => None,
        Ok(Some(s)) if s.eq_ignore_ascii_case("none") => None,
        Ok(Some(s)) => Some(SortKey::parse(&s).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "sort must be one of: weight, title, moduleOrder",
                None,
            )
        })?),
        Err(m) => return Err(err(&req.id, "bad_params", format!("sort {}", m), None)),
    };

    Ok((
        query,
        FilterSpec {
            module,
            duration,
            sort,
        },
    ))
}

fn handle_filter(state: &mut AppState, req: &Request) -> JsonValue {
    let (query, spec) = match parse_filter(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    if let Err(e) = entry.session.set_filter(query, spec) {
        return session_err(&req.id, &e);
    }
    respond_view(req, &entry.session, None)
}

fn handle_filter_reset(state: &mut AppState, req: &Request) -> JsonValue {
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    if let Err(e) = entry.session.reset_filter() {
        return session_err(&req.id, &e);
    }
    respond_view(req, &entry.session, None)
}

fn handle_select_toggle(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(raw) = req.params.get("lesson") else {
        return err(&req.id, "bad_params", "missing lesson", None);
    };
    let key = match parse_key(req, raw, "lesson") {
        Ok(k) => k,
        Err(e) => return e,
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    match entry.session.toggle_selection(&key) {
        Ok(selected) => ok(
            &req.id,
            json!({
                "selected": selected,
                "selection": entry.session.selection().keys(),
            }),
        ),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_select_clear(state: &mut AppState, req: &Request) -> JsonValue {
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    match entry.session.clear_selection() {
        Ok(()) => ok(&req.id, json!({ "selection": [] })),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_move_within_week(state: &mut AppState, req: &Request) -> JsonValue {
    let week = match required_week(req, "week") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let from = match required_index(req, "fromIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let to = match required_index(req, "toIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    match entry.session.move_within_week(week, from, to) {
        Ok(outcome) => respond_view(req, &entry.session, Some(move_result(outcome))),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_move_between_weeks(state: &mut AppState, req: &Request) -> JsonValue {
    let source_week = match required_week(req, "sourceWeek") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let source_index = match required_index(req, "sourceIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let dest_week = match required_week(req, "destWeek") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let dest_index = match required_index(req, "destIndex") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    match entry
        .session
        .move_between_weeks(source_week, source_index, dest_week, dest_index)
    {
        Ok(outcome) => respond_view(req, &entry.session, Some(move_result(outcome))),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_discard(state: &mut AppState, req: &Request) -> JsonValue {
    let week = match required_week(req, "week") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let index = match required_index(req, "index") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    match entry.session.discard_to_pool(week, index) {
        Ok(outcome) => respond_view(req, &entry.session, Some(move_result(outcome))),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_assign(state: &mut AppState, req: &Request) -> JsonValue {
    let week = match required_week(req, "week") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Without explicit keys the current selection is assigned.
    let keys: Option<Vec<LessonKey>> = match req.params.get("keys") {
        None | Some(JsonValue::Null) => None,
        Some(JsonValue::Array(items)) => {
            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                match parse_key(req, item, "keys[]") {
                    Ok(k) => keys.push(k),
                    Err(e) => return e,
                }
            }
            Some(keys)
        }
        Some(_) => return err(&req.id, "bad_params", "keys must be an array", None),
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    let result = match keys {
        Some(keys) => entry.session.assign_from_pool(&keys, week),
        None => entry.session.assign_selection(week),
    };
    match result {
        Ok(report) => respond_view(req, &entry.session, Some(json!({ "report": report }))),
        Err(e) => session_err(&req.id, &e),
    }
}

fn handle_submit(state: &mut AppState, req: &Request) -> JsonValue {
    let schedule_id = match parse_opt_string(req.params.get("scheduleId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("scheduleId {}", m), None),
    };
    let email = match parse_opt_string(req.params.get("email")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("email {}", m), None),
    };
    let sid = match session_id(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let AppState { db, sessions, .. } = state;
    let Some(entry) = sessions.get_mut(&sid) else {
        return err(&req.id, "session_not_found", format!("no open session {}", sid), None);
    };
    let schedule_id = schedule_id.or_else(|| entry.schedule_id.clone());
    let email = email.or_else(|| entry.email.clone());

    let submission = match entry.session.submit() {
        Ok(s) => s,
        Err(e) => return session_err(&req.id, &e),
    };
    let payload = submission.payload.to_json();

    let mut recorded = false;
    if let Some(conn) = db.as_ref() {
        let ts = db::now_ts();
        if let Err(e) = conn.execute(
            "INSERT INTO submissions(id, session_id, schedule_id, email, status, payload_json,
                                     total_minutes, week_count, message, created_at, updated_at)
             VALUES(?, ?, ?, ?, 'pending', ?, ?, ?, NULL, ?, ?)",
            rusqlite::params![
                submission.id,
                sid,
                schedule_id,
                email,
                payload.to_string(),
                submission.payload.summary.total_minutes as i64,
                submission.payload.weeks.len() as i64,
                ts,
                ts,
            ],
        ) {
            // Nothing went out, so the session goes straight back to editing.
            let _ = entry.session.acknowledge(Ack::Failed(e.to_string()));
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "submissions" })),
            );
        }
        recorded = true;
    } else {
        debug!(session = %sid, "no workspace selected; submission not recorded");
    }

    ok(
        &req.id,
        json!({
            "submissionId": submission.id,
            "state": entry.session.state().as_str(),
            "scheduleId": schedule_id,
            "email": email,
            "recorded": recorded,
            "payload": payload,
        }),
    )
}

fn handle_ack(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(delivered) = req.params.get("delivered").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "delivered must be boolean", None);
    };
    let message = match parse_opt_string(req.params.get("message")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("message {}", m), None),
    };
    let sid = match session_id(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let AppState { db, sessions, .. } = state;
    let Some(entry) = sessions.get_mut(&sid) else {
        return err(&req.id, "session_not_found", format!("no open session {}", sid), None);
    };
    let submission_id = entry.session.pending_submission().map(|s| s.id.clone());
    let ack = if delivered {
        Ack::Delivered
    } else {
        Ack::Failed(message.clone().unwrap_or_else(|| "delivery failed".to_string()))
    };
    if let Err(e) = entry.session.acknowledge(ack) {
        return session_err(&req.id, &e);
    }

    if let (Some(conn), Some(submission_id)) = (db.as_ref(), submission_id.as_ref()) {
        let status = if delivered { "delivered" } else { "failed" };
        if let Err(e) = conn.execute(
            "UPDATE submissions SET status = ?, message = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![status, message, db::now_ts(), submission_id],
        ) {
            // The session already moved on; the outbox row stays pending.
            warn!(submission = %submission_id, error = %e, "failed to settle outbox row");
        }
    }

    ok(
        &req.id,
        json!({
            "state": entry.session.state().as_str(),
            "submissionId": submission_id,
            "delivered": delivered,
        }),
    )
}

fn handle_close(state: &mut AppState, req: &Request) -> JsonValue {
    let sid = match session_id(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entry = match session_mut(state, req) {
        Ok(e) => e,
        Err(e) => return e,
    };
    if let Err(e) = entry.session.close() {
        return session_err(&req.id, &e);
    }
    state.sessions.remove(&sid);
    info!(session = %sid, "session closed");
    ok(&req.id, json!({ "state": "closed" }))
}

fn handle_abandon(state: &mut AppState, req: &Request) -> JsonValue {
    let sid = match session_id(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(entry) = state.sessions.remove(&sid) else {
        return err(&req.id, "session_not_found", format!("no open session {}", sid), None);
    };
    info!(session = %sid, state = %entry.session.state(), "session abandoned");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.open" => Some(handle_open(state, req)),
        "session.load" => Some(handle_load(state, req)),
        "session.view" => Some(handle_view(state, req)),
        "session.filter" => Some(handle_filter(state, req)),
        "session.filter.reset" => Some(handle_filter_reset(state, req)),
        "session.select.toggle" => Some(handle_select_toggle(state, req)),
        "session.select.clear" => Some(handle_select_clear(state, req)),
        "session.moveWithinWeek" => Some(handle_move_within_week(state, req)),
        "session.moveBetweenWeeks" => Some(handle_move_between_weeks(state, req)),
        "session.discard" => Some(handle_discard(state, req)),
        "session.assign" => Some(handle_assign(state, req)),
        "session.submit" => Some(handle_submit(state, req)),
        "session.ack" => Some(handle_ack(state, req)),
        "session.close" => Some(handle_close(state, req)),
        "session.abandon" => Some(handle_abandon(state, req)),
        _ => None,
    }
}
