use crate::ipc::error::{err, ok};
use crate::ipc::helpers::parse_opt_string;
use crate::ipc::types::{AppState, Request};
use rusqlite::types::Value as SqlValue;
use serde_json::{json, Value as JsonValue};

const STATUSES: [&str; 3] = ["pending", "delivered", "failed"];

fn handle_list(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let schedule_id = match parse_opt_string(req.params.get("scheduleId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("scheduleId {}", m), None),
    };
    let status = match parse_opt_string(req.params.get("status")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("status {}", m), None),
    };
    if let Some(s) = status.as_deref() {
        if !STATUSES.contains(&s) {
            return err(
                &req.id,
                "bad_params",
                "status must be one of: pending, delivered, failed",
                None,
            );
        }
    }

    let mut sql = String::from(
        "SELECT id, session_id, schedule_id, email, status, payload_json, total_minutes,
                week_count, message, created_at, updated_at
         FROM submissions WHERE 1 = 1",
    );
    let mut bind: Vec<SqlValue> = Vec::new();
    if let Some(s) = schedule_id {
        sql.push_str(" AND schedule_id = ?");
        bind.push(SqlValue::Text(s));
    }
    if let Some(s) = status {
        sql.push_str(" AND status = ?");
        bind.push(SqlValue::Text(s));
    }
    sql.push_str(" ORDER BY created_at, id");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt.query_map(rusqlite::params_from_iter(bind), |r| {
        let payload_raw: String = r.get(5)?;
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "sessionId": r.get::<_, String>(1)?,
            "scheduleId": r.get::<_, Option<String>>(2)?,
            "email": r.get::<_, Option<String>>(3)?,
            "status": r.get::<_, String>(4)?,
            "payload": serde_json::from_str::<JsonValue>(&payload_raw).unwrap_or(JsonValue::Null),
            "totalMinutes": r.get::<_, i64>(6)?,
            "weekCount": r.get::<_, i64>(7)?,
            "message": r.get::<_, Option<String>>(8)?,
            "createdAt": r.get::<_, String>(9)?,
            "updatedAt": r.get::<_, String>(10)?,
        }))
    });
    let submissions = match rows.and_then(|it| it.collect::<Result<Vec<_>, _>>()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "submissions": submissions }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submissions.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
