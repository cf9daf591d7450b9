use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request, SessionEntry};
use crate::schedule::LessonKey;
use serde_json::Value as JsonValue;

pub fn required_str(req: &Request, key: &str) -> Result<String, JsonValue> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn parse_opt_string(v: Option<&JsonValue>) -> Result<Option<String>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or("must be string or null")?.trim().to_string();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
    }
}

pub fn required_index(req: &Request, key: &str) -> Result<usize, JsonValue> {
    let Some(v) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    v.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a non-negative integer", key),
                None,
            )
        })
}

/// Week numbers arrive as integers; numeric strings are accepted too since
/// droppable ids on the UI side are strings.
pub fn required_week(req: &Request, key: &str) -> Result<u32, JsonValue> {
    let parsed = match req.params.get(key) {
        Some(JsonValue::String(s)) => s.trim().parse::<u32>().ok(),
        Some(v) => v.as_u64().and_then(|n| u32::try_from(n).ok()),
        None => return Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    };
    parsed.ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be a week number", key),
            None,
        )
    })
}

pub fn parse_key(req: &Request, v: &JsonValue, what: &str) -> Result<LessonKey, JsonValue> {
    LessonKey::from_json(v).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be an object with module and title", what),
            None,
        )
    })
}

pub fn session_id(req: &Request) -> Result<String, JsonValue> {
    required_str(req, "sessionId")
}

pub fn session_mut<'a>(state: &'a mut AppState, req: &Request) -> Result<&'a mut SessionEntry, JsonValue> {
    let id = session_id(req)?;
    state.sessions.get_mut(&id).ok_or_else(|| {
        err(
            &req.id,
            "session_not_found",
            format!("no open session {}", id),
            None,
        )
    })
}
