use crate::schedule::SessionError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Maps an engine error to a response. The session is untouched in both cases.
pub fn session_err(id: &str, e: &SessionError) -> serde_json::Value {
    let details = match e {
        SessionError::InvalidState { operation, state } => {
            Some(json!({ "operation": operation, "state": state.as_str() }))
        }
        SessionError::ReferenceNotFound(_) => None,
    };
    err(id, e.code(), e.to_string(), details)
}

/// Response line for input that never parsed into a request, so has no id.
pub fn bad_json(message: impl Into<String>) -> serde_json::Value {
    json!({
        "ok": false,
        "error": { "code": "bad_json", "message": message.into() }
    })
}
