use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::generator_defaults;
use crate::ipc::types::{AppState, Request};
use crate::schedule::catalog::ContainerRef;
use crate::schedule::generate::{MAX_MINUTES_PER_WEEK, MAX_WEEKS};
use crate::schedule::{generate, Lesson, LoadWarning};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

fn opt_u32_in(req: &Request, key: &str, min: u32, max: u32) -> Result<Option<u32>, JsonValue> {
    match req.params.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .filter(|n| (u64::from(min)..=u64::from(max)).contains(n))
            .map(|n| Some(n as u32))
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{} must be an integer in {}..={}", key, min, max),
                    None,
                )
            }),
    }
}

fn handle_generate(state: &mut AppState, req: &Request) -> JsonValue {
    let Some(raw) = req.params.get("lessons").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "lessons must be an array", None);
    };

    let mut cfg = generator_defaults(state.db.as_ref());
    match opt_u32_in(req, "weeks", 1, MAX_WEEKS) {
        Ok(Some(n)) => cfg.weeks = n,
        Ok(None) => {}
        Err(e) => return e,
    }
    match opt_u32_in(req, "minMinutesPerWeek", 0, MAX_MINUTES_PER_WEEK) {
        Ok(Some(n)) => cfg.min_minutes_per_week = n,
        Ok(None) => {}
        Err(e) => return e,
    }
    match opt_u32_in(req, "maxMinutesPerWeek", 0, MAX_MINUTES_PER_WEEK) {
        Ok(Some(n)) => cfg.max_minutes_per_week = n,
        Ok(None) => {}
        Err(e) => return e,
    }
    if cfg.min_minutes_per_week > cfg.max_minutes_per_week {
        return err(
            &req.id,
            "bad_params",
            "minMinutesPerWeek must not exceed maxMinutesPerWeek",
            Some(json!({
                "minMinutesPerWeek": cfg.min_minutes_per_week,
                "maxMinutesPerWeek": cfg.max_minutes_per_week
            })),
        );
    }

    let mut lessons = Vec::with_capacity(raw.len());
    let mut warnings = Vec::new();
    for (index, item) in raw.iter().enumerate() {
        match Lesson::from_json(item) {
            Some(l) => lessons.push(l),
            None => warnings.push(LoadWarning::MalformedLesson {
                container: ContainerRef::Pool,
                index,
            }),
        }
    }

    let generated = generate(lessons, &cfg);
    warnings.extend(generated.warnings.iter().cloned());
    debug!(
        weeks = generated.weeks.len(),
        leftover = generated.pool.len(),
        "schedule generated"
    );
    ok(
        &req.id,
        json!({
            "schedule": generated.to_input_json(&cfg),
            "warnings": warnings,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.generate" => Some(handle_generate(state, req)),
        _ => None,
    }
}
