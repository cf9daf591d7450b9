use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::schedule::generate::{MAX_MINUTES_PER_WEEK, MAX_WEEKS};
use crate::schedule::{DurationDirection, FilterSpec, GeneratorConfig, SortKey};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Editor,
    Generator,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "editor" => Some(Self::Editor),
            "generator" => Some(Self::Generator),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Editor => "setup.editor",
            Self::Generator => "setup.generator",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Editor => json!({
            "defaultSort": "none",
            "durationDirection": "moreThan",
            "durationThresholdMinutes": 30
        }),
        SetupSection::Generator => json!({
            "defaultWeeks": 12,
            "defaultMinMinutesPerWeek": 90,
            "defaultMaxMinutesPerWeek": 180,
            "fillRatioPercent": 90,
            "minIntermediateWeight": 3.5
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_f64_range(v: &Value, key: &str, min: f64, max: f64) -> Result<f64, String> {
    let n = v.as_f64().ok_or_else(|| format!("{} must be a number", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Editor => match k.as_str() {
                "defaultSort" => {
                    let s = parse_string_max(v, k, 16)?;
                    let canonical = if s.eq_ignore_ascii_case("none") {
                        "none"
                    } else {
                        SortKey::parse(&s)
                            .map(SortKey::as_str)
                            .ok_or("defaultSort must be one of: none, weight, title, moduleOrder")?
                    };
                    obj.insert(k.clone(), Value::String(canonical.to_string()));
                }
                "durationDirection" => {
                    let s = parse_string_max(v, k, 16)?;
                    let canonical = match DurationDirection::parse(&s) {
                        Some(DurationDirection::MoreThan) => "moreThan",
                        Some(DurationDirection::LessThan) => "lessThan",
                        None => {
                            return Err("durationDirection must be one of: moreThan, lessThan".into())
                        }
                    };
                    obj.insert(k.clone(), Value::String(canonical.to_string()));
                }
                "durationThresholdMinutes" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 600)?));
                }
                _ => return Err(format!("unknown editor field: {}", k)),
            },
            SetupSection::Generator => match k.as_str() {
                "defaultWeeks" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, i64::from(MAX_WEEKS))?));
                }
                "defaultMinMinutesPerWeek" | "defaultMaxMinutesPerWeek" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, i64::from(MAX_MINUTES_PER_WEEK))?));
                }
                "fillRatioPercent" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 10, 100)?));
                }
                "minIntermediateWeight" => {
                    obj.insert(k.clone(), Value::from(parse_f64_range(v, k, -1000.0, 1000.0)?));
                }
                _ => return Err(format!("unknown generator field: {}", k)),
            },
        }
    }
    if let SetupSection::Generator = section {
        let min = obj.get("defaultMinMinutesPerWeek").and_then(|v| v.as_i64()).unwrap_or(0);
        let max = obj.get("defaultMaxMinutesPerWeek").and_then(|v| v.as_i64()).unwrap_or(0);
        if min > max {
            return Err("defaultMinMinutesPerWeek must not exceed defaultMaxMinutesPerWeek".into());
        }
    }
    Ok(())
}

fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a bad stored value falls back to defaults.
            let mut merged = current.clone();
            if merge_section_patch(section, &mut merged, saved_obj).is_ok() {
                current = merged;
            }
        }
    }
    Ok(current)
}

fn section_or_default(conn: Option<&Connection>, section: SetupSection) -> Value {
    conn.and_then(|c| load_section(c, section).ok())
        .unwrap_or_else(|| default_section(section))
}

/// Editor settings that shape the pool view of a new session.
#[derive(Debug, Clone)]
pub struct EditorDefaults {
    pub sort: Option<SortKey>,
    pub duration_direction: DurationDirection,
    pub duration_threshold_minutes: u32,
}

impl EditorDefaults {
    pub fn filter(&self) -> FilterSpec {
        FilterSpec {
            sort: self.sort,
            ..FilterSpec::default()
        }
    }
}

pub fn editor_defaults(conn: Option<&Connection>) -> EditorDefaults {
    let obj = section_or_default(conn, SetupSection::Editor);
    EditorDefaults {
        sort: obj
            .get("defaultSort")
            .and_then(|v| v.as_str())
            .and_then(SortKey::parse),
        duration_direction: obj
            .get("durationDirection")
            .and_then(|v| v.as_str())
            .and_then(DurationDirection::parse)
            .unwrap_or(DurationDirection::MoreThan),
        duration_threshold_minutes: obj
            .get("durationThresholdMinutes")
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(30),
    }
}

pub fn generator_defaults(conn: Option<&Connection>) -> GeneratorConfig {
    let obj = section_or_default(conn, SetupSection::Generator);
    let base = GeneratorConfig::default();
    let int = |k: &str, fallback: u32| {
        obj.get(k)
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(fallback)
    };
    GeneratorConfig {
        weeks: int("defaultWeeks", base.weeks),
        min_minutes_per_week: int("defaultMinMinutesPerWeek", base.min_minutes_per_week),
        max_minutes_per_week: int("defaultMaxMinutesPerWeek", base.max_minutes_per_week),
        fill_ratio: obj
            .get("fillRatioPercent")
            .and_then(|v| v.as_f64())
            .map(|p| p / 100.0)
            .unwrap_or(base.fill_ratio),
        min_intermediate_weight: obj
            .get("minIntermediateWeight")
            .and_then(|v| v.as_f64())
            .unwrap_or(base.min_intermediate_weight),
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let editor = match load_section(conn, SetupSection::Editor) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let generator = match load_section(conn, SetupSection::Generator) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "editor": editor, "generator": generator }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_patch_canonicalizes_values() {
        let mut current = default_section(SetupSection::Editor);
        let patch = json!({ "defaultSort": "A-Z", "durationDirection": "less" });
        merge_section_patch(
            SetupSection::Editor,
            &mut current,
            patch.as_object().expect("object"),
        )
        .expect("merge");
        assert_eq!(current["defaultSort"], json!("title"));
        assert_eq!(current["durationDirection"], json!("lessThan"));
    }

    #[test]
    fn generator_patch_rejects_inverted_budget() {
        let mut current = default_section(SetupSection::Generator);
        let patch = json!({ "defaultMinMinutesPerWeek": 500 });
        assert!(merge_section_patch(
            SetupSection::Generator,
            &mut current,
            patch.as_object().expect("object"),
        )
        .is_err());
    }

    #[test]
    fn defaults_apply_without_a_workspace() {
        let editor = editor_defaults(None);
        assert_eq!(editor.sort, None);
        assert_eq!(editor.duration_threshold_minutes, 30);
        let generator = generator_defaults(None);
        assert_eq!(generator, GeneratorConfig::default());
    }
}
