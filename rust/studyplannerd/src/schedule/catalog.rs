use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Week label that marks the pool entry of an input schedule.
pub const POOL_LABEL: &str = "remaining";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LessonKey {
    pub module: String,
    pub title: String,
}

impl LessonKey {
    pub fn new(module: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            title: title.into(),
        }
    }

    /// Reads `{ "module": ..., "title": ... }` (or `module_name` /
    /// `lesson_theme`). Both fields are required.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let module = text_field(obj, &["module", "module_name"])?;
        let title = text_field(obj, &["title", "lesson_theme"])?;
        Some(Self::new(module, title))
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.module, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub module: String,
    pub title: String,
    pub duration_min: u32,
    pub weight: f64,
}

impl Lesson {
    pub fn new(module: impl Into<String>, title: impl Into<String>, duration_min: u32, weight: f64) -> Self {
        Self {
            module: module.into(),
            title: title.into(),
            duration_min,
            weight,
        }
    }

    pub fn key(&self) -> LessonKey {
        LessonKey::new(self.module.clone(), self.title.clone())
    }

    pub fn has_key(&self, key: &LessonKey) -> bool {
        self.module == key.module && self.title == key.title
    }

    /// Parses one lesson record. Field names are accepted in both the
    /// camelCase wire form and the scheduling service's own form
    /// (`module_name`, `lesson_theme`, `duration_min`, `peso`).
    ///
    /// Returns `None` when the value is not an object or has no module or
    /// title, since those make up the identity key. Duration and weight
    /// degrade to zero.
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let module = text_field(obj, &["module", "module_name"])?;
        let title = text_field(obj, &["title", "lesson_theme"])?;
        Some(Self {
            module,
            title,
            duration_min: parse_minutes(field(obj, &["durationMin", "duration_min"])),
            weight: field(obj, &["weight", "peso"])
                .and_then(|v| v.as_f64())
                .filter(|w| w.is_finite())
                .unwrap_or(0.0),
        })
    }
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n).filter(|v| !v.is_null()))
}

fn text_field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    let s = field(obj, names)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn parse_minutes(v: Option<&Value>) -> u32 {
    let Some(v) = v else {
        return 0;
    };
    if let Some(n) = v.as_u64() {
        return n.min(u32::MAX as u64) as u32;
    }
    match v.as_f64() {
        Some(f) if f.is_finite() && f > 0.0 => f.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Week {
    pub week: u32,
    pub lessons: Vec<Lesson>,
}

impl Week {
    pub fn new(week: u32, lessons: Vec<Lesson>) -> Self {
        Self { week, lessons }
    }

    pub fn contains(&self, key: &LessonKey) -> bool {
        self.lessons.iter().any(|l| l.has_key(key))
    }
}

/// Where a lesson sat in the input. Serializes as the week number or `"remaining"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRef {
    Pool,
    Week(u32),
}

impl Serialize for ContainerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContainerRef::Pool => serializer.serialize_str(POOL_LABEL),
            ContainerRef::Week(n) => serializer.serialize_u32(*n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LoadWarning {
    #[serde(rename_all = "camelCase")]
    DuplicateLesson {
        module: String,
        title: String,
        dropped_from: ContainerRef,
    },
    #[serde(rename_all = "camelCase")]
    MalformedLesson { container: ContainerRef, index: usize },
    #[serde(rename_all = "camelCase")]
    MalformedWeekEntry { index: usize },
    #[serde(rename_all = "camelCase")]
    UnknownWeekLabel { label: String },
    #[serde(rename_all = "camelCase")]
    DuplicateWeek { week: u32 },
    #[serde(rename_all = "camelCase")]
    LessonsNotArray { container: ContainerRef },
    MissingPool,
}

/// An input schedule after parsing and identity normalization.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSchedule {
    pub weeks: Vec<Week>,
    pub pool: Vec<Lesson>,
    pub params: Map<String, Value>,
    pub warnings: Vec<LoadWarning>,
}

enum Label {
    Pool,
    Week(u32),
    Unknown(String),
}

fn parse_label(v: Option<&Value>) -> Label {
    match v {
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case(POOL_LABEL) => Label::Pool,
        Some(Value::String(s)) => match s.trim().parse::<u32>() {
            Ok(n) => Label::Week(n),
            Err(_) => Label::Unknown(s.clone()),
        },
        Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(n) => Label::Week(n),
            None => Label::Unknown(v.to_string()),
        },
        None => Label::Unknown("null".to_string()),
    }
}

fn parse_lessons(
    entry: &Map<String, Value>,
    container: ContainerRef,
    warnings: &mut Vec<LoadWarning>,
) -> Vec<Lesson> {
    let Some(items) = entry.get("lessons").and_then(|v| v.as_array()) else {
        warnings.push(LoadWarning::LessonsNotArray { container });
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match Lesson::from_json(item) {
            Some(lesson) => out.push(lesson),
            None => warnings.push(LoadWarning::MalformedLesson { container, index }),
        }
    }
    out
}

/// Drops lessons whose key was already seen, recording a warning for each.
pub fn dedupe_into(
    lessons: Vec<Lesson>,
    container: ContainerRef,
    seen: &mut HashSet<LessonKey>,
    warnings: &mut Vec<LoadWarning>,
) -> Vec<Lesson> {
    let mut kept = Vec::with_capacity(lessons.len());
    for lesson in lessons {
        if seen.insert(lesson.key()) {
            kept.push(lesson);
        } else {
            warnings.push(LoadWarning::DuplicateLesson {
                module: lesson.module,
                title: lesson.title,
                dropped_from: container,
            });
        }
    }
    kept
}

/// Parses a loosely typed input schedule. Never fails: malformed parts
/// degrade to empty containers and are reported as warnings.
///
/// Identity conflicts resolve first-wins in pool order, then weeks by
/// ascending number, then position.
pub fn normalize(input: &Value) -> NormalizedSchedule {
    let mut warnings = Vec::new();
    let entries = input
        .get("weeks")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut pool: Vec<Lesson> = Vec::new();
    let mut saw_pool = false;
    let mut weeks: Vec<Week> = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            warnings.push(LoadWarning::MalformedWeekEntry { index });
            continue;
        };
        match parse_label(obj.get("week")) {
            Label::Pool => {
                saw_pool = true;
                let lessons = parse_lessons(obj, ContainerRef::Pool, &mut warnings);
                pool.extend(lessons);
            }
            Label::Week(n) => {
                let lessons = parse_lessons(obj, ContainerRef::Week(n), &mut warnings);
                match weeks.iter_mut().find(|w| w.week == n) {
                    Some(existing) => {
                        warnings.push(LoadWarning::DuplicateWeek { week: n });
                        existing.lessons.extend(lessons);
                    }
                    None => weeks.push(Week::new(n, lessons)),
                }
            }
            Label::Unknown(label) => {
                warnings.push(LoadWarning::UnknownWeekLabel { label });
                let lessons = parse_lessons(obj, ContainerRef::Pool, &mut warnings);
                pool.extend(lessons);
            }
        }
    }
    if !saw_pool {
        warnings.push(LoadWarning::MissingPool);
    }

    weeks.sort_by_key(|w| w.week);

    let mut seen = HashSet::new();
    let pool = dedupe_into(pool, ContainerRef::Pool, &mut seen, &mut warnings);
    let weeks = weeks
        .into_iter()
        .map(|w| {
            let lessons = dedupe_into(w.lessons, ContainerRef::Week(w.week), &mut seen, &mut warnings);
            Week::new(w.week, lessons)
        })
        .collect();

    let params = input
        .get("params")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    NormalizedSchedule {
        weeks,
        pool,
        params,
        warnings,
    }
}
