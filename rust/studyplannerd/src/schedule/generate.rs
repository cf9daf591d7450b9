use super::catalog::{dedupe_into, ContainerRef, Lesson, LoadWarning, Week, POOL_LABEL};
use super::summary::{summarize, Summary};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Longest plan the generator builds, in weeks.
pub const MAX_WEEKS: u32 = 104;
/// Minutes in a week; no weekly budget can exceed it.
pub const MAX_MINUTES_PER_WEEK: u32 = 10_080;

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub weeks: u32,
    pub min_minutes_per_week: u32,
    pub max_minutes_per_week: u32,
    /// A week stops taking lessons once it reaches this share of the max.
    pub fill_ratio: f64,
    /// Past the weekly minimum, only lessons at least this heavy are added.
    pub min_intermediate_weight: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            weeks: 12,
            min_minutes_per_week: 90,
            max_minutes_per_week: 180,
            fill_ratio: 0.9,
            min_intermediate_weight: 3.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedSchedule {
    pub weeks: Vec<Week>,
    /// Lessons no week took, heaviest first.
    pub pool: Vec<Lesson>,
    pub summary: Summary,
    pub warnings: Vec<LoadWarning>,
}

impl GeneratedSchedule {
    /// Shapes the result like an input schedule so it can be loaded into a session.
    pub fn to_input_json(&self, cfg: &GeneratorConfig) -> Value {
        let mut weeks: Vec<Value> = self
            .weeks
            .iter()
            .map(|w| json!({ "week": w.week, "lessons": w.lessons }))
            .collect();
        weeks.push(json!({ "week": POOL_LABEL, "lessons": self.pool }));
        json!({
            "weeks": weeks,
            "summary": self.summary,
            "params": {
                "minMinutesPerWeek": cfg.min_minutes_per_week,
                "maxMinutesPerWeek": cfg.max_minutes_per_week
            }
        })
    }
}

/// Greedy weekly fill from the heaviest lessons down.
///
/// Below the weekly minimum a week takes the first lesson that still fits
/// under the max. Past the minimum the lesson must also reach
/// `min_intermediate_weight`. A week closes when it hits
/// `max * fill_ratio` or nothing else fits. At most [`MAX_WEEKS`] weeks are built.
pub fn generate(lessons: Vec<Lesson>, cfg: &GeneratorConfig) -> GeneratedSchedule {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut remaining = dedupe_into(lessons, ContainerRef::Pool, &mut seen, &mut warnings);
    remaining.sort_by(|a, b| b.weight.total_cmp(&a.weight));

    let max = u64::from(cfg.max_minutes_per_week);
    let min = u64::from(cfg.min_minutes_per_week);
    let limit = max as f64 * cfg.fill_ratio;

    let week_count = cfg.weeks.min(MAX_WEEKS);
    let mut weeks = Vec::with_capacity(week_count as usize);
    for number in 1..=week_count {
        let mut lessons = Vec::new();
        let mut total: u64 = 0;
        while !remaining.is_empty() && (total as f64) < limit {
            let fits = |l: &Lesson| {
                let under_max = total + u64::from(l.duration_min) <= max;
                if total < min {
                    under_max
                } else {
                    under_max && l.weight >= cfg.min_intermediate_weight
                }
            };
            let Some(pos) = remaining.iter().position(fits) else {
                break;
            };
            let lesson = remaining.remove(pos);
            total += u64::from(lesson.duration_min);
            lessons.push(lesson);
        }
        weeks.push(Week::new(number, lessons));
    }

    let summary = summarize(&weeks);
    GeneratedSchedule {
        weeks,
        pool: remaining,
        summary,
        warnings,
    }
}
