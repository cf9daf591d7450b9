use super::catalog::Lesson;
use serde::Serialize;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DurationDirection {
    MoreThan,
    LessThan,
}

impl DurationDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morethan" | "more" | "gt" => Some(Self::MoreThan),
            "lessthan" | "less" | "lt" => Some(Self::LessThan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationFilter {
    pub direction: DurationDirection,
    pub minutes: u32,
}

impl DurationFilter {
    pub fn matches(&self, lesson: &Lesson) -> bool {
        match self.direction {
            DurationDirection::MoreThan => lesson.duration_min > self.minutes,
            DurationDirection::LessThan => lesson.duration_min < self.minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Highest weight first.
    Weight,
    /// Alphabetical by title, ignoring case and accents.
    Title,
    /// Grouped by the order modules first appear in the unfiltered pool.
    ModuleOrder,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" => Some(Self::Weight),
            "title" | "a-z" => Some(Self::Title),
            "moduleorder" | "module" => Some(Self::ModuleOrder),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Title => "title",
            Self::ModuleOrder => "moduleOrder",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    pub module: Option<String>,
    pub duration: Option<DurationFilter>,
    pub sort: Option<SortKey>,
}

impl FilterSpec {
    fn keeps(&self, lesson: &Lesson) -> bool {
        if let Some(module) = &self.module {
            if lesson.module != *module {
                return false;
            }
        }
        self.duration.map_or(true, |d| d.matches(lesson))
    }
}

/// Lowercases and strips diacritics so "Pulmão" matches "pulmao".
///
/// Canonical decomposition splits accented letters into base plus
/// combining marks, which are dropped. Letters with no decomposition
/// (stroked or ligatures) are mapped by hand.
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.nfd().flat_map(char::to_lowercase) {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'ø' => out.push('o'),
            'đ' | 'ð' => out.push('d'),
            'ł' => out.push('l'),
            'ħ' => out.push('h'),
            'ŧ' => out.push('t'),
            'ı' => out.push('i'),
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            other => out.push(other),
        }
    }
    out
}

/// Distinct module names in first-seen order.
pub fn modules(pool: &[Lesson]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for lesson in pool {
        if !out.iter().any(|m| *m == lesson.module) {
            out.push(lesson.module.clone());
        }
    }
    out
}

/// Narrows and orders the pool. Pure: the input is never reordered and the
/// same arguments always give the same order.
pub fn apply(pool: &[Lesson], query: &str, spec: &FilterSpec) -> Vec<Lesson> {
    let needle = fold(query.trim());
    let mut out: Vec<Lesson> = pool
        .iter()
        .filter(|l| needle.is_empty() || fold(&l.title).contains(&needle))
        .filter(|l| spec.keeps(l))
        .cloned()
        .collect();

    match spec.sort {
        None => {}
        Some(SortKey::Weight) => out.sort_by(|a, b| b.weight.total_cmp(&a.weight)),
        Some(SortKey::Title) => {
            let mut keyed: Vec<(String, Lesson)> =
                out.into_iter().map(|l| (fold(&l.title), l)).collect();
            keyed.sort_by(|(fa, a), (fb, b)| fa.cmp(fb).then_with(|| a.title.cmp(&b.title)));
            out = keyed.into_iter().map(|(_, l)| l).collect();
        }
        Some(SortKey::ModuleOrder) => {
            let order: HashMap<String, usize> = modules(pool)
                .into_iter()
                .enumerate()
                .map(|(i, m)| (m, i))
                .collect();
            out.sort_by_key(|l| order.get(&l.module).copied().unwrap_or(usize::MAX));
        }
    }
    out
}

/// Short labels for the active filters, e.g. for chips above the pool list.
pub fn describe(query: &str, spec: &FilterSpec) -> Vec<String> {
    let mut labels = Vec::new();
    let query = query.trim();
    if !query.is_empty() {
        labels.push(format!("Search: {}", query));
    }
    if let Some(module) = &spec.module {
        labels.push(module.clone());
    }
    if let Some(d) = spec.duration {
        labels.push(match d.direction {
            DurationDirection::MoreThan => format!("More than {} min", d.minutes),
            DurationDirection::LessThan => format!("Less than {} min", d.minutes),
        });
    }
    if let Some(sort) = spec.sort {
        let name = match sort {
            SortKey::Weight => "Weight",
            SortKey::Title => "A-Z",
            SortKey::ModuleOrder => "Modules",
        };
        labels.push(format!("Sorted by: {}", name));
    }
    labels
}
