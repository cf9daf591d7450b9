use super::catalog::{Lesson, LessonKey, Week};
use super::summary::{summarize, Summary};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The request was valid but resolves to the current order.
    Unchanged,
    /// A week number or index did not resolve. Nothing was changed.
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignReport {
    pub assigned: usize,
    /// Keys repeated in the request or already in the destination week.
    pub skipped_duplicates: usize,
    /// Keys that are not in the pool.
    pub missing: usize,
}

/// Weeks plus the pool of unassigned lessons.
///
/// Every lesson key lives in exactly one container. Operations validate
/// their references before touching anything, so a failed request leaves
/// the model as it was.
#[derive(Debug, Clone, Default)]
pub struct ScheduleModel {
    weeks: Vec<Week>,
    pool: Vec<Lesson>,
}

impl ScheduleModel {
    pub fn new(weeks: Vec<Week>, pool: Vec<Lesson>) -> Self {
        Self { weeks, pool }
    }

    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    pub fn pool(&self) -> &[Lesson] {
        &self.pool
    }

    pub fn week(&self, number: u32) -> Option<&Week> {
        self.weeks.iter().find(|w| w.week == number)
    }

    fn week_index(&self, number: u32) -> Option<usize> {
        self.weeks.iter().position(|w| w.week == number)
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.weeks)
    }

    /// Every key across pool and weeks, pool first.
    pub fn keys(&self) -> Vec<LessonKey> {
        self.pool
            .iter()
            .chain(self.weeks.iter().flat_map(|w| w.lessons.iter()))
            .map(Lesson::key)
            .collect()
    }

    /// Moves the lesson at `from` to slot `to` of the same week.
    ///
    /// Slots are counted before removal, `0..=len`: slot `i` is the gap in
    /// front of lesson `i`. Slots `from` and `from + 1` both border the lesson
    /// itself, so either is a no-op. Slots past the end clamp to `len`.
    pub fn move_within_week(&mut self, week: u32, from: usize, to: usize) -> MoveOutcome {
        let Some(wi) = self.week_index(week) else {
            return MoveOutcome::NotFound;
        };
        let lessons = &mut self.weeks[wi].lessons;
        if from >= lessons.len() {
            return MoveOutcome::NotFound;
        }
        let to = to.min(lessons.len());
        if to == from || to == from + 1 {
            return MoveOutcome::Unchanged;
        }
        let lesson = lessons.remove(from);
        let dest = if to > from { to - 1 } else { to };
        lessons.insert(dest, lesson);
        MoveOutcome::Moved
    }

    /// Moves a lesson to position `dest_index` of another week (clamped to
    /// its length). Same-week requests use the slot rule of
    /// [`ScheduleModel::move_within_week`].
    pub fn move_between_weeks(
        &mut self,
        source_week: u32,
        source_index: usize,
        dest_week: u32,
        dest_index: usize,
    ) -> MoveOutcome {
        let (Some(si), Some(di)) = (self.week_index(source_week), self.week_index(dest_week)) else {
            return MoveOutcome::NotFound;
        };
        if si == di {
            return self.move_within_week(source_week, source_index, dest_index);
        }
        if source_index >= self.weeks[si].lessons.len() {
            return MoveOutcome::NotFound;
        }
        let lesson = self.weeks[si].lessons.remove(source_index);
        let dest = &mut self.weeks[di].lessons;
        let at = dest_index.min(dest.len());
        dest.insert(at, lesson);
        MoveOutcome::Moved
    }

    /// Takes a lesson out of a week and puts it at the front of the pool.
    pub fn discard_to_pool(&mut self, week: u32, index: usize) -> MoveOutcome {
        let Some(wi) = self.week_index(week) else {
            return MoveOutcome::NotFound;
        };
        if index >= self.weeks[wi].lessons.len() {
            return MoveOutcome::NotFound;
        }
        let lesson = self.weeks[wi].lessons.remove(index);
        self.pool.insert(0, lesson);
        MoveOutcome::Moved
    }

    /// Appends pool lessons to the end of `week`, in the order given.
    /// Returns `None` if the week does not exist.
    pub fn assign_from_pool(&mut self, keys: &[LessonKey], week: u32) -> Option<AssignReport> {
        let wi = self.week_index(week)?;
        let mut report = AssignReport::default();
        let mut requested: HashSet<&LessonKey> = HashSet::new();
        for key in keys {
            if !requested.insert(key) || self.weeks[wi].contains(key) {
                report.skipped_duplicates += 1;
                continue;
            }
            let Some(pos) = self.pool.iter().position(|l| l.has_key(key)) else {
                report.missing += 1;
                continue;
            };
            let lesson = self.pool.remove(pos);
            self.weeks[wi].lessons.push(lesson);
            report.assigned += 1;
        }
        Some(report)
    }
}
