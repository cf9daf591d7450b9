use super::catalog::Week;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_minutes: u64,
    pub minutes_per_week: Vec<u64>,
}

/// Per-week minute totals in week order, and their sum.
pub fn summarize(weeks: &[Week]) -> Summary {
    let minutes_per_week: Vec<u64> = weeks
        .iter()
        .map(|w| w.lessons.iter().map(|l| u64::from(l.duration_min)).sum())
        .collect();
    Summary {
        total_minutes: minutes_per_week.iter().sum(),
        minutes_per_week,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::catalog::Lesson;

    #[test]
    fn sums_each_week_and_the_total() {
        let weeks = vec![
            Week::new(1, vec![Lesson::new("M", "a", 15, 1.0), Lesson::new("M", "b", 30, 1.0)]),
            Week::new(2, vec![]),
            Week::new(3, vec![Lesson::new("N", "c", 0, 1.0)]),
        ];
        let s = summarize(&weeks);
        assert_eq!(s.minutes_per_week, vec![45, 0, 0]);
        assert_eq!(s.total_minutes, 45);
    }

    #[test]
    fn empty_schedule_is_zero() {
        assert_eq!(summarize(&[]), Summary::default());
    }
}
