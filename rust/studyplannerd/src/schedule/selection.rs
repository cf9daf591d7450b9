use super::catalog::{Lesson, LessonKey};

/// Pool lessons picked for a batch assignment, in the order they were picked.
///
/// Every key refers to a lesson currently in the pool; callers run
/// [`Selection::reconcile`] after anything that takes lessons out of it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    keys: Vec<LessonKey>,
}

impl Selection {
    pub fn keys(&self) -> &[LessonKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &LessonKey) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Adds the key if absent, removes it if present. Returns the new
    /// membership, or `None` when the key is neither selected nor in the pool.
    pub fn toggle(&mut self, key: &LessonKey, pool: &[Lesson]) -> Option<bool> {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            self.keys.remove(pos);
            return Some(false);
        }
        if !pool.iter().any(|l| l.has_key(key)) {
            return None;
        }
        self.keys.push(key.clone());
        Some(true)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Drops keys that are no longer in the pool. Returns how many were dropped.
    pub fn reconcile(&mut self, pool: &[Lesson]) -> usize {
        let before = self.keys.len();
        self.keys.retain(|k| pool.iter().any(|l| l.has_key(k)));
        before - self.keys.len()
    }

    /// Selected lessons first, then `filtered` without them.
    pub fn pin(&self, pool: &[Lesson], filtered: Vec<Lesson>) -> Vec<Lesson> {
        let mut out: Vec<Lesson> = self
            .keys
            .iter()
            .filter_map(|k| pool.iter().find(|l| l.has_key(k)).cloned())
            .collect();
        out.extend(filtered.into_iter().filter(|l| !self.contains(&l.key())));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Vec<Lesson> {
        vec![
            Lesson::new("M", "a", 10, 1.0),
            Lesson::new("M", "b", 20, 2.0),
            Lesson::new("N", "c", 30, 3.0),
        ]
    }

    #[test]
    fn toggle_adds_then_removes() {
        let p = pool();
        let mut s = Selection::default();
        assert_eq!(s.toggle(&LessonKey::new("M", "b"), &p), Some(true));
        assert!(s.contains(&LessonKey::new("M", "b")));
        assert_eq!(s.toggle(&LessonKey::new("M", "b"), &p), Some(false));
        assert!(s.is_empty());
    }

    #[test]
    fn toggle_rejects_keys_outside_the_pool() {
        let mut s = Selection::default();
        assert_eq!(s.toggle(&LessonKey::new("X", "zz"), &pool()), None);
        assert!(s.is_empty());
    }

    #[test]
    fn reconcile_drops_departed_lessons() {
        let mut p = pool();
        let mut s = Selection::default();
        s.toggle(&LessonKey::new("M", "a"), &p);
        s.toggle(&LessonKey::new("N", "c"), &p);
        p.remove(0);
        assert_eq!(s.reconcile(&p), 1);
        assert_eq!(s.keys(), &[LessonKey::new("N", "c")]);
    }

    #[test]
    fn pinned_lessons_survive_a_filter_that_excludes_them() {
        let p = pool();
        let mut s = Selection::default();
        s.toggle(&LessonKey::new("N", "c"), &p);
        let filtered: Vec<Lesson> = p.iter().filter(|l| l.module == "M").cloned().collect();
        let shown = s.pin(&p, filtered);
        let titles: Vec<&str> = shown.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[test]
    fn pinned_lessons_are_not_repeated() {
        let p = pool();
        let mut s = Selection::default();
        s.toggle(&LessonKey::new("M", "b"), &p);
        let shown = s.pin(&p, p.clone());
        let titles: Vec<&str> = shown.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }
}
