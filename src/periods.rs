use chrono::NaiveDateTime;
use serde::Serialize;

/// Reference instants chosen for comparison, in the order they were added.
///
/// Owned by the caller's session; there is no shared or global registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PeriodRegistry {
    periods: Vec<NaiveDateTime>,
}

impl PeriodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the instant was already registered.
    pub fn add(&mut self, instant: NaiveDateTime) -> bool {
        if self.periods.contains(&instant) {
            return false;
        }
        self.periods.push(instant);
        true
    }

    /// Returns `false` when the instant was not registered.
    pub fn remove(&mut self, instant: &NaiveDateTime) -> bool {
        match self.periods.iter().position(|p| p == instant) {
            Some(index) => {
                self.periods.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.periods.clear();
    }

    pub fn periods(&self) -> &[NaiveDateTime] {
        &self.periods
    }

    pub fn contains(&self, instant: &NaiveDateTime) -> bool {
        self.periods.contains(instant)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

impl FromIterator<NaiveDateTime> for PeriodRegistry {
    fn from_iter<I: IntoIterator<Item = NaiveDateTime>>(iter: I) -> Self {
        let mut registry = PeriodRegistry::new();
        for instant in iter {
            registry.add(instant);
        }
        registry
    }
}
