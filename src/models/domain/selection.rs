use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Chosen choice positions per question id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Selections(HashMap<i64, BTreeSet<usize>>);

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: i64) -> Option<&BTreeSet<usize>> {
        self.0.get(&question_id)
    }

    /// Chosen positions for the question, empty when nothing was picked.
    pub fn chosen(&self, question_id: i64) -> BTreeSet<usize> {
        self.0.get(&question_id).cloned().unwrap_or_default()
    }

    /// Flips `position` and returns whether it is now selected.
    pub fn toggle(&mut self, question_id: i64, position: usize) -> bool {
        let chosen = self.0.entry(question_id).or_default();
        if chosen.remove(&position) {
            false
        } else {
            chosen.insert(position);
            true
        }
    }

    pub fn select_only(&mut self, question_id: i64, position: usize) {
        self.0.insert(question_id, BTreeSet::from([position]));
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }
}

impl FromIterator<(i64, BTreeSet<usize>)> for Selections {
    fn from_iter<I: IntoIterator<Item = (i64, BTreeSet<usize>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut selections = Selections::new();

        assert!(selections.toggle(1, 2));
        assert!(selections.toggle(1, 0));
        assert_eq!(selections.chosen(1), BTreeSet::from([0, 2]));

        assert!(!selections.toggle(1, 2));
        assert_eq!(selections.chosen(1), BTreeSet::from([0]));
    }

    #[test]
    fn test_select_only_replaces() {
        let mut selections = Selections::new();
        selections.toggle(4, 1);
        selections.toggle(4, 3);
        selections.select_only(4, 0);

        assert_eq!(selections.chosen(4), BTreeSet::from([0]));
        assert!(selections.chosen(5).is_empty());
    }

    #[test]
    fn test_is_empty_ignores_cleared_sets() {
        let mut selections = Selections::new();
        assert!(selections.is_empty());

        selections.toggle(1, 0);
        selections.toggle(1, 0);
        assert!(selections.is_empty());
    }

    #[test]
    fn test_selections_deserialize_from_json_object() {
        let selections: Selections =
            serde_json::from_str(r#"{"12": [0, 2], "13": []}"#).expect("selections should parse");

        assert_eq!(selections.chosen(12), BTreeSet::from([0, 2]));
        assert_eq!(selections.get(13), Some(&BTreeSet::new()));
    }
}
