//! Regression test-set management.
//!
//! The set grows as real-world input/output pairs are observed and as
//! synthetic inputs are generated; inputs are deduplicated by structural
//! equality, so replaying the same traffic never inflates the set.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::TestCase;

/// The regression test set of one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestSet {
    cases: Vec<TestCase>,
}

impl TestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from already-shaped cases, deduplicating inputs.
    pub fn from_cases(cases: Vec<TestCase>) -> Self {
        let mut set = Self::new();
        for case in cases {
            set.push_unique(case);
        }
        set
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter()
    }

    /// Record an observed input/output pair.
    ///
    /// Returns `true` when the input was new. A structurally equal input is
    /// a no-op: the stored case (including its recorded output) is kept
    /// as-is, and the output is never treated as ground truth.
    pub fn record_observed(&mut self, input: Value, output: Option<Value>) -> bool {
        self.push_unique(TestCase { input, output })
    }

    /// Merge generated test inputs; returns how many were new.
    pub fn extend_generated(&mut self, inputs: Vec<Value>) -> usize {
        inputs
            .into_iter()
            .filter(|input| self.push_unique(TestCase::new(input.clone())))
            .count()
    }

    fn push_unique(&mut self, case: TestCase) -> bool {
        if self.cases.iter().any(|c| c.input == case.input) {
            return false;
        }
        self.cases.push(case);
        true
    }
}

impl<'a> IntoIterator for &'a TestSet {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_observed_is_idempotent() {
        let mut set = TestSet::new();
        assert!(set.record_observed(json!({"Question": "2+2?"}), None));
        assert!(!set.record_observed(json!({"Question": "2+2?"}), Some(json!("4"))));
        assert_eq!(set.len(), 1);
        // The first recording wins; the duplicate's output is discarded.
        assert!(set.cases()[0].output.is_none());
    }

    #[test]
    fn structural_equality_ignores_key_order() {
        let mut set = TestSet::new();
        set.record_observed(json!({"a": 1, "b": 2}), None);
        assert!(!set.record_observed(json!({"b": 2, "a": 1}), None));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn extend_generated_counts_new_inputs() {
        let mut set = TestSet::new();
        set.record_observed(json!({"Question": "old"}), None);
        let added = set.extend_generated(vec![
            json!({"Question": "old"}),
            json!({"Question": "new"}),
            json!({"Question": "new"}),
        ]);
        assert_eq!(added, 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn legacy_bare_strings_survive_a_round_trip() {
        // Stored sets written by older clients mixed bare values with
        // shaped cases; deserialization normalizes both.
        let raw = json!(["plain prompt", {"input": {"Question": "2+2?"}}]);
        let set: TestSet = serde_json::from_value(raw).unwrap();
        assert_eq!(set.cases().len(), 2);
        assert_eq!(set.cases()[0].input, json!("plain prompt"));
        assert_eq!(set.cases()[1].input, json!({"Question": "2+2?"}));

        let back = serde_json::to_value(&set).unwrap();
        let reloaded: TestSet = serde_json::from_value(back).unwrap();
        assert_eq!(reloaded, set);
    }
}
