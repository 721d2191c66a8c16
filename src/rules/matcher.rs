//! Rule matching over a routine catalog
//!
//! Every rule is evaluated independently. The result is the union of the
//! routines selected by all satisfied rules, deduplicated in first-insert
//! order, so rule order only changes the diagnostics.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use super::condition::{self, AnswerRecord, AnswerValue, Condition, Operator};
use crate::types::{Result, TrellisError};

/// Routine attribute selector applied when a rule's condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    pub field: String,
    pub value: AnswerValue,
}

/// Named `(condition -> action)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub condition: Condition,
    pub action: RuleAction,
}

/// Anything the matcher can select from
pub trait RoutineAttributes {
    fn routine_id(&self) -> &str;

    /// Attribute value by field name, `None` when absent or not comparable
    fn attribute(&self, field: &str) -> Option<AnswerValue>;
}

/// Immutable rule configuration, loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

const DEFAULT_RULES: &str = include_str!("../../config/rules.json");

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TrellisError::Config(format!("Invalid rule set: {}", e)))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrellisError::Config(format!("Failed to read rule set {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Rule set shipped with the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(DEFAULT_RULES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A rule rejected during a matching pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRule {
    pub rule: String,
    pub reason: String,
}

/// Result of one matching pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// Selected routine ids, each exactly once
    pub routine_ids: Vec<String>,
    /// Satisfied rule names, in rule order
    pub matched_rules: Vec<String>,
    /// Rules that could not be evaluated
    pub invalid_rules: Vec<RejectedRule>,
}

/// Select every catalog routine picked by a satisfied rule
pub fn match_routines<R: RoutineAttributes>(
    rules: &[Rule],
    answers: &AnswerRecord,
    catalog: &[R],
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for rule in rules {
        match condition::evaluate(&rule.condition, answers) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!(rule = %rule.name, error = %e, "Skipping invalid rule");
                outcome.invalid_rules.push(RejectedRule {
                    rule: rule.name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        }

        outcome.matched_rules.push(rule.name.clone());

        for routine in catalog {
            let selected = routine
                .attribute(&rule.action.field)
                .map(|actual| condition::compare(&actual, &Operator::Eq, &rule.action.value))
                .unwrap_or(false);

            if selected && seen.insert(routine.routine_id()) {
                outcome.routine_ids.push(routine.routine_id().to_string());
            }
        }
    }

    debug!(
        matched_rules = outcome.matched_rules.len(),
        routines = outcome.routine_ids.len(),
        invalid = outcome.invalid_rules.len(),
        "Rule matching complete"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    struct TestRoutine {
        id: String,
        attributes: HashMap<String, AnswerValue>,
    }

    impl RoutineAttributes for TestRoutine {
        fn routine_id(&self) -> &str {
            &self.id
        }

        fn attribute(&self, field: &str) -> Option<AnswerValue> {
            self.attributes.get(field).cloned()
        }
    }

    fn routine(id: &str, category: &str, intensity: &str) -> TestRoutine {
        TestRoutine {
            id: id.to_string(),
            attributes: HashMap::from([
                ("category".to_string(), AnswerValue::Text(category.into())),
                ("intensity".to_string(), AnswerValue::Text(intensity.into())),
            ]),
        }
    }

    fn rule(name: &str, field: &str, op: Operator, value: AnswerValue, action: (&str, &str)) -> Rule {
        Rule {
            name: name.to_string(),
            condition: Condition::new(field, op, value),
            action: RuleAction {
                field: action.0.to_string(),
                value: AnswerValue::Text(action.1.to_string()),
            },
        }
    }

    fn catalog() -> Vec<TestRoutine> {
        vec![
            routine("walk", "cardio", "low"),
            routine("yoga", "mobility", "low"),
            routine("hiit", "cardio", "high"),
        ]
    }

    #[test]
    fn test_union_without_duplicates() {
        let rules = vec![
            rule("older", "age", Operator::Gt, AnswerValue::Number(60.0), ("intensity", "low")),
            rule("sedentary", "active", Operator::Eq, AnswerValue::Bool(false), ("category", "cardio")),
        ];
        let answers = AnswerRecord::from([
            ("age".to_string(), AnswerValue::Number(70.0)),
            ("active".to_string(), AnswerValue::Bool(false)),
        ]);

        let outcome = match_routines(&rules, &answers, &catalog());

        // walk is selected by both rules but appears once
        assert_eq!(outcome.routine_ids, vec!["walk", "yoga", "hiit"]);
        assert_eq!(outcome.matched_rules, vec!["older", "sedentary"]);
        assert!(outcome.invalid_rules.is_empty());
    }

    #[test]
    fn test_empty_rules_and_no_matches() {
        let answers = AnswerRecord::from([("age".to_string(), AnswerValue::Number(20.0))]);
        assert!(match_routines(&[], &answers, &catalog()).routine_ids.is_empty());

        let rules = vec![rule("older", "age", Operator::Gt, AnswerValue::Number(60.0), ("intensity", "low"))];
        let outcome = match_routines(&rules, &answers, &catalog());
        assert!(outcome.routine_ids.is_empty());
        assert!(outcome.matched_rules.is_empty());
    }

    #[test]
    fn test_invalid_rule_does_not_abort_pass() {
        let rules = vec![
            rule("broken", "age", Operator::Unsupported("~=".into()), AnswerValue::Number(1.0), ("category", "cardio")),
            rule("any_age", "age", Operator::Ge, AnswerValue::Number(0.0), ("category", "mobility")),
        ];
        let answers = AnswerRecord::from([("age".to_string(), AnswerValue::Number(30.0))]);

        let outcome = match_routines(&rules, &answers, &catalog());
        assert_eq!(outcome.routine_ids, vec!["yoga"]);
        assert_eq!(outcome.invalid_rules.len(), 1);
        assert_eq!(outcome.invalid_rules[0].rule, "broken");
    }

    #[test]
    fn test_rule_order_does_not_change_set() {
        let mut rules = vec![
            rule("a", "age", Operator::Gt, AnswerValue::Number(10.0), ("category", "cardio")),
            rule("b", "age", Operator::Gt, AnswerValue::Number(10.0), ("intensity", "low")),
        ];
        let answers = AnswerRecord::from([("age".to_string(), AnswerValue::Number(30.0))]);

        let forward: HashSet<String> = match_routines(&rules, &answers, &catalog())
            .routine_ids
            .into_iter()
            .collect();
        rules.reverse();
        let backward: HashSet<String> = match_routines(&rules, &answers, &catalog())
            .routine_ids
            .into_iter()
            .collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_embedded_rule_set_loads() {
        let rules = RuleSet::embedded().unwrap();
        assert!(!rules.is_empty());
    }

    proptest! {
        #[test]
        fn prop_no_duplicates(age in 0u32..100, thresholds in prop::collection::vec(0u32..100, 0..8)) {
            let rules: Vec<Rule> = thresholds
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let action = if i % 2 == 0 { ("category", "cardio") } else { ("intensity", "low") };
                    rule(&format!("r{}", i), "age", Operator::Lt, AnswerValue::Number(*t as f64), action)
                })
                .collect();
            let answers = AnswerRecord::from([("age".to_string(), AnswerValue::Number(age as f64))]);

            let outcome = match_routines(&rules, &answers, &catalog());
            let unique: HashSet<&String> = outcome.routine_ids.iter().collect();
            prop_assert_eq!(unique.len(), outcome.routine_ids.len());
        }
    }
}
