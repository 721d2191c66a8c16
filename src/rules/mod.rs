//! Rule-driven routine selection
//!
//! - [`condition`]: evaluates one `(field, operator, value)` condition
//! - [`matcher`]: unions the routines selected by every satisfied rule

pub mod condition;
pub mod matcher;

pub use condition::{evaluate, AnswerRecord, AnswerValue, Condition, InvalidRuleError, Operator};
pub use matcher::{match_routines, MatchOutcome, RejectedRule, RoutineAttributes, Rule, RuleAction, RuleSet};
