//! Plain-text rendering of structured results.
//!
//! The natural-language phrasing layer is an external collaborator; it
//! receives the structured results. This renderer only gives each result
//! a deterministic, human-readable form for the CLI and for logs.

use crate::reason::csp::CspResult;
use crate::session::{LearnResult, ProveResult, QueryResult};

pub trait Describe {
    fn describe(&self) -> String;
}

impl Describe for LearnResult {
    fn describe(&self) -> String {
        if let Some(contradiction) = &self.rejected {
            return format!("rejected: {}", contradiction);
        }
        if !self.success {
            return format!("learn failed: {}", self.errors.join("; "));
        }
        let mut out = format!(
            "learned {} fact{}",
            self.facts_added,
            if self.facts_added == 1 { "" } else { "s" }
        );
        for warning in &self.warnings {
            out.push_str(&format!("\nwarning: {}", warning));
        }
        out
    }
}

impl Describe for QueryResult {
    fn describe(&self) -> String {
        if !self.errors.is_empty() {
            return format!("query failed: {}", self.errors.join("; "));
        }
        if self.all_results.is_empty() {
            return "no results".to_string();
        }
        let mut out = String::new();
        for (i, answer) in self.all_results.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let bindings = answer
                .bindings
                .iter()
                .map(|(hole, value)| format!("{} = {}", hole, value))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{} (confidence {:.2}, {})",
                if bindings.is_empty() {
                    "yes"
                } else {
                    bindings.as_str()
                },
                answer.confidence,
                answer.method
            ));
        }
        for warning in &self.warnings {
            out.push_str(&format!("\nwarning: {}", warning));
        }
        out
    }
}

impl Describe for ProveResult {
    fn describe(&self) -> String {
        if !self.errors.is_empty() {
            return format!("prove failed: {}", self.errors.join("; "));
        }
        if !self.valid {
            return match &self.failure {
                Some(trace) => format!("not proven: {}", trace),
                None => "not proven".to_string(),
            };
        }
        let mut out = format!(
            "proven (confidence {:.2}, {})",
            self.confidence, self.method
        );
        for step in &self.steps {
            let bindings = if step.bindings.is_empty() {
                String::new()
            } else {
                format!(
                    " with {}",
                    step.bindings
                        .iter()
                        .map(|(var, value)| format!("{} = {}", var, value))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            out.push_str(&format!("\n  [{}] {}{}", step.kind, step.detail, bindings));
        }
        out
    }
}

impl Describe for CspResult {
    fn describe(&self) -> String {
        if self.solutions.is_empty() {
            let note = if self.timed_out { " (timed out)" } else { "" };
            return format!("no solutions{}", note);
        }
        let mut out = format!(
            "{} solution{}",
            self.solutions.len(),
            if self.solutions.len() == 1 { "" } else { "s" }
        );
        for solution in &self.solutions {
            let rendered = solution
                .iter()
                .map(|(var, value)| format!("{} = {}", var, value))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("\n  {}", rendered));
        }
        out.push_str(&format!(
            "\n({} nodes, {} backtracks, {} pruned, {} ms)",
            self.stats.nodes, self.stats.backtracks, self.stats.pruned, self.stats.time_ms
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Contradiction, ContradictionReason};

    #[test]
    fn learn_result_counts_facts() {
        let result = LearnResult {
            success: true,
            facts_added: 3,
            ..LearnResult::default()
        };
        assert_eq!(result.describe(), "learned 3 facts");
    }

    #[test]
    fn rejected_learn_renders_contradiction() {
        let result = LearnResult {
            rejected: Some(Contradiction {
                attempted: "hasState Door Closed".into(),
                existing: "hasState Door Open".into(),
                reason: ContradictionReason::MutuallyExclusive {
                    operator: "hasState".into(),
                    values: vec!["Open".into(), "Closed".into()],
                },
            }),
            ..LearnResult::default()
        };
        let text = result.describe();
        assert!(text.starts_with("rejected:"));
        assert!(text.contains("hasState Door Open"));
    }

    #[test]
    fn empty_query_renders_no_results() {
        let result = QueryResult::default();
        assert_eq!(result.describe(), "no results");
    }

    #[test]
    fn unproven_goal_renders_failure_trace() {
        let result = ProveResult {
            failure: Some("rule 'r' failed at premise 'p'".into()),
            ..ProveResult::default()
        };
        assert!(result.describe().contains("failed at premise"));
    }
}
