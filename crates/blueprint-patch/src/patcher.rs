//! # Patch Loop
//!
//! ```text
//! violations ──► select fixable ──► apply (once per field) ──► re-validate
//!      ▲                                                          │
//!      └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Rounds that change nothing, or that reproduce an earlier record state,
//! end the loop with `CycleDetected`. In the revisit case the record from
//! before the offending round is kept, so the result is always a state the
//! validator actually evaluated.

use std::collections::BTreeSet;
use std::sync::Arc;

use blueprint_core::{PatchOutcome, Record, Violation};
use blueprint_rules::RuleSet;
use blueprint_schema::{RecordValidator, SchemaValidator};

use crate::fixes::FixRegistry;

/// Iteration bound used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// The outcome of a patch run.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchResult {
    /// The record after the last accepted round.
    pub record: Record,
    /// Violations a fix was attempted for that no longer occur.
    pub fixed: Vec<Violation>,
    /// Structural violations still present on `record`.
    pub unfixed: Vec<Violation>,
    /// Rounds that changed the record.
    pub iterations: usize,
    /// Why the loop stopped.
    pub outcome: PatchOutcome,
}

/// Applies registered fixes until the record is stable.
#[derive(Debug, Clone)]
pub struct DeterministicPatcher {
    fixes: Arc<FixRegistry>,
    max_iterations: usize,
    validator: SchemaValidator,
}

impl DeterministicPatcher {
    /// A patcher with the given fixes and bound. A bound of zero is raised
    /// to one.
    pub fn new(fixes: Arc<FixRegistry>, max_iterations: usize) -> Self {
        Self {
            fixes,
            max_iterations: max_iterations.max(1),
            validator: SchemaValidator::new(),
        }
    }

    /// The configured iteration bound.
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// The fix registry in use.
    pub fn fixes(&self) -> &FixRegistry {
        &self.fixes
    }

    /// Run the loop. `violations` are the structural violations of
    /// `record` under `rules`.
    pub fn patch(&self, record: &Record, violations: &[Violation], rules: &RuleSet) -> PatchResult {
        if violations.is_empty() {
            return PatchResult {
                record: record.clone(),
                fixed: Vec::new(),
                unfixed: Vec::new(),
                iterations: 0,
                outcome: PatchOutcome::NotNeeded,
            };
        }

        let mut current = record.clone();
        let mut remaining = violations.to_vec();
        let mut seen = vec![current.clone()];
        let mut attempted: Vec<Violation> = Vec::new();
        let mut iterations = 0usize;

        let outcome = loop {
            let fixable: Vec<&Violation> = remaining
                .iter()
                .filter(|v| v.fixable && self.has_fix_for(v, rules))
                .collect();
            if fixable.is_empty() {
                break if remaining.iter().any(Violation::is_failure) {
                    PatchOutcome::Unfixable
                } else {
                    PatchOutcome::Clean
                };
            }
            if iterations >= self.max_iterations {
                tracing::warn!(
                    rule_set = %rules.version(),
                    iterations,
                    remaining = remaining.len(),
                    "patch iteration bound reached"
                );
                break PatchOutcome::Exhausted;
            }

            let next = self.apply_round(&current, &fixable, rules, &mut attempted);
            if next == current {
                tracing::debug!(rule_set = %rules.version(), iterations, "patch round made no change");
                break PatchOutcome::CycleDetected;
            }
            if seen.contains(&next) {
                tracing::warn!(rule_set = %rules.version(), iterations, "patch round revisited an earlier state");
                break PatchOutcome::CycleDetected;
            }

            iterations += 1;
            seen.push(next.clone());
            current = next;
            remaining = self.validator.validate(&current, rules);
            tracing::debug!(
                rule_set = %rules.version(),
                iteration = iterations,
                remaining = remaining.len(),
                "patch round applied"
            );
        };

        let fixed = attempted
            .into_iter()
            .filter(|a| !remaining.iter().any(|r| r.same_issue(a)))
            .collect();

        PatchResult {
            record: current,
            fixed,
            unfixed: remaining,
            iterations,
            outcome,
        }
    }

    fn has_fix_for(&self, violation: &Violation, rules: &RuleSet) -> bool {
        let Some(name) = rules
            .structural_rule(&violation.rule_id)
            .and_then(|rule| rule.fix.as_deref())
        else {
            return false;
        };
        if self.fixes.contains(name) {
            true
        } else {
            tracing::warn!(rule_id = %violation.rule_id, fix = name, "fix function is not registered");
            false
        }
    }

    fn apply_round(
        &self,
        current: &Record,
        fixable: &[&Violation],
        rules: &RuleSet,
        attempted: &mut Vec<Violation>,
    ) -> Record {
        let mut next = current.clone();
        let mut touched: BTreeSet<&str> = BTreeSet::new();

        for violation in fixable {
            let Some(field) = violation.field.as_deref() else {
                continue;
            };
            if touched.contains(field) {
                continue;
            }
            let Some(rule) = rules.structural_rule(&violation.rule_id) else {
                continue;
            };
            let Some(fix) = rule.fix.as_deref().and_then(|name| self.fixes.get(name)) else {
                continue;
            };
            if !attempted.iter().any(|a| a.same_issue(violation)) {
                attempted.push((*violation).clone());
            }
            let Some(value) = current.get_present(field) else {
                continue;
            };
            match fix.apply(value, rule) {
                Some(repaired) if !repaired.is_canonicalizable() => {
                    tracing::warn!(rule_id = %rule.id, field, "discarded fix result that cannot be hashed");
                }
                Some(repaired) if repaired != *value => {
                    if next.set(field, repaired) {
                        touched.insert(field);
                    } else {
                        tracing::warn!(rule_id = %rule.id, field, "fix target is not addressable");
                    }
                }
                _ => {}
            }
        }
        next
    }
}
