//! # Rule Sets
//!
//! An immutable, versioned collection of structural and semantic rules.
//! Fields are private; the only ways to obtain a `RuleSet` are
//! [`RuleSet::new`], [`RuleSetBuilder`] and the document loaders, all of
//! which enforce the same invariants.

use std::collections::BTreeSet;

use blueprint_core::{RuleId, RuleSetVersion};
use serde::Serialize;

use crate::error::RuleSetError;
use crate::semantic::SemanticRule;
use crate::structural::StructuralRule;

/// A versioned rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    version: RuleSetVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    structural: Vec<StructuralRule>,
    semantic: Vec<SemanticRule>,
}

impl RuleSet {
    /// Build a rule set, checking rule-id uniqueness across both tiers and
    /// the internal consistency of every rule.
    pub fn new(
        version: RuleSetVersion,
        description: Option<String>,
        structural: Vec<StructuralRule>,
        semantic: Vec<SemanticRule>,
    ) -> Result<Self, RuleSetError> {
        let mut seen: BTreeSet<&RuleId> = BTreeSet::new();
        for id in structural.iter().map(|r| &r.id).chain(semantic.iter().map(|r| &r.id)) {
            if !seen.insert(id) {
                return Err(RuleSetError::DuplicateRuleId(id.clone()));
            }
        }
        for rule in &structural {
            rule.check_consistency()?;
        }
        for rule in &semantic {
            rule.check_consistency()?;
        }
        Ok(Self {
            version,
            description,
            structural,
            semantic,
        })
    }

    /// Start building a rule set for `version`.
    pub fn builder(version: RuleSetVersion) -> RuleSetBuilder {
        RuleSetBuilder {
            version,
            description: None,
            structural: Vec::new(),
            semantic: Vec::new(),
        }
    }

    /// The version identifier.
    pub fn version(&self) -> &RuleSetVersion {
        &self.version
    }

    /// Free-text description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Structural rules in declaration order.
    pub fn structural(&self) -> &[StructuralRule] {
        &self.structural
    }

    /// Semantic rules in declaration order.
    pub fn semantic(&self) -> &[SemanticRule] {
        &self.semantic
    }

    /// Every fix name referenced by a structural rule, deduplicated.
    pub fn fix_names(&self) -> BTreeSet<&str> {
        self.structural.iter().filter_map(|r| r.fix.as_deref()).collect()
    }

    /// Look up a structural rule by id.
    pub fn structural_rule(&self, id: &RuleId) -> Option<&StructuralRule> {
        self.structural.iter().find(|r| &r.id == id)
    }
}

/// Incremental construction of a [`RuleSet`]. Validation happens in
/// [`RuleSetBuilder::build`].
#[derive(Debug, Clone)]
pub struct RuleSetBuilder {
    version: RuleSetVersion,
    description: Option<String>,
    structural: Vec<StructuralRule>,
    semantic: Vec<SemanticRule>,
}

impl RuleSetBuilder {
    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a structural rule.
    pub fn structural(mut self, rule: StructuralRule) -> Self {
        self.structural.push(rule);
        self
    }

    /// Append a semantic rule.
    pub fn semantic(mut self, rule: SemanticRule) -> Self {
        self.semantic.push(rule);
        self
    }

    /// Validate and freeze.
    pub fn build(self) -> Result<RuleSet, RuleSetError> {
        RuleSet::new(self.version, self.description, self.structural, self.semantic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::Predicate;
    use blueprint_core::ValueType;

    fn rid(s: &str) -> RuleId {
        RuleId::new(s).unwrap()
    }

    fn version(s: &str) -> RuleSetVersion {
        RuleSetVersion::new(s).unwrap()
    }

    #[test]
    fn builder_preserves_declaration_order() {
        let rs = RuleSet::builder(version("bond-v1"))
            .structural(StructuralRule::new(rid("b"), "b", ValueType::Text))
            .structural(StructuralRule::new(rid("a"), "a", ValueType::Text))
            .build()
            .unwrap();
        let ids: Vec<&str> = rs.structural().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(rs.version().as_str(), "bond-v1");
    }

    #[test]
    fn duplicate_ids_across_tiers_are_rejected() {
        let err = RuleSet::builder(version("v1"))
            .structural(StructuralRule::new(rid("price"), "price", ValueType::Number))
            .semantic(SemanticRule::new(
                rid("price"),
                Predicate::NumericRange { field: "price".into(), min: Some(0.0), max: None },
                "price must be positive",
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, RuleSetError::DuplicateRuleId(id) if id.as_str() == "price"));
    }

    #[test]
    fn fix_names_are_collected() {
        let rs = RuleSet::builder(version("v1"))
            .structural(StructuralRule::new(rid("a"), "a", ValueType::Number).fix("coerce_number"))
            .structural(StructuralRule::new(rid("b"), "b", ValueType::Number).fix("coerce_number"))
            .structural(StructuralRule::new(rid("c"), "c", ValueType::Text).fix("trim"))
            .build()
            .unwrap();
        assert_eq!(rs.fix_names().into_iter().collect::<Vec<_>>(), vec!["coerce_number", "trim"]);
        assert!(rs.structural_rule(&rid("c")).is_some());
    }
}
