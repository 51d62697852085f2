//! Organization routing rules
//!
//! Each organization maps visitor URLs onto agent pools with an ordered list of
//! rules. A rule either carries explicit [`RoutingCondition`]s (all of which must
//! hold) or falls back to the legacy domain/path pattern pair.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::ids::{OrganizationId, PoolId};

/// String comparison applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    IsExactly,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
}

impl MatchOperator {
    /// Apply the operator to already-lowercased operands
    pub fn apply(&self, candidate: &str, expected: &str) -> bool {
        match self {
            MatchOperator::IsExactly => candidate == expected,
            MatchOperator::Contains => candidate.contains(expected),
            MatchOperator::DoesNotContain => !candidate.contains(expected),
            MatchOperator::StartsWith => candidate.starts_with(expected),
            MatchOperator::EndsWith => candidate.ends_with(expected),
        }
    }
}

/// Which part of the URL a condition inspects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionTarget {
    Domain,
    Path,
    QueryParam { param_name: String },
}

/// One clause of a rule; every clause of a rule must match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingCondition {
    #[serde(flatten)]
    pub target: ConditionTarget,

    #[serde(rename = "match_type")]
    pub operator: MatchOperator,

    pub value: String,
}

impl RoutingCondition {
    pub fn domain(operator: MatchOperator, value: impl Into<String>) -> Self {
        Self { target: ConditionTarget::Domain, operator, value: value.into() }
    }

    pub fn path(operator: MatchOperator, value: impl Into<String>) -> Self {
        Self { target: ConditionTarget::Path, operator, value: value.into() }
    }

    pub fn query_param(
        param_name: impl Into<String>,
        operator: MatchOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            target: ConditionTarget::QueryParam { param_name: param_name.into() },
            operator,
            value: value.into(),
        }
    }
}

fn any_domain() -> String {
    "*".to_string()
}

fn any_path() -> String {
    "/**".to_string()
}

fn active_by_default() -> bool {
    true
}

/// URL-to-pool routing rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: String,

    /// Legacy domain pattern: `*`, `*.example.com`, or a substring
    #[serde(default = "any_domain")]
    pub domain_pattern: String,

    /// Legacy path pattern: exact, `/x/*`, `/x/**`, or `/x*`
    #[serde(default = "any_path")]
    pub path_pattern: String,

    /// When non-empty, replaces the legacy pattern pair
    #[serde(default)]
    pub conditions: Vec<RoutingCondition>,

    pub pool_id: PoolId,

    /// Higher priority rules are tried first
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

impl RoutingRule {
    /// Legacy rule built from a domain/path pattern pair
    pub fn with_patterns(
        id: impl Into<String>,
        domain_pattern: impl Into<String>,
        path_pattern: impl Into<String>,
        pool_id: impl Into<PoolId>,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            domain_pattern: domain_pattern.into(),
            path_pattern: path_pattern.into(),
            conditions: Vec::new(),
            pool_id: pool_id.into(),
            priority,
            is_active: true,
        }
    }

    /// Condition-based rule
    pub fn with_conditions(
        id: impl Into<String>,
        conditions: Vec<RoutingCondition>,
        pool_id: impl Into<PoolId>,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            domain_pattern: any_domain(),
            path_pattern: any_path(),
            conditions,
            pool_id: pool_id.into(),
            priority,
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    fn validate(&self) -> Result<()> {
        for condition in &self.conditions {
            if let ConditionTarget::QueryParam { param_name } = &condition.target {
                if param_name.trim().is_empty() {
                    return Err(RoutingError::invalid_input(format!(
                        "rule {}: query_param condition needs a parameter name",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Per-organization routing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRoutingConfig {
    pub organization_id: OrganizationId,

    /// Pool used when no rule matches (may be absent)
    #[serde(default)]
    pub default_pool_id: Option<PoolId>,

    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl OrganizationRoutingConfig {
    /// Build a config; inactive rules are dropped and the rest are ordered by
    /// descending priority (ties keep their given order).
    pub fn new(
        organization_id: impl Into<OrganizationId>,
        default_pool_id: Option<PoolId>,
        rules: Vec<RoutingRule>,
    ) -> Result<Self> {
        Self {
            organization_id: organization_id.into(),
            default_pool_id,
            rules,
        }
        .normalized()
    }

    /// Validate and put the rule list into evaluation order
    pub fn normalized(mut self) -> Result<Self> {
        for rule in &self.rules {
            rule.validate()?;
        }
        self.rules.retain(|rule| rule.is_active);
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(self)
    }
}
