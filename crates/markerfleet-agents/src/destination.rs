//! Static classification table: `(group, key) -> drop-off point`.

use std::collections::HashSet;

use markerfleet_core::GroupId;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    #[error("destination group {0} is defined more than once")]
    DuplicateGroup(GroupId),
    #[error("destination group {group}: rule #{index} has an empty pattern")]
    EmptyPattern { group: GroupId, index: usize },
    #[error("destination group {0} has a non-finite coordinate")]
    NonFinite(GroupId),
    #[error("fallback destination has a non-finite coordinate")]
    NonFiniteFallback,
}

/// Route keys containing `contains` to `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DestinationRule {
    pub contains: String,
    pub to: Point2<f32>,
}

impl DestinationRule {
    pub fn new(contains: impl Into<String>, to: Point2<f32>) -> Self {
        Self {
            contains: contains.into(),
            to,
        }
    }

    #[inline]
    pub fn matches(&self, key: &str) -> bool {
        key.contains(self.contains.as_str())
    }
}

/// Ordered rules for one carrier group plus its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupPolicy {
    pub group: GroupId,
    #[serde(default)]
    pub rules: Vec<DestinationRule>,
    pub default: Point2<f32>,
}

impl GroupPolicy {
    pub fn new(group: impl Into<GroupId>, default: Point2<f32>) -> Self {
        Self {
            group: group.into(),
            rules: Vec::new(),
            default,
        }
    }

    pub fn rule(mut self, contains: impl Into<String>, to: Point2<f32>) -> Self {
        self.rules.push(DestinationRule::new(contains, to));
        self
    }

    /// First matching rule wins; otherwise the group default.
    pub fn resolve(&self, key: &str) -> Point2<f32> {
        self.rules
            .iter()
            .find(|r| r.matches(key))
            .map_or(self.default, |r| r.to)
    }

    fn is_finite(&self) -> bool {
        let finite = |p: &Point2<f32>| p.x.is_finite() && p.y.is_finite();
        finite(&self.default) && self.rules.iter().all(|r| finite(&r.to))
    }
}

/// Immutable after mission configuration; share it with `Arc`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DestinationTable {
    /// Used for groups without a partition.
    pub fallback: Point2<f32>,
    #[serde(default)]
    pub groups: Vec<GroupPolicy>,
}

impl DestinationTable {
    pub fn new(fallback: Point2<f32>) -> Self {
        Self {
            fallback,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, policy: GroupPolicy) -> Self {
        self.groups.push(policy);
        self
    }

    pub fn policy(&self, group: &GroupId) -> Option<&GroupPolicy> {
        self.groups.iter().find(|g| &g.group == group)
    }

    pub fn has_group(&self, group: &GroupId) -> bool {
        self.policy(group).is_some()
    }

    /// Drop-off point for `key` consumed by a carrier of `group`. Total.
    pub fn resolve(&self, group: &GroupId, key: &str) -> Point2<f32> {
        self.policy(group)
            .map_or(self.fallback, |policy| policy.resolve(key))
    }

    pub fn validate(&self) -> Result<(), DestinationError> {
        if !(self.fallback.x.is_finite() && self.fallback.y.is_finite()) {
            return Err(DestinationError::NonFiniteFallback);
        }
        let mut seen = HashSet::new();
        for policy in &self.groups {
            if !seen.insert(&policy.group) {
                return Err(DestinationError::DuplicateGroup(policy.group.clone()));
            }
            if let Some(index) = policy.rules.iter().position(|r| r.contains.is_empty()) {
                return Err(DestinationError::EmptyPattern {
                    group: policy.group.clone(),
                    index,
                });
            }
            if !policy.is_finite() {
                return Err(DestinationError::NonFinite(policy.group.clone()));
            }
        }
        Ok(())
    }
}
