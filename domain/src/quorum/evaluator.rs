//! Quorum policy evaluation
//!
//! Resolves, for every group a delta modifies, the `mod_policy` of that group
//! against the **current** configuration. Evaluating against the proposed
//! state would let a single update both rewrite a policy and satisfy the
//! rewritten version.
//!
//! Groups created by the delta are not evaluated on their own: they do not
//! exist yet, and their creation is authorized through the parent's write,
//! which is always part of the same delta.

use super::policy::Policy;
use super::rule::QuorumRule;
use crate::config::{ChannelConfig, ConfigGroup, GroupPath};
use crate::core::error::DomainError;
use crate::core::ids::OrgId;
use crate::delta::ConfigUpdateDelta;
use crate::signature::PublicCredential;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Signature requirement of a single modified group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRequirement {
    /// The modified group
    pub path: GroupPath,
    /// Policy reference as written in the group's `mod_policy`
    pub policy: String,
    pub rule: QuorumRule,
    /// Policy members and the credentials their signatures are checked against
    pub members: BTreeMap<OrgId, PublicCredential>,
    /// Distinct member signatures needed
    pub threshold: usize,
}

impl GroupRequirement {
    /// Number of members among `signed`
    pub fn signed_count(&self, signed: &BTreeSet<OrgId>) -> usize {
        self.members.keys().filter(|org| signed.contains(*org)).count()
    }

    pub fn is_satisfied(&self, signed: &BTreeSet<OrgId>) -> bool {
        self.signed_count(signed) >= self.threshold
    }

    /// Members that have not signed yet
    pub fn missing(&self, signed: &BTreeSet<OrgId>) -> BTreeSet<OrgId> {
        self.members
            .keys()
            .filter(|org| !signed.contains(*org))
            .cloned()
            .collect()
    }
}

/// Combined signature requirement of a delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuorumRequirement {
    pub groups: Vec<GroupRequirement>,
}

impl QuorumRequirement {
    /// Union of every modified group's policy members
    pub fn required_signers(&self) -> BTreeSet<OrgId> {
        self.groups
            .iter()
            .flat_map(|g| g.members.keys().cloned())
            .collect()
    }

    /// Credential a signer's signature must verify against
    pub fn credential(&self, org: &OrgId) -> Option<&PublicCredential> {
        self.groups.iter().find_map(|g| g.members.get(org))
    }

    /// Whether every group's threshold is met by `signed`
    pub fn is_satisfied(&self, signed: &BTreeSet<OrgId>) -> bool {
        !self.groups.is_empty() && self.groups.iter().all(|g| g.is_satisfied(signed))
    }

    /// Unsigned members of the groups whose thresholds are not met yet
    pub fn outstanding(&self, signed: &BTreeSet<OrgId>) -> BTreeSet<OrgId> {
        self.groups
            .iter()
            .filter(|g| !g.is_satisfied(signed))
            .flat_map(|g| g.missing(signed))
            .collect()
    }
}

/// Evaluates which organizations must sign a delta
pub struct QuorumPolicyEvaluator;

impl QuorumPolicyEvaluator {
    /// Build the requirement for `delta` from the pre-update configuration
    pub fn evaluate(
        current: &ChannelConfig,
        delta: &ConfigUpdateDelta,
    ) -> Result<QuorumRequirement, DomainError> {
        let groups = delta
            .write_set
            .keys()
            .filter(|path| current.group(path).is_some())
            .map(|path| Self::resolve(&current.root, path))
            .collect::<Result<Vec<_>, _>>()?;

        if groups.is_empty() {
            return Err(DomainError::InvalidDelta(
                "delta does not modify any existing group".to_string(),
            ));
        }

        Ok(QuorumRequirement { groups })
    }

    /// Resolve the `mod_policy` of the group at `path`
    pub fn resolve(root: &ConfigGroup, path: &GroupPath) -> Result<GroupRequirement, DomainError> {
        let group = root
            .group(path)
            .ok_or_else(|| DomainError::GroupNotFound(path.clone()))?;

        let (owner_path, policy_name) = Self::split_reference(path, &group.mod_policy)?;
        let owner = root
            .group(&owner_path)
            .ok_or_else(|| DomainError::PolicyNotFound {
                path: path.clone(),
                policy: group.mod_policy.clone(),
            })?;
        let policy = owner
            .policies
            .get(&policy_name)
            .ok_or_else(|| DomainError::PolicyNotFound {
                path: path.clone(),
                policy: group.mod_policy.clone(),
            })?;

        let members = Self::members(root, owner, &group.mod_policy, policy)?;
        let rule = policy.rule();
        let threshold = rule.min_signatures(members.len());

        if members.is_empty() || threshold > members.len() {
            return Err(DomainError::UnsatisfiablePolicy {
                path: path.clone(),
                policy: group.mod_policy.clone(),
                required: threshold,
                members: members.len(),
            });
        }

        Ok(GroupRequirement {
            path: path.clone(),
            policy: group.mod_policy.clone(),
            rule,
            members,
            threshold,
        })
    }

    /// Split a policy reference into the owning group and the policy name
    ///
    /// `Admins` refers to the group's own policy; `/Channel/Application/Admins`
    /// refers to a policy of another group.
    fn split_reference(path: &GroupPath, reference: &str) -> Result<(GroupPath, String), DomainError> {
        if !reference.starts_with('/') {
            return Ok((path.clone(), reference.to_string()));
        }

        let not_found = || DomainError::PolicyNotFound {
            path: path.clone(),
            policy: reference.to_string(),
        };
        let (group_part, name) = reference.rsplit_once('/').ok_or_else(not_found)?;
        if name.is_empty() {
            return Err(not_found());
        }
        let owner: GroupPath = group_part.parse().map_err(|_| not_found())?;
        Ok((owner, name.to_string()))
    }

    fn members(
        root: &ConfigGroup,
        owner: &ConfigGroup,
        reference: &str,
        policy: &Policy,
    ) -> Result<BTreeMap<OrgId, PublicCredential>, DomainError> {
        match policy {
            Policy::ImplicitMeta { .. } => Ok(owner
                .organizations()
                .into_iter()
                .filter_map(|(id, org)| org.msp().map(|msp| (id, msp.admin_key.clone())))
                .collect()),
            Policy::SignedBy { orgs, .. } => orgs
                .iter()
                .map(|org| {
                    root.find_organization(org)
                        .and_then(ConfigGroup::msp)
                        .map(|msp| (org.clone(), msp.admin_key.clone()))
                        .ok_or_else(|| DomainError::UnknownPolicyMember {
                            policy: reference.to_string(),
                            org: org.clone(),
                        })
                })
                .collect(),
        }
    }
}
