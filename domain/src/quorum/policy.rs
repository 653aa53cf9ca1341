//! Signature policies attached to config groups

use super::rule::QuorumRule;
use crate::core::ids::OrgId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Conventional policy names
pub const ADMINS_POLICY: &str = "Admins";
pub const READERS_POLICY: &str = "Readers";
pub const WRITERS_POLICY: &str = "Writers";
pub const ENDORSEMENT_POLICY: &str = "Endorsement";

/// A signature policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Policy {
    /// Members are every organization beneath the group that owns the policy
    ImplicitMeta { rule: QuorumRule },
    /// Members are an explicit organization list
    SignedBy { orgs: BTreeSet<OrgId>, rule: QuorumRule },
}

impl Policy {
    pub fn implicit_meta(rule: QuorumRule) -> Self {
        Policy::ImplicitMeta { rule }
    }

    /// Policy satisfied by the given organization alone
    pub fn signed_by(org: OrgId) -> Self {
        Policy::SignedBy {
            orgs: BTreeSet::from([org]),
            rule: QuorumRule::Any,
        }
    }

    pub fn rule(&self) -> QuorumRule {
        match self {
            Policy::ImplicitMeta { rule } | Policy::SignedBy { rule, .. } => *rule,
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Policy::ImplicitMeta { rule } => write!(f, "implicit meta: {}", rule),
            Policy::SignedBy { orgs, rule } => write!(
                f,
                "{} of [{}]",
                rule,
                crate::core::ids::join_orgs(orgs)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_by_single_org() {
        let policy = Policy::signed_by(OrgId::new("Org1"));
        assert_eq!(policy.rule(), QuorumRule::Any);
        assert_eq!(policy.to_string(), "any member of [Org1]");
    }

    #[test]
    fn test_policy_serde_shape() {
        let json = serde_json::to_value(Policy::implicit_meta(QuorumRule::Majority)).unwrap();
        assert_eq!(json["type"], "implicit_meta");
        assert_eq!(json["rule"], "majority");
    }
}
