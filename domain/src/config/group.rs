//! Versioned configuration groups
//!
//! A [`ConfigGroup`] is one node of a channel's configuration tree. The
//! channel root is the `Channel` group; organizations live two levels down
//! under `Channel/Application` or `Channel/Orderer`.
//!
//! # Versioning
//!
//! A group's `version` covers its *own* content: values, policies,
//! `mod_policy` and the set of child names. A change inside a child bumps
//! only the child.

use super::path::GroupPath;
use super::value::{BATCH_SIZE_KEY, BATCH_TIMEOUT_KEY, BatchSize, ConfigValue, MSP_KEY, MspConfig};
use crate::core::ids::OrgId;
use crate::quorum::Policy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A node of the channel configuration tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigGroup {
    /// Incremented by exactly one whenever this group's own content changes
    pub version: u64,
    /// Policy governing changes to this group: a local policy name, or an
    /// absolute reference such as `/Channel/Application/Admins`
    pub mod_policy: String,
    #[serde(default)]
    pub values: BTreeMap<String, ConfigValue>,
    #[serde(default)]
    pub policies: BTreeMap<String, Policy>,
    #[serde(default)]
    pub children: BTreeMap<String, ConfigGroup>,
}

impl ConfigGroup {
    /// Create an empty group at version 0
    pub fn new(mod_policy: impl Into<String>) -> Self {
        Self {
            mod_policy: mod_policy.into(),
            ..Default::default()
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_value(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_policy(mut self, name: impl Into<String>, policy: Policy) -> Self {
        self.policies.insert(name.into(), policy);
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: ConfigGroup) -> Self {
        self.children.insert(name.into(), child);
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    // ==================== Navigation ====================

    /// Look up a group by path, treating `self` as the `Channel` root
    pub fn group(&self, path: &GroupPath) -> Option<&ConfigGroup> {
        path.below_root()
            .iter()
            .try_fold(self, |group, name| group.children.get(name))
    }

    /// Mutable variant of [`group`](Self::group)
    pub fn group_mut(&mut self, path: &GroupPath) -> Option<&mut ConfigGroup> {
        path.below_root()
            .iter()
            .try_fold(self, |group, name| group.children.get_mut(name))
    }

    /// Find an organization group anywhere beneath this group
    pub fn find_organization(&self, org: &OrgId) -> Option<&ConfigGroup> {
        self.find_organization_path(&GroupPath::root(), org)
            .and_then(|path| self.group(&path))
    }

    /// Path of an organization group, searching depth-first from `base`
    pub fn find_organization_path(&self, base: &GroupPath, org: &OrgId) -> Option<GroupPath> {
        for (name, child) in &self.children {
            let path = base.child(name.clone());
            if child.is_organization() {
                if name == org.as_str() {
                    return Some(path);
                }
            } else if let Some(found) = child.find_organization_path(&path, org) {
                return Some(found);
            }
        }
        None
    }

    /// Organization groups beneath this group, stopping at the first
    /// organization on each branch. An organization group yields nothing.
    pub fn organizations(&self) -> Vec<(OrgId, &ConfigGroup)> {
        let mut orgs = Vec::new();
        for (name, child) in &self.children {
            if child.is_organization() {
                orgs.push((OrgId::new(name.clone()), child));
            } else {
                orgs.extend(child.organizations());
            }
        }
        orgs
    }

    // ==================== Content ====================

    /// Whether this group describes an organization (carries an MSP value)
    pub fn is_organization(&self) -> bool {
        self.msp().is_some()
    }

    pub fn msp(&self) -> Option<&MspConfig> {
        self.values.get(MSP_KEY).and_then(ConfigValue::as_msp)
    }

    pub fn batch_size(&self) -> Option<&BatchSize> {
        self.values.get(BATCH_SIZE_KEY).and_then(ConfigValue::as_batch_size)
    }

    pub fn batch_timeout(&self) -> Option<&str> {
        self.values
            .get(BATCH_TIMEOUT_KEY)
            .and_then(ConfigValue::as_batch_timeout)
    }

    pub fn child_names(&self) -> BTreeSet<String> {
        self.children.keys().cloned().collect()
    }

    /// Compare the group's own content, ignoring versions and child contents
    pub fn same_content(&self, other: &ConfigGroup) -> bool {
        self.mod_policy == other.mod_policy
            && self.values == other.values
            && self.policies == other.policies
            && self.children.len() == other.children.len()
            && self.children.keys().eq(other.children.keys())
    }

    /// Compare whole subtrees, ignoring versions
    pub fn same_subtree(&self, other: &ConfigGroup) -> bool {
        self.same_content(other)
            && self
                .children
                .iter()
                .all(|(name, child)| other.children.get(name).is_some_and(|o| child.same_subtree(o)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quorum::QuorumRule;
    use crate::signature::PublicCredential;

    fn org_group(msp_id: &str) -> ConfigGroup {
        ConfigGroup::new("Admins").with_value(
            MSP_KEY,
            ConfigValue::Msp(MspConfig {
                msp_id: msp_id.to_string(),
                admin_key: PublicCredential::from_bytes([7; 32]),
                root_certs: vec![],
            }),
        )
    }

    fn sample_root() -> ConfigGroup {
        let application = ConfigGroup::new("Admins")
            .with_policy("Admins", Policy::implicit_meta(QuorumRule::Majority))
            .with_child("Org1", org_group("Org1MSP"))
            .with_child("Org2", org_group("Org2MSP"));
        let orderer = ConfigGroup::new("Admins").with_child("OrdererOrg", org_group("OrdererMSP"));
        ConfigGroup::new("Admins")
            .with_child("Application", application)
            .with_child("Orderer", orderer)
    }

    #[test]
    fn test_group_lookup() {
        let root = sample_root();
        assert!(root.group(&GroupPath::root()).is_some());
        assert!(root.group(&GroupPath::application().child("Org2")).is_some());
        assert!(root.group(&GroupPath::application().child("Org9")).is_none());
    }

    #[test]
    fn test_find_organization_path() {
        let root = sample_root();
        assert_eq!(
            root.find_organization_path(&GroupPath::root(), &OrgId::new("OrdererOrg")),
            Some(GroupPath::orderer().child("OrdererOrg"))
        );
        assert!(root.find_organization(&OrgId::new("Missing")).is_none());
    }

    #[test]
    fn test_organizations_under_root_and_container() {
        let root = sample_root();
        assert_eq!(root.organizations().len(), 3);

        let app = root.group(&GroupPath::application()).unwrap();
        let names: Vec<_> = app.organizations().into_iter().map(|(id, _)| id).collect();
        assert_eq!(names, vec![OrgId::new("Org1"), OrgId::new("Org2")]);
    }

    #[test]
    fn test_same_content_ignores_version_and_child_content() {
        let a = sample_root();
        let mut b = a.clone().with_version(9);
        b.group_mut(&GroupPath::application())
            .unwrap()
            .children
            .insert("Org1".to_string(), org_group("Changed"));

        assert!(a.same_content(&b));
        assert!(!a.same_subtree(&b));
    }

    #[test]
    fn test_same_content_detects_child_set_change() {
        let a = sample_root();
        let mut b = a.clone();
        b.children.remove("Orderer");
        assert!(!a.same_content(&b));
    }
}
