//! Configuration update deltas (read-set / write-set)

use crate::config::{ConfigGroup, ConfigValue, GroupPath};
use crate::core::error::DomainError;
use crate::core::ids::ChannelId;
use crate::quorum::Policy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// New content of a single group
///
/// Children are listed by name only; each created child carries its own
/// write. A name missing from `children` removes that child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupWrite {
    pub version: u64,
    pub mod_policy: String,
    pub values: BTreeMap<String, ConfigValue>,
    pub policies: BTreeMap<String, Policy>,
    pub children: BTreeSet<String>,
}

impl GroupWrite {
    /// Capture `group`'s own content at `version`
    pub fn from_group(group: &ConfigGroup, version: u64) -> Self {
        Self {
            version,
            mod_policy: group.mod_policy.clone(),
            values: group.values.clone(),
            policies: group.policies.clone(),
            children: group.child_names(),
        }
    }

    /// Whether `group`'s own content equals this write (versions ignored)
    pub fn matches(&self, group: &ConfigGroup) -> bool {
        self.mod_policy == group.mod_policy
            && self.values == group.values
            && self.policies == group.policies
            && self.children == group.child_names()
    }
}

/// Structural diff between two configuration trees
///
/// The read-set records the version of every pre-existing group the update
/// depends on; the ordering service rejects the update if any of them moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdateDelta {
    pub channel: ChannelId,
    pub read_set: BTreeMap<GroupPath, u64>,
    pub write_set: BTreeMap<GroupPath, GroupWrite>,
}

/// A read-set entry that no longer matches the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadConflict {
    pub path: GroupPath,
    pub expected: u64,
    /// `None` when the group no longer exists
    pub actual: Option<u64>,
}

impl std::fmt::Display for ReadConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.actual {
            Some(actual) => write!(
                f,
                "{} read at version {} but is at version {}",
                self.path, self.expected, actual
            ),
            None => write!(
                f,
                "{} read at version {} no longer exists",
                self.path, self.expected
            ),
        }
    }
}

impl ConfigUpdateDelta {
    /// Deterministic byte encoding signed by every organization
    ///
    /// All maps are ordered, so equal deltas always encode identically.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(self).map_err(|e| DomainError::Encoding(e.to_string()))
    }

    /// Paths modified in place (present in the read-set and the write-set)
    pub fn modified_paths(&self) -> impl Iterator<Item = &GroupPath> {
        self.write_set
            .keys()
            .filter(|path| self.read_set.contains_key(*path))
    }

    /// Paths created by this delta
    pub fn created_paths(&self) -> impl Iterator<Item = &GroupPath> {
        self.write_set
            .keys()
            .filter(|path| !self.read_set.contains_key(*path))
    }

    /// Read-set entries whose version differs from `root`
    pub fn read_conflicts(&self, root: &ConfigGroup) -> Vec<ReadConflict> {
        self.read_set
            .iter()
            .filter_map(|(path, expected)| {
                let actual = root.group(path).map(|g| g.version);
                (actual != Some(*expected)).then(|| ReadConflict {
                    path: path.clone(),
                    expected: *expected,
                    actual,
                })
            })
            .collect()
    }
}
