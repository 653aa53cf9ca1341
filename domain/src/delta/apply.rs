//! Applying deltas to configuration trees

use super::update::ConfigUpdateDelta;
use crate::config::{ConfigGroup, GroupPath};
use crate::core::error::DomainError;

/// Check that every write carries the version the ordering service expects:
/// base version + 1 for existing groups, 0 for created ones
pub fn check_write_versions(base: &ConfigGroup, delta: &ConfigUpdateDelta) -> Result<(), DomainError> {
    for (path, write) in &delta.write_set {
        let expected = base.group(path).map_or(0, |group| group.version + 1);
        if write.version != expected {
            return Err(DomainError::InvalidDelta(format!(
                "{} written at version {}, expected {}",
                path, write.version, expected
            )));
        }
    }
    Ok(())
}

/// Produce the tree resulting from applying `delta` to `base`
///
/// Writes are applied parent before child. Children a write no longer lists
/// are dropped; newly listed children must carry their own write.
pub fn apply_delta(base: &ConfigGroup, delta: &ConfigUpdateDelta) -> Result<ConfigGroup, DomainError> {
    let mut root = base.clone();

    // BTreeMap order puts every parent before its descendants
    for (path, write) in &delta.write_set {
        for name in &write.children {
            let child_path = path.child(name.clone());
            let exists = root.group(&child_path).is_some();
            if !exists && !delta.write_set.contains_key(&child_path) {
                return Err(DomainError::InvalidDelta(format!(
                    "{} lists child '{}' without a write for it",
                    path, name
                )));
            }
        }

        let group = root
            .group_mut(path)
            .ok_or_else(|| DomainError::InvalidDelta(format!("parent of {} not written", path)))?;

        group.version = write.version;
        group.mod_policy = write.mod_policy.clone();
        group.values = write.values.clone();
        group.policies = write.policies.clone();
        group.children.retain(|name, _| write.children.contains(name));
        for name in &write.children {
            group.children.entry(name.clone()).or_default();
        }
    }

    Ok(root)
}

/// Paths written by `delta` whose parent is neither present nor written
pub fn orphaned_writes(base: &ConfigGroup, delta: &ConfigUpdateDelta) -> Vec<GroupPath> {
    delta
        .write_set
        .keys()
        .filter(|path| {
            path.parent().is_some_and(|parent| {
                base.group(&parent).is_none() && !delta.write_set.contains_key(&parent)
            })
        })
        .cloned()
        .collect()
}
