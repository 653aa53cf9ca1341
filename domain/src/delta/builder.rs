//! Delta construction
//!
//! A proposal is first applied to a copy of the current tree, then the two
//! trees are diffed group by group:
//!
//! | group state                   | read-set          | write-set              |
//! |-------------------------------|-------------------|------------------------|
//! | own content changed           | current version   | current version + 1    |
//! | removed (parent lists it no more) | current version | omitted              |
//! | created                       | omitted           | version 0              |
//! | unchanged                     | omitted           | omitted                |
//!
//! Only groups that actually change are touched, which keeps the set of
//! policies (and therefore signers) involved as small as possible.

use super::update::{ConfigUpdateDelta, GroupWrite};
use crate::config::value::{BATCH_SIZE_KEY, BATCH_TIMEOUT_KEY};
use crate::config::{ChannelConfig, ConfigGroup, ConfigValue, GroupPath};
use crate::core::error::DomainError;
use crate::core::ids::{ChannelId, OrgId};
use crate::proposal::{BatchParamsChange, OrgKind, OrgSpec, ProposalKind};
use std::collections::BTreeMap;

/// Builds minimal configuration update deltas
pub struct DeltaBuilder;

impl DeltaBuilder {
    /// Compute the delta realizing `proposal` on top of `current`
    ///
    /// Fails with [`DomainError::NoChange`] when the proposal leaves every
    /// group's content as it is.
    pub fn build(
        current: &ChannelConfig,
        proposal: &ProposalKind,
    ) -> Result<ConfigUpdateDelta, DomainError> {
        let target = Self::target(&current.root, proposal)?;
        Self::diff(&current.channel, &current.root, &target)
    }

    /// The tree `current` becomes once `proposal` is applied
    pub fn target(current: &ConfigGroup, proposal: &ProposalKind) -> Result<ConfigGroup, DomainError> {
        let mut target = current.clone();
        match proposal {
            ProposalKind::AddOrganization(spec) => Self::add_organization(&mut target, spec)?,
            ProposalKind::RemoveOrganization { org_id } => {
                Self::remove_organization(&mut target, org_id)?
            }
            ProposalKind::ChangeBatchParams(change) => Self::change_batch(&mut target, change)?,
        }
        Ok(target)
    }

    /// Structural diff from `current` to `target`
    pub fn diff(
        channel: &ChannelId,
        current: &ConfigGroup,
        target: &ConfigGroup,
    ) -> Result<ConfigUpdateDelta, DomainError> {
        let mut read_set = BTreeMap::new();
        let mut write_set = BTreeMap::new();

        Self::diff_group(
            &GroupPath::root(),
            current,
            target,
            &mut read_set,
            &mut write_set,
        );

        if write_set.is_empty() {
            return Err(DomainError::NoChange);
        }

        Ok(ConfigUpdateDelta {
            channel: channel.clone(),
            read_set,
            write_set,
        })
    }

    fn diff_group(
        path: &GroupPath,
        current: &ConfigGroup,
        target: &ConfigGroup,
        read_set: &mut BTreeMap<GroupPath, u64>,
        write_set: &mut BTreeMap<GroupPath, GroupWrite>,
    ) {
        if !current.same_content(target) {
            read_set.insert(path.clone(), current.version);
            write_set.insert(
                path.clone(),
                GroupWrite::from_group(target, current.version + 1),
            );
        }

        for (name, current_child) in &current.children {
            let child_path = path.child(name.clone());
            match target.children.get(name) {
                Some(target_child) => Self::diff_group(
                    &child_path,
                    current_child,
                    target_child,
                    read_set,
                    write_set,
                ),
                None => {
                    read_set.insert(child_path, current_child.version);
                }
            }
        }

        for (name, target_child) in &target.children {
            if !current.children.contains_key(name) {
                Self::write_created(&path.child(name.clone()), target_child, write_set);
            }
        }
    }

    fn write_created(
        path: &GroupPath,
        group: &ConfigGroup,
        write_set: &mut BTreeMap<GroupPath, GroupWrite>,
    ) {
        write_set.insert(path.clone(), GroupWrite::from_group(group, 0));
        for (name, child) in &group.children {
            Self::write_created(&path.child(name.clone()), child, write_set);
        }
    }

    // ==================== Proposal Application ====================

    fn add_organization(root: &mut ConfigGroup, spec: &OrgSpec) -> Result<(), DomainError> {
        let org_group = spec.to_group();
        let expected_path = spec.kind.parent_path().child(spec.org_id.as_str());

        if let Some(existing_path) = root.find_organization_path(&GroupPath::root(), &spec.org_id) {
            let identical = existing_path == expected_path
                && root
                    .group(&existing_path)
                    .is_some_and(|existing| existing.same_subtree(&org_group));
            // Identical re-adds fall through to an empty diff
            return if identical {
                Ok(())
            } else {
                Err(DomainError::OrganizationExists(spec.org_id.clone()))
            };
        }

        let parent_path = spec.kind.parent_path();
        let parent = root
            .group_mut(&parent_path)
            .ok_or(DomainError::GroupNotFound(parent_path))?;
        parent
            .children
            .insert(spec.org_id.as_str().to_string(), org_group);
        Ok(())
    }

    fn remove_organization(root: &mut ConfigGroup, org: &OrgId) -> Result<(), DomainError> {
        for kind in [OrgKind::Application, OrgKind::Orderer] {
            let removed = root
                .group_mut(&kind.parent_path())
                .and_then(|parent| parent.children.remove(org.as_str()));
            if removed.is_some() {
                return Ok(());
            }
        }
        Err(DomainError::UnknownOrganization(org.clone()))
    }

    fn change_batch(root: &mut ConfigGroup, change: &BatchParamsChange) -> Result<(), DomainError> {
        let orderer_path = GroupPath::orderer();
        let orderer = root
            .group_mut(&orderer_path)
            .ok_or(DomainError::GroupNotFound(orderer_path))?;

        let mut size = orderer.batch_size().copied().unwrap_or_default();
        if let Some(count) = change.max_message_count {
            size.max_message_count = count;
        }
        if let Some(bytes) = change.absolute_max_bytes {
            size.absolute_max_bytes = bytes;
        }
        if let Some(bytes) = change.preferred_max_bytes {
            size.preferred_max_bytes = bytes;
        }

        let size_changed = change.max_message_count.is_some()
            || change.absolute_max_bytes.is_some()
            || change.preferred_max_bytes.is_some();
        if size_changed {
            orderer
                .values
                .insert(BATCH_SIZE_KEY.to_string(), ConfigValue::BatchSize(size));
        }
        if let Some(timeout) = &change.timeout {
            orderer.values.insert(
                BATCH_TIMEOUT_KEY.to_string(),
                ConfigValue::BatchTimeout {
                    timeout: timeout.clone(),
                },
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::value::DEFAULT_BATCH_TIMEOUT;
    use crate::config::{BatchSize, ChannelTemplate};
    use crate::delta::apply_delta;
    use crate::quorum::QuorumRule;
    use crate::signature::PublicCredential;
    use std::collections::BTreeSet;

    fn spec(id: &str, kind: OrgKind, key: u8) -> OrgSpec {
        OrgSpec::new(id, format!("{}MSP", id), kind, PublicCredential::from_bytes([key; 32]))
    }

    fn channel() -> ChannelConfig {
        let mut config = ChannelTemplate::new()
            .with_org(spec("OrgA", OrgKind::Application, 1))
            .with_org(spec("OrgB", OrgKind::Application, 2))
            .with_org(spec("OrdA", OrgKind::Orderer, 10))
            .with_orderer_admins(QuorumRule::All)
            .build("mychannel");
        // Give groups distinct versions so read-set values are meaningful
        config.root.version = 4;
        config.root.group_mut(&GroupPath::application()).unwrap().version = 7;
        config.root.group_mut(&GroupPath::orderer()).unwrap().version = 2;
        config
            .root
            .group_mut(&GroupPath::application().child("OrgB"))
            .unwrap()
            .version = 3;
        config
    }

    fn paths(items: &[GroupPath]) -> BTreeSet<GroupPath> {
        items.iter().cloned().collect()
    }

    #[test]
    fn test_add_org_delta() {
        let current = channel();
        let delta = DeltaBuilder::build(
            &current,
            &ProposalKind::AddOrganization(spec("OrgC", OrgKind::Application, 3)),
        )
        .unwrap();

        let app = GroupPath::application();
        let new_org = app.child("OrgC");

        assert_eq!(delta.read_set, BTreeMap::from([(app.clone(), 7)]));
        assert_eq!(
            delta.write_set.keys().cloned().collect::<BTreeSet<_>>(),
            paths(&[app.clone(), new_org.clone()])
        );
        assert_eq!(delta.write_set[&app].version, 8);
        assert!(delta.write_set[&app].children.contains("OrgC"));
        assert_eq!(delta.write_set[&new_org].version, 0);
        assert_eq!(delta.created_paths().collect::<Vec<_>>(), vec![&new_org]);
    }

    #[test]
    fn test_add_orderer_org_goes_under_orderer() {
        let current = channel();
        let delta = DeltaBuilder::build(
            &current,
            &ProposalKind::AddOrganization(spec("OrdB", OrgKind::Orderer, 11)),
        )
        .unwrap();

        assert_eq!(delta.read_set, BTreeMap::from([(GroupPath::orderer(), 2)]));
        assert!(delta.write_set.contains_key(&GroupPath::orderer().child("OrdB")));
    }

    #[test]
    fn test_remove_org_delta() {
        let current = channel();
        let delta = DeltaBuilder::build(&current, &ProposalKind::remove("OrgB")).unwrap();

        let app = GroupPath::application();
        let removed = app.child("OrgB");

        assert_eq!(
            delta.read_set,
            BTreeMap::from([(app.clone(), 7), (removed.clone(), 3)])
        );
        assert_eq!(delta.write_set.len(), 1);
        assert_eq!(delta.write_set[&app].version, 8);
        assert!(!delta.write_set[&app].children.contains("OrgB"));
        assert!(!delta.write_set.contains_key(&removed));
    }

    #[test]
    fn test_remove_unknown_org() {
        let err = DeltaBuilder::build(&channel(), &ProposalKind::remove("Nobody")).unwrap_err();
        assert_eq!(err, DomainError::UnknownOrganization(OrgId::new("Nobody")));
    }

    #[test]
    fn test_batch_change_touches_only_orderer() {
        let current = channel();
        let delta = DeltaBuilder::build(
            &current,
            &ProposalKind::ChangeBatchParams(BatchParamsChange {
                timeout: Some("5s".to_string()),
                max_message_count: Some(100),
                ..Default::default()
            }),
        )
        .unwrap();

        let orderer = GroupPath::orderer();
        assert_eq!(delta.read_set, BTreeMap::from([(orderer.clone(), 2)]));
        assert_eq!(delta.write_set.len(), 1);

        let write = &delta.write_set[&orderer];
        assert_eq!(write.version, 3);
        assert_eq!(
            write.values[BATCH_TIMEOUT_KEY],
            ConfigValue::BatchTimeout {
                timeout: "5s".to_string()
            }
        );
        let size = write.values[BATCH_SIZE_KEY].as_batch_size().unwrap();
        assert_eq!(size.max_message_count, 100);
        assert_eq!(size.absolute_max_bytes, BatchSize::default().absolute_max_bytes);
    }

    #[test]
    fn test_identical_batch_change_is_no_change() {
        let current = channel();
        let delta = DeltaBuilder::build(
            &current,
            &ProposalKind::ChangeBatchParams(BatchParamsChange {
                timeout: Some(DEFAULT_BATCH_TIMEOUT.to_string()),
                max_message_count: Some(BatchSize::default().max_message_count),
                ..Default::default()
            }),
        );
        assert_eq!(delta.unwrap_err(), DomainError::NoChange);
    }

    #[test]
    fn test_empty_batch_change_is_no_change() {
        let result = DeltaBuilder::build(
            &channel(),
            &ProposalKind::ChangeBatchParams(BatchParamsChange::default()),
        );
        assert_eq!(result.unwrap_err(), DomainError::NoChange);
    }

    #[test]
    fn test_readding_identical_org_is_no_change() {
        let current = channel();
        let result = DeltaBuilder::build(
            &current,
            &ProposalKind::AddOrganization(spec("OrgA", OrgKind::Application, 1)),
        );
        assert_eq!(result.unwrap_err(), DomainError::NoChange);
    }

    #[test]
    fn test_adding_existing_org_with_new_material_fails() {
        let current = channel();
        let result = DeltaBuilder::build(
            &current,
            &ProposalKind::AddOrganization(spec("OrgA", OrgKind::Application, 99)),
        );
        assert_eq!(
            result.unwrap_err(),
            DomainError::OrganizationExists(OrgId::new("OrgA"))
        );

        // Same id on the other side of the network is also a conflict
        let result = DeltaBuilder::build(
            &current,
            &ProposalKind::AddOrganization(spec("OrgA", OrgKind::Orderer, 1)),
        );
        assert!(matches!(result, Err(DomainError::OrganizationExists(_))));
    }

    #[test]
    fn test_read_set_matches_observed_versions() {
        let current = channel();
        let proposals = [
            ProposalKind::AddOrganization(spec("OrgC", OrgKind::Application, 3)),
            ProposalKind::remove("OrgA"),
            ProposalKind::remove("OrdA"),
            ProposalKind::ChangeBatchParams(BatchParamsChange {
                preferred_max_bytes: Some(1024),
                ..Default::default()
            }),
        ];

        for proposal in &proposals {
            let delta = DeltaBuilder::build(&current, proposal).unwrap();
            for (path, version) in &delta.read_set {
                assert_eq!(current.version_of(path), Some(*version), "{}", proposal);
            }
            // Every pre-existing written group is read at its base version
            for path in delta.write_set.keys() {
                if let Some(version) = current.version_of(path) {
                    assert_eq!(delta.read_set.get(path), Some(&version), "{}", proposal);
                }
            }
            assert!(delta.read_conflicts(&current.root).is_empty());
        }
    }

    #[test]
    fn test_round_trip_reproduces_target() {
        let current = channel();
        let proposals = [
            ProposalKind::AddOrganization(spec("OrgC", OrgKind::Application, 3)),
            ProposalKind::remove("OrgB"),
            ProposalKind::ChangeBatchParams(BatchParamsChange {
                absolute_max_bytes: Some(4096),
                timeout: Some("1s".to_string()),
                ..Default::default()
            }),
        ];

        for proposal in &proposals {
            let target = DeltaBuilder::target(&current.root, proposal).unwrap();
            let delta = DeltaBuilder::diff(&current.channel, &current.root, &target).unwrap();
            let applied = apply_delta(&current.root, &delta).unwrap();

            assert!(applied.same_subtree(&target), "{}", proposal);
            for (path, write) in &delta.write_set {
                assert_eq!(applied.group(path).unwrap().version, write.version);
            }
        }
    }
}
