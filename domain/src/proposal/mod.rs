//! Configuration change proposals
//!
//! A [`ProposalKind`] is the validated intent handed to the pipeline. Field
//! shapes have already been checked by the caller; this module only knows
//! how each intent maps onto the configuration tree.

use crate::config::path::GroupPath;
use crate::config::value::{ANCHOR_PEERS_KEY, AnchorPeer, ConfigValue, MSP_KEY, MspConfig};
use crate::config::ConfigGroup;
use crate::core::ids::OrgId;
use crate::quorum::{ADMINS_POLICY, ENDORSEMENT_POLICY, Policy, READERS_POLICY, WRITERS_POLICY};
use crate::signature::PublicCredential;
use serde::{Deserialize, Serialize};

/// Which side of the network an organization belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrgKind {
    /// Peer organization under `Channel/Application`
    #[default]
    Application,
    /// Ordering organization under `Channel/Orderer`
    Orderer,
}

impl OrgKind {
    /// Container group the organization lives in
    pub fn parent_path(&self) -> GroupPath {
        match self {
            OrgKind::Application => GroupPath::application(),
            OrgKind::Orderer => GroupPath::orderer(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrgKind::Application => "application",
            OrgKind::Orderer => "orderer",
        }
    }
}

impl std::fmt::Display for OrgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrgKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "application" | "app" | "peer" => Ok(OrgKind::Application),
            "orderer" => Ok(OrgKind::Orderer),
            other => Err(format!(
                "Unknown organization kind: {}. Valid: application, orderer",
                other
            )),
        }
    }
}

/// Definition of an organization joining a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSpec {
    pub org_id: OrgId,
    pub msp_id: String,
    pub kind: OrgKind,
    /// Admin signing credential used to verify the org's config signatures
    pub admin_key: PublicCredential,
    #[serde(default)]
    pub root_certs: Vec<String>,
    #[serde(default)]
    pub anchor_peers: Vec<AnchorPeer>,
}

impl OrgSpec {
    pub fn new(
        org_id: impl Into<OrgId>,
        msp_id: impl Into<String>,
        kind: OrgKind,
        admin_key: PublicCredential,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            msp_id: msp_id.into(),
            kind,
            admin_key,
            root_certs: Vec::new(),
            anchor_peers: Vec::new(),
        }
    }

    pub fn with_root_cert(mut self, pem: impl Into<String>) -> Self {
        self.root_certs.push(pem.into());
        self
    }

    pub fn with_anchor_peer(mut self, peer: AnchorPeer) -> Self {
        self.anchor_peers.push(peer);
        self
    }

    /// The organization's config group: MSP material plus default policies,
    /// all of which are satisfied by the organization alone
    pub fn to_group(&self) -> ConfigGroup {
        let own = || Policy::signed_by(self.org_id.clone());

        let mut group = ConfigGroup::new(ADMINS_POLICY)
            .with_value(
                MSP_KEY,
                ConfigValue::Msp(MspConfig {
                    msp_id: self.msp_id.clone(),
                    admin_key: self.admin_key.clone(),
                    root_certs: self.root_certs.clone(),
                }),
            )
            .with_policy(ADMINS_POLICY, own())
            .with_policy(READERS_POLICY, own())
            .with_policy(WRITERS_POLICY, own());

        if self.kind == OrgKind::Application {
            group = group.with_policy(ENDORSEMENT_POLICY, own());
            if !self.anchor_peers.is_empty() {
                group = group.with_value(
                    ANCHOR_PEERS_KEY,
                    ConfigValue::AnchorPeers {
                        peers: self.anchor_peers.clone(),
                    },
                );
            }
        }

        group
    }
}

/// Requested batch parameter changes; `None` leaves a parameter untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchParamsChange {
    pub max_message_count: Option<u32>,
    pub absolute_max_bytes: Option<u32>,
    pub preferred_max_bytes: Option<u32>,
    /// Batch timeout duration, e.g. "2s"
    pub timeout: Option<String>,
}

impl BatchParamsChange {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the parameters this change touches
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.max_message_count.is_some() {
            fields.push("BatchSizeMaxMessageCount");
        }
        if self.absolute_max_bytes.is_some() {
            fields.push("BatchSizeAbsoluteMaxBytes");
        }
        if self.preferred_max_bytes.is_some() {
            fields.push("BatchSizePreferredMaxBytes");
        }
        if self.timeout.is_some() {
            fields.push("BatchTimeout");
        }
        fields
    }
}

/// A validated configuration change intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalKind {
    AddOrganization(OrgSpec),
    RemoveOrganization { org_id: OrgId },
    ChangeBatchParams(BatchParamsChange),
}

impl ProposalKind {
    pub fn remove(org_id: impl Into<OrgId>) -> Self {
        ProposalKind::RemoveOrganization {
            org_id: org_id.into(),
        }
    }

    /// Short human-readable summary
    pub fn describe(&self) -> String {
        match self {
            ProposalKind::AddOrganization(spec) => {
                format!("add {} organization {}", spec.kind, spec.org_id)
            }
            ProposalKind::RemoveOrganization { org_id } => format!("remove organization {}", org_id),
            ProposalKind::ChangeBatchParams(change) => {
                format!("change {}", change.changed_fields().join(", "))
            }
        }
    }
}

impl std::fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}
