//! Organization definitions from TOML (`[[organizations]]` array)

use chanconf_domain::{
    AnchorPeer, ConfigIssue, ConfigIssueCode, OrgKind, OrgSpec, PublicCredential,
};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

/// Raw organization definition
///
/// # Example
///
/// ```toml
/// [[organizations]]
/// id = "Org1"
/// msp_id = "Org1MSP"
/// kind = "application"                       # or "orderer"
/// signing_seed = "<64 hex chars>"            # ed25519 secret seed
/// anchor_peers = ["peer0.org1.example.com:7051"]
/// root_certs = []
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOrganization {
    pub id: String,
    pub msp_id: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Hex-encoded 32-byte ed25519 seed
    pub signing_seed: String,
    #[serde(default)]
    pub anchor_peers: Vec<String>,
    #[serde(default)]
    pub root_certs: Vec<String>,
}

fn default_kind() -> String {
    OrgKind::Application.as_str().to_string()
}

impl FileOrganization {
    /// Parse the organization kind, falling back to application
    pub fn parse_kind(&self) -> (OrgKind, Vec<ConfigIssue>) {
        match self.kind.parse::<OrgKind>() {
            Ok(kind) => (kind, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: format!("organizations.{}.kind", self.id),
                        value: self.kind.clone(),
                        valid_values: vec!["application".to_string(), "orderer".to_string()],
                    },
                    format!(
                        "organizations.{}.kind: unknown value '{}', falling back to 'application'",
                        self.id, self.kind
                    ),
                );
                (OrgKind::Application, vec![issue])
            }
        }
    }

    /// Decode the signing seed
    pub fn signing_key(&self) -> Result<SigningKey, ConfigIssue> {
        let invalid = || {
            ConfigIssue::error(
                ConfigIssueCode::InvalidSigningSeed {
                    org: self.id.clone(),
                },
                format!(
                    "organizations.{}.signing_seed: expected 64 hex characters",
                    self.id
                ),
            )
        };
        let bytes = hex::decode(self.signing_seed.trim()).map_err(|_| invalid())?;
        let seed: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(SigningKey::from_bytes(&seed))
    }

    /// Parse anchor peers, reporting entries that are not `host:port`
    pub fn parse_anchor_peers(&self) -> (Vec<AnchorPeer>, Vec<ConfigIssue>) {
        let mut peers = Vec::new();
        let mut issues = Vec::new();
        for entry in &self.anchor_peers {
            let parsed = entry
                .rsplit_once(':')
                .and_then(|(host, port)| Some((host, port.parse::<u16>().ok()?)))
                .filter(|(host, _)| !host.is_empty());
            match parsed {
                Some((host, port)) => peers.push(AnchorPeer::new(host, port)),
                None => issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidAnchorPeer {
                        org: self.id.clone(),
                        value: entry.clone(),
                    },
                    format!(
                        "organizations.{}.anchor_peers: '{}' is not host:port, skipped",
                        self.id, entry
                    ),
                )),
            }
        }
        (peers, issues)
    }

    /// Build the organization definition used in channel configuration
    pub fn to_spec(&self) -> Result<OrgSpec, ConfigIssue> {
        let key = self.signing_key()?;
        let (kind, _) = self.parse_kind();
        let (anchor_peers, _) = self.parse_anchor_peers();

        let mut spec = OrgSpec::new(
            self.id.as_str(),
            self.msp_id.clone(),
            kind,
            PublicCredential::from_verifying_key(&key.verifying_key()),
        );
        for cert in &self.root_certs {
            spec = spec.with_root_cert(cert.clone());
        }
        for peer in anchor_peers {
            spec = spec.with_anchor_peer(peer);
        }
        Ok(spec)
    }

    /// All issues with this entry
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.parse_kind().1;
        issues.extend(self.parse_anchor_peers().1);
        if let Err(issue) = self.signing_key() {
            issues.push(issue);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(seed: &str) -> FileOrganization {
        FileOrganization {
            id: "Org1".to_string(),
            msp_id: "Org1MSP".to_string(),
            kind: "application".to_string(),
            signing_seed: seed.to_string(),
            anchor_peers: vec!["peer0.org1.example.com:7051".to_string()],
            root_certs: vec![],
        }
    }

    #[test]
    fn test_to_spec() {
        let seed = "01".repeat(32);
        let spec = org(&seed).to_spec().unwrap();
        let key = SigningKey::from_bytes(&[1; 32]);

        assert_eq!(spec.org_id.as_str(), "Org1");
        assert_eq!(spec.kind, OrgKind::Application);
        assert_eq!(
            spec.admin_key,
            PublicCredential::from_verifying_key(&key.verifying_key())
        );
        assert_eq!(spec.anchor_peers, vec![AnchorPeer::new("peer0.org1.example.com", 7051)]);
    }

    #[test]
    fn test_bad_seed_is_error() {
        let issues = org("abcd").validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert!(org("zz").to_spec().is_err());
    }

    #[test]
    fn test_bad_kind_and_peer_are_warnings() {
        let mut entry = org(&"02".repeat(32));
        entry.kind = "consortium".to_string();
        entry.anchor_peers.push("no-port".to_string());

        let issues = entry.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| !i.is_error()));
        assert_eq!(entry.to_spec().unwrap().anchor_peers.len(), 1);
    }
}
