//! Local keyring of organization signing keys
//!
//! Holds ed25519 signing keys for the organizations whose admins run this
//! process. Organizations without a local key cannot be asked to sign; their
//! signatures must arrive out of band.

use crate::config::FileConfig;
use async_trait::async_trait;
use chanconf_application::{CredentialError, CredentialProvider, SignerIdentity};
use chanconf_domain::{ConfigIssue, OrgId, PublicCredential, SignatureBytes};
use ed25519_dalek::{Signer, SigningKey};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// In-process signing keys, one per organization
#[derive(Default)]
pub struct LocalKeyring {
    signers: HashMap<OrgId, Arc<LocalSigner>>,
}

impl LocalKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every organization key from configuration
    ///
    /// Entries with an unreadable seed are skipped and reported.
    pub fn from_config(config: &FileConfig) -> (Self, Vec<ConfigIssue>) {
        let mut keyring = Self::new();
        let mut issues = Vec::new();
        for org in &config.organizations {
            match org.signing_key() {
                Ok(key) => keyring.insert(org.id.as_str(), key),
                Err(issue) => issues.push(issue),
            }
        }
        (keyring, issues)
    }

    pub fn with_key(mut self, org: impl Into<OrgId>, key: SigningKey) -> Self {
        self.insert(org, key);
        self
    }

    pub fn insert(&mut self, org: impl Into<OrgId>, key: SigningKey) {
        let org = org.into();
        self.signers
            .insert(org.clone(), Arc::new(LocalSigner { org, key }));
    }

    /// Stop signing for `org`
    pub fn remove(&mut self, org: &OrgId) -> bool {
        self.signers.remove(org).is_some()
    }

    pub fn contains(&self, org: &OrgId) -> bool {
        self.signers.contains_key(org)
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    /// Public half of `org`'s key, as recorded in channel configuration
    pub fn public_credential(&self, org: &OrgId) -> Option<PublicCredential> {
        self.signers
            .get(org)
            .map(|s| PublicCredential::from_verifying_key(&s.key.verifying_key()))
    }
}

#[async_trait]
impl CredentialProvider for LocalKeyring {
    async fn signer(&self, org: &OrgId) -> Result<Arc<dyn SignerIdentity>, CredentialError> {
        self.signers
            .get(org)
            .map(|s| Arc::clone(s) as Arc<dyn SignerIdentity>)
            .ok_or_else(|| CredentialError::NotFound(org.clone()))
    }
}

/// Signs configuration updates with a local ed25519 key
pub struct LocalSigner {
    org: OrgId,
    key: SigningKey,
}

#[async_trait]
impl SignerIdentity for LocalSigner {
    fn org(&self) -> &OrgId {
        &self.org
    }

    async fn sign(&self, message: &[u8]) -> Result<SignatureBytes, CredentialError> {
        debug!("{} signing {} bytes", self.org, message.len());
        Ok(self.key.sign(message).into())
    }
}
