//! Signing credential port
//!
//! Each organization signs through its own [`SignerIdentity`]. Where the key
//! material lives (local keyring, HSM, remote signer) is an adapter concern.

use async_trait::async_trait;
use chanconf_domain::{OrgId, SignatureBytes};
use std::sync::Arc;
use thiserror::Error;

/// Errors obtaining or using a signing credential
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("No signing credential for organization '{0}'")]
    NotFound(OrgId),

    #[error("Signing failed for '{org}': {message}")]
    SigningFailed { org: OrgId, message: String },
}

/// An organization's signing capability
#[async_trait]
pub trait SignerIdentity: Send + Sync {
    /// The organization this identity signs for
    fn org(&self) -> &OrgId;

    /// Sign `message`
    async fn sign(&self, message: &[u8]) -> Result<SignatureBytes, CredentialError>;
}

/// Supplies signer identities per organization
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn signer(&self, org: &OrgId) -> Result<Arc<dyn SignerIdentity>, CredentialError>;
}
