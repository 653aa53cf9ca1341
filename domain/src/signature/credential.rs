//! Public signing credentials and signatures (ed25519)

use crate::core::error::DomainError;
use crate::core::ids::OrgId;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

/// An organization's public signing key, hex encoded on the wire
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PublicCredential([u8; 32]);

impl PublicCredential {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    pub fn from_hex(s: &str) -> Result<Self, DomainError> {
        let bytes = hex::decode(s).map_err(|e| DomainError::InvalidCredential(e.to_string()))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            DomainError::InvalidCredential(format!("expected 32 key bytes, found {}", b.len()))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check `signature` over `message`; malformed keys or signatures never verify
    pub fn verify(&self, message: &[u8], signature: &SignatureBytes) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature.as_bytes()) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}

impl std::fmt::Debug for PublicCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicCredential({}…)", &self.to_hex()[..8])
    }
}

impl From<PublicCredential> for String {
    fn from(credential: PublicCredential) -> Self {
        credential.to_hex()
    }
}

impl TryFrom<String> for PublicCredential {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

/// Raw signature bytes, hex encoded on the wire
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SignatureBytes(Vec<u8>);

impl SignatureBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl From<Signature> for SignatureBytes {
    fn from(signature: Signature) -> Self {
        Self(signature.to_bytes().to_vec())
    }
}

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = self.to_hex();
        write!(f, "SignatureBytes({}…)", &hex[..hex.len().min(8)])
    }
}

impl From<SignatureBytes> for String {
    fn from(signature: SignatureBytes) -> Self {
        signature.to_hex()
    }
}

impl TryFrom<String> for SignatureBytes {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        hex::decode(&s)
            .map(Self)
            .map_err(|e| DomainError::InvalidCredential(e.to_string()))
    }
}

/// A signature attributed to an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSignature {
    pub org: OrgId,
    pub signature: SignatureBytes,
}
