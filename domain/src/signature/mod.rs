//! Signing credentials, signatures and envelopes

pub mod credential;
pub mod envelope;

pub use credential::{OrgSignature, PublicCredential, SignatureBytes};
pub use envelope::ConfigEnvelope;
