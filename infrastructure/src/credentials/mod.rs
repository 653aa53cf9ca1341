//! Signing credential adapters

mod keyring;

pub use keyring::{LocalKeyring, LocalSigner};
