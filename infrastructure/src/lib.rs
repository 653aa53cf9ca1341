//! Infrastructure layer for chanconf
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod credentials;
pub mod logging;
pub mod orderer;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileChannelConfig, FileConfig, FileLoggingConfig, FileNetworkConfig,
    FileOrganization, FileOutputConfig, FileOutputFormat, FilePipelineConfig,
};
pub use credentials::{LocalKeyring, LocalSigner};
pub use logging::JsonlAuditLogger;
pub use orderer::{InMemoryOrderingService, genesis_channels};
