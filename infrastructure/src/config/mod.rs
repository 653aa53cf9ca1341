//! Configuration file loading for chanconf
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CHANCONF_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./chanconf.toml` or `./.chanconf.toml`
//! 4. Global: `$XDG_CONFIG_HOME/chanconf/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileChannelConfig, FileConfig, FileLoggingConfig, FileNetworkConfig, FileOrganization,
    FileOutputConfig, FileOutputFormat, FilePipelineConfig,
};
pub use loader::ConfigLoader;
