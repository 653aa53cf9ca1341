//! Channel configuration tree
//!
//! - [`ChannelConfig`]: a channel's configuration snapshot (sequence + root group)
//! - [`ConfigGroup`]: a versioned node of the tree
//! - [`GroupPath`]: `Channel/...` addressing of groups
//! - [`ConfigValue`]: typed values (MSP, batch parameters, ...)
//! - [`ChannelTemplate`]: genesis configuration builder

pub mod channel;
pub mod group;
pub mod path;
pub mod template;
pub mod value;

pub use channel::ChannelConfig;
pub use group::ConfigGroup;
pub use path::GroupPath;
pub use template::ChannelTemplate;
pub use value::{AnchorPeer, BatchSize, ConfigValue, MspConfig};
