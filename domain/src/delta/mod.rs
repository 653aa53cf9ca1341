//! Configuration update deltas
//!
//! A [`ConfigUpdateDelta`] is the minimal description of a configuration
//! change: the versions of the groups it depends on (read-set) and the new
//! content of the groups it changes (write-set).

pub mod apply;
pub mod builder;
pub mod update;

pub use apply::{apply_delta, check_write_versions, orphaned_writes};
pub use builder::DeltaBuilder;
pub use update::{ConfigUpdateDelta, GroupWrite, ReadConflict};
