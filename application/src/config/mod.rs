//! Application-level configuration.
//!
//! - [`PipelineParams`]: update loop control (deadlines, timeouts, retries)

pub mod pipeline_params;

pub use pipeline_params::PipelineParams;
