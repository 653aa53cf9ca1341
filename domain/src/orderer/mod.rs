//! Ordering service vocabulary

pub mod response;

pub use response::{OrdererResponse, RejectReason};
