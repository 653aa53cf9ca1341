//! Ordering service adapters

mod genesis;
mod memory;

pub use genesis::genesis_channels;
pub use memory::InMemoryOrderingService;
