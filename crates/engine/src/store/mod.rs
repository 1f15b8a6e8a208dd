//! Key/value backends for the direction store.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;
