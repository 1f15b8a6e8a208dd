pub mod collaborators;
pub mod config;
pub mod error;
pub mod types;

pub use collaborators::{Delivery, KeyValueStore, Notifier, PriceHistory};
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
