pub mod binance;
pub mod config;
pub mod direction;
pub mod evaluator;
pub mod store;

pub use binance::BinanceFuturesClient;
pub use config::SignalFileConfig;
pub use direction::DirectionStore;
pub use evaluator::Evaluator;
pub use store::{MemoryStore, RestStore};
