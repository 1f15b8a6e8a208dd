pub mod format;
pub mod notifier;

pub use format::{format_price, render_decision, render_self_test};
pub use notifier::{DisabledNotifier, TelegramNotifier};
