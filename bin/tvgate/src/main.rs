use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, KeyValueStore, Notifier};
use engine::{
    BinanceFuturesClient, DirectionStore, Evaluator, MemoryStore, RestStore, SignalFileConfig,
};
use risk::MacroCalendar;
use telegram_notify::{DisabledNotifier, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!(port = cfg.port, "TvGate starting");

    let settings = match cfg.signal_config_path.as_deref() {
        Some(path) => {
            info!(%path, "Loading signal config");
            SignalFileConfig::load(path)
        }
        None => SignalFileConfig::default(),
    };

    let calendar = MacroCalendar::new(cfg.macro_events.clone(), cfg.macro_window_hours);
    if calendar.is_empty() {
        info!("No macro events configured");
    } else {
        info!(
            events = cfg.macro_events.len(),
            window_hours = cfg.macro_window_hours,
            "Macro event blackout active"
        );
    }

    // ── Direction store ───────────────────────────────────────────────────────
    let kv: Arc<dyn KeyValueStore> = match cfg.rest_store() {
        Some((url, token)) => {
            info!(%url, "Using REST direction store");
            Arc::new(
                RestStore::new(url, token, cfg.http_timeout)
                    .context("failed to build REST store client")?,
            )
        }
        None => {
            warn!("REDIS_URL/REDIS_TOKEN not set; directions kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let directions = DirectionStore::new(kv, cfg.direction_ttl);

    // ── Price history ─────────────────────────────────────────────────────────
    let history = Arc::new(
        BinanceFuturesClient::new(&cfg.binance_futures_base, cfg.http_timeout)
            .context("failed to build Binance futures client")?,
    );

    // ── Notifier ──────────────────────────────────────────────────────────────
    let notifier: Arc<dyn Notifier> = match cfg.telegram() {
        Some((token, chat)) => {
            info!("Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(token, chat, cfg.http_timeout))
        }
        None => {
            warn!("TG_BOT_TOKEN/TG_CHAT_ID not set; notifications disabled");
            Arc::new(DisabledNotifier)
        }
    };

    // ── Webhook API ───────────────────────────────────────────────────────────
    let state = api::AppState {
        evaluator: Arc::new(Evaluator::new(directions, history, settings, calendar)),
        notifier,
        tv_secret: Arc::from(cfg.tv_secret.as_str()),
    };

    tokio::select! {
        res = api::serve(state, cfg.port) => res.context("webhook server failed")?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received. Exiting."),
    }
    Ok(())
}
