use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use common::{
    kline_interval, normalize_symbol, Decision, DecisionContext, Error, Evaluation, EventKind,
    PriceHistory, Reason, Result, SignalEvent,
};
use risk::{build_plan, FilterPipeline, MacroCalendar, SignalBar, SpikeMode};
use strategy::{PivotLocator, SideVocabulary};

use crate::config::SignalFileConfig;
use crate::direction::DirectionStore;

/// Decides, per incoming event, whether to record a direction or whether an
/// entry signal should be recommended, blocked or ignored.
///
/// Entry signals go through: label -> 4H alignment -> macro window ->
/// pivot -> risk plan -> filters. Each stage can end the evaluation.
pub struct Evaluator {
    directions: DirectionStore,
    history: Arc<dyn PriceHistory>,
    direction_labels: SideVocabulary,
    entry_labels: SideVocabulary,
    pivots: PivotLocator,
    filters: FilterPipeline,
    calendar: MacroCalendar,
}

impl Evaluator {
    pub fn new(
        directions: DirectionStore,
        history: Arc<dyn PriceHistory>,
        settings: SignalFileConfig,
        calendar: MacroCalendar,
    ) -> Self {
        Self {
            directions,
            history,
            direction_labels: settings.direction_labels,
            entry_labels: settings.entry_labels,
            pivots: settings.pivot,
            filters: FilterPipeline::new(settings.filters),
            calendar,
        }
    }

    pub fn directions(&self) -> &DirectionStore {
        &self.directions
    }

    /// Evaluate one event as of `now`.
    ///
    /// Errors are reserved for collaborator failures and unusable payloads;
    /// vetoes and unrecognized labels are ordinary `Decision`s.
    pub async fn evaluate(&self, event: &SignalEvent, now: DateTime<Utc>) -> Result<Evaluation> {
        match event.kind {
            EventKind::Direction4h => self.record_direction(event).await,
            EventKind::EntrySignal => {
                self.evaluate_entry(event, now).await.map(Evaluation::Decided)
            }
            EventKind::Unknown => Ok(Evaluation::Decided(Decision::ignored(
                Reason::UnknownType,
                context(event, None, None),
            ))),
        }
    }

    async fn record_direction(&self, event: &SignalEvent) -> Result<Evaluation> {
        let Some(side) = self.direction_labels.detect(&event.event) else {
            info!(
                symbol = %event.symbol,
                label = %event.event,
                "Direction label not recognized, nothing stored"
            );
            return Ok(Evaluation::Decided(Decision::ignored(
                Reason::UnrecognizedDirection,
                context(event, None, None),
            )));
        };

        let symbol = require_symbol(event)?;
        self.directions.set(&symbol, side).await?;
        Ok(Evaluation::DirectionRecorded { symbol, side })
    }

    async fn evaluate_entry(&self, event: &SignalEvent, now: DateTime<Utc>) -> Result<Decision> {
        let symbol = require_symbol(event)?;

        let Some(side) = self.entry_labels.detect(&event.event) else {
            info!(%symbol, label = %event.event, "Unknown entry label");
            return Ok(Decision::ignored(Reason::UnknownEvent, context(event, None, None)));
        };

        // Alignment with the recorded higher-timeframe trend.
        let direction = self.directions.get(&symbol).await;
        let ctx = context(event, Some(side), direction);
        if direction != Some(side) {
            info!(%symbol, %side, direction = ?direction, "Entry not aligned with 4H direction");
            return Ok(Decision::ignored(Reason::NotAligned, ctx));
        }

        if let Some(at) = self.calendar.active_event(now) {
            info!(%symbol, %side, event_at = %at, "Entry inside macro event window");
            return Ok(Decision::blocked(Reason::MacroWindow, None, ctx));
        }

        let entry = require_price(event.open, "open")?;
        let close = require_price(event.close, "close")?;

        let interval = kline_interval(&event.interval);
        let candles = self
            .history
            .recent_candles(&symbol, interval, self.pivots.required_bars())
            .await?;
        let pivot = self.pivots.locate(&candles, side).ok_or_else(|| {
            Error::DataUnavailable(format!("no closed {interval} candles for {symbol}"))
        })?;

        let Some(plan) = build_plan(entry, pivot.price, side, self.filters.config().stop_buffer_pct)
        else {
            warn!(%symbol, %side, entry, pivot = pivot.price, "Pivot on wrong side of entry");
            return Ok(Decision::blocked(Reason::InvalidStop, None, ctx));
        };

        let bar = SignalBar::new(entry, close);
        let previous = match self.filters.config().spike_mode {
            SpikeMode::TwoBar => candles.last().map(SignalBar::from),
            SpikeMode::SingleBar => None,
        };

        match self.filters.check(&plan, &bar, previous.as_ref(), side) {
            Some(reason) => {
                info!(%symbol, %side, %reason, risk_pct = plan.risk_pct, "Entry blocked");
                Ok(Decision::blocked(reason, Some(plan), ctx))
            }
            None => {
                info!(
                    %symbol,
                    %side,
                    entry = plan.entry,
                    stop_loss = plan.stop_loss,
                    risk_pct = plan.risk_pct,
                    "Entry recommended"
                );
                Ok(Decision::recommend(plan, ctx))
            }
        }
    }
}

fn require_symbol(event: &SignalEvent) -> Result<String> {
    let symbol = normalize_symbol(&event.symbol);
    if symbol.is_empty() {
        return Err(Error::InvalidPayload("missing symbol".into()));
    }
    Ok(symbol)
}

fn require_price(price: Option<f64>, field: &str) -> Result<f64> {
    match price {
        Some(p) if p.is_finite() => Ok(p),
        Some(p) => Err(Error::InvalidPayload(format!("ENTRY_SIGNAL {field} price is {p}"))),
        None => Err(Error::InvalidPayload(format!("ENTRY_SIGNAL without {field} price"))),
    }
}

fn context(
    event: &SignalEvent,
    side: Option<common::Side>,
    direction: Option<common::Side>,
) -> DecisionContext {
    DecisionContext {
        symbol: normalize_symbol(&event.symbol),
        side,
        direction,
        timeframe: event.interval.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use common::{Candle, Outcome, Side};

    use crate::store::MemoryStore;

    struct FakeHistory {
        candles: Vec<Candle>,
        fail: bool,
        calls: AtomicUsize,
        last_request: Mutex<Option<(String, String, usize)>>,
    }

    impl FakeHistory {
        fn with(candles: Vec<Candle>) -> Arc<Self> {
            Arc::new(Self {
                candles,
                fail: false,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                candles: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl PriceHistory for FakeHistory {
        async fn recent_candles(
            &self,
            symbol: &str,
            interval: &str,
            count: usize,
        ) -> Result<Vec<Candle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() =
                Some((symbol.to_string(), interval.to_string(), count));
            if self.fail {
                return Err(Error::DataUnavailable("kline response is not an array".into()));
            }
            Ok(self.candles.clone())
        }
    }

    /// Flat lows at `base` with a single strict swing low at `pivot` in the middle.
    fn swing_low_series(base: f64, pivot: f64) -> Vec<Candle> {
        (0..20)
            .map(|i| {
                let low = if i == 10 { pivot } else { base };
                Candle::new(base + 50.0, base + 100.0, low, base + 50.0)
            })
            .collect()
    }

    /// Flat highs at `base` with a single strict swing high at `pivot`.
    fn swing_high_series(base: f64, pivot: f64) -> Vec<Candle> {
        (0..20)
            .map(|i| {
                let high = if i == 10 { pivot } else { base };
                Candle::new(base - 1.0, high, base - 2.0, base - 1.0)
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    fn evaluator(history: Arc<FakeHistory>, calendar: MacroCalendar) -> Evaluator {
        let directions =
            DirectionStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(3600));
        Evaluator::new(directions, history, SignalFileConfig::default(), calendar)
    }

    fn direction_event(symbol: &str, label: &str) -> SignalEvent {
        SignalEvent {
            kind: EventKind::Direction4h,
            event: label.into(),
            symbol: symbol.into(),
            interval: "240".into(),
            open: None,
            close: None,
        }
    }

    fn entry_event(symbol: &str, label: &str, open: f64, close: f64) -> SignalEvent {
        SignalEvent {
            kind: EventKind::EntrySignal,
            event: label.into(),
            symbol: symbol.into(),
            interval: "15".into(),
            open: Some(open),
            close: Some(close),
        }
    }

    fn decided(eval: Evaluation) -> Decision {
        match eval {
            Evaluation::Decided(d) => d,
            other => panic!("expected a decision, got {other:?}"),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    async fn decide(ev: &Evaluator, event: &SignalEvent) -> Decision {
        decided(ev.evaluate(event, now()).await.unwrap())
    }

    async fn record(ev: &Evaluator, symbol: &str, label: &str) {
        let res = ev.evaluate(&direction_event(symbol, label), now()).await.unwrap();
        assert!(matches!(res, Evaluation::DirectionRecorded { .. }));
    }

    #[tokio::test]
    async fn direction_update_is_stored_under_normalized_symbol() {
        let ev = evaluator(FakeHistory::with(vec![]), MacroCalendar::default());
        let res = ev
            .evaluate(&direction_event("BINANCE:BTCUSDT.P", "4H 多頭漸增"), now())
            .await
            .unwrap();
        assert_eq!(
            res,
            Evaluation::DirectionRecorded {
                symbol: "BTCUSDT".into(),
                side: Side::Long
            }
        );
        assert_eq!(ev.directions().get("BTCUSDT").await, Some(Side::Long));
    }

    #[tokio::test]
    async fn unrecognized_direction_label_writes_nothing() {
        let ev = evaluator(FakeHistory::with(vec![]), MacroCalendar::default());
        let d = decide(&ev, &direction_event("BTCUSDT", "neutral")).await;
        assert_eq!(d.outcome, Outcome::Ignored);
        assert_eq!(d.reason, Some(Reason::UnrecognizedDirection));
        assert_eq!(ev.directions().get("BTCUSDT").await, None);
    }

    #[tokio::test]
    async fn unknown_entry_label_is_ignored() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history.clone(), MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        let d = decide(&ev, &entry_event("BTCUSDT", "foo", 60_000.0, 60_010.0)).await;
        assert_eq!(d.outcome, Outcome::Ignored);
        assert_eq!(d.reason.unwrap().to_string(), "unknown event");
        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_recorded_direction_always_ignored() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history.clone(), MacroCalendar::default());

        let d = decide(&ev, &entry_event("BTCUSDT.P", "Long", 60_000.0, 60_010.0)).await;
        assert_eq!(d.outcome, Outcome::Ignored);
        assert_eq!(d.reason, Some(Reason::NotAligned));
        assert!(d.plan.is_none());
        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn misalignment_is_ignored_even_inside_macro_window() {
        let calendar = MacroCalendar::new(vec![now()], 12.0);
        let ev = evaluator(FakeHistory::with(vec![]), calendar);
        record(&ev, "ETHUSDT", "Short").await;

        let d = decide(&ev, &entry_event("ETHUSDT", "Long", 3000.0, 3001.0)).await;
        assert_eq!(d.outcome, Outcome::Ignored);
        assert_eq!(d.context.direction, Some(Side::Short));
        assert_eq!(d.context.side, Some(Side::Long));
    }

    #[tokio::test]
    async fn macro_window_blocks_before_any_price_lookup() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let calendar = MacroCalendar::new(vec![now() + chrono::Duration::hours(12)], 12.0);
        let ev = evaluator(history.clone(), calendar);
        record(&ev, "BTCUSDT", "Long").await;

        let d = decide(&ev, &entry_event("BTCUSDT", "Long", 60_000.0, 60_010.0)).await;
        assert_eq!(d.outcome, Outcome::Blocked);
        assert_eq!(d.reason, Some(Reason::MacroWindow));
        assert!(d.plan.is_none());
        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sub_one_percent_risk_is_blocked_with_numbers() {
        // Pivot 59700 -> SL 59401.5, risk 598.5 (0.9975% of 60000).
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_700.0));
        let ev = evaluator(history.clone(), MacroCalendar::default());
        record(&ev, "BTCUSDT.P", "Long").await;

        let d = decide(&ev, &entry_event("BTCUSDT.P", "Long", 60_000.0, 60_050.0)).await;
        assert_eq!(d.outcome, Outcome::Blocked);
        assert_eq!(d.reason.unwrap().to_string(), "risk < 1%");
        let plan = d.plan.unwrap();
        assert!(approx(plan.stop_loss, 59_401.5));
        assert!(approx(plan.risk, 598.5));
        assert!(approx(plan.take_profit_1, 60_598.5));
        assert!(approx(plan.take_profit_2, 60_897.75));

        let (symbol, interval, count) = history.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(symbol, "BTCUSDT");
        assert_eq!(interval, "15m");
        assert_eq!(count, 100);
    }

    #[tokio::test]
    async fn aligned_long_with_sane_risk_is_recommended() {
        // Pivot 59400 -> SL 59103, risk 897 (1.495%).
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "BTCUSDT", "多頭").await;

        let event = entry_event("BINANCE:BTCUSDT.P", "多單進場", 60_000.0, 60_100.0);
        let d = decide(&ev, &event).await;
        assert_eq!(d.outcome, Outcome::Recommend);
        assert!(d.reason.is_none());
        let plan = d.plan.unwrap();
        assert!(approx(plan.stop_loss, 59_103.0));
        assert!(approx(plan.take_profit_1, 60_897.0));
        assert!(approx(plan.take_profit_2, 61_345.5));
        assert_eq!(d.context.symbol, "BTCUSDT");
        assert_eq!(d.context.timeframe, "15");
    }

    #[tokio::test]
    async fn aligned_short_with_sane_risk_is_recommended() {
        // Pivot high 102 -> SL 102.51, risk 2.51 (2.51%).
        let history = FakeHistory::with(swing_high_series(101.0, 102.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "SOLUSDT", "Short").await;

        let d = decide(&ev, &entry_event("SOLUSDT", "short entry", 100.0, 99.5)).await;
        assert_eq!(d.outcome, Outcome::Recommend);
        let plan = d.plan.unwrap();
        assert!(plan.stop_loss > plan.entry);
        assert!(approx(plan.take_profit_1, 97.49));
    }

    #[tokio::test]
    async fn oversized_risk_is_blocked() {
        // Pivot 57900 -> SL 57610.5, risk 2389.5 (3.98%).
        let history = FakeHistory::with(swing_low_series(58_500.0, 57_900.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        let d = decide(&ev, &entry_event("BTCUSDT", "Long", 60_000.0, 60_010.0)).await;
        assert_eq!(d.outcome, Outcome::Blocked);
        assert_eq!(d.reason.unwrap().to_string(), "risk > 3%");
    }

    #[tokio::test]
    async fn already_reached_one_r_is_blocked() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        // risk 897; close is 900 above entry.
        let d = decide(&ev, &entry_event("BTCUSDT", "Long", 60_000.0, 60_900.0)).await;
        assert_eq!(d.reason, Some(Reason::ReachedFirstTarget));
    }

    #[tokio::test]
    async fn spike_bar_is_blocked() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        // Bar fell 1.6%: not a 1R move in our favour, but a spike.
        let d = decide(&ev, &entry_event("BTCUSDT", "Long", 60_000.0, 59_040.0)).await;
        assert_eq!(d.reason, Some(Reason::Spike));
        assert!(d.plan.is_some());
    }

    #[tokio::test]
    async fn pivot_above_long_entry_is_invalid_stop() {
        let history = FakeHistory::with(swing_low_series(61_000.0, 60_500.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        let d = decide(&ev, &entry_event("BTCUSDT", "Long", 60_000.0, 60_010.0)).await;
        assert_eq!(d.outcome, Outcome::Blocked);
        assert_eq!(d.reason, Some(Reason::InvalidStop));
        assert!(d.plan.is_none());
    }

    #[tokio::test]
    async fn history_failure_aborts_evaluation() {
        let ev = evaluator(FakeHistory::failing(), MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        let err = ev
            .evaluate(&entry_event("BTCUSDT", "Long", 60_000.0, 60_010.0), now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_history_is_data_unavailable() {
        let ev = evaluator(FakeHistory::with(vec![]), MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        let err = ev
            .evaluate(&entry_event("BTCUSDT", "Long", 60_000.0, 60_010.0), now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn missing_open_price_is_invalid_payload() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history, MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        let mut event = entry_event("BTCUSDT", "Long", 60_000.0, 60_010.0);
        event.open = None;
        let err = ev.evaluate(&event, now()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn non_finite_prices_are_invalid_payload() {
        let history = FakeHistory::with(swing_low_series(59_800.0, 59_400.0));
        let ev = evaluator(history.clone(), MacroCalendar::default());
        record(&ev, "BTCUSDT", "Long").await;

        for close in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let event = entry_event("BTCUSDT", "Long", 60_000.0, close);
            let err = ev.evaluate(&event, now()).await.unwrap_err();
            assert!(matches!(err, Error::InvalidPayload(_)), "close {close}: {err}");
        }
        let event = entry_event("BTCUSDT", "Long", f64::NAN, 60_010.0);
        assert!(matches!(ev.evaluate(&event, now()).await, Err(Error::InvalidPayload(_))));
        assert_eq!(history.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrecognized_direction_without_symbol_is_ignored() {
        let ev = evaluator(FakeHistory::with(vec![]), MacroCalendar::default());
        let d = decide(&ev, &direction_event("", "neutral")).await;
        assert_eq!(d.reason, Some(Reason::UnrecognizedDirection));

        let err = ev.evaluate(&direction_event("", "Long"), now()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn unknown_type_is_ignored() {
        let ev = evaluator(FakeHistory::with(vec![]), MacroCalendar::default());
        let mut event = entry_event("BTCUSDT", "Long", 1.0, 1.0);
        event.kind = EventKind::Unknown;
        let d = decide(&ev, &event).await;
        assert_eq!(d.reason, Some(Reason::UnknownType));
    }

    #[tokio::test]
    async fn two_bar_mode_uses_last_closed_candle() {
        // Last historical candle has a 1.3% body; signal bar also 1.3%.
        let mut candles = swing_high_series(101.0, 102.0);
        candles.push(Candle::new(100.0, 101.0, 98.5, 98.7));
        let directions =
            DirectionStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(3600));
        let mut settings = SignalFileConfig::default();
        settings.filters.spike_mode = SpikeMode::TwoBar;
        let history = FakeHistory::with(candles);
        let ev = Evaluator::new(directions, history, settings, MacroCalendar::default());
        record(&ev, "SOLUSDT", "Short").await;

        let d = decide(&ev, &entry_event("SOLUSDT", "Short", 100.0, 101.3)).await;
        assert_eq!(d.reason, Some(Reason::Spike));
    }
}
