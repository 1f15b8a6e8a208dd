use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{body_pct, Candle, Reason, RiskPlan, Side};

/// How the spike filter looks at bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpikeMode {
    /// Veto on the signal bar's body alone (`>= spike_pct`).
    #[default]
    SingleBar,
    /// Additionally veto when both the signal bar and the previous closed bar
    /// have bodies `>= spike_pair_pct`.
    TwoBar,
}

/// User-configurable filter thresholds. All values are fractions
/// (0.01 = 1%).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Distance of the stop beyond the pivot.
    pub stop_buffer_pct: f64,
    /// Veto when risk / entry is below this.
    pub min_risk_pct: f64,
    /// Veto when risk / entry is above this.
    pub max_risk_pct: f64,
    /// Single-bar body size that counts as a spike.
    pub spike_pct: f64,
    /// Per-bar body size for the two-bar spike rule.
    pub spike_pair_pct: f64,
    pub spike_mode: SpikeMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            stop_buffer_pct: 0.005,
            min_risk_pct: 0.01,
            max_risk_pct: 0.03,
            spike_pct: 0.015,
            spike_pair_pct: 0.012,
            spike_mode: SpikeMode::SingleBar,
        }
    }
}

/// Open and close of a bar as reported by the signal (or taken from history).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBar {
    pub open: f64,
    pub close: f64,
}

impl SignalBar {
    pub fn new(open: f64, close: f64) -> Self {
        Self { open, close }
    }

    pub fn body_pct(&self) -> f64 {
        body_pct(self.open, self.close)
    }
}

impl From<&Candle> for SignalBar {
    fn from(c: &Candle) -> Self {
        Self::new(c.open, c.close)
    }
}

/// The individual veto rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    RiskTooSmall,
    RiskTooLarge,
    ReachedFirstTarget,
    Spike,
}

impl Filter {
    pub const ORDER: [Filter; 4] = [
        Filter::RiskTooSmall,
        Filter::RiskTooLarge,
        Filter::ReachedFirstTarget,
        Filter::Spike,
    ];
}

/// Ordered veto rules applied to a computed `RiskPlan`.
/// The first rule that fires decides; later rules are not evaluated.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    config: FilterConfig,
}

impl FilterPipeline {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Run every filter in order. `previous` is only consulted in
    /// `SpikeMode::TwoBar`.
    pub fn check(
        &self,
        plan: &RiskPlan,
        bar: &SignalBar,
        previous: Option<&SignalBar>,
        side: Side,
    ) -> Option<Reason> {
        Filter::ORDER.iter().find_map(|filter| {
            let veto = self.apply(*filter, plan, bar, previous, side);
            if let Some(reason) = &veto {
                debug!(?filter, %reason, risk_pct = plan.risk_pct, "Filter vetoed entry");
            }
            veto
        })
    }

    fn apply(
        &self,
        filter: Filter,
        plan: &RiskPlan,
        bar: &SignalBar,
        previous: Option<&SignalBar>,
        side: Side,
    ) -> Option<Reason> {
        let cfg = &self.config;
        match filter {
            Filter::RiskTooSmall => (plan.risk_pct < cfg.min_risk_pct)
                .then_some(Reason::RiskTooSmall { min_pct: cfg.min_risk_pct }),
            Filter::RiskTooLarge => (plan.risk_pct > cfg.max_risk_pct)
                .then_some(Reason::RiskTooLarge { max_pct: cfg.max_risk_pct }),
            Filter::ReachedFirstTarget => {
                reached_first_target(plan, bar.close, side).then_some(Reason::ReachedFirstTarget)
            }
            Filter::Spike => {
                let spiked = match (cfg.spike_mode, previous) {
                    (SpikeMode::TwoBar, Some(prev)) => {
                        is_two_bar_spike(bar, prev, cfg.spike_pct, cfg.spike_pair_pct)
                    }
                    _ => is_single_bar_spike(bar, cfg.spike_pct),
                };
                spiked.then_some(Reason::Spike)
            }
        }
    }
}

/// Price already travelled one full risk unit in the trade's favour before
/// an entry could be taken.
pub fn reached_first_target(plan: &RiskPlan, close: f64, side: Side) -> bool {
    match side {
        Side::Long => close - plan.entry >= plan.risk,
        Side::Short => plan.entry - close >= plan.risk,
    }
}

/// Signal bar body `>= threshold`.
pub fn is_single_bar_spike(bar: &SignalBar, threshold: f64) -> bool {
    bar.body_pct() >= threshold
}

/// Signal bar body `>= threshold`, or both bars' bodies `>= pair_threshold`.
pub fn is_two_bar_spike(
    bar: &SignalBar,
    previous: &SignalBar,
    threshold: f64,
    pair_threshold: f64,
) -> bool {
    let current = bar.body_pct();
    current >= threshold || (current >= pair_threshold && previous.body_pct() >= pair_threshold)
}
