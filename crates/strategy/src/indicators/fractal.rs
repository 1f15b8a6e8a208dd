use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Candle, PivotPoint, Side};

/// Fractal swing-pivot locator.
///
/// A bar is a pivot when its low (long setups) or high (short setups) is
/// strictly more extreme than each of the `left_right` bars on both sides.
/// Bars are scanned from the most recent confirmable one backward, and the
/// first hit wins even if an older pivot is more extreme. Without any
/// fractal the extreme of the last `lookback` bars is used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PivotLocator {
    pub left_right: usize,
    pub lookback: usize,
}

impl Default for PivotLocator {
    fn default() -> Self {
        Self {
            left_right: 2,
            lookback: 50,
        }
    }
}

impl PivotLocator {
    /// Minimum number of bars always requested from price history.
    pub const MIN_REQUEST: usize = 100;

    pub fn new(left_right: usize, lookback: usize) -> Self {
        assert!(left_right >= 1, "pivot left/right span must be >= 1");
        assert!(lookback >= 1, "pivot lookback must be >= 1");
        Self { left_right, lookback }
    }

    /// Bars to request so the scan and the fallback window are both covered.
    pub fn required_bars(&self) -> usize {
        (self.lookback + 2 * self.left_right + 3).max(Self::MIN_REQUEST)
    }

    /// Locate the pivot for `side` in `candles` (oldest first).
    /// Returns `None` only when `candles` is empty.
    pub fn locate(&self, candles: &[Candle], side: Side) -> Option<PivotPoint> {
        if let Some(pivot) = self.find_fractal(candles, side) {
            debug!(price = pivot.price, %side, "Fractal pivot found");
            return Some(pivot);
        }
        let fallback = self.window_extreme(candles, side);
        if let Some(p) = fallback {
            debug!(
                price = p.price,
                %side,
                lookback = self.lookback,
                "No fractal, using window extreme"
            );
        }
        fallback
    }

    /// Most recent confirmed fractal, if any.
    pub fn find_fractal(&self, candles: &[Candle], side: Side) -> Option<PivotPoint> {
        let l = self.left_right;
        if candles.len() < 2 * l + 1 {
            return None;
        }

        (l..=candles.len() - 1 - l).rev().find_map(|i| {
            let is_pivot = match side {
                Side::Long => {
                    let low = candles[i].low;
                    (1..=l).all(|j| low < candles[i - j].low && low < candles[i + j].low)
                }
                Side::Short => {
                    let high = candles[i].high;
                    (1..=l).all(|j| high > candles[i - j].high && high > candles[i + j].high)
                }
            };
            is_pivot.then(|| PivotPoint {
                price: match side {
                    Side::Long => candles[i].low,
                    Side::Short => candles[i].high,
                },
            })
        })
    }

    /// Lowest low (long) or highest high (short) over the last `lookback` bars.
    pub fn window_extreme(&self, candles: &[Candle], side: Side) -> Option<PivotPoint> {
        let start = candles.len().saturating_sub(self.lookback);
        let window = &candles[start..];
        if window.is_empty() {
            return None;
        }
        let price = match side {
            Side::Long => window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
            Side::Short => window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
        };
        Some(PivotPoint { price })
    }
}
