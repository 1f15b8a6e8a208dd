use common::{RiskPlan, Side};

/// Derive stop-loss and targets from the entry price and the swing pivot.
///
/// The stop sits `stop_buffer_pct` beyond the pivot (below a swing low for
/// longs, above a swing high for shorts). TP1 is 1R and TP2 1.5R from entry.
/// Returns `None` when the resulting risk is not strictly positive, i.e. the
/// pivot is on the wrong side of the entry.
pub fn build_plan(entry: f64, pivot: f64, side: Side, stop_buffer_pct: f64) -> Option<RiskPlan> {
    if !(entry.is_finite() && pivot.is_finite()) || entry <= 0.0 {
        return None;
    }

    let (stop_loss, risk) = match side {
        Side::Long => {
            let sl = pivot * (1.0 - stop_buffer_pct);
            (sl, entry - sl)
        }
        Side::Short => {
            let sl = pivot * (1.0 + stop_buffer_pct);
            (sl, sl - entry)
        }
    };
    if risk <= 0.0 || !risk.is_finite() {
        return None;
    }

    let dir = match side {
        Side::Long => 1.0,
        Side::Short => -1.0,
    };

    Some(RiskPlan {
        entry,
        stop_loss,
        risk,
        take_profit_1: entry + dir * risk,
        take_profit_2: entry + dir * 1.5 * risk,
        risk_pct: risk / entry,
    })
}
