use std::fmt::Write;

use common::{Decision, Outcome, Side};

/// Price formatting used in every message: 2 decimals from 100 up,
/// 4 decimals from 1 up, otherwise 6 significant digits.
pub fn format_price(x: f64) -> String {
    if x >= 100.0 {
        format!("{x:.2}")
    } else if x >= 1.0 {
        format!("{x:.4}")
    } else {
        significant(x, 6)
    }
}

fn significant(x: f64, digits: usize) -> String {
    if x == 0.0 || !x.is_finite() {
        return format!("{x:.prec$}", prec = digits - 1);
    }
    let magnitude = x.abs().log10().floor() as i32;
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    format!("{x:.decimals$}")
}

pub fn direction_label(side: Option<Side>) -> &'static str {
    match side {
        Some(Side::Long) => "多頭漸增 LONG 📈",
        Some(Side::Short) => "空頭漸增 SHORT 📉",
        None => "unknown",
    }
}

/// Operator message for a decision. `None` for ignored events, which are
/// never pushed.
pub fn render_decision(decision: &Decision) -> Option<String> {
    let headline = match (decision.outcome, &decision.reason) {
        (Outcome::Ignored, _) => return None,
        (Outcome::Recommend, _) => ">> ✅ Entry recommended".to_string(),
        (Outcome::Blocked, Some(reason)) => {
            format!(">> ⚠️ Entry NOT recommended (reason: {})", reason.notice())
        }
        (Outcome::Blocked, None) => ">> ⚠️ Entry NOT recommended".to_string(),
    };

    let ctx = &decision.context;
    let mut text = format!(
        "{headline}\n\n📊 Symbol: {}\n⏳ 4H trend: {}\n🕐 Timeframe: {}",
        ctx.symbol,
        direction_label(ctx.direction),
        ctx.timeframe,
    );

    if let Some(plan) = &decision.plan {
        let _ = write!(
            text,
            "\n🎯 Entry: {}\n🛡 SL: {}\n🥇 TP1: {}\n🥈 TP2: {}",
            format_price(plan.entry),
            format_price(plan.stop_loss),
            format_price(plan.take_profit_1),
            format_price(plan.take_profit_2),
        );
    }
    Some(text)
}

pub fn render_self_test(text: &str) -> String {
    format!("🔔 {text}")
}
