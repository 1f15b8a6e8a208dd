use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Trade direction. Used both for the recorded higher-timeframe trend and
/// for the side of an entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    /// Parse the stored representation (`LONG` / `SHORT`). Anything else is `None`.
    pub fn from_stored(value: &str) -> Option<Side> {
        match value {
            "LONG" => Some(Side::Long),
            "SHORT" => Some(Side::Short),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip an `EXCHANGE:` prefix and a `.P` perpetual suffix.
/// `BINANCE:BTCUSDT.P` becomes `BTCUSDT`.
pub fn normalize_symbol(raw: &str) -> String {
    let s = raw.rsplit(':').next().unwrap_or(raw).trim();
    s.strip_suffix(".P").unwrap_or(s).to_string()
}

/// Map a webhook interval (numeric minutes, `1D` or `4H`) to a kline interval.
/// Unknown values fall back to 15 minutes.
pub fn kline_interval(interval: &str) -> &'static str {
    match interval.trim() {
        "1" => "1m",
        "3" => "3m",
        "5" => "5m",
        "15" => "15m",
        "30" => "30m",
        "60" => "1h",
        "120" => "2h",
        "240" | "4H" => "4h",
        "1D" => "1d",
        _ => "15m",
    }
}

/// One closed bar of price history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self { open, high, low, close }
    }
}

/// `|close - open| / open`, guarded against a zero open.
pub fn body_pct(open: f64, close: f64) -> f64 {
    (close - open).abs() / open.max(1e-9)
}

/// The swing extreme found by the pivot locator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotPoint {
    pub price: f64,
}

/// Stop-loss and targets derived from an entry price and a pivot.
///
/// `risk > 0`, `risk_pct = risk / entry`; TP1 sits exactly 1x risk beyond the
/// entry and TP2 1.5x risk, on the profitable side for the trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskPlan {
    pub entry: f64,
    pub stop_loss: f64,
    pub risk: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub risk_pct: f64,
}

/// Kind of webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "DIRECTION_4H")]
    Direction4h,
    #[serde(rename = "ENTRY_SIGNAL")]
    EntrySignal,
    #[serde(other)]
    Unknown,
}

/// An incoming signal event, already authenticated by the boundary layer.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Free-text label such as "Long entry" or "多單進場".
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub interval: String,
    #[serde(default, deserialize_with = "optional_price")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "optional_price")]
    pub close: Option<f64>,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    use serde_json::Value;
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn optional_price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    use serde::de::Error as _;
    use serde_json::Value;
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(x) if x.is_finite() => Ok(Some(x)),
            _ => Err(D::Error::custom(format!("price is not numeric: {n}"))),
        },
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            // `parse` accepts "NaN" and "inf", which are not prices.
            Ok(x) if x.is_finite() => Ok(Some(x)),
            _ => Err(D::Error::custom(format!("price is not numeric: '{s}'"))),
        },
        Some(other) => Err(D::Error::custom(format!("price is not numeric: {other}"))),
    }
}

/// Final verdict of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Recommend,
    Blocked,
    Ignored,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Recommend => write!(f, "RECOMMEND"),
            Outcome::Blocked => write!(f, "BLOCKED"),
            Outcome::Ignored => write!(f, "IGNORED"),
        }
    }
}

/// Why an event was ignored or an entry blocked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reason {
    // Ignored
    UnknownEvent,
    UnrecognizedDirection,
    NotAligned,
    UnknownType,
    // Blocked
    MacroWindow,
    InvalidStop,
    RiskTooSmall { min_pct: f64 },
    RiskTooLarge { max_pct: f64 },
    ReachedFirstTarget,
    Spike,
}

impl Reason {
    /// Longer operator-facing wording used in notifications.
    pub fn notice(&self) -> String {
        match self {
            Reason::UnknownEvent => "unknown entry label".into(),
            Reason::UnrecognizedDirection => "unrecognized direction label".into(),
            Reason::NotAligned => "entry against the 4H trend".into(),
            Reason::UnknownType => "unknown event type".into(),
            Reason::MacroWindow => "major macro event window".into(),
            Reason::InvalidStop => "stop-loss on the wrong side of entry".into(),
            Reason::RiskTooSmall { min_pct } => format!("stop-loss under {}%", pct(*min_pct)),
            Reason::RiskTooLarge { max_pct } => format!("stop-loss over {}%", pct(*max_pct)),
            Reason::ReachedFirstTarget => "1:1 reached before entry".into(),
            Reason::Spike => "short-term spike".into(),
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::UnknownEvent => write!(f, "unknown event"),
            Reason::UnrecognizedDirection => write!(f, "unrecognized direction label"),
            Reason::NotAligned => write!(f, "direction not aligned with higher-timeframe trend"),
            Reason::UnknownType => write!(f, "unknown type"),
            Reason::MacroWindow => write!(f, "macro event window"),
            Reason::InvalidStop => write!(f, "invalid stop placement"),
            Reason::RiskTooSmall { min_pct } => write!(f, "risk < {}%", pct(*min_pct)),
            Reason::RiskTooLarge { max_pct } => write!(f, "risk > {}%", pct(*max_pct)),
            Reason::ReachedFirstTarget => write!(f, "reached RR1"),
            Reason::Spike => write!(f, "spike"),
        }
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Render a fraction as a trimmed percentage: 0.01 -> "1", 0.015 -> "1.5".
fn pct(fraction: f64) -> String {
    let s = format!("{:.2}", fraction * 100.0);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Who/what a decision is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionContext {
    pub symbol: String,
    /// Side of the entry signal, when the label was recognized.
    pub side: Option<Side>,
    /// Recorded higher-timeframe direction at evaluation time.
    pub direction: Option<Side>,
    /// Raw interval string from the event, kept for display.
    pub timeframe: String,
}

/// Result of evaluating one event. `reason` is present iff the outcome is
/// BLOCKED or IGNORED.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub outcome: Outcome,
    pub reason: Option<Reason>,
    pub plan: Option<RiskPlan>,
    pub context: DecisionContext,
}

impl Decision {
    pub fn recommend(plan: RiskPlan, context: DecisionContext) -> Self {
        Self {
            outcome: Outcome::Recommend,
            reason: None,
            plan: Some(plan),
            context,
        }
    }

    pub fn blocked(reason: Reason, plan: Option<RiskPlan>, context: DecisionContext) -> Self {
        Self {
            outcome: Outcome::Blocked,
            reason: Some(reason),
            plan,
            context,
        }
    }

    pub fn ignored(reason: Reason, context: DecisionContext) -> Self {
        Self {
            outcome: Outcome::Ignored,
            reason: Some(reason),
            plan: None,
            context,
        }
    }

    /// Only blocked and recommended entries are worth an operator message.
    pub fn is_notifiable(&self) -> bool {
        self.outcome != Outcome::Ignored
    }
}

/// What the evaluation engine produced for an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// A DIRECTION_4H event was stored.
    DirectionRecorded { symbol: String, side: Side },
    Decided(Decision),
}
