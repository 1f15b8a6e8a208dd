use serde::{Deserialize, Serialize};

use common::{Error, Result};
use risk::FilterConfig;
use strategy::{PivotLocator, SideVocabulary};

/// Optional signal-tuning file (TOML). Any missing section keeps its
/// default; a label section that is present must list both sides.
///
/// Example `config/signals.toml`:
/// ```toml
/// [entry_labels]
/// long = ["long", "多單進場", "buy"]
/// short = ["short", "空單進場", "sell"]
///
/// [pivot]
/// lookback = 60
///
/// [filters]
/// max_risk_pct = 0.025
/// spike_mode = "two_bar"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalFileConfig {
    /// Vocabulary for DIRECTION_4H labels.
    pub direction_labels: SideVocabulary,
    /// Vocabulary for ENTRY_SIGNAL labels.
    pub entry_labels: SideVocabulary,
    pub pivot: PivotLocator,
    pub filters: FilterConfig,
}

impl Default for SignalFileConfig {
    fn default() -> Self {
        Self {
            direction_labels: SideVocabulary::direction_defaults(),
            entry_labels: SideVocabulary::entry_defaults(),
            pivot: PivotLocator::default(),
            filters: FilterConfig::default(),
        }
    }
}

impl SignalFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path).unwrap_or_else(|e| {
            panic!("Failed to read signal config at '{path}': {e}")
        });
        Self::from_toml(&content).unwrap_or_else(|e| {
            panic!("Failed to parse signal config at '{path}': {e}")
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.pivot.left_right == 0 || self.pivot.lookback == 0 {
            return Err(Error::Config("pivot left_right and lookback must be >= 1".into()));
        }
        let f = &self.filters;
        if f.min_risk_pct > f.max_risk_pct {
            return Err(Error::Config(format!(
                "min_risk_pct ({}) exceeds max_risk_pct ({})",
                f.min_risk_pct, f.max_risk_pct
            )));
        }
        if f.stop_buffer_pct < 0.0 || f.stop_buffer_pct >= 1.0 {
            return Err(Error::Config("stop_buffer_pct must be in [0, 1)".into()));
        }
        Ok(())
    }
}
