use serde::{Deserialize, Serialize};

use common::Side;

/// Trigger phrases that map a free-text event label to a side.
///
/// Matching is a case-insensitive substring test. Long phrases are checked
/// before short phrases, so a label matching both resolves to `Long`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SideVocabulary {
    pub long: Vec<String>,
    pub short: Vec<String>,
}

impl SideVocabulary {
    pub fn new<I, S>(long: I, short: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            long: long.into_iter().map(Into::into).collect(),
            short: short.into_iter().map(Into::into).collect(),
        }
    }

    /// Phrases for higher-timeframe direction updates ("4H bullish ... Long", "多頭").
    pub fn direction_defaults() -> Self {
        Self::new(["long", "多"], ["short", "空"])
    }

    /// Phrases for entry signals ("Long entry", "多單進場").
    pub fn entry_defaults() -> Self {
        Self::new(["long", "多單進場"], ["short", "空單進場"])
    }

    pub fn detect(&self, label: &str) -> Option<Side> {
        let label = label.to_lowercase();
        let hit = |phrases: &[String]| {
            phrases
                .iter()
                .filter(|p| !p.is_empty())
                .any(|p| label.contains(&p.to_lowercase()))
        };

        if hit(&self.long) {
            Some(Side::Long)
        } else if hit(&self.short) {
            Some(Side::Short)
        } else {
            None
        }
    }
}
