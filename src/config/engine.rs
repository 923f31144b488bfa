use super::traits::{require, ConfigManifest, ConfigSection, FieldManifest};
use crate::error::CurveLabError;
use crate::types::RegimeKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master seed; `None` draws one from entropy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub regimes: Vec<RegimeKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            regimes: RegimeKind::ALL.to_vec(),
        }
    }
}

impl ConfigSection for EngineConfig {
    fn section_name() -> &'static str {
        "engine"
    }

    fn validate(&self) -> Result<(), CurveLabError> {
        require(!self.regimes.is_empty(), "At least one regime must be enabled")
    }

    fn to_manifest(&self) -> ConfigManifest {
        ConfigManifest {
            section: "Engine".to_string(),
            fields: vec![FieldManifest::integer(
                "regimes",
                self.regimes.len(),
                1.0,
                RegimeKind::ALL.len() as f64,
                "Market regimes searched",
            )],
        }
    }
}
