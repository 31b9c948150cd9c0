use serde::{Deserialize, Serialize};

use super::record::TitleStatus;

/// Sentinel values the normalizer falls back to when a field is blank or
/// cannot be interpreted. Historical summaries were built with the defaults
/// below; changing them changes the published aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationDefaults {
    pub unknown_creditor: String,
    pub campaign_label: String,
    pub default_campaign_number: String,
    pub client_label: String,
    pub unknown_client_suffix: String,
    pub default_status: TitleStatus,
}

impl Default for NormalizationDefaults {
    fn default() -> Self {
        Self {
            unknown_creditor: "Credor Desconhecido".to_string(),
            campaign_label: "Campanha".to_string(),
            default_campaign_number: "1".to_string(),
            client_label: "Cliente".to_string(),
            unknown_client_suffix: "X".to_string(),
            default_status: TitleStatus::Pending,
        }
    }
}

impl NormalizationDefaults {
    pub fn campaign(&self, number: &str) -> String {
        format!("{} {}", self.campaign_label, number)
    }

    pub fn default_campaign(&self) -> String {
        self.campaign(&self.default_campaign_number)
    }

    pub fn client(&self, suffix: &str) -> String {
        format!("{} {}", self.client_label, suffix)
    }

    pub fn unknown_client(&self) -> String {
        self.client(&self.unknown_client_suffix)
    }
}
