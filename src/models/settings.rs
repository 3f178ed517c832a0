// src/models/settings.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::yes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Setting {
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialAccount {
    pub platform: String,
    pub account_name: String,
    pub account_url: String,
    #[serde(default = "yes")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

pub type SettingsByCategory = BTreeMap<String, BTreeMap<String, Value>>;

pub fn group_settings(settings: Vec<Setting>) -> SettingsByCategory {
    let mut grouped = SettingsByCategory::new();
    for setting in settings {
        grouped
            .entry(setting.category)
            .or_default()
            .insert(setting.id, setting.value);
    }
    grouped
}

/// Groups accounts by platform, keeping their incoming order within a platform.
pub fn group_social(accounts: Vec<SocialAccount>) -> BTreeMap<String, Vec<SocialLink>> {
    let mut grouped: BTreeMap<String, Vec<SocialLink>> = BTreeMap::new();
    for account in accounts {
        grouped.entry(account.platform).or_default().push(SocialLink {
            name: account.account_name,
            url: account.account_url,
        });
    }
    grouped
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub settings: Option<Value>,
}

/// Per-key result of a bulk settings update.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct SettingsOutcome {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_group_by_category_then_key() {
        let grouped = group_settings(vec![
            Setting { id: "clinic_name".into(), category: "general".into(), value: json!("Klinik Sehat") },
            Setting { id: "open_hours".into(), category: "schedule".into(), value: json!({"mon": "08-16"}) },
            Setting { id: "phone".into(), category: "general".into(), value: json!("0812") },
        ]);
        assert_eq!(grouped["general"].len(), 2);
        assert_eq!(grouped["schedule"]["open_hours"]["mon"], "08-16");
    }

    #[test]
    fn social_accounts_group_by_platform() {
        let account = |platform: &str, name: &str| SocialAccount {
            platform: platform.into(),
            account_name: name.into(),
            account_url: format!("https://{platform}.com/{name}"),
            is_active: true,
            display_order: None,
        };
        let grouped = group_social(vec![
            account("instagram", "klinik.a"),
            account("tiktok", "klinik"),
            account("instagram", "klinik.b"),
        ]);
        assert_eq!(grouped["instagram"].len(), 2);
        assert_eq!(grouped["instagram"][1].name, "klinik.b");
        assert_eq!(grouped["tiktok"][0].url, "https://tiktok.com/klinik");
    }
}
