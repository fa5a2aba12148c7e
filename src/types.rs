use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConsentError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDescriptor {
    #[serde(default)]
    pub read_only: bool,
    /// Default state when the persisted consent cannot be trusted.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub services: IndexMap<String, ServiceDescriptor>,
}

impl CategoryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn service(mut self, id: impl Into<String>, label: Option<&str>) -> Self {
        self.services.insert(
            id.into(),
            ServiceDescriptor {
                label: label.map(str::to_string),
            },
        );
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    #[serde(default)]
    pub label: Option<String>,
}

/// Declared categories, keyed and ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsentConfig {
    #[serde(default)]
    pub categories: IndexMap<String, CategoryDescriptor>,
}

impl ConsentConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConsentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn category(&self, id: &str) -> Option<&CategoryDescriptor> {
        self.categories.get(id)
    }

    pub fn with_category(mut self, id: impl Into<String>, category: CategoryDescriptor) -> Self {
        self.categories.insert(id.into(), category);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieTable {
    #[serde(default)]
    pub caption: Option<String>,
    /// Column key -> header text, in display order.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Each record is keyed by header key; values are trusted markup.
    #[serde(default)]
    pub body: Vec<IndexMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDescriptor {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub linked_category: Option<String>,
    #[serde(default)]
    pub cookie_table: Option<CookieTable>,
}

impl SectionDescriptor {
    pub fn is_empty(&self) -> bool {
        self.title.as_deref().is_none_or(str::is_empty)
            && self.description.as_deref().is_none_or(str::is_empty)
            && self.linked_category.as_deref().is_none_or(str::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabDescriptor {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsConfig {
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub tabs: Vec<TabDescriptor>,
}

/// Labels and content of the preferences dialog for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesModalLabels {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub close_icon_label: Option<String>,
    #[serde(default)]
    pub accept_all_btn: Option<String>,
    #[serde(default)]
    pub accept_necessary_btn: Option<String>,
    #[serde(default)]
    pub save_preferences_btn: Option<String>,
    /// `singular|plural` template for the service counter badge.
    #[serde(default)]
    pub service_counter_label: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionDescriptor>,
    #[serde(default)]
    pub tabs_config: Option<TabsConfig>,
}

impl PreferencesModalLabels {
    pub fn uses_tabs(&self) -> bool {
        self.tabs_config
            .as_ref()
            .is_some_and(|config| !config.tabs.is_empty())
    }

    pub fn has_footer(&self) -> bool {
        [
            &self.accept_all_btn,
            &self.accept_necessary_btn,
            &self.save_preferences_btn,
        ]
        .iter()
        .any(|label| label.as_deref().is_some_and(|text| !text.is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationBundle {
    #[serde(default)]
    pub preferences_modal: Option<PreferencesModalLabels>,
}

impl TranslationBundle {
    pub fn from_json_str(json: &str) -> Result<Self, ConsentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_preferences_modal(labels: PreferencesModalLabels) -> Self {
        Self {
            preferences_modal: Some(labels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_keeps_declaration_order() {
        let config = ConsentConfig::from_json_str(
            r#"{
                "categories": {
                    "necessary": { "readOnly": true, "enabled": true },
                    "analytics": {
                        "services": {
                            "ga": { "label": "Google Analytics" },
                            "hotjar": {}
                        }
                    }
                }
            }"#,
        )
        .expect("config");

        let ids: Vec<&str> = config.categories.keys().map(String::as_str).collect();
        assert_eq!(ids, ["necessary", "analytics"]);
        let analytics = config.category("analytics").expect("analytics");
        let services: Vec<&str> = analytics.services.keys().map(String::as_str).collect();
        assert_eq!(services, ["ga", "hotjar"]);
        assert!(config.category("necessary").expect("necessary").read_only);
    }

    #[test]
    fn bundle_parses_tabs_and_tables() {
        let bundle = TranslationBundle::from_json_str(
            r#"{
                "preferencesModal": {
                    "title": "Preferences",
                    "acceptAllBtn": "Accept all",
                    "serviceCounterLabel": "service|services",
                    "sections": [
                        {
                            "title": "Analytics",
                            "linkedCategory": "analytics",
                            "cookieTable": {
                                "caption": "Cookies",
                                "headers": { "name": "Name", "domain": "Domain" },
                                "body": [ { "name": "_ga", "domain": "example.com" } ]
                            }
                        }
                    ],
                    "tabsConfig": { "tabs": [ { "id": "a", "label": "A" } ] }
                }
            }"#,
        )
        .expect("bundle");

        let labels = bundle.preferences_modal.expect("labels");
        assert!(labels.uses_tabs());
        assert!(labels.has_footer());
        let table = labels.sections[0].cookie_table.as_ref().expect("table");
        let keys: Vec<&str> = table.headers.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "domain"]);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = ConsentConfig::from_json_str("{ categories: ").expect_err("invalid");
        assert!(matches!(err, ConsentError::Json(_)));
    }

    #[test]
    fn empty_strings_count_as_missing_content() {
        let section = SectionDescriptor {
            title: Some(String::new()),
            ..SectionDescriptor::default()
        };
        assert!(section.is_empty());
        assert!(!PreferencesModalLabels::default().has_footer());
    }
}
