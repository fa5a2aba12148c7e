use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::debug::DebugLogger;
use crate::error::ConsentError;
use crate::types::{ConsentConfig, PreferencesModalLabels, TranslationBundle};

/// Persisted consent record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentState {
    #[serde(default)]
    pub accepted_categories: Vec<String>,
    #[serde(default)]
    pub accepted_services: IndexMap<String, Vec<String>>,
    /// When set the record is ignored and category defaults apply.
    #[serde(default)]
    pub invalid_consent: bool,
    #[serde(default)]
    pub use_tabs_layout: bool,
}

impl ConsentState {
    /// A state with no trusted record; every toggle falls back to defaults.
    pub fn invalid() -> Self {
        Self {
            invalid_consent: true,
            ..Self::default()
        }
    }

    pub fn is_category_accepted(&self, category: &str) -> bool {
        self.accepted_categories.iter().any(|c| c == category)
    }

    pub fn is_service_accepted(&self, category: &str, service: &str) -> bool {
        self.accepted_services
            .get(category)
            .is_some_and(|services| services.iter().any(|s| s == service))
    }

    pub fn accept_category(mut self, category: impl Into<String>) -> Self {
        self.accepted_categories.push(category.into());
        self
    }

    pub fn accept_service(mut self, category: &str, service: impl Into<String>) -> Self {
        self.accepted_services
            .entry(category.to_string())
            .or_default()
            .push(service.into());
        self
    }
}

/// Enabled services per rendered category, as edited by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveToggleState {
    enabled_services: IndexMap<String, Vec<String>>,
}

impl LiveToggleState {
    pub fn enabled_services(&self, category: &str) -> &[String] {
        self.enabled_services
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set_enabled_services(&mut self, category: &str, services: Vec<String>) {
        self.enabled_services.insert(category.to_string(), services);
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.enabled_services.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.enabled_services
    }

    pub fn clear(&mut self) {
        self.enabled_services.clear();
    }
}

/// Explicit session context handed to every component.
pub struct Session {
    pub config: ConsentConfig,
    pub translation: Option<TranslationBundle>,
    pub consent: ConsentState,
    pub live: LiveToggleState,
    pub(crate) preferences_modal_exists: bool,
    pub(crate) debug: Option<DebugLogger>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn modal_labels(&self) -> Option<&PreferencesModalLabels> {
        self.translation
            .as_ref()
            .and_then(|bundle| bundle.preferences_modal.as_ref())
    }

    pub fn preferences_modal_exists(&self) -> bool {
        self.preferences_modal_exists
    }

    pub fn debug_logger(&self) -> Option<&DebugLogger> {
        self.debug.as_ref()
    }
}

pub struct SessionBuilder {
    config: Option<ConsentConfig>,
    translation: Option<TranslationBundle>,
    consent: ConsentState,
    debug_writer: Option<Box<dyn Write>>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            translation: None,
            consent: ConsentState::invalid(),
            debug_writer: None,
        }
    }

    pub fn config(mut self, config: ConsentConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn translation(mut self, bundle: TranslationBundle) -> Self {
        self.translation = Some(bundle);
        self
    }

    pub fn consent(mut self, consent: ConsentState) -> Self {
        self.consent = consent;
        self
    }

    // JSON-lines render records; see `DebugLogger`.
    pub fn debug_writer(mut self, writer: impl Write + 'static) -> Self {
        self.debug_writer = Some(Box::new(writer));
        self
    }

    pub fn build(self) -> Result<Session, ConsentError> {
        let config = self.config.ok_or_else(|| {
            ConsentError::InvalidConfiguration("session requires a category config".to_string())
        })?;
        Ok(Session {
            config,
            translation: self.translation,
            consent: self.consent,
            live: LiveToggleState::default(),
            preferences_modal_exists: false,
            debug: self.debug_writer.map(DebugLogger::new),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Persistence {
    fn load(&self) -> ConsentState;
    fn save(&mut self, state: &ConsentState) -> Result<(), ConsentError>;
}

/// Keeps the JSON encoding of the state, the shape a consent cookie carries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl Persistence for MemoryStore {
    fn load(&self) -> ConsentState {
        self.value
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_else(ConsentState::invalid)
    }

    fn save(&mut self, state: &ConsentState) -> Result<(), ConsentError> {
        self.value = Some(serde_json::to_string(state)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_tests_follow_record() {
        let state = ConsentState::default()
            .accept_category("analytics")
            .accept_service("analytics", "ga");
        assert!(state.is_category_accepted("analytics"));
        assert!(!state.is_category_accepted("ads"));
        assert!(state.is_service_accepted("analytics", "ga"));
        assert!(!state.is_service_accepted("analytics", "hotjar"));
        assert!(!state.is_service_accepted("ads", "ga"));
    }

    #[test]
    fn empty_store_loads_invalid_consent() {
        let store = MemoryStore::new();
        assert!(store.load().invalid_consent);
    }

    #[test]
    fn store_round_trips_through_json() {
        let mut store = MemoryStore::new();
        let state = ConsentState {
            use_tabs_layout: true,
            ..ConsentState::default().accept_category("necessary")
        };
        store.save(&state).expect("save");
        assert!(store.raw().expect("raw").contains("\"useTabsLayout\":true"));
        assert_eq!(store.load(), state);
    }

    #[test]
    fn builder_requires_config() {
        let err = Session::builder().build().err().expect("missing config");
        assert!(matches!(err, ConsentError::InvalidConfiguration(_)));
    }

    #[test]
    fn live_state_defaults_to_no_services() {
        let mut live = LiveToggleState::default();
        assert!(live.enabled_services("analytics").is_empty());
        live.set_enabled_services("analytics", vec!["ga".to_string()]);
        assert_eq!(live.enabled_services("analytics"), ["ga".to_string()]);
        assert_eq!(live.categories().collect::<Vec<_>>(), ["analytics"]);
    }
}
