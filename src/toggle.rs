use indexmap::IndexMap;
use kuchiki::NodeRef;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::dom::{self, ARIA_HIDDEN, DATA_CATEGORY, Icon};
use crate::state::{ConsentState, LiveToggleState};
use crate::types::CategoryDescriptor;

static INLINE_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*>.*</.*>").expect("inline markup pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToggleKey {
    Category(String),
    Service { category: String, service: String },
}

impl ToggleKey {
    pub fn category(id: impl Into<String>) -> Self {
        ToggleKey::Category(id.into())
    }

    pub fn service(category: impl Into<String>, service: impl Into<String>) -> Self {
        ToggleKey::Service {
            category: category.into(),
            service: service.into(),
        }
    }

    pub fn category_id(&self) -> &str {
        match self {
            ToggleKey::Category(id) => id,
            ToggleKey::Service { category, .. } => category,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToggleHandle {
    key: ToggleKey,
    input: NodeRef,
    checked: bool,
    disabled: bool,
}

impl ToggleHandle {
    pub fn key(&self) -> &ToggleKey {
        &self.key
    }

    pub fn input(&self) -> &NodeRef {
        &self.input
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn id(&self) -> String {
        dom::get_attribute(&self.input, "id").unwrap_or_default()
    }

    fn set_checked(&mut self, checked: bool) {
        if self.disabled {
            return;
        }
        self.checked = checked;
        dom::set_flag(&self.input, "checked", checked);
    }
}

/// Category -> toggle and (category, service) -> toggle lookups for one render pass.
#[derive(Debug, Default)]
pub struct ToggleRegistry {
    categories: IndexMap<String, ToggleHandle>,
    services: IndexMap<String, IndexMap<String, ToggleHandle>>,
    next_id: usize,
}

impl ToggleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self, category: &str) -> Option<&ToggleHandle> {
        self.categories.get(category)
    }

    pub fn service(&self, category: &str, service: &str) -> Option<&ToggleHandle> {
        self.services.get(category)?.get(service)
    }

    pub fn get(&self, key: &ToggleKey) -> Option<&ToggleHandle> {
        match key {
            ToggleKey::Category(id) => self.category(id),
            ToggleKey::Service { category, service } => self.service(category, service),
        }
    }

    fn get_mut(&mut self, key: &ToggleKey) -> Option<&mut ToggleHandle> {
        match key {
            ToggleKey::Category(id) => self.categories.get_mut(id),
            ToggleKey::Service { category, service } => {
                self.services.get_mut(category)?.get_mut(service)
            }
        }
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// True once any toggle, category or service, is bound to `category`.
    pub fn is_bound(&self, category: &str) -> bool {
        self.categories.contains_key(category) || self.services.contains_key(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &ToggleHandle> {
        self.categories.values()
    }

    pub fn services_of(&self, category: &str) -> impl Iterator<Item = &ToggleHandle> {
        self.services
            .get(category)
            .into_iter()
            .flat_map(|services| services.values())
    }

    /// Checked services of `category`, in render order.
    pub fn checked_services(&self, category: &str) -> Vec<String> {
        self.services
            .get(category)
            .map(|services| {
                services
                    .iter()
                    .filter(|(_, handle)| handle.checked)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.categories.len() + self.services.values().map(IndexMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.categories.clear();
        self.services.clear();
        self.next_id = 0;
    }

    fn next_input_id(&mut self) -> String {
        let id = format!("pm__toggle-{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn register(&mut self, handle: ToggleHandle) {
        match handle.key.clone() {
            ToggleKey::Category(id) => {
                self.categories.insert(id, handle);
            }
            ToggleKey::Service { category, service } => {
                self.services
                    .entry(category)
                    .or_default()
                    .insert(service, handle);
            }
        }
    }
}

/// Drops inline open/close tag pairs so markup never leaks into the accessible label.
pub fn plain_label(label: &str) -> String {
    INLINE_MARKUP.replace_all(label, "").into_owned()
}

fn initial_checked(key: &ToggleKey, category: &CategoryDescriptor, consent: &ConsentState) -> bool {
    if category.read_only {
        return true;
    }
    if consent.invalid_consent {
        return category.enabled;
    }
    match key {
        ToggleKey::Category(id) => consent.is_category_accepted(id),
        ToggleKey::Service { category, service } => consent.is_service_accepted(category, service),
    }
}

/// Builds a labelled checkbox bound to `key` and registers it.
///
/// Returns the `<label>` wrapper; the input inside it is reachable through
/// the registry.
pub fn create_toggle(
    label: &str,
    key: ToggleKey,
    category: &CategoryDescriptor,
    consent: &ConsentState,
    registry: &mut ToggleRegistry,
) -> NodeRef {
    let toggle_label = dom::create_node("label");
    let toggle = dom::create_node("input");
    let toggle_icon = dom::create_node("span");
    let toggle_icon_circle = dom::create_node("span");
    let toggle_label_span = dom::create_node("span");
    let toggle_on_icon = dom::create_node("span");
    let toggle_off_icon = dom::create_node("span");

    dom::append_markup(&toggle_on_icon, &dom::svg_icon(Icon::Tick, 3.0));
    dom::append_markup(&toggle_off_icon, &dom::svg_icon(Icon::Cross, 3.0));

    dom::set_attribute(&toggle, "type", "checkbox");
    dom::add_class(&toggle_label, "section__toggle-wrapper");
    dom::add_class(&toggle, "section__toggle");
    dom::add_class(&toggle_on_icon, "toggle__icon-on");
    dom::add_class(&toggle_off_icon, "toggle__icon-off");
    dom::add_class(&toggle_icon, "toggle__icon");
    dom::add_class(&toggle_icon_circle, "toggle__icon-circle");
    dom::add_class(&toggle_label_span, "toggle__label");
    dom::set_attribute(&toggle_icon, ARIA_HIDDEN, "true");

    let value = match &key {
        ToggleKey::Category(id) => id.clone(),
        ToggleKey::Service { category, service } => {
            dom::add_class(&toggle_label, "toggle-service");
            dom::set_attribute(&toggle, DATA_CATEGORY, category.as_str());
            service.clone()
        }
    };
    dom::set_attribute(&toggle, "value", value);
    dom::set_attribute(&toggle, "id", registry.next_input_id());
    dom::append_text(&toggle_label_span, &plain_label(label));

    toggle_icon_circle.append(toggle_off_icon);
    toggle_icon_circle.append(toggle_on_icon);
    toggle_icon.append(toggle_icon_circle);

    let checked = initial_checked(&key, category, consent);
    let disabled = category.read_only;
    dom::set_flag(&toggle, "checked", checked);
    dom::set_flag(&toggle, "disabled", disabled);

    toggle_label.append(toggle.clone());
    toggle_label.append(toggle_icon);
    toggle_label.append(toggle_label_span);

    registry.register(ToggleHandle {
        key,
        input: toggle,
        checked,
        disabled,
    });

    toggle_label
}

/// Category -> services: every sibling service follows the category.
pub fn on_category_change(registry: &mut ToggleRegistry, live: &mut LiveToggleState, category: &str) {
    let Some(checked) = registry.category(category).map(ToggleHandle::is_checked) else {
        return;
    };
    if let Some(services) = registry.services.get_mut(category) {
        for handle in services.values_mut() {
            handle.set_checked(checked);
        }
    }
    let enabled = registry.checked_services(category);
    debug!(category, checked, enabled = enabled.len(), "category toggle changed");
    live.set_enabled_services(category, enabled);
}

/// Services -> category: the category is checked iff any service is.
pub fn on_service_change(registry: &mut ToggleRegistry, live: &mut LiveToggleState, category: &str) {
    let enabled = registry.checked_services(category);
    let any_enabled = !enabled.is_empty();
    if let Some(handle) = registry.categories.get_mut(category) {
        handle.set_checked(any_enabled);
    }
    debug!(category, enabled = enabled.len(), "service toggle changed");
    live.set_enabled_services(category, enabled);
}

/// Once a category has services it is a view of them; a persisted category
/// flag that disagrees with its services is overridden.
pub fn reconcile_category(registry: &mut ToggleRegistry, category: &str) {
    if !registry.services.get(category).is_some_and(|services| !services.is_empty()) {
        return;
    }
    let any_enabled = registry.services_of(category).any(ToggleHandle::is_checked);
    if let Some(handle) = registry.categories.get_mut(category) {
        if handle.checked != any_enabled {
            debug!(category, checked = any_enabled, "category toggle reconciled with services");
        }
        handle.set_checked(any_enabled);
    }
}

/// A user click on the checkbox bound to `key`.
///
/// Returns false when nothing changed (unknown or disabled toggle).
pub fn click(registry: &mut ToggleRegistry, live: &mut LiveToggleState, key: &ToggleKey) -> bool {
    let Some(handle) = registry.get_mut(key) else {
        return false;
    };
    if handle.disabled {
        return false;
    }
    let next = !handle.checked;
    handle.set_checked(next);
    match key {
        ToggleKey::Category(id) => on_category_change(registry, live, id),
        ToggleKey::Service { category, .. } => on_service_change(registry, live, category),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn analytics() -> CategoryDescriptor {
        CategoryDescriptor::new()
            .service("ga", Some("Google Analytics"))
            .service("hotjar", None)
            .service("matomo", None)
    }

    fn render(
        id: &str,
        category: &CategoryDescriptor,
        consent: &ConsentState,
    ) -> (ToggleRegistry, LiveToggleState) {
        let mut registry = ToggleRegistry::new();
        let mut live = LiveToggleState::default();
        create_toggle(id, ToggleKey::category(id), category, consent, &mut registry);
        for service in category.services.keys() {
            create_toggle(
                service,
                ToggleKey::service(id, service.as_str()),
                category,
                consent,
                &mut registry,
            );
        }
        live.set_enabled_services(id, registry.checked_services(id));
        (registry, live)
    }

    fn is_checked(registry: &ToggleRegistry, key: &ToggleKey) -> bool {
        registry.get(key).expect("toggle").is_checked()
    }

    #[test]
    fn restores_valid_consent() {
        let consent = ConsentState::default()
            .accept_category("analytics")
            .accept_service("analytics", "ga");
        let (registry, live) = render("analytics", &analytics(), &consent);

        assert!(is_checked(&registry, &ToggleKey::category("analytics")));
        assert!(is_checked(&registry, &ToggleKey::service("analytics", "ga")));
        assert!(!is_checked(&registry, &ToggleKey::service("analytics", "hotjar")));
        assert!(!is_checked(&registry, &ToggleKey::service("analytics", "matomo")));
        assert_eq!(live.enabled_services("analytics"), ["ga".to_string()]);
    }

    #[test]
    fn invalid_consent_uses_category_default() {
        let category = CategoryDescriptor::new().enabled(true);
        let (registry, _) = render("functional", &category, &ConsentState::invalid());
        let handle = registry.category("functional").expect("toggle");
        assert!(handle.is_checked());
        assert!(!handle.is_disabled());
        assert!(dom::has_attribute(handle.input(), "checked"));
    }

    #[test]
    fn read_only_ignores_clicks() {
        let category = analytics().read_only(true);
        let (mut registry, mut live) = render("necessary", &category, &ConsentState::default());

        let keys = [
            ToggleKey::category("necessary"),
            ToggleKey::service("necessary", "ga"),
            ToggleKey::service("necessary", "hotjar"),
        ];
        for key in &keys {
            assert!(!click(&mut registry, &mut live, key));
        }
        for key in &keys {
            let handle = registry.get(key).expect("toggle");
            assert!(handle.is_checked() && handle.is_disabled());
            assert!(dom::has_attribute(handle.input(), "disabled"));
        }
    }

    #[test]
    fn category_click_cascades_to_services() {
        let (mut registry, mut live) = render("analytics", &analytics(), &ConsentState::default());

        assert!(click(&mut registry, &mut live, &ToggleKey::category("analytics")));
        assert_eq!(registry.checked_services("analytics").len(), 3);
        assert_eq!(live.enabled_services("analytics").len(), 3);

        assert!(click(&mut registry, &mut live, &ToggleKey::category("analytics")));
        assert!(registry.checked_services("analytics").is_empty());
        assert!(live.enabled_services("analytics").is_empty());
        assert!(registry.services_of("analytics").all(|h| !dom::has_attribute(h.input(), "checked")));
    }

    #[test]
    fn reconcile_follows_services_not_persisted_category() {
        let accepted_only = ConsentState::default().accept_category("analytics");
        let (mut registry, _) = render("analytics", &analytics(), &accepted_only);
        assert!(is_checked(&registry, &ToggleKey::category("analytics")));
        reconcile_category(&mut registry, "analytics");
        assert!(!is_checked(&registry, &ToggleKey::category("analytics")));
        let input = registry.category("analytics").expect("toggle").input().clone();
        assert!(!dom::has_attribute(&input, "checked"));

        let service_only = ConsentState::default().accept_service("analytics", "hotjar");
        let (mut registry, _) = render("analytics", &analytics(), &service_only);
        reconcile_category(&mut registry, "analytics");
        assert!(is_checked(&registry, &ToggleKey::category("analytics")));

        let read_only = analytics().read_only(true);
        let (mut registry, _) = render("necessary", &read_only, &ConsentState::default());
        reconcile_category(&mut registry, "necessary");
        assert!(is_checked(&registry, &ToggleKey::category("necessary")));

        let (mut registry, _) = render("ads", &CategoryDescriptor::new(), &ConsentState::default().accept_category("ads"));
        reconcile_category(&mut registry, "ads");
        assert!(is_checked(&registry, &ToggleKey::category("ads")));
    }

    #[test]
    fn category_without_services_is_checked_directly() {
        let category = CategoryDescriptor::new();
        let (mut registry, mut live) = render("ads", &category, &ConsentState::default());
        assert!(click(&mut registry, &mut live, &ToggleKey::category("ads")));
        assert!(is_checked(&registry, &ToggleKey::category("ads")));
        assert!(live.enabled_services("ads").is_empty());
    }

    #[test]
    fn service_label_drops_inline_markup() {
        assert_eq!(plain_label("Analytics <span class=\"x\">beta</span>"), "Analytics ");
        assert_eq!(plain_label("Plain"), "Plain");

        let mut registry = ToggleRegistry::new();
        let wrapper = create_toggle(
            "YouTube <b>embed</b>",
            ToggleKey::service("media", "yt"),
            &CategoryDescriptor::new(),
            &ConsentState::default(),
            &mut registry,
        );
        let span = wrapper.select_first(".toggle__label").expect("label span");
        assert_eq!(span.as_node().text_contents(), "YouTube ");
        let input = registry.service("media", "yt").expect("toggle").input().clone();
        assert_eq!(dom::get_attribute(&input, DATA_CATEGORY).as_deref(), Some("media"));
        assert_eq!(dom::get_attribute(&input, "value").as_deref(), Some("yt"));
    }

    #[test]
    fn input_ids_are_unique() {
        let (registry, _) = render("analytics", &analytics(), &ConsentState::default());
        let mut ids: Vec<String> = registry
            .categories()
            .chain(registry.services_of("analytics"))
            .map(ToggleHandle::id)
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, registry.len());
    }

    proptest! {
        #[test]
        fn category_tracks_services_under_any_clicks(clicks in proptest::collection::vec(0usize..3, 1..40)) {
            let category = analytics();
            let services: Vec<String> = category.services.keys().cloned().collect();
            let (mut registry, mut live) = render("analytics", &category, &ConsentState::default());

            for index in clicks {
                let key = ToggleKey::service("analytics", services[index].as_str());
                prop_assert!(click(&mut registry, &mut live, &key));
                let any = registry.services_of("analytics").any(ToggleHandle::is_checked);
                prop_assert_eq!(is_checked(&registry, &ToggleKey::category("analytics")), any);
                prop_assert_eq!(live.enabled_services("analytics").to_vec(), registry.checked_services("analytics"));
            }
        }
    }
}
