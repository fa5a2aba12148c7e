use kuchiki::NodeRef;
use tracing::warn;

use crate::dom::{self, ARIA_HIDDEN, BUTTON_TAG, DIV_TAG, Icon};
use crate::state::{ConsentState, LiveToggleState};
use crate::toggle::{self, ToggleKey, ToggleRegistry};
use crate::types::{
    CategoryDescriptor, ConsentConfig, CookieTable, PreferencesModalLabels, SectionDescriptor,
};

/// Index of an expandable section within the current render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    Collapsed,
    Expanded,
}

/// Expand/collapse state of one section; the DOM markers are derived from it.
#[derive(Debug, Clone)]
pub struct Accordion {
    category: String,
    section: NodeRef,
    title: NodeRef,
    region: NodeRef,
    state: Expansion,
}

impl Accordion {
    fn new(category: &str, section: NodeRef, title: NodeRef, region: NodeRef) -> Self {
        let accordion = Self {
            category: category.to_string(),
            section,
            title,
            region,
            state: Expansion::Collapsed,
        };
        accordion.project();
        accordion
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn state(&self) -> Expansion {
        self.state
    }

    pub fn is_expanded(&self) -> bool {
        self.state == Expansion::Expanded
    }

    pub fn toggle(&mut self) {
        self.state = match self.state {
            Expansion::Collapsed => Expansion::Expanded,
            Expansion::Expanded => Expansion::Collapsed,
        };
        self.project();
    }

    fn project(&self) {
        let expanded = self.is_expanded();
        if expanded {
            dom::add_class(&self.section, "is-expanded");
        } else {
            dom::remove_class(&self.section, "is-expanded");
        }
        dom::set_attribute(&self.title, "aria-expanded", expanded.to_string());
        dom::set_attribute(&self.region, ARIA_HIDDEN, (!expanded).to_string());
    }
}

/// Mutable state shared by every section built during one render pass.
pub struct RenderPass<'a> {
    pub config: &'a ConsentConfig,
    pub consent: &'a ConsentState,
    pub live: &'a mut LiveToggleState,
    pub registry: &'a mut ToggleRegistry,
    pub accordions: &'a mut Vec<Accordion>,
}

#[derive(Debug, Clone)]
pub struct RenderedSection {
    pub node: NodeRef,
    pub has_toggle: bool,
    pub accordion: Option<SectionId>,
}

/// `singular|plural` template; plural only when there is more than one service.
pub fn service_counter_text(template: &str, count: usize) -> (String, String) {
    let parts: Vec<&str> = template.split('|').collect();
    let label = if parts.len() > 1 && count > 1 {
        parts[1]
    } else {
        parts[0]
    };
    let text = if label.is_empty() {
        count.to_string()
    } else {
        format!("{count} {label}")
    };
    (label.to_string(), text)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

pub fn render_section(
    pass: &mut RenderPass<'_>,
    descriptor: &SectionDescriptor,
    index: usize,
    labels: &PreferencesModalLabels,
) -> Option<RenderedSection> {
    if descriptor.is_empty() {
        return None;
    }

    let title_data = non_empty(&descriptor.title);
    let description_data = non_empty(&descriptor.description);
    let linked_category = non_empty(&descriptor.linked_category);

    let config = pass.config;
    let mut category: Option<(&str, &CategoryDescriptor)> =
        linked_category.and_then(|id| config.category(id).map(|c| (id, c)));
    if let Some((id, _)) = category {
        if pass.registry.is_bound(id) {
            warn!(category = id, section = index, "category already bound, rendering section without toggle");
            category = None;
        }
    }
    let has_toggle = category.is_some();

    let table = descriptor
        .cookie_table
        .as_ref()
        .filter(|table| !table.body.is_empty());
    let service_count = category.map(|(_, c)| c.services.len()).unwrap_or(0);
    let expandable =
        has_toggle && (description_data.is_some() || table.is_some() || service_count > 0);

    let section = dom::create_node(DIV_TAG);
    dom::add_class_pm(&section, "section");

    let desc_container = (expandable || description_data.is_some()).then(|| {
        let node = dom::create_node(DIV_TAG);
        dom::add_class_pm(&node, "section-desc-wrapper");
        node
    });

    if let (Some((category_id, category_object)), Some(container)) = (category, &desc_container) {
        if expandable && service_count > 0 {
            let services = render_services(pass, category_id, category_object);
            container.append(services);
        }
    }

    let mut title_button = None;
    if let Some(title) = title_data {
        let title_container = dom::create_node(DIV_TAG);
        let title_node = if expandable {
            dom::create_node(BUTTON_TAG)
        } else {
            dom::create_node(DIV_TAG)
        };
        dom::add_class_pm(&title_container, "section-title-wrapper");
        dom::add_class_pm(&title_node, "section-title");
        dom::set_inner_html(&title_node, title);
        title_container.append(title_node.clone());

        if let Some((category_id, category_object)) = category {
            let arrow = dom::create_node("span");
            dom::append_markup(&arrow, &dom::svg_icon(Icon::Arrow, 3.5));
            dom::add_class_pm(&arrow, "section-arrow");
            title_container.append(arrow);

            dom::set_attribute(&section, "class", "pm__section--toggle");

            let toggle_label = toggle::create_toggle(
                title,
                ToggleKey::category(category_id),
                category_object,
                pass.consent,
                pass.registry,
            );

            if let Some(template) = labels.service_counter_label.as_deref() {
                if service_count > 0 {
                    title_node.append(service_counter(template, service_count));
                }
            }

            if expandable {
                dom::add_class_pm(&section, "section--expandable");
                dom::set_attribute(&title_node, "aria-controls", format!("{category_id}-desc"));
            }

            title_container.append(toggle_label);
        }

        if !expandable {
            dom::set_attribute(&title_node, "role", "heading");
            dom::set_attribute(&title_node, "aria-level", "3");
        } else {
            title_button = Some(title_node);
        }

        section.append(title_container);
    }

    if let (Some(description), Some(container)) = (description_data, &desc_container) {
        let paragraph = dom::create_node("p");
        dom::add_class_pm(&paragraph, "section-desc");
        dom::set_inner_html(&paragraph, description);
        container.append(paragraph);
    }

    let mut accordion = None;
    if let (true, Some((category_id, _)), Some(container)) = (expandable, category, &desc_container) {
        dom::set_attribute(container, "id", format!("{category_id}-desc"));
        if let Some(title_node) = title_button {
            let id = SectionId(pass.accordions.len());
            pass.accordions.push(Accordion::new(
                category_id,
                section.clone(),
                title_node,
                container.clone(),
            ));
            accordion = Some(id);
        } else {
            dom::set_attribute(container, ARIA_HIDDEN, "true");
        }

        if let Some(table) = table {
            container.append(render_cookie_table(table, index));
        }
    }

    if let Some(container) = desc_container {
        section.append(container);
    }

    if let Some((category_id, _)) = category {
        toggle::reconcile_category(pass.registry, category_id);
        let enabled = pass.registry.checked_services(category_id);
        pass.live.set_enabled_services(category_id, enabled);
    }

    Some(RenderedSection {
        node: section,
        has_toggle,
        accordion,
    })
}

fn render_services(
    pass: &mut RenderPass<'_>,
    category_id: &str,
    category: &CategoryDescriptor,
) -> NodeRef {
    let services_container = dom::create_node(DIV_TAG);
    dom::add_class_pm(&services_container, "section-services");

    for (service_name, service) in &category.services {
        let service_label = service
            .label
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(service_name);

        let service_div = dom::create_node(DIV_TAG);
        let service_header = dom::create_node(DIV_TAG);
        let service_icon = dom::create_node(DIV_TAG);
        let service_title = dom::create_node(DIV_TAG);

        dom::add_class_pm(&service_div, "service");
        dom::add_class_pm(&service_title, "service-title");
        dom::add_class_pm(&service_header, "service-header");
        dom::add_class_pm(&service_icon, "service-icon");

        let toggle_label = toggle::create_toggle(
            service_label,
            ToggleKey::service(category_id, service_name.as_str()),
            category,
            pass.consent,
            pass.registry,
        );
        dom::set_inner_html(&service_title, service_label);

        service_header.append(service_icon);
        service_header.append(service_title);
        service_div.append(service_header);
        service_div.append(toggle_label);
        services_container.append(service_div);
    }

    services_container
}

fn service_counter(template: &str, count: usize) -> NodeRef {
    let badge = dom::create_node("span");
    dom::add_class_pm(&badge, "badge");
    dom::add_class_pm(&badge, "service-counter");
    dom::set_attribute(&badge, ARIA_HIDDEN, "true");
    dom::set_attribute(&badge, "data-servicecounter", count.to_string());

    let (label, text) = service_counter_text(template, count);
    if !label.is_empty() {
        dom::set_attribute(&badge, "data-counterlabel", label);
    }
    dom::set_inner_html(&badge, &text);
    badge
}

fn render_cookie_table(table: &CookieTable, index: usize) -> NodeRef {
    let table_node = dom::create_node("table");
    let thead = dom::create_node("thead");
    let tbody = dom::create_node("tbody");

    if let Some(caption_text) = non_empty(&table.caption) {
        let caption = dom::create_node("caption");
        dom::add_class_pm(&caption, "table-caption");
        dom::set_inner_html(&caption, caption_text);
        table_node.append(caption);
    }

    dom::add_class_pm(&table_node, "section-table");
    dom::add_class_pm(&thead, "table-head");
    dom::add_class_pm(&tbody, "table-body");

    let head_row = dom::create_node("tr");
    for header_value in table.headers.values() {
        let th = dom::create_node("th");
        dom::set_attribute(&th, "id", format!("cc__row-{header_value}{index}"));
        dom::set_attribute(&th, "scope", "col");
        dom::add_class_pm(&th, "table-th");
        dom::set_inner_html(&th, header_value);
        head_row.append(th);
    }
    thead.append(head_row);

    for record in &table.body {
        let tr = dom::create_node("tr");
        dom::add_class_pm(&tr, "table-tr");

        for (key, header_value) in &table.headers {
            let td = dom::create_node("td");
            let td_inner = dom::create_node(DIV_TAG);
            dom::add_class_pm(&td, "table-td");
            dom::set_attribute(&td, "data-column", header_value.as_str());
            dom::set_attribute(&td, "headers", format!("cc__row-{header_value}{index}"));
            // Cell values are trusted config markup.
            if let Some(value) = record.get(key) {
                dom::append_markup(&td_inner, value);
            }
            td.append(td_inner);
            tr.append(td);
        }

        tbody.append(tr);
    }

    table_node.append(thead);
    table_node.append(tbody);
    table_node
}
