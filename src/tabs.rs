use kuchiki::NodeRef;

use crate::dom::{self, ARIA_HIDDEN, BUTTON_TAG, DIV_TAG};
use crate::interaction::Key;
use crate::section::RenderedSection;
use crate::types::{SectionDescriptor, TabsConfig};

const DEFAULT_TABLIST_LABEL: &str = "Preference categories";

/// Rendered tabs plus the single active index they project.
#[derive(Debug, Clone)]
pub struct TabContainer {
    tablist: NodeRef,
    buttons: Vec<NodeRef>,
    panels: Vec<NodeRef>,
    active: usize,
}

impl TabContainer {
    pub fn tablist(&self) -> &NodeRef {
        &self.tablist
    }

    pub fn buttons(&self) -> &[NodeRef] {
        &self.buttons
    }

    pub fn panels(&self) -> &[NodeRef] {
        &self.panels
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    pub fn select(&mut self, index: usize) {
        if index >= self.buttons.len() {
            return;
        }
        self.active = index;
        self.project();
    }

    /// Roving keyboard selection from the tab at `current`.
    ///
    /// Returns the newly selected index, or `None` when the key is not a
    /// navigation key.
    pub fn handle_key(&mut self, current: usize, key: Key) -> Option<usize> {
        let count = self.buttons.len();
        if count == 0 {
            return None;
        }
        let current = current.min(count - 1);
        let next = match key {
            Key::ArrowLeft => {
                if current == 0 {
                    count - 1
                } else {
                    current - 1
                }
            }
            Key::ArrowRight => {
                if current == count - 1 {
                    0
                } else {
                    current + 1
                }
            }
            Key::Home => 0,
            Key::End => count - 1,
            _ => return None,
        };
        self.select(next);
        Some(next)
    }

    fn project(&self) {
        for (idx, button) in self.buttons.iter().enumerate() {
            let is_active = idx == self.active;
            dom::set_attribute(button, "aria-selected", is_active.to_string());
            dom::set_attribute(button, "tabindex", if is_active { "0" } else { "-1" });
            if is_active {
                dom::add_class_pm(button, "tab--active");
            } else {
                dom::remove_class_pm(button, "tab--active");
            }
        }

        for (idx, panel) in self.panels.iter().enumerate() {
            if idx == self.active {
                dom::set_attribute(panel, ARIA_HIDDEN, "false");
                dom::remove_class_pm(panel, "tabpanel--hidden");
            } else {
                dom::set_attribute(panel, ARIA_HIDDEN, "true");
                dom::add_class_pm(panel, "tabpanel--hidden");
            }
        }
    }
}

/// Builds the tablist and panels into `container`.
///
/// Each panel's sections go through `render_section`; `None` results are
/// skipped. Returns `None` when no tabs are configured.
pub fn render_tabs(
    config: &TabsConfig,
    container: &NodeRef,
    render_section: &mut dyn FnMut(&SectionDescriptor, usize) -> Option<RenderedSection>,
) -> Option<TabContainer> {
    if config.tabs.is_empty() {
        return None;
    }

    let tablist_wrapper = dom::create_node(DIV_TAG);
    dom::add_class_pm(&tablist_wrapper, "tablist-wrapper");

    let tablist = dom::create_node(DIV_TAG);
    dom::set_attribute(&tablist, "role", "tablist");
    dom::set_attribute(
        &tablist,
        "aria-label",
        config
            .aria_label
            .as_deref()
            .filter(|label| !label.is_empty())
            .unwrap_or(DEFAULT_TABLIST_LABEL),
    );
    dom::add_class_pm(&tablist, "tablist");

    let panels_container = dom::create_node(DIV_TAG);
    dom::add_class_pm(&panels_container, "tabpanels");

    let mut buttons = Vec::with_capacity(config.tabs.len());
    let mut panels = Vec::with_capacity(config.tabs.len());

    for tab in &config.tabs {
        let tab_id = format!("pm-tab-{}", tab.id);
        let panel_id = format!("pm-tabpanel-{}", tab.id);

        let button = dom::create_node(BUTTON_TAG);
        dom::set_attribute(&button, "role", "tab");
        dom::set_attribute(&button, "id", tab_id.as_str());
        dom::set_attribute(&button, "aria-controls", panel_id.as_str());
        dom::add_class_pm(&button, "tab");
        dom::set_inner_html(&button, &tab.label);

        let panel = dom::create_node(DIV_TAG);
        dom::set_attribute(&panel, "role", "tabpanel");
        dom::set_attribute(&panel, "id", panel_id);
        dom::set_attribute(&panel, "aria-labelledby", tab_id);
        dom::set_attribute(&panel, "tabindex", "0");
        dom::add_class_pm(&panel, "tabpanel");

        if !tab.sections.is_empty() {
            let sections_container = dom::create_node(DIV_TAG);
            dom::add_class_pm(&sections_container, "tabpanel-sections");
            for (section_index, section) in tab.sections.iter().enumerate() {
                if let Some(rendered) = render_section(section, section_index) {
                    sections_container.append(rendered.node);
                }
            }
            panel.append(sections_container);
        }

        tablist.append(button.clone());
        panels_container.append(panel.clone());
        buttons.push(button);
        panels.push(panel);
    }

    tablist_wrapper.append(tablist.clone());
    container.append(tablist_wrapper);
    container.append(panels_container);

    let tabs = TabContainer {
        tablist,
        buttons,
        panels,
        active: 0,
    };
    tabs.project();
    Some(tabs)
}
