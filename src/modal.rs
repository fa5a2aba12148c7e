use kuchiki::NodeRef;
use std::time::Duration;
use tracing::debug;

use crate::api::{AcceptCategories, ConsentApi, DeferredTask, ModalHost, PreferenceSelection};
use crate::dom::{self, ARIA_HIDDEN, BTN_GROUP_CLASS, BUTTON_TAG, DATA_ROLE, DIV_TAG, Icon};
use crate::error::ConsentError;
use crate::events::{EventBus, LifecycleEvent};
use crate::interaction::{EventOutcome, FooterAction, Interaction, Key};
use crate::section::{self, Accordion, RenderPass, SectionId};
use crate::state::Session;
use crate::tabs::{self, TabContainer};
use crate::toggle::{self, ToggleHandle, ToggleKey, ToggleRegistry};
use crate::types::{PreferencesModalLabels, SectionDescriptor};

pub const PREFERENCES_MODAL_NAME: &str = "preferencesModal";
const ENTRANCE_ANIMATION_DELAY: Duration = Duration::from_millis(100);
const ENTRANCE_ANIMATION_CLASS: &str = "cc--anim";

struct Shell {
    container: NodeRef,
    overlay: NodeRef,
    dialog: NodeRef,
    header: NodeRef,
    title: NodeRef,
    close_button: NodeRef,
    body: NodeRef,
    footer: NodeRef,
    primary_group: NodeRef,
    secondary_group: NodeRef,
}

impl Shell {
    fn build(labels: &PreferencesModalLabels) -> Self {
        let container = dom::create_node(DIV_TAG);
        dom::add_class(&container, "pm-wrapper");

        let overlay = dom::create_node(DIV_TAG);
        dom::add_class(&overlay, "pm-overlay");
        container.append(overlay.clone());

        let dialog = dom::create_node(DIV_TAG);
        dom::add_class(&dialog, "pm");
        dom::set_attribute(&dialog, "role", "dialog");
        dom::set_attribute(&dialog, ARIA_HIDDEN, "true");
        dom::set_attribute(&dialog, "aria-modal", "true");
        dom::set_attribute(&dialog, "aria-labelledby", "pm__title");

        let header = dom::create_node(DIV_TAG);
        dom::add_class_pm(&header, "header");

        let title = dom::create_node("h2");
        dom::add_class_pm(&title, "title");
        dom::set_attribute(&title, "id", "pm__title");

        let close_button = dom::create_node(BUTTON_TAG);
        dom::add_class_pm(&close_button, "close-btn");
        dom::set_attribute(
            &close_button,
            "aria-label",
            labels.close_icon_label.as_deref().unwrap_or_default(),
        );
        let focus_span = dom::create_node("span");
        dom::append_markup(&focus_span, &dom::svg_icon(Icon::Cross, 1.5));
        close_button.append(focus_span);

        let body = new_body();

        let footer = dom::create_node(DIV_TAG);
        dom::add_class_pm(&footer, "footer");
        let primary_group = dom::create_node(DIV_TAG);
        let secondary_group = dom::create_node(DIV_TAG);
        dom::add_class_pm(&primary_group, BTN_GROUP_CLASS);
        dom::add_class_pm(&secondary_group, BTN_GROUP_CLASS);
        footer.append(primary_group.clone());
        footer.append(secondary_group.clone());

        header.append(title.clone());
        header.append(close_button.clone());

        let focus_root = dom::create_node(DIV_TAG);
        dom::set_attribute(&focus_root, "tabindex", "-1");
        dialog.append(focus_root);
        dialog.append(header.clone());
        dialog.append(body.clone());
        if labels.has_footer() {
            dialog.append(footer.clone());
        }

        container.append(dialog.clone());

        Self {
            container,
            overlay,
            dialog,
            header,
            title,
            close_button,
            body,
            footer,
            primary_group,
            secondary_group,
        }
    }
}

fn new_body() -> NodeRef {
    let body = dom::create_node(DIV_TAG);
    dom::add_class_pm(&body, "body");
    body
}

fn is_within(node: &NodeRef, ancestor: &NodeRef) -> bool {
    node.inclusive_ancestors().any(|candidate| candidate == *ancestor)
}

#[derive(Default)]
struct FooterButtons {
    accept_all: Option<NodeRef>,
    accept_necessary: Option<NodeRef>,
    save: Option<NodeRef>,
}

impl FooterButtons {
    fn slot(&mut self, action: FooterAction) -> &mut Option<NodeRef> {
        match action {
            FooterAction::AcceptAll => &mut self.accept_all,
            FooterAction::AcceptNecessary => &mut self.accept_necessary,
            FooterAction::SavePreferences => &mut self.save,
        }
    }

    fn get(&self, action: FooterAction) -> Option<&NodeRef> {
        match action {
            FooterAction::AcceptAll => self.accept_all.as_ref(),
            FooterAction::AcceptNecessary => self.accept_necessary.as_ref(),
            FooterAction::SavePreferences => self.save.as_ref(),
        }
    }
}

/// The preferences dialog: owns the shell, the toggle lookups and the
/// presentation state of the current body.
#[derive(Default)]
pub struct PreferencesModal {
    shell: Option<Shell>,
    footer_buttons: FooterButtons,
    registry: ToggleRegistry,
    accordions: Vec<Accordion>,
    tabs: Option<TabContainer>,
    focused: Option<NodeRef>,
}

impl PreferencesModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the dialog on first call and rebuilds only its body afterwards.
    ///
    /// Skipped entirely when the current translation has no preferences
    /// labels.
    pub fn render(&mut self, session: &mut Session, host: &mut dyn ModalHost, events: &mut EventBus) {
        let Session {
            config,
            translation,
            consent,
            live,
            preferences_modal_exists,
            debug: debug_logger,
        } = session;

        let Some(labels) = translation
            .as_ref()
            .and_then(|bundle| bundle.preferences_modal.as_ref())
        else {
            debug!("no preferences modal labels, skipping render");
            return;
        };

        let first_build = self.shell.is_none();
        let shell = self.shell.get_or_insert_with(|| Shell::build(labels));
        let body = if first_build { shell.body.clone() } else { new_body() };

        if let Some(title) = labels.title.as_deref().filter(|t| !t.is_empty()) {
            dom::set_inner_html(&shell.title, title);
            if let Some(close_label) = labels.close_icon_label.as_deref().filter(|l| !l.is_empty()) {
                dom::set_attribute(&shell.close_button, "aria-label", close_label);
            }
        }

        if self
            .focused
            .as_ref()
            .is_some_and(|focused| is_within(focused, &shell.body))
        {
            self.focused = None;
        }
        self.registry.clear();
        self.accordions.clear();
        self.tabs = None;
        live.clear();

        let mut pass = RenderPass {
            config,
            consent,
            live,
            registry: &mut self.registry,
            accordions: &mut self.accordions,
        };
        let mut section_count = 0usize;

        let layout = match labels.tabs_config.as_ref().filter(|_| labels.uses_tabs()) {
            Some(tabs_config) => {
                dom::add_class_pm(&body, "body--tabs");
                let mut render_one = |descriptor: &SectionDescriptor, _index: usize| {
                    let rendered = section::render_section(&mut pass, descriptor, section_count, labels);
                    section_count += 1;
                    rendered
                };
                self.tabs = tabs::render_tabs(tabs_config, &body, &mut render_one);
                "tabs"
            }
            None => {
                let mut toggle_group: Option<NodeRef> = None;
                for (index, descriptor) in labels.sections.iter().enumerate() {
                    let Some(rendered) = section::render_section(&mut pass, descriptor, index, labels)
                    else {
                        continue;
                    };
                    section_count += 1;
                    if rendered.has_toggle {
                        let group = toggle_group.get_or_insert_with(|| {
                            let group = dom::create_node(DIV_TAG);
                            dom::add_class_pm(&group, "section-toggles");
                            body.append(group.clone());
                            group
                        });
                        group.append(rendered.node);
                    } else {
                        toggle_group = None;
                        body.append(rendered.node);
                    }
                }
                "sections"
            }
        };

        for (action, label) in [
            (FooterAction::AcceptAll, &labels.accept_all_btn),
            (FooterAction::AcceptNecessary, &labels.accept_necessary_btn),
            (FooterAction::SavePreferences, &labels.save_preferences_btn),
        ] {
            let Some(text) = label.as_deref().filter(|text| !text.is_empty()) else {
                continue;
            };
            let group = match action {
                FooterAction::SavePreferences => &shell.secondary_group,
                _ => &shell.primary_group,
            };
            let button = self.footer_buttons.slot(action).get_or_insert_with(|| {
                let button = dom::create_node(BUTTON_TAG);
                dom::add_class_pm(&button, "btn");
                if action == FooterAction::SavePreferences {
                    dom::add_class_pm(&button, "btn--secondary");
                }
                dom::set_attribute(&button, DATA_ROLE, action.data_role());
                group.append(button.clone());
                button
            });
            dom::set_inner_html(button, text);
        }
        if labels.has_footer() && shell.footer.parent().is_none() {
            shell.dialog.append(shell.footer.clone());
        }

        if !first_build {
            shell.body.insert_after(body.clone());
            shell.body.detach();
            shell.body = body;
        }

        debug!(
            first_build,
            layout,
            sections = section_count,
            toggles = self.registry.len(),
            "preferences modal rendered"
        );
        if let Some(logger) = debug_logger.as_ref() {
            let tab_count = self.tabs.as_ref().map(TabContainer::len).unwrap_or(0);
            logger.log_render_pass(
                first_build,
                layout,
                &[
                    ("sections", section_count as u64),
                    ("toggles", self.registry.len() as u64),
                    ("tabs", tab_count as u64),
                ],
            );
        }

        if !*preferences_modal_exists {
            *preferences_modal_exists = true;
            debug!(modal = PREFERENCES_MODAL_NAME, "preferences modal created");

            events.publish(&LifecycleEvent::ModalReady {
                modal_name: PREFERENCES_MODAL_NAME,
                root: shell.dialog.clone(),
            });
            let main = host.build_main_container();
            main.append(shell.container.clone());
            host.install_focus_trap(&shell.dialog);

            let container = shell.container.clone();
            host.defer(
                ENTRANCE_ANIMATION_DELAY,
                DeferredTask::new(move || dom::add_class(&container, ENTRANCE_ANIMATION_CLASS)),
            );
        }
    }

    /// Routes one user interaction; state is fully settled on return.
    pub fn dispatch(
        &mut self,
        session: &mut Session,
        api: &mut dyn ConsentApi,
        interaction: Interaction,
    ) -> EventOutcome {
        if self.shell.is_none() {
            return EventOutcome::Ignored;
        }
        match interaction {
            Interaction::ToggleClick(key) => {
                if toggle::click(&mut self.registry, &mut session.live, &key) {
                    EventOutcome::Handled
                } else {
                    debug!(?key, "toggle click ignored");
                    EventOutcome::Ignored
                }
            }
            Interaction::SectionTitleClick(id) => match self.accordions.get_mut(id.0) {
                Some(accordion) => {
                    accordion.toggle();
                    EventOutcome::Handled
                }
                None => EventOutcome::Ignored,
            },
            Interaction::TabClick(index) => match self.tabs.as_mut() {
                Some(tabs) if index < tabs.len() => {
                    tabs.select(index);
                    self.focused = tabs.buttons().get(index).cloned();
                    EventOutcome::Handled
                }
                _ => EventOutcome::Ignored,
            },
            Interaction::TabKeyDown { tab, key } => {
                let Some(tabs) = self.tabs.as_mut() else {
                    return EventOutcome::Ignored;
                };
                match tabs.handle_key(tab, key) {
                    Some(next) => {
                        self.focused = tabs.buttons().get(next).cloned();
                        EventOutcome::Handled
                    }
                    None => EventOutcome::Ignored,
                }
            }
            Interaction::DocumentKeyDown(Key::Escape)
            | Interaction::OverlayClick
            | Interaction::CloseClick => {
                api.hide_preferences();
                EventOutcome::Handled
            }
            Interaction::DocumentKeyDown(_) => EventOutcome::Ignored,
            Interaction::Footer(action) => {
                if self.footer_buttons.get(action).is_none() {
                    return EventOutcome::Ignored;
                }
                let categories = match action {
                    FooterAction::AcceptAll => AcceptCategories::All,
                    FooterAction::AcceptNecessary => AcceptCategories::Only(Vec::new()),
                    FooterAction::SavePreferences => AcceptCategories::Current,
                };
                let selection = self.selection(session);
                api.accept_category(categories, &selection);
                api.hide_preferences();
                api.hide();
                EventOutcome::Handled
            }
        }
    }

    pub fn selection(&self, session: &Session) -> PreferenceSelection {
        PreferenceSelection {
            checked_categories: self
                .registry
                .categories()
                .filter(|handle| handle.is_checked())
                .map(|handle| handle.key().category_id().to_string())
                .collect(),
            enabled_services: session.live.as_map().clone(),
        }
    }

    pub fn registry(&self) -> &ToggleRegistry {
        &self.registry
    }

    pub fn toggle(&self, key: &ToggleKey) -> Result<&ToggleHandle, ConsentError> {
        self.registry.get(key).ok_or_else(|| {
            let target = match key {
                ToggleKey::Category(id) => id.clone(),
                ToggleKey::Service { category, service } => format!("{category}/{service}"),
            };
            ConsentError::UnknownControl(target)
        })
    }

    pub fn tabs(&self) -> Option<&TabContainer> {
        self.tabs.as_ref()
    }

    pub fn accordion(&self, id: SectionId) -> Option<&Accordion> {
        self.accordions.get(id.0)
    }

    pub fn section_for_category(&self, category: &str) -> Option<SectionId> {
        self.accordions
            .iter()
            .position(|accordion| accordion.category() == category)
            .map(SectionId)
    }

    pub fn focused(&self) -> Option<&NodeRef> {
        self.focused.as_ref()
    }

    pub fn container(&self) -> Option<&NodeRef> {
        self.shell.as_ref().map(|shell| &shell.container)
    }

    pub fn overlay(&self) -> Option<&NodeRef> {
        self.shell.as_ref().map(|shell| &shell.overlay)
    }

    pub fn dialog(&self) -> Option<&NodeRef> {
        self.shell.as_ref().map(|shell| &shell.dialog)
    }

    pub fn header(&self) -> Option<&NodeRef> {
        self.shell.as_ref().map(|shell| &shell.header)
    }

    pub fn body(&self) -> Option<&NodeRef> {
        self.shell.as_ref().map(|shell| &shell.body)
    }

    pub fn footer(&self) -> Option<&NodeRef> {
        self.shell.as_ref().map(|shell| &shell.footer)
    }

    pub fn footer_button(&self, action: FooterAction) -> Option<&NodeRef> {
        self.footer_buttons.get(action)
    }

    /// Tab-reachable controls inside the dialog, in document order.
    pub fn focusable_elements(&self) -> Vec<NodeRef> {
        let Some(shell) = self.shell.as_ref() else {
            return Vec::new();
        };
        let Ok(candidates) = shell
            .dialog
            .select("button, a[href], input, select, textarea, [tabindex]")
        else {
            return Vec::new();
        };
        candidates
            .map(|element| element.as_node().clone())
            .filter(|node| !dom::has_attribute(node, "disabled"))
            .filter(|node| dom::get_attribute(node, "tabindex").as_deref() != Some("-1"))
            .filter(|node| {
                !node
                    .ancestors()
                    .any(|ancestor| dom::has_class(&ancestor, "pm__tabpanel--hidden"))
            })
            .collect()
    }

    pub fn to_html(&self) -> Option<String> {
        self.shell.as_ref().map(|shell| shell.container.to_string())
    }
}
