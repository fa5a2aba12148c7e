use kuchiki::NodeRef;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use crate::api::{AcceptCategories, ConsentApi, DeferredTask, ModalHost, PreferenceSelection};
use crate::dom::{self, DIV_TAG};
use crate::state::{ConsentState, Session};
use crate::types::{
    CategoryDescriptor, ConsentConfig, PreferencesModalLabels, SectionDescriptor, TabDescriptor,
    TabsConfig, TranslationBundle,
};

pub fn sample_config() -> ConsentConfig {
    ConsentConfig::default()
        .with_category(
            "necessary",
            CategoryDescriptor::new().read_only(true).enabled(true),
        )
        .with_category(
            "analytics",
            CategoryDescriptor::new()
                .service("ga", Some("Google Analytics"))
                .service("hotjar", None),
        )
        .with_category(
            "marketing",
            CategoryDescriptor::new().service("ads", Some("Ad network")),
        )
        .with_category("preferences", CategoryDescriptor::new().enabled(true))
}

fn section(title: &str, description: Option<&str>, category: Option<&str>) -> SectionDescriptor {
    SectionDescriptor {
        title: Some(title.to_string()),
        description: description.map(str::to_string),
        linked_category: category.map(str::to_string),
        cookie_table: None,
    }
}

fn intro() -> SectionDescriptor {
    section("Cookie usage", Some("We use cookies to run this site."), None)
}

fn necessary() -> SectionDescriptor {
    section(
        "Strictly necessary",
        Some("Required for the site to work."),
        Some("necessary"),
    )
}

fn analytics() -> SectionDescriptor {
    section("Analytics", Some("Helps us measure traffic."), Some("analytics"))
}

fn marketing() -> SectionDescriptor {
    section("Marketing", None, Some("marketing"))
}

fn preferences() -> SectionDescriptor {
    section("Preferences", None, Some("preferences"))
}

fn base_labels() -> PreferencesModalLabels {
    PreferencesModalLabels {
        title: Some("Cookie preferences".to_string()),
        close_icon_label: Some("Close".to_string()),
        accept_all_btn: Some("Accept all".to_string()),
        accept_necessary_btn: Some("Reject all".to_string()),
        save_preferences_btn: Some("Save preferences".to_string()),
        service_counter_label: Some("service|services".to_string()),
        sections: Vec::new(),
        tabs_config: None,
    }
}

/// Flat layout: plain, three toggles, plain, one toggle.
pub fn sample_labels() -> PreferencesModalLabels {
    PreferencesModalLabels {
        sections: vec![
            intro(),
            necessary(),
            analytics(),
            marketing(),
            section("More information", Some("Contact us for details."), None),
            preferences(),
        ],
        ..base_labels()
    }
}

/// Two tabs; every optional category sits on the second one.
pub fn tabbed_labels() -> PreferencesModalLabels {
    PreferencesModalLabels {
        tabs_config: Some(TabsConfig {
            aria_label: None,
            tabs: vec![
                TabDescriptor {
                    id: "general".to_string(),
                    label: "General".to_string(),
                    sections: vec![intro(), necessary()],
                },
                TabDescriptor {
                    id: "optional".to_string(),
                    label: "Optional".to_string(),
                    sections: vec![analytics(), marketing(), preferences()],
                },
            ],
        }),
        ..base_labels()
    }
}

pub fn sample_session(consent: ConsentState, labels: Option<PreferencesModalLabels>) -> Session {
    let mut builder = Session::builder().config(sample_config()).consent(consent);
    if let Some(labels) = labels {
        builder = builder.translation(TranslationBundle::with_preferences_modal(labels));
    }
    builder.build().expect("session")
}

pub fn session_with_debug(
    labels: Option<PreferencesModalLabels>,
    buffer: Rc<RefCell<Vec<u8>>>,
) -> Session {
    let mut builder = Session::builder()
        .config(sample_config())
        .consent(ConsentState::default())
        .debug_writer(SharedBuf(buffer));
    if let Some(labels) = labels {
        builder = builder.translation(TranslationBundle::with_preferences_modal(labels));
    }
    builder.build().expect("session")
}

#[derive(Clone, Default)]
pub struct SharedBuf(pub Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeApi {
    pub accepted: Vec<(AcceptCategories, PreferenceSelection)>,
    pub preferences_hidden: usize,
    pub banner_hidden: usize,
}

impl ConsentApi for FakeApi {
    fn accept_category(&mut self, categories: AcceptCategories, selection: &PreferenceSelection) {
        self.accepted.push((categories, selection.clone()));
    }

    fn hide_preferences(&mut self) {
        self.preferences_hidden += 1;
    }

    fn hide(&mut self) {
        self.banner_hidden += 1;
    }
}

pub struct FakeHost {
    pub main: NodeRef,
    pub main_builds: usize,
    pub focus_traps: usize,
    pub deferred: Vec<(Duration, DeferredTask)>,
}

impl FakeHost {
    pub fn run_deferred(&mut self) {
        for (_, task) in self.deferred.drain(..) {
            task.run();
        }
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        let main = dom::create_node(DIV_TAG);
        dom::set_attribute(&main, "id", "cc-main");
        Self {
            main,
            main_builds: 0,
            focus_traps: 0,
            deferred: Vec::new(),
        }
    }
}

impl ModalHost for FakeHost {
    fn build_main_container(&mut self) -> NodeRef {
        self.main_builds += 1;
        self.main.clone()
    }

    fn install_focus_trap(&mut self, _dialog: &NodeRef) {
        self.focus_traps += 1;
    }

    fn defer(&mut self, delay: Duration, task: DeferredTask) {
        self.deferred.push((delay, task));
    }
}
