use indexmap::IndexMap;
use kuchiki::NodeRef;
use std::fmt;
use std::time::Duration;

/// Which categories a footer action asks the consent API to accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptCategories {
    All,
    Only(Vec<String>),
    /// Whatever the toggles currently show.
    Current,
}

/// Snapshot of the toggles at the moment an accept action fires.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSelection {
    pub checked_categories: Vec<String>,
    pub enabled_services: IndexMap<String, Vec<String>>,
}

pub trait ConsentApi {
    fn accept_category(&mut self, categories: AcceptCategories, selection: &PreferenceSelection);
    fn hide_preferences(&mut self);
    /// Hides the consent banner.
    fn hide(&mut self);
}

/// Fire-and-forget work scheduled by the modal.
pub struct DeferredTask(Box<dyn FnOnce()>);

impl DeferredTask {
    pub fn new(task: impl FnOnce() + 'static) -> Self {
        Self(Box::new(task))
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeferredTask")
    }
}

pub trait ModalHost {
    /// Ensures the widget root exists and returns it.
    fn build_main_container(&mut self) -> NodeRef;
    fn install_focus_trap(&mut self, dialog: &NodeRef);
    fn defer(&mut self, delay: Duration, task: DeferredTask);
}
