mod api;
mod debug;
mod dom;
mod error;
mod events;
mod interaction;
mod modal;
mod section;
mod state;
mod tabs;
mod tabs_layout;
#[cfg(test)]
mod test_support;
mod toggle;
mod types;

pub use api::{AcceptCategories, ConsentApi, DeferredTask, ModalHost, PreferenceSelection};
pub use debug::DebugLogger;
pub use dom::{Icon, svg_icon};
pub use error::ConsentError;
pub use events::{EventBus, EventKind, LifecycleEvent};
pub use interaction::{EventOutcome, FooterAction, Interaction, Key};
pub use modal::{PREFERENCES_MODAL_NAME, PreferencesModal};
pub use section::{
    Accordion, Expansion, RenderPass, RenderedSection, SectionId, render_section,
    service_counter_text,
};
pub use state::{
    ConsentState, LiveToggleState, MemoryStore, Persistence, Session, SessionBuilder,
};
pub use tabs::{TabContainer, render_tabs};
pub use tabs_layout::TabsLayoutSwitch;
pub use toggle::{
    ToggleHandle, ToggleKey, ToggleRegistry, click, create_toggle, on_category_change,
    on_service_change, plain_label, reconcile_category,
};
pub use types::{
    CategoryDescriptor, ConsentConfig, CookieTable, PreferencesModalLabels, SectionDescriptor,
    ServiceDescriptor, TabDescriptor, TabsConfig, TranslationBundle,
};
