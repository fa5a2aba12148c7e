use kuchiki::NodeRef;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::dom;
use crate::error::ConsentError;
use crate::events::{EventBus, EventKind};
use crate::state::{Persistence, Session};
use crate::types::TranslationBundle;

/// Owns the switch checkbox and the two bundles it chooses between.
pub struct TabsLayoutSwitch {
    checkbox: NodeRef,
    default_bundle: TranslationBundle,
    tabs_bundle: TranslationBundle,
}

impl TabsLayoutSwitch {
    pub fn new(
        checkbox: NodeRef,
        default_bundle: TranslationBundle,
        tabs_bundle: TranslationBundle,
    ) -> Self {
        Self {
            checkbox,
            default_bundle,
            tabs_bundle,
        }
    }

    pub fn checkbox(&self) -> &NodeRef {
        &self.checkbox
    }

    pub fn is_checked(&self) -> bool {
        dom::has_attribute(&self.checkbox, "checked")
    }

    pub fn bundle_for(&self, use_tabs: bool) -> &TranslationBundle {
        if use_tabs {
            &self.tabs_bundle
        } else {
            &self.default_bundle
        }
    }

    fn apply(&self, use_tabs: bool, session: &mut Session) {
        dom::set_flag(&self.checkbox, "checked", use_tabs);
        session.consent.use_tabs_layout = use_tabs;
        session.translation = Some(self.bundle_for(use_tabs).clone());
    }

    /// Persists the new mode, records it, then asks for a rebuild.
    ///
    /// A failed save leaves the switch and the session untouched.
    pub fn set_use_tabs(
        &self,
        checked: bool,
        session: &mut Session,
        store: &mut dyn Persistence,
        rerender: impl FnOnce(&mut Session),
    ) -> Result<(), ConsentError> {
        let mut staged = session.consent.clone();
        staged.use_tabs_layout = checked;
        store.save(&staged)?;
        self.apply(checked, session);
        debug!(use_tabs = checked, "tabs layout switched");
        rerender(session);
        Ok(())
    }

    /// Keeps the switch in step with widget initialization and consent resets.
    pub fn attach<P: Persistence + 'static>(
        switch: Rc<Self>,
        session: Rc<RefCell<Session>>,
        store: Rc<RefCell<P>>,
        bus: &mut EventBus,
    ) {
        {
            let switch = Rc::clone(&switch);
            let session = Rc::clone(&session);
            bus.subscribe(EventKind::Init, move |_| {
                let Ok(mut session) = session.try_borrow_mut() else {
                    warn!("session busy during init, tabs switch not synced");
                    return;
                };
                let use_tabs = session.consent.use_tabs_layout;
                dom::set_flag(&switch.checkbox, "checked", use_tabs);
                if !use_tabs {
                    return;
                }
                switch.apply(true, &mut session);
                if let Err(err) = store.borrow_mut().save(&session.consent) {
                    warn!(error = %err, "failed to persist tabs layout on init");
                }
            });
        }

        bus.subscribe(EventKind::Reset, move |_| {
            let Ok(mut session) = session.try_borrow_mut() else {
                warn!("session busy during reset, tabs switch not cleared");
                return;
            };
            switch.apply(false, &mut session);
            debug!("tabs layout cleared on reset");
        });
    }
}
