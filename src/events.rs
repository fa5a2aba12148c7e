use kuchiki::NodeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    Reset,
    ModalReady,
}

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The page-level widget finished initializing.
    Init,
    /// Stored consent was wiped.
    Reset,
    ModalReady { modal_name: &'static str, root: NodeRef },
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::Init => EventKind::Init,
            LifecycleEvent::Reset => EventKind::Reset,
            LifecycleEvent::ModalReady { .. } => EventKind::ModalReady,
        }
    }
}

type Listener = Box<dyn FnMut(&LifecycleEvent)>;

/// In-process publish/subscribe for widget lifecycle events.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(EventKind, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, listener: impl FnMut(&LifecycleEvent) + 'static) {
        self.listeners.push((kind, Box::new(listener)));
    }

    /// Delivers `event` to its subscribers in subscription order.
    pub fn publish(&mut self, event: &LifecycleEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for (listener_kind, listener) in &mut self.listeners {
            if *listener_kind == kind {
                listener(event);
                delivered += 1;
            }
        }
        delivered
    }
}
