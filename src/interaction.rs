use crate::section::SectionId;
use crate::toggle::ToggleKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Escape,
    Other,
}

impl Key {
    /// Maps a `KeyboardEvent.key` name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            "Escape" | "Esc" => Key::Escape,
            _ => Key::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterAction {
    AcceptAll,
    AcceptNecessary,
    SavePreferences,
}

impl FooterAction {
    pub fn data_role(self) -> &'static str {
        match self {
            FooterAction::AcceptAll => "all",
            FooterAction::AcceptNecessary => "necessary",
            FooterAction::SavePreferences => "save",
        }
    }
}

/// User input forwarded by the host, keyed by what it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    ToggleClick(ToggleKey),
    SectionTitleClick(SectionId),
    TabClick(usize),
    TabKeyDown { tab: usize, key: Key },
    DocumentKeyDown(Key),
    OverlayClick,
    CloseClick,
    Footer(FooterAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event was consumed; for key events the default action is suppressed.
    Handled,
    Ignored,
}

impl EventOutcome {
    pub fn is_handled(self) -> bool {
        self == EventOutcome::Handled
    }
}
