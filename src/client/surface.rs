//! Display surface the client core drives. Rendering itself lives elsewhere.

use std::sync::Mutex;

/// Terminal navigation targets after sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Dashboard,
    Welcome,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard.html",
            Self::Welcome => "welcomepage.html",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Error,
    Success,
}

pub trait Surface: Send + Sync {
    /// Replace the page with a static fatal error.
    fn render_fatal(&self, message: &str);

    /// Hide the loader and show the sign-in form.
    fn reveal_sign_in(&self);

    /// Full navigation; nothing runs on this page afterwards.
    fn navigate(&self, destination: Destination);

    fn show_alert(&self, message: &str, kind: AlertKind);
}

/// Everything a [`MemorySurface`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Fatal(String),
    SignInRevealed,
    Navigated(Destination),
    Alert(String, AlertKind),
}

/// Surface that records calls instead of rendering.
#[derive(Default)]
pub struct MemorySurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_navigation(&self) -> Option<Destination> {
        self.events().into_iter().rev().find_map(|e| match e {
            SurfaceEvent::Navigated(d) => Some(d),
            _ => None,
        })
    }

    fn record(&self, event: SurfaceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl Surface for MemorySurface {
    fn render_fatal(&self, message: &str) {
        self.record(SurfaceEvent::Fatal(message.to_string()));
    }

    fn reveal_sign_in(&self) {
        self.record(SurfaceEvent::SignInRevealed);
    }

    fn navigate(&self, destination: Destination) {
        self.record(SurfaceEvent::Navigated(destination));
    }

    fn show_alert(&self, message: &str, kind: AlertKind) {
        self.record(SurfaceEvent::Alert(message.to_string(), kind));
    }
}
