//! Events delivered from the backend worker to the UI thread.

use client_core::Event;

#[derive(Debug)]
pub enum UiEvent {
    Controller(Event),
    ServiceStatus(ServiceStatus),
    BackendUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    #[default]
    Unknown,
    Online(String),
    Offline(String),
}

impl ServiceStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::Unknown => "checking service...",
            Self::Online(_) => "service online",
            Self::Offline(_) => "service unreachable",
        }
    }
}
