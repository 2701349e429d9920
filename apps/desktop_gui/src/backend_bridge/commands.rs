//! Backend commands queued from UI to backend worker.

use client_core::Effect;

#[derive(Debug)]
pub enum BackendCommand {
    Run(Effect),
    Ping,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Run(effect) => effect.name(),
            Self::Ping => "ping",
        }
    }
}
