//! Command orchestration helpers from UI actions to backend command queue.

use client_core::{Effect, Event};
use crossbeam_channel::{Sender, TrySendError};
use shared::error::{AuthError, FailureCause, PredictError};

use crate::backend_bridge::commands::BackendCommand;

/// Queue `cmd` for the backend worker. When it cannot be queued, returns the
/// failure event to feed back into the controller so the UI never waits on a
/// request that was never sent.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> Option<Event> {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            None
        }
        Err(TrySendError::Full(cmd)) => {
            *status = "Request queue is full; please retry".to_string();
            undeliverable(cmd, "command queue full")
        }
        Err(TrySendError::Disconnected(cmd)) => {
            *status = "Background worker stopped; restart the app".to_string();
            undeliverable(cmd, "backend worker disconnected")
        }
    }
}

fn undeliverable(cmd: BackendCommand, reason: &str) -> Option<Event> {
    tracing::warn!(command = cmd.name(), reason, "command not queued");
    let cause = FailureCause::Transport(reason.to_string());
    match cmd {
        BackendCommand::Run(Effect::Authenticate { .. }) => {
            Some(Event::AuthFailed(AuthError::new(cause)))
        }
        BackendCommand::Run(Effect::Predict { selection, .. }) => Some(Event::PredictionFailed {
            selection,
            error: PredictError::new(cause),
        }),
        BackendCommand::Ping => None,
    }
}
