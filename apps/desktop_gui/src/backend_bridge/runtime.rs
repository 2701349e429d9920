//! Worker thread that runs controller effects on a tokio runtime and reports
//! their outcomes back to the UI.

use std::{sync::Arc, thread};

use client_core::{run_effect, Event, HttpPredictionClient};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{ServiceStatus, UiEvent};

pub fn launch(
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
    client: HttpPredictionClient,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendUnavailable(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let client = Arc::new(client);
        runtime.block_on(async move {
            while let Ok(cmd) = cmd_rx.recv() {
                tracing::debug!(command = cmd.name(), "backend: received command");
                let client = Arc::clone(&client);
                let ui_tx = ui_tx.clone();
                // Each request runs on its own task so a slow prediction never
                // holds back a newer selection.
                match cmd {
                    BackendCommand::Run(effect) => {
                        tokio::spawn(async move {
                            let event = run_effect(&*client, &*client, effect).await;
                            deliver_completion(&ui_tx, event);
                        });
                    }
                    BackendCommand::Ping => {
                        tokio::spawn(async move {
                            let status = match client.ping().await {
                                Ok(message) => ServiceStatus::Online(message),
                                Err(err) => {
                                    tracing::warn!("backend: ping failed: {err:#}");
                                    ServiceStatus::Offline(format!("{err:#}"))
                                }
                            };
                            let _ = ui_tx.try_send(UiEvent::ServiceStatus(status));
                        });
                    }
                }
            }
            tracing::info!("command queue closed; backend worker exiting");
        });
    });
}

/// Completion events must reach the controller or it stays waiting on them, so
/// they wait for queue space instead of being dropped. Only a closed UI loses
/// them.
fn deliver_completion(ui_tx: &Sender<UiEvent>, event: Event) -> bool {
    let name = event.name();
    let sent = tokio::task::block_in_place(|| ui_tx.send(UiEvent::Controller(event)));
    if sent.is_err() {
        tracing::warn!(event = name, "ui closed before completion was delivered");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completion_waits_for_a_full_ui_queue() {
        let (ui_tx, ui_rx) = bounded(1);
        ui_tx
            .try_send(UiEvent::ServiceStatus(ServiceStatus::Unknown))
            .expect("fill queue");

        let drain = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let first = ui_rx.recv().expect("status");
            let second = ui_rx.recv().expect("completion");
            (first, second)
        });

        assert!(deliver_completion(&ui_tx, Event::Logout));
        let (first, second) = drain.join().expect("drain thread");
        assert!(matches!(first, UiEvent::ServiceStatus(_)));
        assert!(matches!(second, UiEvent::Controller(Event::Logout)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn completion_reports_a_closed_ui() {
        let (ui_tx, ui_rx) = bounded(1);
        drop(ui_rx);
        assert!(!deliver_completion(&ui_tx, Event::Clear));
    }
}
