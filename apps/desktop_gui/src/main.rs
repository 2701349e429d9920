mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use client_core::{config::parse_api_base, load_settings, FileTokenStore, HttpPredictionClient};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::events::UiEvent,
    ui::{preview::TexturePreviews, MelanomaApp},
};

#[derive(Parser, Debug)]
#[command(name = "melanoma-desktop", about = "Melanoma detection desktop client")]
struct Args {
    /// Base url of the prediction service.
    #[arg(long)]
    api_url: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = args.api_url.as_deref() {
        settings.api_base = parse_api_base(api_url)?;
    }

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(
        cmd_rx,
        ui_tx,
        HttpPredictionClient::new(settings.api_base.clone()),
    );

    let store = FileTokenStore::new(settings.token_path.clone());
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Melanoma Detection")
            .with_inner_size([720.0, 760.0])
            .with_min_inner_size([480.0, 560.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Melanoma Detection",
        options,
        Box::new(move |cc| {
            let previews = TexturePreviews::new(cc.egui_ctx.clone());
            Ok(Box::new(MelanomaApp::new(cmd_tx, ui_rx, store, previews)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("desktop client exited with error: {err}"))
}
