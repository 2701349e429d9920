use std::{fs, path::Path, time::Duration};

use client_core::{
    Event, FileTokenStore, ImageUpload, Screen, Session, UiState, UploadController,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{
        events::{ServiceStatus, UiEvent},
        orchestration::dispatch_backend_command,
    },
    ui::preview::TexturePreviews,
};

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0x6a, 0x8a, 0xbe);
const CARD_WIDTH: f32 = 420.0;
const PREVIEW_MAX_SIZE: f32 = 400.0;
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

pub struct MelanomaApp {
    controller: UploadController<FileTokenStore, TexturePreviews>,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    username: String,
    password: String,
    status: String,
    service_status: ServiceStatus,
    drag_active: bool,
}

impl MelanomaApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        store: FileTokenStore,
        previews: TexturePreviews,
    ) -> Self {
        let mut app = Self {
            controller: UploadController::new(Session::new(store), previews),
            cmd_tx,
            ui_rx,
            username: String::new(),
            password: String::new(),
            status: String::new(),
            service_status: ServiceStatus::Unknown,
            drag_active: false,
        };
        app.queue(BackendCommand::Ping);
        app
    }

    fn queue(&mut self, cmd: BackendCommand) {
        if let Some(failure) = dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status) {
            self.apply(failure);
        }
    }

    /// Feed one event to the controller and queue whatever it asks for.
    fn apply(&mut self, event: Event) {
        if let Some(effect) = self.controller.handle(event) {
            self.queue(BackendCommand::Run(effect));
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Controller(event) => self.apply(event),
                UiEvent::ServiceStatus(status) => self.service_status = status,
                UiEvent::BackendUnavailable(message) => self.status = message,
            }
        }
    }

    fn process_file_drops(&mut self, ctx: &egui::Context) {
        if !self.controller.state().is_logged_in() {
            return;
        }
        let (hovering, dropped) =
            ctx.input(|i| (!i.raw.hovered_files.is_empty(), i.raw.dropped_files.clone()));

        if hovering && !self.drag_active {
            self.drag_active = true;
            self.apply(Event::DragEntered);
        } else if !hovering && self.drag_active {
            self.drag_active = false;
            if dropped.is_empty() {
                self.apply(Event::DragLeft);
            }
        }

        if !dropped.is_empty() {
            let event = match first_dropped_image(&dropped) {
                Ok(Some(image)) => Event::ImageSelected(image),
                Ok(None) => Event::SelectionEmpty,
                Err(err) => {
                    tracing::warn!("could not read dropped file: {err:#}");
                    self.status = format!("Could not read dropped file: {err}");
                    Event::SelectionEmpty
                }
            };
            self.apply(event);
        }
    }

    fn browse_for_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .pick_file()
        else {
            return;
        };
        match read_image(&path) {
            Ok(image) => self.apply(Event::ImageSelected(image)),
            Err(err) => {
                tracing::warn!(path = %path.display(), "could not read image: {err:#}");
                self.status = format!("Could not read {}: {err}", path.display());
            }
        }
    }

    fn try_login(&mut self) {
        self.status.clear();
        self.apply(Event::SubmitCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
        });
    }

    fn logout(&mut self) {
        self.password.clear();
        self.drag_active = false;
        self.apply(Event::Logout);
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(egui::Frame::new().fill(ACCENT).inner_margin(10.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new("Melanoma Detection")
                            .size(20.0)
                            .strong()
                            .color(egui::Color32::WHITE),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if self.controller.state().is_logged_in() && ui.button("Logout").clicked()
                        {
                            self.logout();
                        }
                        let hover = match &self.service_status {
                            ServiceStatus::Online(message) | ServiceStatus::Offline(message) => {
                                message.clone()
                            }
                            ServiceStatus::Unknown => String::new(),
                        };
                        ui.label(
                            egui::RichText::new(self.service_status.label())
                                .small()
                                .color(egui::Color32::WHITE),
                        )
                        .on_hover_text(hover);
                    });
                });
            });
    }

    fn show_login_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space((ui.available_height() * 0.15).clamp(16.0, 120.0));
            ui.vertical_centered(|ui| {
                ui.set_max_width(CARD_WIDTH);
                card().show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("Admin Login");
                    });
                    ui.add_space(8.0);

                    let user_resp = ui.add(
                        egui::TextEdit::singleline(&mut self.username)
                            .hint_text("Username")
                            .desired_width(f32::INFINITY),
                    );
                    let pass_resp = ui.add(
                        egui::TextEdit::singleline(&mut self.password)
                            .hint_text("Password")
                            .password(true)
                            .desired_width(f32::INFINITY),
                    );

                    if let Some(error) = self.controller.login_error() {
                        ui.colored_label(ui.visuals().error_fg_color, error);
                    }

                    let busy = self.controller.is_login_pending();
                    let button = egui::Button::new(
                        egui::RichText::new(if busy { "Signing in..." } else { "Login" }).strong(),
                    )
                    .min_size(egui::vec2(ui.available_width(), 36.0));
                    let clicked = ui.add_enabled(!busy, button).clicked();

                    let enter = ui.input(|i| i.key_pressed(egui::Key::Enter))
                        && (user_resp.lost_focus() || pass_resp.lost_focus());
                    if (clicked || enter) && !busy {
                        self.try_login();
                    }
                });
                if !self.status.is_empty() {
                    ui.add_space(6.0);
                    ui.small(egui::RichText::new(&self.status).weak());
                }
            });
        });
    }

    fn show_upload_screen(&mut self, ctx: &egui::Context) {
        let state = self.controller.state();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space((ui.available_height() * 0.08).clamp(12.0, 80.0));
            ui.vertical_centered(|ui| {
                ui.set_max_width(CARD_WIDTH);
                card().show(ui, |ui| {
                    ui.vertical_centered(|ui| {
                        self.show_selection(ui, state);
                        if self.controller.is_loading() {
                            ui.add_space(8.0);
                            ui.spinner();
                            ui.label("Processing");
                        }
                        if let Some(result) = self.controller.result() {
                            ui.add_space(8.0);
                            egui::Grid::new("prediction_result")
                                .num_columns(2)
                                .striped(true)
                                .spacing([48.0, 6.0])
                                .show(ui, |ui| {
                                    ui.strong("Label");
                                    ui.strong("Confidence");
                                    ui.end_row();
                                    ui.label(&result.label);
                                    ui.label(result.confidence_text());
                                    ui.end_row();
                                });
                        }
                        if let Some(error) = self.controller.prediction_error() {
                            ui.add_space(8.0);
                            ui.colored_label(ui.visuals().error_fg_color, error);
                        }
                    });
                });

                if matches!(
                    state,
                    UiState::LoggedIn(Screen::ShowingResult | Screen::ShowingError)
                ) {
                    ui.add_space(10.0);
                    if ui.button("✖ Clear").clicked() {
                        self.apply(Event::Clear);
                    }
                }
                if !self.status.is_empty() {
                    ui.add_space(6.0);
                    ui.small(egui::RichText::new(&self.status).weak());
                }
            });
        });
    }

    fn show_selection(&mut self, ui: &mut egui::Ui, state: UiState) {
        if let Some(preview) = self.controller.preview() {
            ui.add(
                egui::Image::new(&preview.texture)
                    .max_size(egui::vec2(PREVIEW_MAX_SIZE, PREVIEW_MAX_SIZE))
                    .fit_to_exact_size(fit_within(preview.size, PREVIEW_MAX_SIZE)),
            );
            return;
        }
        if let Some(pending) = self.controller.pending_image() {
            ui.label(egui::RichText::new(&pending.image.file_name).strong());
            ui.weak("No preview available for this file");
            return;
        }

        let armed = state == UiState::LoggedIn(Screen::AwaitingUpload);
        let stroke_color = if armed {
            ACCENT
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };
        egui::Frame::new()
            .stroke(egui::Stroke::new(2.0, stroke_color))
            .corner_radius(8.0)
            .inner_margin(24.0)
            .show(ui, |ui| {
                ui.set_min_height(160.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(36.0);
                    if armed {
                        ui.label(egui::RichText::new("Drop the image here").strong());
                    } else {
                        ui.label("Drag and drop an image of a skin lesion to process it");
                        ui.add_space(6.0);
                        if ui.button("Browse...").clicked() {
                            self.browse_for_image();
                        }
                    }
                });
            });
    }
}

impl eframe::App for MelanomaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.process_file_drops(ctx);

        self.show_top_bar(ctx);
        match self.controller.state() {
            UiState::LoggedOut => self.show_login_screen(ctx),
            UiState::LoggedIn(_) => self.show_upload_screen(ctx),
        }

        if self.controller.is_loading() || self.controller.is_login_pending() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn card() -> egui::Frame {
    egui::Frame::new()
        .fill(egui::Color32::WHITE)
        .stroke(egui::Stroke::new(1.0, egui::Color32::from_gray(210)))
        .corner_radius(10.0)
        .inner_margin(20.0)
}

fn fit_within(size: egui::Vec2, max: f32) -> egui::Vec2 {
    let longest = size.x.max(size.y).max(1.0);
    let scale = (max / longest).min(1.0);
    size * scale
}

fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(ImageUpload::new(file_name, bytes))
}

/// Only the first dropped file is used. `Ok(None)` when the drop carried no
/// readable file.
fn first_dropped_image(files: &[egui::DroppedFile]) -> anyhow::Result<Option<ImageUpload>> {
    let Some(file) = files.first() else {
        return Ok(None);
    };
    if let Some(bytes) = &file.bytes {
        let name = if file.name.is_empty() {
            "upload".to_string()
        } else {
            file.name.clone()
        };
        return Ok(Some(ImageUpload::new(name, bytes.clone())));
    }
    match &file.path {
        Some(path) => read_image(path).map(Some),
        None => Ok(None),
    }
}
