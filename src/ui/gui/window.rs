use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use eframe::egui::{self, Color32, RichText};
use log::{error, info};
use sshfs_core::core::{Action, Event, StatusPoller};
use sshfs_core::{ConnectionProfile, MountManager};
use tokio::runtime::Runtime;
use tokio::sync::broadcast::{self, error::TryRecvError};

use super::form::{FormOutcome, ProfileForm};
use crate::app::{bootstrap, tool_missing_message};

const REPAINT_EVERY: Duration = Duration::from_millis(250);
const MOUNTED_GREEN: Color32 = Color32::from_rgb(0, 160, 0);

pub fn launch_gui(config_dir: Option<PathBuf>) -> eframe::Result<()> {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start the async runtime: {e}");
            return Err(eframe::Error::AppCreation(Box::new(e)));
        }
    };
    let app = match SshfsApp::new(runtime, config_dir) {
        Ok(app) => app,
        Err(e) => return Err(eframe::Error::AppCreation(e)),
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("SSHFS Manager")
            .with_inner_size([800.0, 500.0])
            .with_min_inner_size([640.0, 320.0]),
        ..Default::default()
    };
    eframe::run_native(
        "SSHFS Manager",
        native_options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}

/// A per-row error, shown until the next action on that row.
struct RowError {
    message: String,
    suggest_force: bool,
}

/// The main GUI application struct. Lives on the UI thread; every mount,
/// unmount and poll runs on `runtime` and reports back through `events`.
pub struct SshfsApp {
    runtime: Runtime,
    manager: MountManager,
    poller: Option<StatusPoller>,
    events: broadcast::Receiver<Event>,

    // Cached from the store; refreshed on store events.
    profiles: Vec<ConnectionProfile>,
    selected: Option<String>,

    form: Option<ProfileForm>,
    confirm_remove: Option<String>,
    close_prompt: Option<Vec<String>>,
    allow_close: bool,

    banners: Vec<String>,
    row_errors: HashMap<String, RowError>,
    status_line: String,
}

impl SshfsApp {
    fn new(
        runtime: Runtime,
        config_dir: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let ctx = bootstrap(config_dir.as_deref())?;
        let manager = ctx.manager;

        let mut banners = Vec::new();
        if let Some(warning) = ctx.load_warning {
            banners.push(warning);
        }
        if !manager.external_tool_available() {
            banners.push(tool_missing_message(&manager.mount_tool()));
        }

        let events = manager.subscribe();
        let poller = {
            let _enter = runtime.enter();
            StatusPoller::spawn(manager.clone(), ctx.settings.poll_interval())
        };
        info!("Window ready with {} connection(s)", manager.profiles().len());

        Ok(Self {
            runtime,
            profiles: manager.profiles(),
            manager,
            poller: Some(poller),
            events,
            selected: None,
            form: None,
            confirm_remove: None,
            close_prompt: None,
            allow_close: false,
            banners,
            row_errors: HashMap::new(),
            status_line: "Ready".to_owned(),
        })
    }

    /// Applies every event that arrived since the last frame.
    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Lagged(n)) => {
                    info!("UI skipped {n} events; reloading");
                    self.profiles = self.manager.profiles();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn apply_event(&mut self, event: Event) {
        match event {
            Event::ProfileAdded(name) => {
                self.profiles = self.manager.profiles();
                self.status_line = format!("Added connection: {name}");
            }
            Event::ProfileUpdated { old_name, new_name } => {
                self.profiles = self.manager.profiles();
                if self.selected.as_deref() == Some(old_name.as_str()) {
                    self.selected = Some(new_name.clone());
                }
                self.row_errors.remove(&old_name);
                self.status_line = format!("Updated connection: {new_name}");
            }
            Event::ProfileRemoved(name) => {
                self.profiles = self.manager.profiles();
                if self.selected.as_deref() == Some(name.as_str()) {
                    self.selected = None;
                }
                self.row_errors.remove(&name);
                self.status_line = format!("Removed connection: {name}");
            }
            Event::StatusChanged { .. } => {}
            Event::ActionStarted { name, action } => {
                self.row_errors.remove(&name);
                self.status_line = match action {
                    Action::Mount => format!("Mounting {name}..."),
                    Action::Unmount | Action::ForceUnmount => format!("Unmounting {name}..."),
                };
            }
            Event::ActionSucceeded { name, action } => {
                self.status_line = match action {
                    Action::Mount => format!("Mounted: {name}"),
                    Action::Unmount | Action::ForceUnmount => format!("Unmounted: {name}"),
                };
            }
            Event::ActionFailed {
                name,
                action,
                message,
                suggest_force,
            } => {
                self.status_line = format!("{} failed: {name}", capitalized(action));
                self.row_errors.insert(
                    name,
                    RowError {
                        message,
                        suggest_force,
                    },
                );
            }
        }
    }

    fn spawn_action(&self, ctx: &egui::Context, name: String, action: Action) {
        let manager = self.manager.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            // Results reach the window as events; the error is already logged.
            let _ = match action {
                Action::Mount => manager.mount(&name).await,
                Action::Unmount => manager.unmount(&name).await,
                Action::ForceUnmount => manager.force_unmount(&name).await,
            };
            ctx.request_repaint();
        });
    }

    fn selected_or_hint(&mut self, what: &str) -> Option<String> {
        if self.selected.is_none() {
            self.status_line = format!("Please select a connection to {what}.");
        }
        self.selected.clone()
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Add Connection").clicked() {
                self.form = Some(ProfileForm::new_profile());
            }
            if ui.button("Edit").clicked() {
                if let Some(name) = self.selected_or_hint("edit") {
                    self.open_editor(&name);
                }
            }
            if ui.button("Remove").clicked() {
                if let Some(name) = self.selected_or_hint("remove") {
                    self.confirm_remove = Some(name);
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Refresh Status").clicked() {
                    if let Some(poller) = &self.poller {
                        poller.refresh();
                    }
                    self.status_line = "Refreshing status...".to_owned();
                }
                if ui.button("Unmount").clicked() {
                    if let Some(name) = self.selected_or_hint("unmount") {
                        self.spawn_action(ctx, name, Action::Unmount);
                    }
                }
                if ui.button("Mount").clicked() {
                    if let Some(name) = self.selected_or_hint("mount") {
                        self.spawn_action(ctx, name, Action::Mount);
                    }
                }
            });
        });
    }

    fn open_editor(&mut self, name: &str) {
        match self.manager.profile(name) {
            Some(profile) => self.form = Some(ProfileForm::edit(&profile)),
            None => self.status_line = format!("Connection '{name}' no longer exists."),
        }
    }

    fn connection_table(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        if self.profiles.is_empty() {
            ui.label("No connections yet. Use \"Add Connection\" to create one.");
            return;
        }

        let mut clicked: Option<String> = None;
        let mut double_clicked: Option<String> = None;
        let mut actions: Vec<(String, Action)> = Vec::new();

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("connections")
                .striped(true)
                .num_columns(6)
                .spacing([16.0, 6.0])
                .show(ui, |ui| {
                    for header in ["Name", "Host", "Remote Path", "Local Mount", "Status", "Actions"] {
                        ui.label(RichText::new(header).strong());
                    }
                    ui.end_row();

                    for profile in &self.profiles {
                        let name = &profile.name;
                        let status = self.manager.status(name);
                        let busy = self.manager.is_busy(name);

                        let is_selected = self.selected.as_deref() == Some(name.as_str());
                        let response = ui.selectable_label(is_selected, name.as_str());
                        if response.clicked() {
                            clicked = Some(name.clone());
                        }
                        if response.double_clicked() {
                            double_clicked = Some(name.clone());
                        }
                        ui.label(profile.host_label());
                        ui.label(&profile.remote_path);
                        ui.label(&profile.local_mount_point);

                        ui.horizontal(|ui| {
                            if busy {
                                ui.spinner();
                                ui.label("Working...");
                            } else if status.mounted {
                                ui.colored_label(MOUNTED_GREEN, "Mounted");
                            } else {
                                ui.colored_label(Color32::GRAY, "Not Mounted");
                            }
                            if !profile.enabled {
                                ui.weak("(disabled)");
                            }
                        });

                        ui.horizontal(|ui| {
                            let (label, action) = if status.mounted {
                                ("Unmount", Action::Unmount)
                            } else {
                                ("Mount", Action::Mount)
                            };
                            if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                                actions.push((name.clone(), action));
                            }
                            if let Some(row_error) = self.row_errors.get(name) {
                                if row_error.suggest_force
                                    && ui
                                        .add_enabled(!busy, egui::Button::new("Force Unmount"))
                                        .on_hover_text("Lazy unmount; unsaved remote writes may be lost")
                                        .clicked()
                                {
                                    actions.push((name.clone(), Action::ForceUnmount));
                                }
                            }
                        });
                        ui.end_row();

                        if let Some(row_error) = self.row_errors.get(name) {
                            ui.label("");
                            ui.colored_label(ui.visuals().error_fg_color, &row_error.message);
                            ui.end_row();
                        }
                    }
                });
        });

        if let Some(name) = clicked {
            self.selected = Some(name);
        }
        if let Some(name) = double_clicked {
            self.open_editor(&name);
        }
        for (name, action) in actions {
            self.spawn_action(ctx, name, action);
        }
    }

    fn form_dialog(&mut self, ctx: &egui::Context) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match form.show(ctx) {
            FormOutcome::Open => {}
            FormOutcome::Cancel => self.form = None,
            FormOutcome::Save => {
                let profile = form.to_profile();
                let result = match form.original.clone() {
                    Some(original) => self.manager.update_profile(&original, profile),
                    None => self.manager.add_profile(profile),
                };
                match result {
                    Ok(()) => self.form = None,
                    Err(e) if e.is_unsaved() => {
                        self.form = None;
                        self.banners.push(e.to_string());
                    }
                    Err(e) => {
                        let field = e.validation().and_then(|v| v.field());
                        form.set_error(field, e.to_string());
                    }
                }
            }
        }
    }

    fn remove_dialog(&mut self, ctx: &egui::Context) {
        let Some(name) = self.confirm_remove.clone() else {
            return;
        };
        let mut answer: Option<bool> = None;
        egui::Window::new("Confirm Removal")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("Are you sure you want to remove '{name}'?"));
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });
        match answer {
            Some(true) => {
                self.confirm_remove = None;
                match self.manager.remove_profile(&name) {
                    Ok(_) => {}
                    Err(e) if e.is_unsaved() => self.banners.push(e.to_string()),
                    Err(e) => self.status_line = e.to_string(),
                }
            }
            Some(false) => self.confirm_remove = None,
            None => {}
        }
    }

    /// Asks what to do with live mounts before the window goes away.
    fn handle_close(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.allow_close {
            // A mount still running counts: it would finish after the window is gone.
            let mounted = self.manager.active_profiles();
            if !mounted.is_empty() {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                self.close_prompt = Some(mounted);
            }
        }

        let Some(mounted) = self.close_prompt.clone() else {
            return;
        };
        let mut answer: Option<Option<bool>> = None;
        egui::Window::new("Mounted Connections")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "There are {} mounted or mounting connection(s).\nDo you want to unmount them before closing?",
                    mounted.len()
                ));
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(Some(true));
                    }
                    if ui.button("No").clicked() {
                        answer = Some(Some(false));
                    }
                    if ui.button("Cancel").clicked() {
                        answer = Some(None);
                    }
                });
            });

        match answer {
            Some(Some(true)) => {
                self.close_prompt = None;
                self.allow_close = true;
                self.status_line = "Unmounting before exit...".to_owned();
                let manager = self.manager.clone();
                let ctx = ctx.clone();
                self.runtime.spawn(async move {
                    for name in mounted {
                        let _ = manager.unmount_when_idle(&name).await;
                    }
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                });
            }
            Some(Some(false)) => {
                self.close_prompt = None;
                self.allow_close = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            Some(None) => self.close_prompt = None,
            None => {}
        }
    }
}

impl eframe::App for SshfsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ctx, ui);
            let mut dismissed = None;
            for (i, banner) in self.banners.iter().enumerate() {
                ui.horizontal(|ui| {
                    ui.colored_label(ui.visuals().warn_fg_color, banner);
                    if ui.small_button("Dismiss").clicked() {
                        dismissed = Some(i);
                    }
                });
            }
            if let Some(i) = dismissed {
                self.banners.remove(i);
            }
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(&self.status_line);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.connection_table(ctx, ui);
        });

        self.form_dialog(ctx);
        self.remove_dialog(ctx);
        self.handle_close(ctx);

        // Poll results arrive off-thread; wake up to pick them up.
        ctx.request_repaint_after(REPAINT_EVERY);
    }
}

fn capitalized(action: Action) -> String {
    let text = action.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}
