use eframe::egui;
use sshfs_core::storage::{ConnectionProfile, Field, DEFAULT_PORT};

/// What the user did with the dialog this frame.
pub enum FormOutcome {
    Open,
    Save,
    Cancel,
}

/// Create/edit dialog state. Holds raw text so half-typed input survives
/// between frames.
pub struct ProfileForm {
    /// `None` when creating a new connection.
    pub original: Option<String>,
    name: String,
    host: String,
    port: u16,
    username: String,
    remote_path: String,
    local_mount_point: String,
    identity_file: String,
    extra_options: String,
    enabled: bool,
    error: Option<(Option<Field>, String)>,
}

impl ProfileForm {
    pub fn new_profile() -> Self {
        Self {
            original: None,
            name: String::new(),
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            remote_path: "/".to_owned(),
            local_mount_point: String::new(),
            identity_file: String::new(),
            extra_options: String::new(),
            enabled: true,
            error: None,
        }
    }

    pub fn edit(profile: &ConnectionProfile) -> Self {
        Self {
            original: Some(profile.name.clone()),
            name: profile.name.clone(),
            host: profile.host.clone(),
            port: profile.port,
            username: profile.username.clone(),
            remote_path: profile.remote_path.clone(),
            local_mount_point: profile.local_mount_point.clone(),
            identity_file: profile.identity_file.clone().unwrap_or_default(),
            extra_options: profile.extra_options.clone().unwrap_or_default(),
            enabled: profile.enabled,
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.original.is_some() {
            "Connection Settings"
        } else {
            "New Connection"
        }
    }

    pub fn to_profile(&self) -> ConnectionProfile {
        let optional = |s: &str| Some(s.trim().to_owned()).filter(|s| !s.is_empty());
        ConnectionProfile {
            name: self.name.clone(),
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            remote_path: self.remote_path.clone(),
            local_mount_point: self.local_mount_point.clone(),
            identity_file: optional(&self.identity_file),
            extra_options: optional(&self.extra_options),
            enabled: self.enabled,
        }
    }

    /// Shows `message` next to `field`, or above the buttons when `None`.
    pub fn set_error(&mut self, field: Option<Field>, message: String) {
        self.error = Some((field, message));
    }

    pub fn show(&mut self, ctx: &egui::Context) -> FormOutcome {
        let mut outcome = FormOutcome::Open;
        egui::Window::new(self.title())
            .collapsible(false)
            .resizable(false)
            .min_width(500.0)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.group(|ui| {
                    ui.strong("Basic Settings");
                    egui::Grid::new("basic_settings").num_columns(2).show(ui, |ui| {
                        self.text_row(ui, "Connection Name:", Field::Name, "My Server");
                        self.text_row(ui, "Host:", Field::Host, "example.com or 192.168.1.100");
                        ui.label("Port:");
                        ui.add(egui::DragValue::new(&mut self.port).range(1..=65535));
                        ui.end_row();
                        self.text_row(ui, "Username:", Field::Username, "username");
                    });
                });

                ui.group(|ui| {
                    ui.strong("Path Settings");
                    egui::Grid::new("path_settings").num_columns(2).show(ui, |ui| {
                        self.text_row(ui, "Remote Path:", Field::RemotePath, "/home/user or /var/www");
                        self.text_row(ui, "Local Mount Point:", Field::LocalMountPoint, "/mnt/remote");
                    });
                });

                ui.group(|ui| {
                    ui.strong("SSH Settings");
                    egui::Grid::new("ssh_settings").num_columns(2).show(ui, |ui| {
                        ui.label("SSH Key:");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.identity_file)
                                .hint_text("~/.ssh/id_rsa (optional)"),
                        );
                        ui.end_row();
                        ui.label("Extra Options:");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.extra_options)
                                .hint_text("-o reconnect,ServerAliveInterval=15"),
                        );
                        ui.end_row();
                    });
                    ui.checkbox(&mut self.enabled, "Enabled");
                });

                if let Some((None, message)) = &self.error {
                    ui.colored_label(ui.visuals().error_fg_color, message);
                }

                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        outcome = FormOutcome::Save;
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = FormOutcome::Cancel;
                    }
                });
            });
        outcome
    }

    fn text_row(&mut self, ui: &mut egui::Ui, label: &str, field: Field, hint: &str) {
        ui.label(label);
        ui.vertical(|ui| {
            let value = match field {
                Field::Name => &mut self.name,
                Field::Host => &mut self.host,
                Field::Username => &mut self.username,
                Field::RemotePath => &mut self.remote_path,
                Field::LocalMountPoint => &mut self.local_mount_point,
            };
            ui.add(egui::TextEdit::singleline(value).hint_text(hint));
            if let Some((Some(bad), message)) = &self.error {
                if *bad == field {
                    ui.colored_label(ui.visuals().error_fg_color, message);
                }
            }
        });
        ui.end_row();
    }
}
