use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::errors::{Field, ValidationError};
use crate::utils::paths::{expand_tilde, normalize};

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_REMOTE_PATH: &str = "/";

/// A user-named remote mount definition.
///
/// JSON looks like:
/// `{ "name":"work", "host":"10.0.0.5", "port":22, "username":"alice",
///    "remotePath":"/home/alice", "localMountPoint":"/mnt/work" }`
///
/// Files written by older releases used snake_case keys and called the
/// identity file `ssh_key`; those are accepted on read. Optional fields are
/// kept exactly as read; a blank value counts as unset wherever it is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default = "default_remote_path", alias = "remote_path")]
    pub remote_path: String,
    #[serde(alias = "local_mount_point")]
    pub local_mount_point: String,
    #[serde(
        default,
        alias = "ssh_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub identity_file: Option<String>,
    #[serde(
        default,
        alias = "extra_options",
        skip_serializing_if = "Option::is_none"
    )]
    pub extra_options: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_remote_path() -> String {
    DEFAULT_REMOTE_PATH.to_owned()
}

fn default_enabled() -> bool {
    true
}

impl ConnectionProfile {
    /// A profile with the default port and remote path.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
        local_mount_point: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            remote_path: default_remote_path(),
            local_mount_point: local_mount_point.into(),
            identity_file: None,
            extra_options: None,
            enabled: true,
        }
    }

    /// Trims every text field, turns blank optionals into `None` and an
    /// empty remote path into `/`.
    pub fn normalized(mut self) -> Self {
        fn trim(s: &mut String) {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                *s = trimmed.to_owned();
            }
        }
        fn trim_opt(s: &mut Option<String>) {
            *s = s
                .take()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty());
        }

        trim(&mut self.name);
        trim(&mut self.host);
        trim(&mut self.username);
        trim(&mut self.remote_path);
        trim(&mut self.local_mount_point);
        trim_opt(&mut self.identity_file);
        trim_opt(&mut self.extra_options);
        if self.remote_path.is_empty() {
            self.remote_path = default_remote_path();
        }
        self
    }

    /// Checks the per-profile invariants. Cross-profile checks (unique name
    /// and mount point) live in the store.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            (Field::Name, &self.name),
            (Field::Host, &self.host),
            (Field::Username, &self.username),
            (Field::RemotePath, &self.remote_path),
            (Field::LocalMountPoint, &self.local_mount_point),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !self.mount_point().is_absolute() {
            return Err(ValidationError::RelativeMountPoint(
                self.local_mount_point.clone(),
            ));
        }
        Ok(())
    }

    /// `username@host:remotePath`, the first argument of the mount tool.
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.remote_path)
    }

    /// `username@host:port`, as shown in the connection list.
    pub fn host_label(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    /// The local mount point with `~` expanded and trailing separators removed.
    pub fn mount_point(&self) -> PathBuf {
        normalize(&expand_tilde(self.local_mount_point.trim()))
    }

    /// The identity file with `~` expanded, if one is configured.
    pub fn identity_path(&self) -> Option<PathBuf> {
        self.identity_file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(expand_tilde)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> ConnectionProfile {
        let mut p = ConnectionProfile::new("work", "10.0.0.5", "alice", "/mnt/work");
        p.remote_path = "/home/alice".into();
        p
    }

    #[test]
    fn target_and_label() {
        let p = work();
        assert_eq!(p.target(), "alice@10.0.0.5:/home/alice");
        assert_eq!(p.host_label(), "alice@10.0.0.5:22");
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut p = work();
        p.username = "  ".into();
        assert_eq!(
            p.validate(),
            Err(ValidationError::MissingField(Field::Username))
        );
    }

    #[test]
    fn port_zero_is_rejected() {
        let mut p = work();
        p.port = 0;
        assert_eq!(p.validate(), Err(ValidationError::InvalidPort));
    }

    #[test]
    fn relative_mount_point_is_rejected() {
        let mut p = work();
        p.local_mount_point = "mnt/work".into();
        assert!(matches!(
            p.validate(),
            Err(ValidationError::RelativeMountPoint(_))
        ));
    }

    #[test]
    fn normalized_fills_defaults() {
        let mut p = work();
        p.name = " work ".into();
        p.remote_path = "".into();
        p.identity_file = Some("   ".into());
        let p = p.normalized();
        assert_eq!(p.name, "work");
        assert_eq!(p.remote_path, "/");
        assert_eq!(p.identity_file, None);
    }

    #[test]
    fn missing_fields_take_defaults_on_read() {
        let json = r#"{"name":"a","host":"h","username":"u","localMountPoint":"/mnt/a"}"#;
        let p: ConnectionProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.port, 22);
        assert_eq!(p.remote_path, "/");
        assert!(p.enabled);
        assert_eq!(p.identity_file, None);
    }

    #[test]
    fn legacy_snake_case_keys_are_accepted() {
        let json = r#"{
            "name": "old", "host": "h", "port": 2222, "username": "u",
            "remote_path": "/srv", "local_mount_point": "/mnt/old",
            "ssh_key": "", "extra_options": "-o compression=yes"
        }"#;
        let p: ConnectionProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.port, 2222);
        assert_eq!(p.remote_path, "/srv");
        assert_eq!(p.local_mount_point, "/mnt/old");
        assert_eq!(p.identity_file.as_deref(), Some(""));
        assert_eq!(p.identity_path(), None);
        assert_eq!(p.extra_options.as_deref(), Some("-o compression=yes"));
    }

    #[test]
    fn writes_camel_case_keys() {
        let json = serde_json::to_value(work()).unwrap();
        assert_eq!(json["remotePath"], "/home/alice");
        assert_eq!(json["localMountPoint"], "/mnt/work");
        assert!(json.get("identityFile").is_none());
    }
}
