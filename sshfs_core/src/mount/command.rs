use std::{fmt, path::Path, time::Duration};

use crate::storage::{ConnectionProfile, Settings};

/// One external program call: what to run, with which arguments, and how
/// long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Builds `sshfs user@host:path <mount point> -p <port> [-o IdentityFile=..] [extras] [-o reconnect]`.
pub fn mount_invocation(profile: &ConnectionProfile, settings: &Settings) -> Invocation {
    let mut args = vec![
        profile.target(),
        profile.mount_point().to_string_lossy().into_owned(),
        "-p".to_owned(),
        profile.port.to_string(),
    ];
    if let Some(key) = profile.identity_path() {
        args.push("-o".to_owned());
        args.push(format!("IdentityFile={}", key.display()));
    }
    if let Some(extra) = profile.extra_options.as_deref() {
        push_extra_options(&mut args, extra);
    }
    if settings.reconnect {
        args.push("-o".to_owned());
        args.push("reconnect".to_owned());
    }
    Invocation::new(&settings.mount_tool, args, settings.mount_timeout())
}

/// Extras that already look like flags (`-o compression=yes -C`) are split on
/// whitespace and appended verbatim; a bare option list
/// (`compression=yes,ServerAliveInterval=15`) is passed as one `-o` value.
fn push_extra_options(args: &mut Vec<String>, extra: &str) {
    let extra = extra.trim();
    if extra.is_empty() {
        return;
    }
    if extra.starts_with('-') {
        args.extend(extra.split_whitespace().map(str::to_owned));
    } else {
        args.push("-o".to_owned());
        args.push(extra.to_owned());
    }
}

/// One invocation per configured unmount tool, in fallback order.
///
/// `fusermount` takes `-u` (plus `-z` when forced); plain `umount` takes the
/// mount point alone (plus `-l` when forced).
pub fn unmount_invocations(mount_point: &Path, settings: &Settings, force: bool) -> Vec<Invocation> {
    let target = mount_point.to_string_lossy().into_owned();
    settings
        .unmount_tools
        .iter()
        .map(|tool| {
            let mut args = Vec::new();
            if is_fusermount(tool) {
                args.push("-u".to_owned());
                if force {
                    args.push("-z".to_owned());
                }
            } else if force {
                args.push("-l".to_owned());
            }
            args.push(target.clone());
            Invocation::new(tool, args, settings.unmount_timeout())
        })
        .collect()
}

fn is_fusermount(tool: &str) -> bool {
    Path::new(tool)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("fusermount"))
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
    fn minimal_profile_builds_baseline_invocation() {
        let inv = mount_invocation(&work(), &Settings::default());
        assert_eq!(inv.program, "sshfs");
        assert_eq!(
            inv.args,
            [
                "alice@10.0.0.5:/home/alice",
                "/mnt/work",
                "-p",
                "22",
                "-o",
                "reconnect"
            ]
        );
        assert_eq!(inv.timeout, Duration::from_secs(30));
    }

    #[test]
    fn identity_file_and_flag_extras_are_appended() {
        let mut p = work();
        p.port = 2222;
        p.identity_file = Some("/keys/id_ed25519".into());
        p.extra_options = Some("-o compression=yes -C".into());
        let inv = mount_invocation(&p, &Settings::default());
        assert_eq!(
            inv.args[2..],
            [
                "-p",
                "2222",
                "-o",
                "IdentityFile=/keys/id_ed25519",
                "-o",
                "compression=yes",
                "-C",
                "-o",
                "reconnect"
            ]
        );
    }

    #[test]
    fn bare_option_list_gets_one_dash_o() {
        let mut p = work();
        p.extra_options = Some("ServerAliveInterval=15,cache=no".into());
        let settings = Settings {
            reconnect: false,
            ..Settings::default()
        };
        let inv = mount_invocation(&p, &settings);
        assert_eq!(inv.args[4..], ["-o", "ServerAliveInterval=15,cache=no"]);
    }

    #[test]
    fn unmount_chain_uses_tool_specific_flags() {
        let invs = unmount_invocations(Path::new("/mnt/work"), &Settings::default(), false);
        assert_eq!(invs.len(), 2);
        assert_eq!(invs[0].to_string(), "fusermount -u /mnt/work");
        assert_eq!(invs[1].to_string(), "umount /mnt/work");

        let forced = unmount_invocations(Path::new("/mnt/work"), &Settings::default(), true);
        assert_eq!(forced[0].to_string(), "fusermount -u -z /mnt/work");
        assert_eq!(forced[1].to_string(), "umount -l /mnt/work");
    }
}
