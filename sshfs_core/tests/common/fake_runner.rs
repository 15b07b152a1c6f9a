//! Deterministic **in-process stand-ins** for the mount tool and the mount
//! table.
//!
//! *  `FakeRunner` records every invocation and answers from a per-program
//!    script (default: exit 0). A successful `sshfs` adds its mount point to
//!    the shared `FakeMountTable`; a successful unmount tool removes it,
//!    exactly as the real kernel table would change.
//! *  `FakeMountTable` never touches the real filesystem, so tests can use
//!    paths like `/mnt/work` without root.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sshfs_core::mount::{CommandOutput, CommandRunner, Invocation, MountError, MountTable};

#[derive(Clone, Default)]
pub struct FakeMountTable {
    mounted: Arc<Mutex<HashSet<PathBuf>>>,
    prepared: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeMountTable {
    pub fn insert(&self, path: impl Into<PathBuf>) {
        self.mounted.lock().insert(path.into());
    }

    pub fn remove(&self, path: &Path) {
        self.mounted.lock().remove(path);
    }

    pub fn prepared(&self) -> Vec<PathBuf> {
        self.prepared.lock().clone()
    }
}

impl MountTable for FakeMountTable {
    fn is_mounted(&self, path: &Path) -> bool {
        self.mounted.lock().contains(path)
    }

    fn prepare_mount_point(&self, path: &Path) -> io::Result<()> {
        self.prepared.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// A scripted reply for one run of a program.
#[derive(Debug, Clone)]
pub enum Reply {
    Exit { code: i32, stderr: String },
    Missing,
    TimedOut,
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Exit {
            code: 0,
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Reply::Exit {
            code,
            stderr: stderr.to_owned(),
        }
    }
}

#[derive(Clone)]
pub struct FakeRunner {
    table: FakeMountTable,
    script: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    /// Every invocation seen, in order.
    pub history: Arc<Mutex<Vec<Invocation>>>,
    delay: Arc<Mutex<Duration>>,
    installed: Arc<Mutex<HashSet<String>>>,
}

impl FakeRunner {
    pub fn new(table: FakeMountTable) -> Self {
        let installed = ["sshfs", "fusermount", "umount"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        Self {
            table,
            script: Arc::default(),
            history: Arc::default(),
            delay: Arc::default(),
            installed: Arc::new(Mutex::new(installed)),
        }
    }

    /// Queue a reply for the next run of `program`.
    pub fn push(&self, program: &str, reply: Reply) {
        self.script
            .lock()
            .entry(program.to_owned())
            .or_default()
            .push_back(reply);
    }

    /// Make every run take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn uninstall(&self, program: &str) {
        self.installed.lock().remove(program);
    }

    pub fn history(&self) -> Vec<Invocation> {
        self.history.lock().clone()
    }

    pub fn runs_of(&self, program: &str) -> usize {
        self.history
            .lock()
            .iter()
            .filter(|inv| inv.program == program)
            .count()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, MountError> {
        self.history.lock().push(invocation.clone());
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .script
            .lock()
            .get_mut(&invocation.program)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(Reply::ok);

        match reply {
            Reply::Missing => Err(MountError::ToolUnavailable(invocation.program.clone())),
            Reply::TimedOut => Err(MountError::TimedOut {
                tool: invocation.program.clone(),
                secs: invocation.timeout.as_secs(),
            }),
            Reply::Exit { code, stderr } => {
                if code == 0 {
                    let target = PathBuf::from(invocation.args.last().cloned().unwrap_or_default());
                    if invocation.program == "sshfs" {
                        self.table.insert(PathBuf::from(&invocation.args[1]));
                    } else {
                        self.table.remove(&target);
                    }
                }
                Ok(CommandOutput {
                    code: Some(code),
                    stdout: String::new(),
                    stderr,
                })
            }
        }
    }

    fn resolve(&self, program: &str) -> bool {
        self.installed.lock().contains(program)
    }
}
