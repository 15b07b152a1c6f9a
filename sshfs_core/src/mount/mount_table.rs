use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::debug;

use crate::utils::paths::normalize;

/// The kernel's view of the current process's mounts.
pub const PROC_MOUNTS: &str = "/proc/self/mounts";

/// The host side of mounting: the table of live mounts and the mount point
/// directories.
pub trait MountTable: Send + Sync {
    /// Is something mounted at `path` right now? Must never fail: an
    /// unreadable table or a path that was never mounted both answer `false`.
    fn is_mounted(&self, path: &Path) -> bool;

    /// Creates the mount point directory (and parents) if it is missing.
    fn prepare_mount_point(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

/// One line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Reads `/proc/self/mounts` (or another file in the same format) on every
/// query.
#[derive(Debug, Clone)]
pub struct ProcMounts {
    table: PathBuf,
}

impl Default for ProcMounts {
    fn default() -> Self {
        Self::new(PROC_MOUNTS)
    }
}

impl ProcMounts {
    pub fn new(table: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn entries(&self) -> Vec<MountEntry> {
        match fs::read_to_string(&self.table) {
            Ok(text) => parse_mount_table(&text),
            Err(e) => {
                debug!("Could not read mount table {:?}: {e}", self.table);
                Vec::new()
            }
        }
    }

    pub fn find(&self, path: &Path) -> Option<MountEntry> {
        let wanted = normalize(path);
        // Later lines shadow earlier ones for the same mount point.
        self.entries()
            .into_iter()
            .rev()
            .find(|e| e.mount_point == wanted)
    }
}

impl MountTable for ProcMounts {
    fn is_mounted(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }
}

/// Parses `fstab`-style lines: `source mountpoint fstype options dump pass`.
/// Malformed lines are skipped.
pub fn parse_mount_table(text: &str) -> Vec<MountEntry> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                source: unescape(source),
                mount_point: normalize(Path::new(&unescape(mount_point))),
                fs_type: fs_type.to_owned(),
            })
        })
        .collect()
}

/// The kernel writes space, tab, newline and backslash as `\040`, `\011`,
/// `\012` and `\134`.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_triplet(&bytes[i + 1..i + 4]) {
            let value =
                (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_triplet(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}
