use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use tempfile::NamedTempFile;

use super::errors::{StoreError, ValidationError};
use super::profile::ConnectionProfile;
use crate::utils::paths::default_config_dir;

pub const STORE_FILE_NAME: &str = "connections.json";

/// The ordered, authoritative collection of connection profiles.
///
/// Every mutation is validated against the whole list first and rejected
/// without any change when it breaks an invariant. A valid mutation then
/// rewrites the whole file at `path`. When that write fails the change is
/// still kept in memory for the session and reported as
/// [`StoreError::Unsaved`].
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<ConnectionProfile>,
}

impl ProfileStore {
    /// An empty store bound to `path`. Nothing is read or written.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            profiles: Vec::new(),
        }
    }

    /// Opens the store at `path`.
    ///
    /// Never fails: an unreadable or malformed file yields an empty store
    /// plus the error so the caller can warn the user. Entries that break a
    /// profile invariant (for example after a hand edit) are left out and
    /// reported as [`StoreError::Invalid`]; earlier entries win name and
    /// mount point clashes. In both cases the file is copied to
    /// `<file>.bak` first so the next save cannot destroy it.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Option<StoreError>) {
        let mut store = Self::at(path);
        let loaded = match store.load() {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Starting with an empty store: {e}");
                if matches!(e, StoreError::Malformed { .. }) {
                    store.backup_original();
                }
                return (store, Some(e));
            }
        };

        let mut rejected = Vec::new();
        for profile in loaded {
            let checked = profile
                .validate()
                .and_then(|()| store.check_conflicts(&profile, None));
            match checked {
                Ok(()) => store.profiles.push(profile),
                Err(e) => {
                    warn!("Skipping stored connection '{}': {e}", profile.name);
                    rejected.push(format!("'{}': {e}", profile.name));
                }
            }
        }
        info!(
            "Loaded {} connection(s) from {:?}",
            store.profiles.len(),
            store.path
        );
        if rejected.is_empty() {
            (store, None)
        } else {
            store.backup_original();
            (store, Some(StoreError::Invalid(rejected)))
        }
    }

    /// `~/.config/sshfs-gui/connections.json` on Linux, or the same file
    /// name under `config_dir` when one is given.
    pub fn open_in(config_dir: Option<&Path>) -> Result<(Self, Option<StoreError>), StoreError> {
        let dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_config_dir().ok_or(StoreError::NoConfigDir)?,
        };
        Ok(Self::open(dir.join(STORE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profiles(&self) -> &[ConnectionProfile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Reads the persisted file. An absent file is a first run and yields
    /// an empty list.
    pub fn load(&self) -> Result<Vec<ConnectionProfile>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No store at {:?}; first run", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        serde_json::from_reader(io::BufReader::new(file)).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Writes the full ordered list: temp file in the same directory,
    /// fsync, then rename over the old file.
    pub fn save(&self, profiles: &[ConnectionProfile]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        serde_json::to_writer_pretty(&mut tmp, profiles)
            .map_err(|e| StoreError::io(&self.path, io::Error::from(e)))?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        debug!("Wrote {} connection(s) to {:?}", profiles.len(), self.path);
        Ok(())
    }

    /// Appends a new profile and persists.
    pub fn add(&mut self, profile: ConnectionProfile) -> Result<(), StoreError> {
        let profile = profile.normalized();
        profile.validate()?;
        self.check_conflicts(&profile, None)?;

        let mut next = self.profiles.clone();
        next.push(profile);
        self.commit(next)
    }

    /// Replaces the profile called `name` (which may be renamed) in place
    /// and persists. Returns the previous version.
    pub fn update(
        &mut self,
        name: &str,
        profile: ConnectionProfile,
    ) -> Result<ConnectionProfile, StoreError> {
        let index = self.index_of(name)?;
        let profile = profile.normalized();
        profile.validate()?;
        self.check_conflicts(&profile, Some(index))?;

        let mut next = self.profiles.clone();
        let previous = std::mem::replace(&mut next[index], profile);
        self.commit(next)?;
        Ok(previous)
    }

    /// Deletes the profile called `name` and persists.
    pub fn remove(&mut self, name: &str) -> Result<ConnectionProfile, StoreError> {
        let index = self.index_of(name)?;
        let mut next = self.profiles.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    fn commit(&mut self, next: Vec<ConnectionProfile>) -> Result<(), StoreError> {
        let saved = self.save(&next);
        self.profiles = next;
        saved.map_err(|e| match e {
            StoreError::Io { path, source } => {
                warn!("Keeping the change in memory only: {source}");
                StoreError::Unsaved { path, source }
            }
            other => other,
        })
    }

    fn index_of(&self, name: &str) -> Result<usize, StoreError> {
        self.profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))
    }

    /// Name must be unique; mount point must be unique among enabled profiles.
    fn check_conflicts(
        &self,
        candidate: &ConnectionProfile,
        skip: Option<usize>,
    ) -> Result<(), ValidationError> {
        let mount_point = candidate.mount_point();
        for (i, existing) in self.profiles.iter().enumerate() {
            if Some(i) == skip {
                continue;
            }
            if existing.name == candidate.name {
                return Err(ValidationError::DuplicateName(candidate.name.clone()));
            }
            if candidate.enabled && existing.enabled && existing.mount_point() == mount_point {
                return Err(ValidationError::DuplicateMountPoint {
                    path: candidate.local_mount_point.clone(),
                    other: existing.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn backup_original(&self) {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".bak");
        match fs::copy(&self.path, &backup) {
            Ok(_) => warn!("Copied the original store to {:?}", backup),
            Err(e) => warn!("Could not back up store {:?}: {e}", self.path),
        }
    }
}
