use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::StorageConfig;
use crate::constants::{PROFILE_DIR_NAME, PROFILE_FILE_NAME};

/// A named set of R2 credentials.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Profile {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Credentials")]
    pub credentials: StorageConfig,
}

/// JSON-backed list of profiles stored with owner-only permissions.
///
/// The file is a JSON array of [`Profile`] values. A missing file is treated
/// as an empty list; it is only created on the first write.
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<Profile>,
}

/// Default profile directory, `$HOME/.r2uploader` (or `%USERPROFILE%` on Windows)
pub fn default_profile_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .ok_or_else(|| anyhow!("could not get home directory"))?;
    Ok(PathBuf::from(home).join(PROFILE_DIR_NAME))
}

impl ProfileStore {
    /// Open the store in `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        create_private_dir(dir)
            .with_context(|| format!("could not create config directory {}", dir.display()))?;

        let path = dir.join(PROFILE_FILE_NAME);
        let profiles = if path.exists() {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("could not read profiles from {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("could not parse profiles in {}", path.display()))?
        } else {
            Vec::new()
        };

        debug!("Loaded {} profiles from {}", profiles.len(), path.display());
        Ok(ProfileStore { path, profiles })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&default_profile_dir()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Add a profile and persist the list. Names must be unique.
    pub fn add(&mut self, name: &str, credentials: StorageConfig) -> Result<()> {
        if name.trim().is_empty() {
            bail!("profile name must not be empty");
        }
        if self.get(name).is_some() {
            bail!("profile '{}' already exists", name);
        }

        self.profiles.push(Profile {
            name: name.to_string(),
            credentials,
        });
        self.save()?;

        info!("Profile '{}' saved to {}", name, self.path.display());
        Ok(())
    }

    /// Remove a profile by name and persist the list.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);
        if self.profiles.len() == before {
            bail!("profile '{}' not found", name);
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.profiles)
            .context("could not serialize profiles")?;
        write_private_file(&self.path, data.as_bytes())
            .with_context(|| format!("could not write profiles to {}", self.path.display()))?;
        // An existing file keeps its old mode when truncated
        restrict_to_owner(&self.path, 0o600)
    }
}

/// Write `data`, creating the file owner-only so it is never readable by others
#[cfg(unix)]
fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    fs::write(path, data)
}

fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    restrict_to_owner(dir, 0o700)
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("could not set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
