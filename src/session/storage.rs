use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use log::debug;

use crate::errors::AppResult;

/// A single durable slot holding the raw credential.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStorage: Send + Sync {
    fn read(&self) -> AppResult<Option<String>>;
    fn write(&self, raw: &str) -> AppResult<()>;
    fn remove(&self) -> AppResult<()>;
}

/// Keeps the credential in a file so it survives a restart.
pub struct FileCredentialStorage {
    path: PathBuf,
}

impl FileCredentialStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStorage for FileCredentialStorage {
    fn read(&self) -> AppResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let raw = contents.trim();
                Ok((!raw.is_empty()).then(|| raw.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, raw: &str) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raw)?;
        debug!("Stored credential at {}", self.path.display());
        Ok(())
    }

    fn remove(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed stored credential at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(raw: &str) -> Self {
        Self {
            slot: Mutex::new(Some(raw.to_string())),
        }
    }
}

impl CredentialStorage for MemoryCredentialStorage {
    fn read(&self) -> AppResult<Option<String>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, raw: &str) -> AppResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.to_string());
        Ok(())
    }

    fn remove(&self) -> AppResult<()> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
