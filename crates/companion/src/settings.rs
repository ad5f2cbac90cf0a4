//! Local persistence of [`DeviceSettings`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use domain::models::DeviceSettings;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Mutation applied by [`SettingsStore::update`]; returns whether it changed anything.
pub type SettingsUpdate = Box<dyn FnOnce(&mut DeviceSettings) -> bool + Send>;

/// Persisted settings of one device.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<DeviceSettings, SettingsError>;

    async fn save(&self, settings: &DeviceSettings) -> Result<(), SettingsError>;

    /// Load, mutate and save as one step with respect to other `update`
    /// calls on the same store. Saves only if `apply` reports a change.
    async fn update(&self, apply: SettingsUpdate) -> Result<(DeviceSettings, bool), SettingsError>;
}

/// Settings kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<DeviceSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: DeviceSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<DeviceSettings, SettingsError> {
        Ok(self.settings.lock().await.clone())
    }

    async fn save(&self, settings: &DeviceSettings) -> Result<(), SettingsError> {
        *self.settings.lock().await = settings.clone();
        Ok(())
    }

    async fn update(&self, apply: SettingsUpdate) -> Result<(DeviceSettings, bool), SettingsError> {
        let mut settings = self.settings.lock().await;
        let changed = apply(&mut *settings);
        Ok((settings.clone(), changed))
    }
}

/// Settings stored as a JSON document on disk.
///
/// A missing file reads as default settings.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<DeviceSettings, SettingsError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file, using defaults");
                Ok(DeviceSettings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, settings: &DeviceSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(settings)?;

        // Replaced via rename, never written in place.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<DeviceSettings, SettingsError> {
        self.read().await
    }

    async fn save(&self, settings: &DeviceSettings) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        self.write(settings).await
    }

    async fn update(&self, apply: SettingsUpdate) -> Result<(DeviceSettings, bool), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.read().await?;
        let changed = apply(&mut settings);
        if changed {
            self.write(&settings).await?;
        }
        Ok((settings, changed))
    }
}

/// Returns the local instance id, generating and persisting one if unset.
pub async fn ensure_instance_id(store: &dyn SettingsStore) -> Result<String, SettingsError> {
    let (settings, generated) = store
        .update(Box::new(|s: &mut DeviceSettings| {
            if s.has_instance_id() {
                false
            } else {
                s.instance_id = Uuid::new_v4().to_string();
                true
            }
        }))
        .await?;

    if generated {
        info!(instance_id = %settings.instance_id, "Generated instance id");
    }
    Ok(settings.instance_id)
}

/// Adopts `instance_id` from the paired device if none is set locally.
///
/// Returns whether it was adopted. A differing id is ignored once one is set.
pub async fn adopt_instance_id(
    store: &dyn SettingsStore,
    instance_id: &str,
) -> Result<bool, SettingsError> {
    if instance_id.is_empty() {
        return Ok(false);
    }

    let candidate = instance_id.to_string();
    let (settings, adopted) = store
        .update(Box::new(move |s: &mut DeviceSettings| {
            if s.has_instance_id() {
                false
            } else {
                s.instance_id = candidate;
                true
            }
        }))
        .await?;

    if adopted {
        info!(instance_id = %settings.instance_id, "Adopted instance id from peer");
    } else if settings.instance_id != instance_id {
        debug!(
            local = %settings.instance_id,
            incoming = %instance_id,
            "Ignoring differing instance id from peer"
        );
    }
    Ok(adopted)
}

/// Merges settings received from the paired device into the local copy.
pub async fn merge_settings(
    store: &dyn SettingsStore,
    incoming: DeviceSettings,
) -> Result<bool, SettingsError> {
    let (_, changed) = store
        .update(Box::new(move |s: &mut DeviceSettings| s.merge_from(&incoming)))
        .await?;
    Ok(changed)
}
