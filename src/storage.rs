use crate::errors::ServiceError;
use crate::live::{ChangeEvent, Collection};
use crate::models::{AppData, SCHEMA_VERSION};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info};

const CHANGE_FEED_CAPACITY: usize = 256;

/// Handle to the document set. Built once at startup and shared through
/// [`crate::AppState`].
#[derive(Debug)]
pub struct Backend {
    path: PathBuf,
    data: Mutex<AppData>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Backend {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let data = load_data(&path).await?;
        info!(
            path = %path.display(),
            profiles = data.profiles.len(),
            tasks = data.tasks.len(),
            "document store opened"
        );
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            path,
            data: Mutex::new(data),
            changes,
        })
    }

    pub async fn read<T>(&self, view: impl FnOnce(&AppData) -> T) -> T {
        let data = self.data.lock().await;
        view(&data)
    }

    /// Applies `apply` to a copy of the document set and persists it before
    /// making it visible. Either every write of the command lands or none do.
    pub async fn transact<T>(
        &self,
        apply: impl FnOnce(&mut AppData) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut data = self.data.lock().await;
        let mut draft = data.clone();
        let output = apply(&mut draft)?;
        persist_data(&self.path, &draft).await?;
        *data = draft;
        Ok(output)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    pub fn notify(&self, user_id: &str, collections: &[Collection]) {
        let at = Utc::now();
        for &collection in collections {
            let event = ChangeEvent {
                user_id: user_id.to_string(),
                collection,
                at,
            };
            // No receivers is not an error: nobody is watching.
            if self.changes.send(event).is_err() {
                debug!(user_id, ?collection, "no live subscribers");
            }
        }
    }
}

pub async fn load_data(path: &Path) -> Result<AppData, ServiceError> {
    match fs::read(path).await {
        Ok(bytes) => {
            let data: AppData = serde_json::from_slice(&bytes).map_err(|err| {
                error!("failed to parse data file: {err}");
                ServiceError::from(err)
            })?;
            if data.schema_version != SCHEMA_VERSION {
                return Err(ServiceError::UnsupportedSchema {
                    found: data.schema_version,
                    expected: SCHEMA_VERSION,
                });
            }
            Ok(data)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(AppData::default()),
        Err(err) => {
            error!("failed to read data file: {err}");
            Err(err.into())
        }
    }
}

/// Writes to a sibling temp file and renames it over the target.
pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), ServiceError> {
    let payload = serde_json::to_vec_pretty(data)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    if let Err(err) = fs::write(&tmp, payload).await {
        error!(path = %tmp.display(), "failed to write data file: {err}");
        return Err(err.into());
    }
    if let Err(err) = fs::rename(&tmp, path).await {
        error!(path = %path.display(), "failed to replace data file: {err}");
        return Err(err.into());
    }
    Ok(())
}
