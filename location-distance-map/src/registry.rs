//! Authoritative store of locations.
//!
//! The registry is single-writer: one async mutex guards both the record list
//! and the id counter, and a file-backed registry writes its JSON document
//! while still holding that lock. An `add` therefore either assigns an id and
//! lands on disk, or changes nothing.

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, info};

use crate::location::{Location, LocationId, NewLocation, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to access registry file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("registry file {} is not valid JSON: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("registry file {} holds an invalid location with id {id}", .path.display())]
    InvalidRecord { path: PathBuf, id: LocationId },
    #[error("registry file {} holds location id {id} more than once", .path.display())]
    DuplicateId { path: PathBuf, id: LocationId },
    #[error("no location ids left after {last}")]
    IdsExhausted { last: LocationId },
}

/// On-disk and in-memory shape of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryState {
    next_id: LocationId,
    locations: Vec<Location>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            next_id: 1,
            locations: Vec::new(),
        }
    }
}

pub struct LocationRegistry {
    state: Mutex<RegistryState>,
    storage: Option<PathBuf>,
}

impl LocationRegistry {
    /// Creates a registry that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            storage: None,
        }
    }

    /// Opens a file-backed registry, starting empty if the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let mut state = match fs::read(&path).await {
            Ok(bytes) => {
                serde_json::from_slice::<RegistryState>(&bytes).map_err(|source| {
                    RegistryError::Format {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => RegistryState::default(),
            Err(source) => return Err(RegistryError::Io { path, source }),
        };

        check_records(&path, &state.locations)?;

        // Ids are never reused, even if the counter in the file was edited by hand.
        let highest = state.locations.iter().map(|loc| loc.id).max().unwrap_or(0);
        let after_highest = highest
            .checked_add(1)
            .ok_or(RegistryError::IdsExhausted { last: highest })?;
        state.next_id = state.next_id.max(after_highest);

        info!(
            path = %path.display(),
            locations = state.locations.len(),
            "opened location registry"
        );

        Ok(Self {
            state: Mutex::new(state),
            storage: Some(path),
        })
    }

    /// Validates and stores a new location, returning it with its assigned id.
    pub async fn add(&self, new: NewLocation) -> Result<Location, RegistryError> {
        let new = new.validate()?;
        let mut state = self.state.lock().await;

        let id = state.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or(RegistryError::IdsExhausted { last: id })?;
        let location = Location {
            id,
            name: new.name,
            lat: new.lat,
            lng: new.lng,
        };
        state.locations.push(location.clone());
        state.next_id = next_id;

        if let Some(path) = &self.storage {
            if let Err(err) = persist(path, &state).await {
                state.locations.pop();
                state.next_id = id;
                return Err(err);
            }
        }

        info!(id = location.id, name = %location.name, "location added");
        Ok(location)
    }

    /// Returns every location in creation order.
    pub async fn list(&self) -> Vec<Location> {
        self.state.lock().await.locations.clone()
    }
}

/// Rejects a loaded file whose records break the invariants `add` upholds.
fn check_records(path: &Path, locations: &[Location]) -> Result<(), RegistryError> {
    let mut seen = HashSet::with_capacity(locations.len());
    for location in locations {
        let valid = location.id >= 1
            && NewLocation::new(location.name.clone(), location.lat, location.lng)
                .validate()
                .is_ok_and(|checked| checked.name == location.name);
        if !valid {
            return Err(RegistryError::InvalidRecord {
                path: path.to_path_buf(),
                id: location.id,
            });
        }
        if !seen.insert(location.id) {
            return Err(RegistryError::DuplicateId {
                path: path.to_path_buf(),
                id: location.id,
            });
        }
    }
    Ok(())
}

/// Writes the registry to a sibling temp file, syncs it, and renames it into place.
async fn persist(path: &Path, state: &RegistryState) -> Result<(), RegistryError> {
    let encoded = serde_json::to_vec_pretty(state).map_err(|source| RegistryError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    let io_error = |source: io::Error| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).await.map_err(io_error)?;
    file.write_all(&encoded).await.map_err(io_error)?;
    file.sync_all().await.map_err(io_error)?;
    drop(file);
    fs::rename(&tmp_path, path).await.map_err(io_error)?;

    debug!(path = %path.display(), bytes = encoded.len(), "registry persisted");
    Ok(())
}
