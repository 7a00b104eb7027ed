use serde::{Deserialize, Serialize};

use crate::location::LocationId;

/// Path serving both the list and the add endpoints.
pub const LOCATIONS_PATH: &str = "/api/locations";
/// Legacy list endpoint kept for existing front ends.
pub const LEGACY_LIST_PATH: &str = "/get_locations.php";
/// Legacy add endpoint kept for existing front ends.
pub const LEGACY_SAVE_PATH: &str = "/save_location.php";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// Reply to an add request. Callers branch on `status`, not on the HTTP code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LocationId>,
}

impl AddResponse {
    pub fn success(id: LocationId) -> Self {
        Self {
            status: Status::Success,
            id: Some(id),
        }
    }

    pub fn error() -> Self {
        Self {
            status: Status::Error,
            id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
