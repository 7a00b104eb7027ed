//! Seam to the map rendering service.
//!
//! Markers are owned by the renderer; the sync controller only keeps a
//! [`MarkerIndex`] from location id to handle for lookups. Clicks travel the
//! other way as [`MarkerClick`] values on a channel, so markers carry no
//! behaviour of their own.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::location::{Coordinate, LocationId};

/// Initial map centre (Colombo).
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 6.9271,
    lng: 79.8612,
};
pub const DEFAULT_ZOOM: u8 = 8;

/// Opaque reference to a marker owned by a [`MapRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Bounce,
    Off,
}

/// A user clicked the marker of `location_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerClick {
    pub location_id: LocationId,
}

pub trait MapRenderer {
    fn create_marker(
        &mut self,
        position: Coordinate,
        label: &str,
        location_id: LocationId,
    ) -> MarkerHandle;

    fn remove_marker(&mut self, handle: MarkerHandle);

    fn set_animation(&mut self, handle: MarkerHandle, animation: Animation);
}

/// Location id to marker handle, rebuilt together with the mirror.
#[derive(Debug, Default)]
pub struct MarkerIndex {
    handles: HashMap<LocationId, MarkerHandle>,
}

impl MarkerIndex {
    pub fn get(&self, id: LocationId) -> Option<MarkerHandle> {
        self.handles.get(&id).copied()
    }

    pub fn contains(&self, id: LocationId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn insert(&mut self, id: LocationId, handle: MarkerHandle) {
        self.handles.insert(id, handle);
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = MarkerHandle> + '_ {
        self.handles.drain().map(|(_, handle)| handle)
    }
}

struct ConsoleMarker {
    location_id: LocationId,
    label: String,
}

/// Renderer for the terminal client: markers are log lines.
pub struct ConsoleMap {
    next_handle: u64,
    live: BTreeMap<MarkerHandle, ConsoleMarker>,
    clicks: mpsc::UnboundedSender<MarkerClick>,
}

impl ConsoleMap {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MarkerClick>) {
        let (clicks, rx) = mpsc::unbounded_channel();
        info!(
            lat = DEFAULT_CENTER.lat,
            lng = DEFAULT_CENTER.lng,
            zoom = DEFAULT_ZOOM,
            "map ready"
        );
        let map = Self {
            next_handle: 1,
            live: BTreeMap::new(),
            clicks,
        };
        (map, rx)
    }

    pub fn live_markers(&self) -> usize {
        self.live.len()
    }

    /// Emits a click on the marker for `location_id`. Returns false when no such marker is live.
    pub fn click(&self, location_id: LocationId) -> bool {
        let Some((handle, marker)) = self
            .live
            .iter()
            .find(|(_, marker)| marker.location_id == location_id)
        else {
            return false;
        };
        debug!(marker = handle.raw(), label = %marker.label, "marker clicked");
        self.clicks.send(MarkerClick { location_id }).is_ok()
    }
}

impl MapRenderer for ConsoleMap {
    fn create_marker(
        &mut self,
        position: Coordinate,
        label: &str,
        location_id: LocationId,
    ) -> MarkerHandle {
        let handle = MarkerHandle(self.next_handle);
        self.next_handle += 1;
        debug!(
            marker = handle.raw(),
            location_id,
            label,
            lat = position.lat,
            lng = position.lng,
            "marker created"
        );
        self.live.insert(
            handle,
            ConsoleMarker {
                location_id,
                label: label.to_string(),
            },
        );
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.live.remove(&handle).is_some() {
            debug!(marker = handle.raw(), "marker removed");
        }
    }

    fn set_animation(&mut self, handle: MarkerHandle, animation: Animation) {
        if let Some(marker) = self.live.get(&handle) {
            info!(marker = handle.raw(), label = %marker.label, ?animation, "marker animation");
        }
    }
}
