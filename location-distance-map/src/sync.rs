//! Client-side mirror of the registry and the markers that depict it.
//!
//! [`SyncController`] owns three things that must agree after every load:
//! the mirror ([`LocationStore`]), the [`MarkerIndex`], and the selector
//! options. A load tears all markers down and rebuilds them from the fresh
//! snapshot instead of diffing. Every operation reports its own failures
//! through the [`Notifier`] and also returns them, so callers can ignore the
//! result without losing the user-facing message.

use std::fmt;

use tracing::{debug, info, warn};

use crate::{
    api::{RegistryApi, TransportError},
    distance::{compute_distance, to_display_km},
    highlight::{HighlightState, Highlighter, Scheduler, Ticket},
    location::{Location, LocationId, NewLocation},
    map::{MapRenderer, MarkerClick, MarkerIndex},
    notify::{InfoOptions, Notifier},
};

const SAVE_FAILED_TITLE: &str = "Oops...";
const SAVE_FAILED_BODY: &str = "Something went wrong while saving the location!";

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("the registry rejected the location")]
    Validation,
    #[error("no location selected")]
    NotSelected,
    #[error("location '{0}' is not in the current list")]
    UnknownLocation(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Ordered snapshot of the registry held by the client.
#[derive(Debug, Default, Clone)]
pub struct LocationStore {
    locations: Vec<Location>,
}

impl LocationStore {
    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.iter().find(|loc| loc.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// One line of a distance listing, already rounded for display.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceEntry {
    pub name: String,
    pub distance_km: f64,
}

impl fmt::Display for DistanceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2} km", self.name, self.distance_km)
    }
}

/// An entry of the location dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    pub id: LocationId,
    pub label: String,
}

pub struct SyncController<A, M, N, S: Scheduler> {
    api: A,
    map: M,
    notifier: N,
    highlighter: Highlighter<S>,
    mirror: LocationStore,
    markers: MarkerIndex,
    selector: Vec<SelectorOption>,
}

impl<A, M, N, S> SyncController<A, M, N, S>
where
    A: RegistryApi,
    M: MapRenderer,
    N: Notifier,
    S: Scheduler,
{
    pub fn new(api: A, map: M, notifier: N, scheduler: S) -> Self {
        Self::with_highlighter(api, map, notifier, Highlighter::new(scheduler))
    }

    pub fn with_highlighter(api: A, map: M, notifier: N, highlighter: Highlighter<S>) -> Self {
        Self {
            api,
            map,
            notifier,
            highlighter,
            mirror: LocationStore::default(),
            markers: MarkerIndex::default(),
            selector: Vec::new(),
        }
    }

    pub fn mirror(&self) -> &LocationStore {
        &self.mirror
    }

    pub fn markers(&self) -> &MarkerIndex {
        &self.markers
    }

    pub fn selector_options(&self) -> &[SelectorOption] {
        &self.selector
    }

    pub fn highlight_state(&self) -> HighlightState {
        self.highlighter.state()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// Replaces the mirror, markers, and selector with the registry's current list.
    ///
    /// On failure nothing local changes.
    pub async fn load_snapshot(&mut self) -> Result<(), SyncError> {
        let snapshot = match self.api.list().await {
            Ok(snapshot) => snapshot,
            Err(err) => return Err(self.fail(err.into())),
        };

        // Handles are about to be released; the highlight must not outlive them.
        self.highlighter.deactivate(&mut self.map);
        for handle in self.markers.drain() {
            self.map.remove_marker(handle);
        }

        let mut locations = Vec::with_capacity(snapshot.len());
        for location in snapshot {
            if self.markers.contains(location.id) {
                warn!(id = location.id, "registry returned a duplicate id; skipping");
                continue;
            }
            let handle = self
                .map
                .create_marker(location.coordinate(), &location.name, location.id);
            self.markers.insert(location.id, handle);
            locations.push(location);
        }

        self.selector = locations
            .iter()
            .map(|loc| SelectorOption {
                id: loc.id,
                label: loc.name.clone(),
            })
            .collect();
        self.mirror = LocationStore { locations };

        info!(locations = self.mirror.len(), "snapshot loaded");
        Ok(())
    }

    /// Submits a new location and reloads on success.
    ///
    /// Returns the id the registry assigned, if it reported one. A failed
    /// reload after a successful add is reported separately and does not turn
    /// the add into an error.
    pub async fn add_location(
        &mut self,
        location: NewLocation,
    ) -> Result<Option<LocationId>, SyncError> {
        let response = match self.api.add(&location).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err.into())),
        };
        if !response.is_success() {
            return Err(self.fail(SyncError::Validation));
        }

        self.notifier.show_success(
            "Location Added!",
            "The new location has been saved successfully.",
        );
        if let Err(err) = self.load_snapshot().await {
            debug!(error = %err, "reload after add failed");
        }
        Ok(response.id)
    }

    /// Distances from `source` to every other mirrored location, in mirror order.
    pub fn show_distances(&self, source: &Location) -> Vec<DistanceEntry> {
        let from = source.coordinate();
        self.mirror
            .iter()
            .filter(|loc| loc.id != source.id)
            .map(|loc| DistanceEntry {
                name: loc.name.clone(),
                distance_km: to_display_km(compute_distance(from, loc.coordinate())),
            })
            .collect()
    }

    /// Resolves a selector value and presents the distances from it.
    pub fn select_and_show(&mut self, selection: &str) -> Result<Vec<DistanceEntry>, SyncError> {
        let selection = selection.trim();
        if selection.is_empty() {
            return Err(self.fail(SyncError::NotSelected));
        }

        let source = selection
            .parse::<LocationId>()
            .ok()
            .and_then(|id| self.mirror.get(id))
            .cloned();
        match source {
            Some(source) => Ok(self.present(&source)),
            None => Err(self.fail(SyncError::UnknownLocation(selection.to_string()))),
        }
    }

    /// Presents the distances from the clicked marker's location.
    pub fn handle_marker_click(
        &mut self,
        click: MarkerClick,
    ) -> Result<Vec<DistanceEntry>, SyncError> {
        match self.mirror.get(click.location_id).cloned() {
            Some(source) => Ok(self.present(&source)),
            None => Err(self.fail(SyncError::UnknownLocation(
                click.location_id.to_string(),
            ))),
        }
    }

    /// Feeds a fired highlight timer back into the state machine.
    pub fn handle_highlight_expired(&mut self, ticket: Ticket) {
        self.highlighter.expire(ticket, &mut self.map);
    }

    fn present(&mut self, source: &Location) -> Vec<DistanceEntry> {
        let entries = self.show_distances(source);
        let html = if entries.is_empty() {
            "No other locations".to_string()
        } else {
            entries
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("<br>")
        };

        self.notifier.show_info(
            &format!("Distances from {}", source.name),
            &html,
            &InfoOptions::default(),
        );

        match self.markers.get(source.id) {
            Some(marker) => self.highlighter.activate(source.id, marker, &mut self.map),
            None => warn!(id = source.id, "no marker to highlight"),
        }
        entries
    }

    fn fail(&mut self, error: SyncError) -> SyncError {
        match &error {
            SyncError::Validation => {
                self.notifier.show_error(SAVE_FAILED_TITLE, SAVE_FAILED_BODY);
            }
            SyncError::NotSelected => self.notifier.show_warning(
                "Select Location",
                "Please choose a location to calculate distances.",
            ),
            SyncError::UnknownLocation(id) => self.notifier.show_error(
                "Unknown Location",
                &format!("Location {id} is no longer listed. Reload and try again."),
            ),
            SyncError::Transport(err) => {
                warn!(error = %err, "registry unreachable");
                self.notifier.show_error(
                    "Connection Problem",
                    &format!("Could not reach the location registry: {err}"),
                );
            }
        }
        error
    }
}
