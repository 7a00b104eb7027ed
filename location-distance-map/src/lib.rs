//! Named map locations and the great-circle distances between them.
//!
//! See `README.md` for usage. The crate has a server half and a client half
//! that talk JSON over HTTP:
//!
//! - [`location`] defines the `Location` record, coordinates, and the
//!   validation rules every stored location obeys.
//! - [`distance`] is the haversine distance engine.
//! - [`registry`] is the server-side store that assigns ids and persists
//!   records, and [`server`] exposes it over axum.
//! - [`message`] holds the JSON shapes exchanged with the registry.
//! - [`api`] is the client's view of the registry, with a reqwest adapter.
//! - [`sync`] keeps the client's mirror of the registry in lockstep with the
//!   markers drawn through [`map`], reporting through [`notify`].
//! - [`highlight`] animates at most one marker at a time and reverts it on a
//!   cancellable timer.
//! - [`cli`], [`protocol`], and [`client`] make up the terminal front end.
//!
//! Integration tests drive the server over real sockets and the sync
//! controller through recording fakes of the map and notification services.

pub mod api;
pub mod cli;
pub mod client;
pub mod distance;
pub mod highlight;
pub mod location;
pub mod map;
pub mod message;
pub mod notify;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod sync;
