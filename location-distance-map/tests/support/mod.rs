//! Recording fakes for the map and notification services, plus a helper that
//! runs a registry server on an ephemeral port.
#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::BTreeMap,
    net::SocketAddr,
    rc::Rc,
    time::Duration,
};

use anyhow::Result;
use location_distance_map::{
    highlight::{Cancel, Scheduler, Ticket},
    location::{Coordinate, LocationId},
    map::{Animation, MapRenderer, MarkerHandle},
    notify::{InfoOptions, Notifier},
    registry::LocationRegistry,
    server::Server,
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

#[derive(Debug, Default)]
pub struct RecordingMap {
    next_handle: u64,
    pub live: BTreeMap<MarkerHandle, LocationId>,
    pub created: usize,
    pub removed: Vec<MarkerHandle>,
    pub animations: Vec<(MarkerHandle, Animation)>,
}

impl RecordingMap {
    /// Location ids whose marker is live and whose last animation was a bounce.
    pub fn bouncing(&self) -> Vec<LocationId> {
        let mut last = BTreeMap::new();
        for (handle, animation) in &self.animations {
            last.insert(*handle, *animation);
        }
        last.into_iter()
            .filter(|(_, animation)| *animation == Animation::Bounce)
            .filter_map(|(handle, _)| self.live.get(&handle).copied())
            .collect()
    }
}

impl MapRenderer for RecordingMap {
    fn create_marker(&mut self, _: Coordinate, _: &str, location_id: LocationId) -> MarkerHandle {
        self.next_handle += 1;
        self.created += 1;
        let handle = MarkerHandle::from_raw(self.next_handle);
        self.live.insert(handle, location_id);
        handle
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        assert!(
            self.live.remove(&handle).is_some(),
            "removed a marker that was not live: {handle:?}"
        );
        self.removed.push(handle);
    }

    fn set_animation(&mut self, handle: MarkerHandle, animation: Animation) {
        assert!(
            self.live.contains_key(&handle),
            "animated a marker that was not live: {handle:?}"
        );
        self.animations.push((handle, animation));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success { title: String, body: String },
    Error { title: String, body: String },
    Warning { title: String, body: String },
    Info {
        title: String,
        html: String,
        options: InfoOptions,
    },
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notices: Vec<Notice>,
}

impl RecordingNotifier {
    pub fn last(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn infos(&self) -> Vec<(&str, &str)> {
        self.notices
            .iter()
            .filter_map(|notice| match notice {
                Notice::Info { title, html, .. } => Some((title.as_str(), html.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show_success(&mut self, title: &str, body: &str) {
        self.notices.push(Notice::Success {
            title: title.into(),
            body: body.into(),
        });
    }

    fn show_error(&mut self, title: &str, body: &str) {
        self.notices.push(Notice::Error {
            title: title.into(),
            body: body.into(),
        });
    }

    fn show_warning(&mut self, title: &str, body: &str) {
        self.notices.push(Notice::Warning {
            title: title.into(),
            body: body.into(),
        });
    }

    fn show_info(&mut self, title: &str, html: &str, options: &InfoOptions) {
        self.notices.push(Notice::Info {
            title: title.into(),
            html: html.into(),
            options: options.clone(),
        });
    }
}

/// Scheduler that never fires on its own; tests deliver tickets by hand.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    pub scheduled: Rc<RefCell<Vec<(Duration, Ticket)>>>,
    pub cancelled: Rc<RefCell<Vec<Ticket>>>,
}

impl ManualScheduler {
    pub fn last_ticket(&self) -> Option<Ticket> {
        self.scheduled.borrow().last().map(|(_, ticket)| *ticket)
    }
}

pub struct ManualPending {
    ticket: Ticket,
    cancelled: Rc<RefCell<Vec<Ticket>>>,
}

impl Cancel for ManualPending {
    fn cancel(self) {
        self.cancelled.borrow_mut().push(self.ticket);
    }
}

impl Scheduler for ManualScheduler {
    type Pending = ManualPending;

    fn schedule_after(&mut self, delay: Duration, ticket: Ticket) -> ManualPending {
        self.scheduled.borrow_mut().push((delay, ticket));
        ManualPending {
            ticket,
            cancelled: Rc::clone(&self.cancelled),
        }
    }
}

/// A registry server running in the background until `stop` is called.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RunningServer {
    pub async fn start(registry: LocationRegistry) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let server = Server::new(listener, registry);
        let addr = server.local_addr()?;

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            let _ = server.run_until(shutdown).await;
        });

        Ok(Self {
            addr,
            shutdown,
            task,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(mut self) {
        let _ = self.shutdown.send(());
        if tokio::time::timeout(Duration::from_secs(2), &mut self.task)
            .await
            .is_err()
        {
            self.task.abort();
        }
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}"))
}
