//! Single-marker highlight with automatic revert.
//!
//! At most one marker bounces at a time. Activating a marker first silences the
//! current one, then schedules a revert through a [`Scheduler`]. Every revert
//! carries a ticket; only the ticket of the latest activation can move the
//! machine back to idle, so a revert that was already in flight when it got
//! superseded is ignored instead of clearing the newer highlight.

use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

use crate::{
    location::LocationId,
    map::{Animation, MapRenderer, MarkerHandle},
};

/// How long a marker stays highlighted without a newer activation.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(3000);

pub type Ticket = u64;

/// A scheduled revert that has not fired yet.
pub trait Cancel {
    fn cancel(self);
}

/// Arranges for `ticket` to be delivered back after `delay`.
pub trait Scheduler {
    type Pending: Cancel;

    fn schedule_after(&mut self, delay: Duration, ticket: Ticket) -> Self::Pending;
}

/// Scheduler backed by tokio timers. Expired tickets arrive on the receiver
/// returned by [`TokioScheduler::new`] and should be fed to
/// [`Highlighter::expire`].
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    expired: mpsc::UnboundedSender<Ticket>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Ticket>) {
        let (expired, rx) = mpsc::unbounded_channel();
        (Self { expired }, rx)
    }
}

impl Scheduler for TokioScheduler {
    type Pending = PendingRevert;

    fn schedule_after(&mut self, delay: Duration, ticket: Ticket) -> PendingRevert {
        let expired = self.expired.clone();
        PendingRevert(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = expired.send(ticket);
        }))
    }
}

/// Aborts its timer task when cancelled or dropped.
#[derive(Debug)]
pub struct PendingRevert(JoinHandle<()>);

impl Cancel for PendingRevert {
    fn cancel(self) {
        self.0.abort();
    }
}

impl Drop for PendingRevert {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    Idle,
    Highlighted(LocationId),
}

pub struct Highlighter<S: Scheduler> {
    scheduler: S,
    duration: Duration,
    active: Option<(LocationId, MarkerHandle)>,
    pending: Option<S::Pending>,
    ticket: Ticket,
}

impl<S: Scheduler> Highlighter<S> {
    pub fn new(scheduler: S) -> Self {
        Self::with_duration(scheduler, HIGHLIGHT_DURATION)
    }

    pub fn with_duration(scheduler: S, duration: Duration) -> Self {
        Self {
            scheduler,
            duration,
            active: None,
            pending: None,
            ticket: 0,
        }
    }

    pub fn state(&self) -> HighlightState {
        match self.active {
            Some((id, _)) => HighlightState::Highlighted(id),
            None => HighlightState::Idle,
        }
    }

    /// Highlights `id`, silencing any other marker first. Re-activating the
    /// current marker restarts its timer.
    pub fn activate<M: MapRenderer>(&mut self, id: LocationId, marker: MarkerHandle, map: &mut M) {
        self.cancel_pending();
        if let Some((previous, previous_marker)) = self.active.take() {
            if previous != id || previous_marker != marker {
                map.set_animation(previous_marker, Animation::Off);
            }
        }

        map.set_animation(marker, Animation::Bounce);
        self.active = Some((id, marker));
        self.ticket += 1;
        self.pending = Some(self.scheduler.schedule_after(self.duration, self.ticket));
        debug!(id, ticket = self.ticket, "highlight activated");
    }

    /// Returns to idle from any state and cancels the pending revert.
    pub fn deactivate<M: MapRenderer>(&mut self, map: &mut M) {
        self.cancel_pending();
        if let Some((id, marker)) = self.active.take() {
            map.set_animation(marker, Animation::Off);
            debug!(id, "highlight cleared");
        }
    }

    /// Handles a fired revert. Stale tickets are ignored; returns whether the
    /// highlight was cleared.
    pub fn expire<M: MapRenderer>(&mut self, ticket: Ticket, map: &mut M) -> bool {
        if ticket != self.ticket || self.active.is_none() {
            debug!(ticket, current = self.ticket, "ignoring stale highlight revert");
            return false;
        }
        self.pending = None;
        if let Some((id, marker)) = self.active.take() {
            map.set_animation(marker, Animation::Off);
            debug!(id, "highlight expired");
        }
        true
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::location::Coordinate;

    #[derive(Default)]
    struct AnimationLog {
        calls: Vec<(MarkerHandle, Animation)>,
    }

    impl AnimationLog {
        fn bouncing(&self) -> Vec<MarkerHandle> {
            let mut state = std::collections::BTreeMap::new();
            for (handle, animation) in &self.calls {
                state.insert(*handle, *animation);
            }
            state
                .into_iter()
                .filter(|(_, animation)| *animation == Animation::Bounce)
                .map(|(handle, _)| handle)
                .collect()
        }
    }

    impl MapRenderer for AnimationLog {
        fn create_marker(&mut self, _: Coordinate, _: &str, id: LocationId) -> MarkerHandle {
            MarkerHandle::from_raw(id as u64)
        }

        fn remove_marker(&mut self, _: MarkerHandle) {}

        fn set_animation(&mut self, handle: MarkerHandle, animation: Animation) {
            self.calls.push((handle, animation));
        }
    }

    #[derive(Clone, Default)]
    struct ManualScheduler {
        cancelled: Rc<RefCell<Vec<Ticket>>>,
        scheduled: Rc<RefCell<Vec<(Duration, Ticket)>>>,
    }

    struct ManualPending {
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

    fn marker(id: LocationId) -> MarkerHandle {
        MarkerHandle::from_raw(id as u64)
    }

    #[test]
    fn starts_idle() {
        let highlighter = Highlighter::new(ManualScheduler::default());
        assert_eq!(highlighter.state(), HighlightState::Idle);
    }

    #[test]
    fn activating_another_marker_silences_the_previous_one_first() {
        let scheduler = ManualScheduler::default();
        let mut highlighter = Highlighter::new(scheduler.clone());
        let mut map = AnimationLog::default();

        highlighter.activate(1, marker(1), &mut map);
        highlighter.activate(2, marker(2), &mut map);

        assert_eq!(
            map.calls,
            vec![
                (marker(1), Animation::Bounce),
                (marker(1), Animation::Off),
                (marker(2), Animation::Bounce),
            ]
        );
        assert_eq!(map.bouncing(), vec![marker(2)]);
        assert_eq!(highlighter.state(), HighlightState::Highlighted(2));
        assert_eq!(*scheduler.cancelled.borrow(), vec![1]);
        assert_eq!(
            *scheduler.scheduled.borrow(),
            vec![(HIGHLIGHT_DURATION, 1), (HIGHLIGHT_DURATION, 2)]
        );
    }

    #[test]
    fn reactivating_the_same_marker_restarts_the_timer() {
        let scheduler = ManualScheduler::default();
        let mut highlighter = Highlighter::new(scheduler.clone());
        let mut map = AnimationLog::default();

        highlighter.activate(4, marker(4), &mut map);
        highlighter.activate(4, marker(4), &mut map);

        assert_eq!(highlighter.state(), HighlightState::Highlighted(4));
        assert_eq!(*scheduler.cancelled.borrow(), vec![1]);
        assert_eq!(scheduler.scheduled.borrow().len(), 2);
        assert_eq!(map.bouncing(), vec![marker(4)]);

        // The first timer is stale now; only the second one reverts.
        assert!(!highlighter.expire(1, &mut map));
        assert_eq!(highlighter.state(), HighlightState::Highlighted(4));
        assert!(highlighter.expire(2, &mut map));
        assert_eq!(highlighter.state(), HighlightState::Idle);
        assert!(map.bouncing().is_empty());
    }

    #[test]
    fn stale_revert_cannot_clear_a_newer_highlight() {
        let mut highlighter = Highlighter::new(ManualScheduler::default());
        let mut map = AnimationLog::default();

        highlighter.activate(1, marker(1), &mut map);
        highlighter.activate(2, marker(2), &mut map);

        assert!(!highlighter.expire(1, &mut map));
        assert_eq!(highlighter.state(), HighlightState::Highlighted(2));
        assert_eq!(map.bouncing(), vec![marker(2)]);
    }

    #[test]
    fn deactivate_cancels_the_timer_and_ignores_its_ticket() {
        let scheduler = ManualScheduler::default();
        let mut highlighter = Highlighter::new(scheduler.clone());
        let mut map = AnimationLog::default();

        highlighter.activate(3, marker(3), &mut map);
        highlighter.deactivate(&mut map);

        assert_eq!(highlighter.state(), HighlightState::Idle);
        assert_eq!(*scheduler.cancelled.borrow(), vec![1]);
        assert!(map.bouncing().is_empty());
        assert!(!highlighter.expire(1, &mut map));

        // Deactivating while idle is a no-op.
        let calls = map.calls.len();
        highlighter.deactivate(&mut map);
        assert_eq!(map.calls.len(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_reverts_after_three_seconds() {
        let (scheduler, mut expired) = TokioScheduler::new();
        let mut highlighter = Highlighter::new(scheduler);
        let mut map = AnimationLog::default();

        highlighter.activate(1, marker(1), &mut map);
        // Let the timer task start its sleep before moving the clock.
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(expired.try_recv().is_err());

        let ticket = expired.recv().await.expect("revert ticket");
        assert!(highlighter.expire(ticket, &mut map));
        assert_eq!(highlighter.state(), HighlightState::Idle);
        assert!(map.bouncing().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_drops_cancelled_timers() {
        let (scheduler, mut expired) = TokioScheduler::new();
        let mut highlighter = Highlighter::new(scheduler);
        let mut map = AnimationLog::default();

        highlighter.activate(1, marker(1), &mut map);
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(2000)).await;
        highlighter.activate(2, marker(2), &mut map);

        // Only the second activation's ticket ever arrives.
        let ticket = expired.recv().await.expect("revert ticket");
        assert_eq!(ticket, 2);
        assert!(highlighter.expire(ticket, &mut map));
        assert!(expired.try_recv().is_err());
    }
}
