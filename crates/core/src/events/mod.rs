//! Event plumbing for the single-threaded player loop.
//!
//! Everything the engine reacts to arrives as a [`PlayerEvent`] delivered by
//! the surrounding event loop: display ticks, source notifications, input
//! gestures, resize signals and timer expirations. Collaborators never call
//! into the controller directly; they publish through a [`Notifier`] whose
//! subscriptions push into a shared [`EventQueue`] that the loop drains.
//! Every subscription is an explicit handle, so teardown can sever the whole
//! listener graph deterministically.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Identifier for a registered observer, returned by [`Notifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Identifier for a host-scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Events delivered to the player by the host event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A display-refresh tick. Carries the wall-clock time at delivery.
    Tick { now: Instant },
    /// A pointer press on the surface; toggles play/pause.
    PointerPressed,
    /// The visual source has its first decodable frame.
    SourceReady,
    /// The visual source's displayed position advanced.
    SourcePositionChanged,
    /// A raw viewport resize signal.
    ResizeSignal,
    /// A previously scheduled one-shot timer elapsed.
    ResizeElapsed(TimerId),
}

/// Requests display-refresh ticks, one at a time.
///
/// The controller calls [`request_frame`](Self::request_frame) only when it
/// has decided to stay in the playing state, so a loop that simply honors
/// every request preserves the "scheduled iff playing" invariant.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Schedules and cancels one-shot timers on behalf of the engine.
pub trait TimerHost {
    /// Arms a timer that should produce [`PlayerEvent::ResizeElapsed`] with
    /// the returned id after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerId;
    /// Cancels a previously scheduled timer. Cancelling a timer that already
    /// fired is a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Registry of observers for one notification type.
///
/// Replaces closure-capture listener graphs: each observer is registered
/// under an id and removed explicitly, never left for drop order to decide.
pub struct Notifier<E> {
    next_id: u64,
    observers: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Notifier<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }

    /// Registers an observer and returns the handle needed to remove it.
    pub fn subscribe(&mut self, observer: Box<dyn FnMut(&E)>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Removes a previously registered observer. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.observers.retain(|(existing, _)| *existing != id);
    }

    /// Delivers an event to every registered observer in subscription order.
    pub fn emit(&mut self, event: &E) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl<E> std::fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Shared FIFO of pending [`PlayerEvent`]s.
///
/// Subscriptions push into the queue; the host loop drains it and dispatches
/// each event to the session. Cloning shares the underlying queue.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<PlayerEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: PlayerEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<PlayerEvent> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn notifier_delivers_to_all_observers() {
        let mut notifier: Notifier<u32> = Notifier::new();
        let seen = Rc::new(Cell::new(0u32));

        for _ in 0..3 {
            let seen = seen.clone();
            notifier.subscribe(Box::new(move |value| {
                seen.set(seen.get() + value);
            }));
        }

        notifier.emit(&2);
        assert_eq!(seen.get(), 6);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut notifier: Notifier<u32> = Notifier::new();
        let seen = Rc::new(Cell::new(0u32));

        let seen_a = seen.clone();
        let a = notifier.subscribe(Box::new(move |value| {
            seen_a.set(seen_a.get() + value);
        }));
        let seen_b = seen.clone();
        notifier.subscribe(Box::new(move |value| {
            seen_b.set(seen_b.get() + value);
        }));

        notifier.unsubscribe(a);
        notifier.emit(&5);

        assert_eq!(seen.get(), 5);
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn unsubscribing_unknown_id_is_harmless() {
        let mut notifier: Notifier<u32> = Notifier::new();
        let id = notifier.subscribe(Box::new(|_| {}));
        notifier.unsubscribe(id);
        notifier.unsubscribe(id);
        assert!(notifier.is_empty());
    }

    #[test]
    fn queue_preserves_delivery_order() {
        let queue = EventQueue::new();
        queue.push(PlayerEvent::SourceReady);
        queue.push(PlayerEvent::PointerPressed);

        assert_eq!(queue.pop(), Some(PlayerEvent::SourceReady));
        assert_eq!(queue.pop(), Some(PlayerEvent::PointerPressed));
        assert_eq!(queue.pop(), None);
    }
}
