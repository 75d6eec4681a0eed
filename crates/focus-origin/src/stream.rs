//! Per-element fan-out of focus changes.
//!
//! Every subscriber gets its own buffer, unbounded unless a cap is configured.
//! Closing the hub completes all subscribers; items buffered before the close
//! are still delivered.

use std::{
    collections::VecDeque,
    fmt, mem,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use crate::{
    error::{RecvError, TryRecvError},
    origin::FocusOrigin,
};

/// Smallest cap a bounded subscriber is given.
const MIN_CAPACITY: usize = 8;

/// One focus change: the new origin, or `None` when focus was lost.
pub type FocusChange = Option<FocusOrigin>;

/// FIFO of changes for one subscriber.
struct ChangeBuffer {
    /// Changes not yet consumed.
    items: VecDeque<FocusChange>,
    /// Changes dropped because the buffer was full.
    lost_count: u64,
    /// Maximum buffered changes, if capped.
    capacity: Option<usize>,
}

/// State shared between the hub and one subscriber.
struct StreamInner {
    /// Buffered changes.
    buffer: Mutex<ChangeBuffer>,
    /// Wakes `recv` when a change arrives or the stream closes.
    notify: Notify,
    /// Set once the hub completes.
    closed: AtomicBool,
}

impl StreamInner {
    /// Empty open stream, holding at most `capacity` changes when set.
    fn new(capacity: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            buffer: Mutex::new(ChangeBuffer {
                items: VecDeque::new(),
                lost_count: 0,
                capacity,
            }),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Buffer a change, dropping the oldest when capped and full. Ignored once closed.
    fn push(&self, change: FocusChange) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let mut buffer = self.buffer.lock();
        if buffer.capacity.is_some_and(|cap| buffer.items.len() >= cap) {
            buffer.items.pop_front();
            buffer.lost_count = buffer.lost_count.saturating_add(1);
            if buffer.lost_count == 1 || buffer.lost_count.is_multiple_of(100) {
                warn!(lost = buffer.lost_count, "focus_change_overflow");
            }
        }
        buffer.items.push_back(change);
        drop(buffer);
        self.notify.notify_waiters();
    }

    /// Mark complete and wake waiters.
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();
    }

    /// True once the hub completed this stream.
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A subscription to one element's focus changes.
///
/// Returned by [`FocusOriginMonitor::monitor`](crate::FocusOriginMonitor::monitor).
/// Yields `Some(origin)` when the element is focused and `None` when it is
/// blurred, in emission order, until monitoring stops.
pub struct FocusChanges {
    /// Shared buffer fed by the hub.
    stream: Arc<StreamInner>,
}

impl FocusChanges {
    /// A stream that holds `items` and is already complete.
    pub(crate) fn completed(items: impl IntoIterator<Item = FocusChange>) -> Self {
        let stream = StreamInner::new(Some(MIN_CAPACITY));
        for item in items {
            stream.push(item);
        }
        stream.close();
        Self { stream }
    }

    /// Take the next buffered change without waiting.
    pub fn try_recv(&mut self) -> Result<FocusChange, TryRecvError> {
        if let Some(change) = self.stream.buffer.lock().items.pop_front() {
            return Ok(change);
        }
        if self.stream.is_closed() {
            Err(TryRecvError::Closed)
        } else {
            Err(TryRecvError::Empty)
        }
    }

    /// Wait for the next change.
    ///
    /// Returns `Err(RecvError::Closed)` once monitoring has stopped and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Result<FocusChange, RecvError> {
        let stream = self.stream.clone();
        loop {
            let notified = stream.notify.notified();
            match self.try_recv() {
                Ok(change) => return Ok(change),
                Err(TryRecvError::Closed) => return Err(RecvError::Closed),
                Err(TryRecvError::Empty) => notified.await,
            }
        }
    }

    /// Take every buffered change.
    pub fn drain(&mut self) -> Vec<FocusChange> {
        self.stream.buffer.lock().items.drain(..).collect()
    }

    /// True once monitoring has stopped, even if changes remain buffered.
    pub fn is_closed(&self) -> bool {
        self.stream.is_closed()
    }

    /// True once monitoring has stopped and nothing remains buffered.
    pub fn is_terminated(&self) -> bool {
        self.stream.is_closed() && self.stream.buffer.lock().items.is_empty()
    }

    /// Changes dropped for this subscriber because its buffer was full.
    pub fn lost_count(&self) -> u64 {
        self.stream.buffer.lock().lost_count
    }
}

impl fmt::Debug for FocusChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buffer = self.stream.buffer.lock();
        f.debug_struct("FocusChanges")
            .field("buffered", &buffer.items.len())
            .field("lost_count", &buffer.lost_count)
            .field("closed", &self.stream.is_closed())
            .finish()
    }
}

/// Fan-out of changes for a single monitored element.
pub(crate) struct ChangeHub {
    /// Per-subscriber buffer cap; `None` is unbounded.
    capacity: Option<usize>,
    /// Live subscribers; dropped subscriptions are pruned lazily.
    subscribers: Mutex<Vec<Weak<StreamInner>>>,
}

impl ChangeHub {
    /// Create a hub with an optional per-subscriber cap.
    pub(crate) fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity: capacity.map(|cap| cap.max(MIN_CAPACITY)),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Add a subscriber. It sees only changes published from now on.
    pub(crate) fn subscribe(&self) -> FocusChanges {
        let stream = StreamInner::new(self.capacity);
        self.subscribers.lock().push(Arc::downgrade(&stream));
        FocusChanges { stream }
    }

    /// Deliver a change to every live subscriber.
    pub(crate) fn publish(&self, change: FocusChange) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|weak| match weak.upgrade() {
            Some(stream) => {
                stream.push(change);
                true
            }
            None => false,
        });
    }

    /// Complete every subscriber.
    pub(crate) fn close(&self) {
        let subscribers = mem::take(&mut *self.subscribers.lock());
        for weak in subscribers {
            if let Some(stream) = weak.upgrade() {
                stream.close();
            }
        }
    }

    /// Number of live subscribers.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl Drop for ChangeHub {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_in_order_without_replay() {
        let hub = ChangeHub::new(None);
        let mut early = hub.subscribe();
        hub.publish(Some(FocusOrigin::Keyboard));
        let mut late = hub.subscribe();
        hub.publish(None);

        assert_eq!(early.drain(), vec![Some(FocusOrigin::Keyboard), None]);
        assert_eq!(late.drain(), vec![None]);
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn close_delivers_buffered_then_completes() {
        let hub = ChangeHub::new(None);
        let mut sub = hub.subscribe();
        hub.publish(Some(FocusOrigin::Mouse));
        hub.close();
        hub.publish(Some(FocusOrigin::Program));

        assert!(sub.is_closed());
        assert!(!sub.is_terminated());
        assert_eq!(sub.try_recv(), Ok(Some(FocusOrigin::Mouse)));
        assert_eq!(sub.try_recv(), Err(TryRecvError::Closed));
        assert!(sub.is_terminated());
    }

    #[test]
    fn unbounded_by_default() {
        let hub = ChangeHub::new(None);
        let mut sub = hub.subscribe();
        hub.publish(Some(FocusOrigin::Keyboard));
        for _ in 0..500 {
            hub.publish(None);
        }
        let items = sub.drain();
        assert_eq!(items.len(), 501);
        assert_eq!(items[0], Some(FocusOrigin::Keyboard));
        assert_eq!(sub.lost_count(), 0);
    }

    #[test]
    fn capped_overflow_drops_oldest() {
        let hub = ChangeHub::new(Some(0));
        let mut sub = hub.subscribe();
        for _ in 0..MIN_CAPACITY {
            hub.publish(Some(FocusOrigin::Touch));
        }
        hub.publish(None);
        assert_eq!(sub.lost_count(), 1);
        let items = sub.drain();
        assert_eq!(items.len(), MIN_CAPACITY);
        assert_eq!(items.last(), Some(&None));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let hub = ChangeHub::new(None);
        let keep = hub.subscribe();
        drop(hub.subscribe());
        hub.publish(None);
        assert_eq!(hub.subscriber_count(), 1);
        drop(keep);
    }

    #[test]
    fn completed_stream_yields_items_then_closes() {
        let mut sub = FocusChanges::completed([None]);
        assert_eq!(sub.try_recv(), Ok(None));
        assert_eq!(sub.try_recv(), Err(TryRecvError::Closed));
    }

    #[tokio::test]
    async fn recv_wakes_on_publish_and_close() {
        let hub = Arc::new(ChangeHub::new(None));
        let mut sub = hub.subscribe();
        let publisher = hub.clone();
        let task = tokio::spawn(async move {
            publisher.publish(Some(FocusOrigin::Keyboard));
            publisher.close();
        });
        assert_eq!(sub.recv().await, Ok(Some(FocusOrigin::Keyboard)));
        assert_eq!(sub.recv().await, Err(RecvError::Closed));
        task.await.unwrap();
    }
}
