//! The focus origin tracker.
//!
//! Global input signals (key, mouse, touch, window focus) are captured before
//! the focus events they cause. The monitor keeps a short-lived "pending
//! origin" for the current task and consults it, together with the last touch
//! target and the window-refocus flag, whenever a monitored element is focused.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    config::MonitorConfig,
    host::{
        FocusEvent, FocusEventKind, FocusListener, Host, ListenerId, Signal, SignalListener,
    },
    origin::{FocusOrigin, FocusState},
    scheduler::{Scheduler, TimerId},
    stream::{ChangeHub, FocusChanges},
};

/// Bookkeeping for one monitored element.
struct MonitoredElementInfo {
    /// Count focus anywhere in the subtree as focus on the element.
    check_children: bool,
    /// Focus and blur listener ids, released on stop.
    listeners: [ListenerId; 2],
    /// Subscribers of this element's changes.
    hub: ChangeHub,
    /// Current position in the focus lifecycle.
    state: FocusState,
}

/// Process-wide inference state shared by all monitored elements.
struct Signals<E> {
    /// Origin for the next focus event in the current task.
    origin: Option<FocusOrigin>,
    /// Origin recorded for the most recent classified focus.
    last_focus_origin: Option<FocusOrigin>,
    /// True only during the task right after the window regained focus.
    window_focused: bool,
    /// Target of the most recent touch, while it is still live.
    last_touch_target: Option<E>,
    /// Pending clear of `last_touch_target`.
    touch_timeout: Option<TimerId>,
    /// Bumped on every touch; a clear only applies to its own touch.
    touch_generation: u64,
}

impl<E> Default for Signals<E> {
    fn default() -> Self {
        Self {
            origin: None,
            last_focus_origin: None,
            window_focused: false,
            last_touch_target: None,
            touch_timeout: None,
            touch_generation: 0,
        }
    }
}

/// Everything guarded by the monitor lock.
struct State<E> {
    /// Document-wide signal listener, when registered.
    signal_listener: Option<ListenerId>,
    /// Inference state.
    signals: Signals<E>,
    /// Monitored elements; at most one record per element.
    elements: HashMap<E, MonitoredElementInfo>,
}

/// Shared core behind every clone of a [`FocusOriginMonitor`].
struct Inner<H: Host> {
    /// UI layer being observed.
    host: Arc<H>,
    /// Timer source for deferred clears.
    scheduler: Arc<dyn Scheduler>,
    /// Tunables.
    config: MonitorConfig,
    /// Snapshot of `host.is_interactive()` taken at construction.
    interactive: bool,
    /// Mutable state.
    state: Mutex<State<H::Element>>,
}

/// Monitors input and focus events to determine why elements are focused.
///
/// Construct one per application and hand clones to every consumer; clones
/// share state. Monitored elements are tracked by handle only, so the monitor
/// never keeps an element alive. Call [`stop_monitoring`](Self::stop_monitoring)
/// (or drop a [`MonitorFocus`](crate::MonitorFocus)) to release an element.
/// Dropping the last clone stops monitoring every element still monitored
/// and detaches the signal listener.
pub struct FocusOriginMonitor<H: Host> {
    /// Shared core.
    inner: Arc<Inner<H>>,
}

impl<H: Host> Clone for FocusOriginMonitor<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<H: Host> FocusOriginMonitor<H> {
    /// Create a monitor and register its document-wide listeners.
    ///
    /// In a non-interactive host nothing is registered and every operation
    /// degrades to a no-op.
    pub fn new(host: Arc<H>, scheduler: Arc<dyn Scheduler>, config: MonitorConfig) -> Self {
        let interactive = host.is_interactive();
        let inner = Arc::new(Inner {
            host,
            scheduler,
            config,
            interactive,
            state: Mutex::new(State {
                signal_listener: None,
                signals: Signals::default(),
                elements: HashMap::new(),
            }),
        });
        if interactive {
            let weak = Arc::downgrade(&inner);
            let listener: SignalListener<H::Element> =
                Arc::new(move |signal: &Signal<H::Element>| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_signal(signal);
                    }
                });
            let id = inner.host.add_signal_listener(listener);
            inner.state.lock().signal_listener = Some(id);
            debug!("focus_monitor_registered");
        } else {
            debug!("focus_monitor_degraded");
        }
        Self { inner }
    }

    /// Create a monitor with the default configuration.
    pub fn with_defaults(host: Arc<H>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self::new(host, scheduler, MonitorConfig::default())
    }

    /// Start (or update) monitoring of `element`.
    ///
    /// With `check_children`, focus anywhere in the element's subtree counts.
    /// Calling this again for a monitored element only updates the flag and
    /// returns a new subscription to the existing change stream.
    ///
    /// In a non-interactive host the returned stream yields a single `None`
    /// and is already complete.
    pub fn monitor(&self, element: &H::Element, check_children: bool) -> FocusChanges {
        if !self.inner.interactive {
            return FocusChanges::completed([None]);
        }

        let mut state = self.inner.state.lock();
        if let Some(info) = state.elements.get_mut(element) {
            info.check_children = check_children;
            trace!(?element, check_children, "monitor_update");
            return info.hub.subscribe();
        }

        let listeners = [FocusEventKind::Focus, FocusEventKind::Blur].map(|kind| {
            let weak = Arc::downgrade(&self.inner);
            let target = element.clone();
            let listener: FocusListener<H::Element> =
                Arc::new(move |event: &FocusEvent<H::Element>| {
                    if let Some(inner) = weak.upgrade() {
                        match event.kind {
                            FocusEventKind::Focus => inner.on_focus(event, &target),
                            FocusEventKind::Blur => inner.on_blur(event, &target),
                        }
                    }
                });
            self.inner.host.add_focus_listener(element, kind, listener)
        });
        let info = MonitoredElementInfo {
            check_children,
            listeners,
            hub: ChangeHub::new(self.inner.config.stream_capacity),
            state: FocusState::Unfocused,
        };
        let changes = info.hub.subscribe();
        state.elements.insert(element.clone(), info);
        debug!(?element, check_children, "monitor_start");
        changes
    }

    /// Stop monitoring `element`.
    ///
    /// Detaches its listeners, completes its stream and clears its markers.
    /// Unknown elements are ignored.
    pub fn stop_monitoring(&self, element: &H::Element) {
        let mut state = self.inner.state.lock();
        let Some(info) = state.elements.remove(element) else {
            return;
        };
        for id in info.listeners {
            self.inner.host.remove_listener(id);
        }
        let subscribers = info.hub.subscriber_count();
        info.hub.close();
        self.inner.apply_classes(element, None);
        debug!(?element, subscribers, "monitor_stop");
    }

    /// Focus `element` and classify that focus as `origin`.
    ///
    /// The origin stays pending until the end of the current task whether or
    /// not a focus event actually follows.
    pub fn focus_via(&self, element: &H::Element, origin: FocusOrigin) {
        if self.inner.interactive {
            let mut state = self.inner.state.lock();
            self.inner.set_origin_for_current_task(&mut state.signals, origin);
        }
        trace!(?element, %origin, "focus_via");
        self.inner.host.focus(element);
    }

    /// Handle a focus event on a monitored element.
    ///
    /// Normally invoked by the listener registered in [`monitor`](Self::monitor);
    /// exposed for hosts that route events themselves.
    pub fn on_focus(&self, event: &FocusEvent<H::Element>, element: &H::Element) {
        self.inner.on_focus(event, element);
    }

    /// Handle a blur event on a monitored element.
    ///
    /// In subtree mode a blur whose related target lies inside the element is
    /// ignored: focus only moved within the subtree.
    pub fn on_blur(&self, event: &FocusEvent<H::Element>, element: &H::Element) {
        self.inner.on_blur(event, element);
    }

    /// Handle a global input signal.
    ///
    /// Normally invoked by the listener registered at construction.
    pub fn on_signal(&self, signal: &Signal<H::Element>) {
        self.inner.on_signal(signal);
    }

    /// True if `element` is monitored.
    pub fn is_monitored(&self, element: &H::Element) -> bool {
        self.inner.state.lock().elements.contains_key(element)
    }

    /// Focus state of a monitored element.
    pub fn state(&self, element: &H::Element) -> Option<FocusState> {
        self.inner
            .state
            .lock()
            .elements
            .get(element)
            .map(|info| info.state)
    }

    /// Origin recorded for the most recent classified focus.
    pub fn last_focus_origin(&self) -> Option<FocusOrigin> {
        self.inner.state.lock().signals.last_focus_origin
    }

    /// Whether the host supports interactive focus tracking.
    pub fn is_interactive(&self) -> bool {
        self.inner.interactive
    }

    /// The configuration this monitor was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// The host this monitor observes.
    pub fn host(&self) -> &Arc<H> {
        &self.inner.host
    }
}

impl<H: Host> Inner<H> {
    /// Record a captured input signal.
    fn on_signal(self: &Arc<Self>, signal: &Signal<H::Element>) {
        let mut state = self.state.lock();
        let signals = &mut state.signals;
        match signal {
            Signal::KeyDown => {
                signals.last_touch_target = None;
                self.set_origin_for_current_task(signals, FocusOrigin::Keyboard);
            }
            Signal::MouseDown => {
                // A mousedown right after a touch is emulated by the platform.
                if signals.last_touch_target.is_none() {
                    self.set_origin_for_current_task(signals, FocusOrigin::Mouse);
                }
            }
            Signal::TouchStart { target } => {
                if let Some(id) = signals.touch_timeout.take() {
                    self.scheduler.cancel(id);
                }
                signals.touch_generation = signals.touch_generation.wrapping_add(1);
                signals.last_touch_target = Some(target.clone());
                let generation = signals.touch_generation;
                let weak = Arc::downgrade(self);
                signals.touch_timeout = Some(self.scheduler.schedule(
                    self.config.touch_buffer(),
                    Box::new(move || Self::clear_touch_target(&weak, generation)),
                ));
            }
            Signal::WindowFocus => {
                signals.window_focused = true;
                let weak = Arc::downgrade(self);
                self.scheduler.schedule(
                    Duration::ZERO,
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.state.lock().signals.window_focused = false;
                        }
                    }),
                );
            }
        }
        trace!(?signal, "focus_signal");
    }

    /// Expire the touch target set by touch number `generation`.
    fn clear_touch_target(weak: &Weak<Self>, generation: u64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut state = inner.state.lock();
        let signals = &mut state.signals;
        if signals.touch_generation == generation {
            signals.last_touch_target = None;
            signals.touch_timeout = None;
            trace!(generation, "touch_target_expired");
        }
    }

    /// Set the pending origin and clear it once the current task ends.
    fn set_origin_for_current_task(
        self: &Arc<Self>,
        signals: &mut Signals<H::Element>,
        origin: FocusOrigin,
    ) {
        signals.origin = Some(origin);
        let weak = Arc::downgrade(self);
        self.scheduler.schedule(
            Duration::ZERO,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().signals.origin = None;
                }
            }),
        );
    }

    /// True if the focus target is, or contains, the live touch target.
    ///
    /// A touch on a child that programmatically focuses its parent is
    /// reported as touch; callers that care use `focus_via(.., Program)`.
    fn was_caused_by_touch(&self, signals: &Signals<H::Element>, target: &H::Element) -> bool {
        signals
            .last_touch_target
            .as_ref()
            .is_some_and(|touched| self.host.contains(target, touched))
    }

    /// Classify a focus event on `element`.
    fn on_focus(&self, event: &FocusEvent<H::Element>, element: &H::Element) {
        let mut state = self.state.lock();
        let State { signals, elements, .. } = &mut *state;
        let Some(info) = elements.get_mut(element) else {
            return;
        };
        if !info.check_children && event.target != *element {
            return;
        }

        let origin = match signals.origin.take() {
            Some(origin) => origin,
            None => match signals.last_focus_origin {
                Some(last) if signals.window_focused => last,
                _ if self.was_caused_by_touch(signals, &event.target) => FocusOrigin::Touch,
                _ => FocusOrigin::Program,
            },
        };

        info.state = FocusState::Focused(origin);
        self.apply_classes(element, Some(origin));
        info.hub.publish(Some(origin));
        signals.last_focus_origin = Some(origin);
        trace!(?element, target = ?event.target, %origin, "focus_classified");
    }

    /// Handle a blur event on `element`.
    fn on_blur(&self, event: &FocusEvent<H::Element>, element: &H::Element) {
        let mut state = self.state.lock();
        let Some(info) = state.elements.get_mut(element) else {
            return;
        };
        if info.check_children
            && let Some(related) = &event.related_target
            && self.host.contains(element, related)
        {
            trace!(?element, ?related, "blur_within_subtree");
            return;
        }

        info.state = FocusState::Unfocused;
        self.apply_classes(element, None);
        info.hub.publish(None);
        trace!(?element, "focus_lost");
    }

    /// Reflect `origin` onto the element's markers.
    fn apply_classes(&self, element: &H::Element, origin: Option<FocusOrigin>) {
        for (class, enabled) in self.config.classes.toggles(origin) {
            self.host.set_class(element, class, enabled);
        }
    }
}

impl<H: Host> Drop for Inner<H> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(id) = state.signal_listener.take() {
            self.host.remove_listener(id);
        }
        for (element, info) in state.elements.drain() {
            for id in info.listeners {
                self.host.remove_listener(id);
            }
            info.hub.close();
            for (class, _) in self.config.classes.toggles(None) {
                self.host.set_class(&element, class, false);
            }
        }
        if let Some(id) = state.signals.touch_timeout.take() {
            self.scheduler.cancel(id);
        }
        debug!("focus_monitor_dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimHost;

    /// Monitor over a fresh simulated host.
    fn fixture() -> (Arc<SimHost>, FocusOriginMonitor<SimHost>) {
        let host = Arc::new(SimHost::new());
        let monitor = FocusOriginMonitor::with_defaults(host.clone(), host.clone());
        (host, monitor)
    }

    #[test]
    fn repeat_monitor_updates_mode_without_duplicate_listeners() {
        let (host, monitor) = fixture();
        let parent = host.create("div", None);
        let child = host.create("button", Some(parent));

        let mut first = monitor.monitor(&parent, false);
        let listeners = host.listener_count();
        let mut second = monitor.monitor(&parent, true);
        assert_eq!(host.listener_count(), listeners);

        host.focus(&child);
        assert_eq!(first.drain(), vec![Some(FocusOrigin::Program)]);
        assert_eq!(second.drain(), vec![Some(FocusOrigin::Program)]);
    }

    #[test]
    fn stop_releases_listeners() {
        let (host, monitor) = fixture();
        let button = host.create("button", None);
        monitor.monitor(&button, false);
        assert_eq!(host.listener_count(), 2);
        monitor.stop_monitoring(&button);
        assert_eq!(host.listener_count(), 0);
        assert!(!monitor.is_monitored(&button));
        monitor.stop_monitoring(&button);
    }

    #[test]
    fn pending_origin_expires_with_task() {
        let (host, monitor) = fixture();
        let button = host.create("button", None);
        let mut changes = monitor.monitor(&button, false);

        host.key_down();
        host.run_pending();
        host.focus(&button);
        assert_eq!(changes.drain(), vec![Some(FocusOrigin::Program)]);
    }

    #[test]
    fn pending_origin_consumed_by_first_focus() {
        let (host, monitor) = fixture();
        let a = host.create("a", None);
        let b = host.create("b", None);
        let mut on_a = monitor.monitor(&a, false);
        let mut on_b = monitor.monitor(&b, false);

        host.key_down();
        host.focus(&a);
        host.focus(&b);
        assert_eq!(on_a.drain(), vec![Some(FocusOrigin::Keyboard), None]);
        assert_eq!(on_b.drain(), vec![Some(FocusOrigin::Program)]);
    }

    #[test]
    fn keydown_clears_touch_target() {
        let (host, monitor) = fixture();
        let button = host.create("button", None);
        let mut changes = monitor.monitor(&button, false);

        host.touch_start(&button);
        host.key_down();
        host.run_pending();
        host.focus(&button);
        assert_eq!(changes.drain(), vec![Some(FocusOrigin::Program)]);
    }

    #[test]
    fn newer_touch_restarts_buffer() {
        let (host, monitor) = fixture();
        let button = host.create("button", None);
        let mut changes = monitor.monitor(&button, false);

        host.touch_start(&button);
        host.advance(Duration::from_millis(400));
        host.touch_start(&button);
        host.advance(Duration::from_millis(400));
        host.focus(&button);
        assert_eq!(changes.drain(), vec![Some(FocusOrigin::Touch)]);
        assert_eq!(host.pending_timers(), 1);
    }

    #[test]
    fn state_follows_lifecycle() {
        let (host, monitor) = fixture();
        let button = host.create("button", None);
        monitor.monitor(&button, false);
        assert_eq!(monitor.state(&button), Some(FocusState::Unfocused));

        host.mouse_down();
        host.focus(&button);
        assert_eq!(
            monitor.state(&button),
            Some(FocusState::Focused(FocusOrigin::Mouse))
        );
        assert_eq!(monitor.last_focus_origin(), Some(FocusOrigin::Mouse));

        host.blur();
        assert_eq!(monitor.state(&button), Some(FocusState::Unfocused));
    }

    #[test]
    fn unmonitored_events_are_ignored() {
        let (host, monitor) = fixture();
        let button = host.create("button", None);
        monitor.on_focus(&FocusEvent::focus(button, None), &button);
        monitor.on_blur(&FocusEvent::blur(button, None), &button);
        assert!(host.classes(&button).is_empty());
        assert_eq!(monitor.last_focus_origin(), None);
    }
}
