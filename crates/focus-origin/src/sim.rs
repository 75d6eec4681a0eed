//! Simulated host: an in-memory element tree with browser-like focus dispatch
//! and a virtual clock.
//!
//! [`SimHost`] implements both [`Host`] and [`Scheduler`], so a monitor can be
//! driven deterministically: input signals, focus moves, and timer expiry all
//! happen only when the caller asks for them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    host::{
        FocusEvent, FocusEventKind, FocusListener, Host, ListenerId, Signal, SignalListener,
    },
    scheduler::{Scheduler, Task, TimerId},
};

/// Handle to a node in a [`SimHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the simulated tree.
struct SimNode {
    /// Human-readable name.
    label: String,
    /// Parent node, if any.
    parent: Option<ElementId>,
    /// Active class-like markers.
    classes: BTreeSet<String>,
}

/// A listener attached to an element.
struct ElementListener {
    /// Node the listener is attached to.
    element: ElementId,
    /// Event kind it receives.
    kind: FocusEventKind,
    /// Callback.
    callback: FocusListener<ElementId>,
}

/// Mutable simulator state.
#[derive(Default)]
struct SimState {
    /// Nodes, indexed by `ElementId`.
    nodes: Vec<SimNode>,
    /// Element listeners in registration order.
    listeners: BTreeMap<ListenerId, ElementListener>,
    /// Document-wide signal listeners in registration order.
    signal_listeners: BTreeMap<ListenerId, SignalListener<ElementId>>,
    /// Source of listener ids, shared by both listener kinds.
    next_listener: u64,
    /// Node holding focus.
    focused: Option<ElementId>,
    /// Node to refocus when the window regains focus.
    window_blurred_from: Option<ElementId>,
    /// Current virtual time.
    now: Duration,
    /// Pending tasks keyed by due time, then timer id.
    timers: BTreeMap<(Duration, TimerId), Task>,
    /// Source of timer ids.
    next_timer: u64,
}

/// In-memory [`Host`] and [`Scheduler`].
pub struct SimHost {
    /// Reported by [`Host::is_interactive`].
    interactive: bool,
    /// Tree, listeners, focus, and clock.
    state: Mutex<SimState>,
}

impl Default for SimHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHost {
    /// An interactive simulator.
    pub fn new() -> Self {
        Self {
            interactive: true,
            state: Mutex::new(SimState::default()),
        }
    }

    /// A simulator that reports no interactive capability.
    pub fn headless() -> Self {
        Self {
            interactive: false,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Add a node under `parent` (or as a root).
    pub fn create(&self, label: &str, parent: Option<ElementId>) -> ElementId {
        let mut state = self.state.lock();
        let id = ElementId(state.nodes.len());
        state.nodes.push(SimNode {
            label: label.to_string(),
            parent,
            classes: BTreeSet::new(),
        });
        id
    }

    /// Label given to a node at creation.
    pub fn label(&self, element: &ElementId) -> Option<String> {
        self.state
            .lock()
            .nodes
            .get(element.0)
            .map(|node| node.label.clone())
    }

    /// Active markers on a node, sorted.
    pub fn classes(&self, element: &ElementId) -> Vec<String> {
        self.state
            .lock()
            .nodes
            .get(element.0)
            .map(|node| node.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True if `class` is active on `element`.
    pub fn has_class(&self, element: &ElementId, class: &str) -> bool {
        self.state
            .lock()
            .nodes
            .get(element.0)
            .is_some_and(|node| node.classes.contains(class))
    }

    /// Node currently holding focus.
    pub fn focused(&self) -> Option<ElementId> {
        self.state.lock().focused
    }

    /// Number of attached element listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Number of attached signal listeners.
    pub fn signal_listener_count(&self) -> usize {
        self.state.lock().signal_listeners.len()
    }

    /// Number of tasks waiting on the virtual clock.
    pub fn pending_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Dispatch a key press.
    pub fn key_down(&self) {
        self.dispatch_signal(&Signal::KeyDown);
    }

    /// Dispatch a mouse press.
    pub fn mouse_down(&self) {
        self.dispatch_signal(&Signal::MouseDown);
    }

    /// Dispatch the start of a touch on `target`.
    pub fn touch_start(&self, target: &ElementId) {
        self.dispatch_signal(&Signal::TouchStart { target: *target });
    }

    /// Remove focus from the focused node, if any.
    pub fn blur(&self) {
        let Some(old) = self.state.lock().focused.take() else {
            return;
        };
        self.dispatch_focus_event(&FocusEvent::blur(old, None));
    }

    /// The window loses focus: the focused node is blurred and remembered.
    pub fn blur_window(&self) {
        let old = {
            let mut state = self.state.lock();
            let old = state.focused.take();
            state.window_blurred_from = old;
            old
        };
        if let Some(old) = old {
            self.dispatch_focus_event(&FocusEvent::blur(old, None));
        }
    }

    /// The window regains focus: signal it, then refocus the remembered node.
    pub fn focus_window(&self) {
        self.dispatch_signal(&Signal::WindowFocus);
        let restore = self.state.lock().window_blurred_from.take();
        if let Some(element) = restore {
            self.move_focus(element);
        }
    }

    /// Run every task that is due now, including zero-delay tasks.
    pub fn run_pending(&self) {
        self.advance(Duration::ZERO);
    }

    /// Move the virtual clock forward, running due tasks in order.
    pub fn advance(&self, by: Duration) {
        let deadline = self.state.lock().now + by;
        loop {
            let task = {
                let mut state = self.state.lock();
                let due = state
                    .timers
                    .first_key_value()
                    .map(|(key, _)| *key)
                    .filter(|(at, _)| *at <= deadline);
                match due {
                    Some(key) => {
                        state.now = state.now.max(key.0);
                        state.timers.remove(&key)
                    }
                    None => None,
                }
            };
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.state.lock().now = deadline;
    }

    /// Invoke every signal listener.
    fn dispatch_signal(&self, signal: &Signal<ElementId>) {
        let listeners: Vec<SignalListener<ElementId>> =
            self.state.lock().signal_listeners.values().cloned().collect();
        trace!(?signal, "sim_signal");
        for listener in listeners {
            listener(signal);
        }
    }

    /// Blur the old node and focus `element`, like a browser focus move.
    fn move_focus(&self, element: ElementId) {
        let old = {
            let mut state = self.state.lock();
            if state.focused == Some(element) {
                return;
            }
            state.focused.take()
        };
        if let Some(old) = old {
            self.dispatch_focus_event(&FocusEvent::blur(old, Some(element)));
        }
        self.state.lock().focused = Some(element);
        self.dispatch_focus_event(&FocusEvent::focus(element, old));
    }

    /// Deliver an event to capture listeners on the target and its ancestors,
    /// outermost first.
    fn dispatch_focus_event(&self, event: &FocusEvent<ElementId>) {
        let callbacks: Vec<FocusListener<ElementId>> = {
            let state = self.state.lock();
            let path = Self::path_to_root(&state, event.target);
            path.iter()
                .rev()
                .flat_map(|node| {
                    state
                        .listeners
                        .values()
                        .filter(move |l| l.element == *node && l.kind == event.kind)
                        .map(|l| l.callback.clone())
                })
                .collect()
        };
        trace!(?event, listeners = callbacks.len(), "sim_focus_event");
        for callback in callbacks {
            callback(event);
        }
    }

    /// `node` followed by its ancestors.
    fn path_to_root(state: &SimState, node: ElementId) -> Vec<ElementId> {
        let mut path = Vec::new();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            path.push(id);
            cursor = state.nodes.get(id.0).and_then(|n| n.parent);
        }
        path
    }
}

impl Host for SimHost {
    type Element = ElementId;

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn add_signal_listener(&self, listener: SignalListener<ElementId>) -> ListenerId {
        let mut state = self.state.lock();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.signal_listeners.insert(id, listener);
        id
    }

    fn add_focus_listener(
        &self,
        element: &ElementId,
        kind: FocusEventKind,
        listener: FocusListener<ElementId>,
    ) -> ListenerId {
        let mut state = self.state.lock();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.insert(
            id,
            ElementListener {
                element: *element,
                kind,
                callback: listener,
            },
        );
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        let mut state = self.state.lock();
        state.listeners.remove(&id);
        state.signal_listeners.remove(&id);
    }

    fn set_class(&self, element: &ElementId, class: &str, enabled: bool) {
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(element.0) {
            if enabled {
                node.classes.insert(class.to_string());
            } else {
                node.classes.remove(class);
            }
        }
    }

    fn contains(&self, ancestor: &ElementId, node: &ElementId) -> bool {
        let state = self.state.lock();
        Self::path_to_root(&state, *node).contains(ancestor)
    }

    fn focus(&self, element: &ElementId) {
        self.move_focus(*element);
    }
}

impl Scheduler for SimHost {
    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.lock();
        state.next_timer += 1;
        let id = TimerId(state.next_timer);
        let due = state.now + delay;
        state.timers.insert((due, id), task);
        id
    }

    fn cancel(&self, id: TimerId) {
        self.state.lock().timers.retain(|(_, timer), _| *timer != id);
    }
}
