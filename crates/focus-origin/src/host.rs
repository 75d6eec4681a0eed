//! Host abstraction: the rendering layer the tracker observes and decorates.
//!
//! A host owns the element tree and the event dispatch. The tracker asks it to
//! register capture-phase listeners, toggle markers, answer containment
//! queries, and move focus. Nothing here renders anything.

use std::{fmt::Debug, hash::Hash, sync::Arc};

/// Opaque id of a listener registered with a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Which focus event a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusEventKind {
    /// The target gained focus.
    Focus,
    /// The target lost focus.
    Blur,
}

/// A focus or blur event as seen by a capture-phase listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusEvent<E> {
    /// Whether focus was gained or lost.
    pub kind: FocusEventKind,
    /// The node that gained or lost focus.
    pub target: E,
    /// For blur, the node about to receive focus; for focus, the node that lost it.
    pub related_target: Option<E>,
}

impl<E> FocusEvent<E> {
    /// Build a focus event.
    pub fn focus(target: E, related_target: Option<E>) -> Self {
        Self {
            kind: FocusEventKind::Focus,
            target,
            related_target,
        }
    }

    /// Build a blur event.
    pub fn blur(target: E, related_target: Option<E>) -> Self {
        Self {
            kind: FocusEventKind::Blur,
            target,
            related_target,
        }
    }
}

/// Document- and window-wide input signals that precede focus changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<E> {
    /// Any key was pressed.
    KeyDown,
    /// A mouse or pointer button was pressed.
    MouseDown,
    /// A touch started on `target`.
    TouchStart {
        /// The touched node.
        target: E,
    },
    /// The containing window regained focus.
    WindowFocus,
}

/// Callback for element focus/blur events.
pub type FocusListener<E> = Arc<dyn Fn(&FocusEvent<E>) + Send + Sync>;

/// Callback for global input signals.
pub type SignalListener<E> = Arc<dyn Fn(&Signal<E>) + Send + Sync>;

/// Capabilities the tracker needs from the UI layer.
///
/// Only [`Host::focus`] may call back into registered listeners synchronously;
/// every other method must return without dispatching events.
pub trait Host: Send + Sync + 'static {
    /// Handle to a node. Handles identify nodes without owning them.
    type Element: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// Whether this environment supports interactive focus at all.
    fn is_interactive(&self) -> bool;

    /// Register a capture-phase listener for [`Signal`]s.
    ///
    /// Signals are dispatched before the focus events they cause.
    fn add_signal_listener(&self, listener: SignalListener<Self::Element>) -> ListenerId;

    /// Register a capture-phase listener on `element`.
    ///
    /// Capture phase means the listener also fires for events whose target is
    /// a descendant of `element`.
    fn add_focus_listener(
        &self,
        element: &Self::Element,
        kind: FocusEventKind,
        listener: FocusListener<Self::Element>,
    ) -> ListenerId;

    /// Detach a signal or focus listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Add or remove a class-like marker on `element`.
    fn set_class(&self, element: &Self::Element, class: &str, enabled: bool);

    /// True if `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: &Self::Element, node: &Self::Element) -> bool;

    /// Ask the platform to move focus to `element`.
    fn focus(&self, element: &Self::Element);
}
