//! Scoped monitoring of a single element.

use crate::{host::Host, monitor::FocusOriginMonitor, stream::FocusChanges};

/// What counts as the element being focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorMode {
    /// Only focus on the element itself.
    #[default]
    Element,
    /// Focus on the element or anything inside it.
    Subtree,
}

impl MonitorMode {
    /// The `check_children` flag passed to [`FocusOriginMonitor::monitor`].
    pub fn check_children(self) -> bool {
        matches!(self, Self::Subtree)
    }
}

/// Monitors one element for as long as it is alive.
///
/// Dropping the guard stops monitoring, which clears the element's markers and
/// completes every subscription to it. The guard only subscribes to changes
/// once [`changes`](Self::changes) is first called.
pub struct MonitorFocus<H: Host> {
    /// Monitor the element is registered with.
    monitor: FocusOriginMonitor<H>,
    /// The watched element.
    element: H::Element,
    /// Mode the element is monitored in.
    mode: MonitorMode,
    /// This guard's own subscription, created on demand.
    changes: Option<FocusChanges>,
}

impl<H: Host> MonitorFocus<H> {
    /// Start monitoring `element` in the given mode.
    pub fn new(monitor: &FocusOriginMonitor<H>, element: H::Element, mode: MonitorMode) -> Self {
        drop(monitor.monitor(&element, mode.check_children()));
        Self {
            monitor: monitor.clone(),
            element,
            mode,
            changes: None,
        }
    }

    /// The watched element.
    pub fn element(&self) -> &H::Element {
        &self.element
    }

    /// Mode the element is monitored in.
    pub fn mode(&self) -> MonitorMode {
        self.mode
    }

    /// Focus changes of the watched element, from the first call onwards.
    pub fn changes(&mut self) -> &mut FocusChanges {
        self.changes
            .get_or_insert_with(|| self.monitor.monitor(&self.element, self.mode.check_children()))
    }
}

impl<H: Host> Drop for MonitorFocus<H> {
    fn drop(&mut self) {
        self.monitor.stop_monitoring(&self.element);
    }
}
