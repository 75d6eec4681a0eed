//! Focus Origin
//!
//! Determines *why* an element received focus (keyboard, mouse, touch, or
//! programmatic invocation) and reflects that as a stream of changes and as
//! class-like markers on the element.
//!
//! - [`FocusOriginMonitor`]: the tracker you construct once and share
//! - [`Host`] and [`Scheduler`]: the UI layer and timer source it runs on
//! - [`FocusChanges`]: per-element change subscriptions
//! - [`MonitorFocus`]: monitors an element until dropped
//! - [`sim::SimHost`]: an in-memory host with a virtual clock
//!
//! ```
//! use std::sync::Arc;
//!
//! use focus_origin::{FocusOrigin, FocusOriginMonitor, Host, sim::SimHost};
//!
//! let host = Arc::new(SimHost::new());
//! let monitor = FocusOriginMonitor::with_defaults(host.clone(), host.clone());
//! let button = host.create("button", None);
//! let mut changes = monitor.monitor(&button, false);
//!
//! host.key_down();
//! host.focus(&button);
//! assert_eq!(changes.try_recv(), Ok(Some(FocusOrigin::Keyboard)));
//! assert!(host.has_class(&button, "focus-via-keyboard"));
//! ```

mod classes;
mod config;
mod error;
mod host;
mod monitor;
mod origin;
mod scheduler;
mod stream;
mod watch;

pub mod sim;

pub use classes::FocusClasses;
pub use config::{MonitorConfig, TOUCH_BUFFER_MS};
pub use error::{Error, RecvError, Result, TryRecvError};
pub use host::{
    FocusEvent, FocusEventKind, FocusListener, Host, ListenerId, Signal, SignalListener,
};
pub use monitor::FocusOriginMonitor;
pub use origin::{FocusOrigin, FocusState};
pub use scheduler::{Scheduler, Task, TimerId, TokioScheduler};
pub use stream::{FocusChange, FocusChanges};
pub use watch::{MonitorFocus, MonitorMode};
