//! Drive a [`Scenario`] on the simulated host and record the transcript.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use focus_origin::{
    FocusChange, FocusChanges, FocusOriginMonitor, Host, MonitorConfig, TryRecvError,
    sim::{ElementId, SimHost},
};
use tracing::{debug, info};

use crate::{
    cli::RunArgs,
    error::{Error, Result},
    scenario::{Scenario, Step},
};

/// One observation of a monitored element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// The element's stream emitted a change.
    Change {
        /// Virtual time of the step that produced the change.
        at: Duration,
        /// Element name.
        element: String,
        /// Emitted origin, `None` for a blur.
        change: FocusChange,
        /// Classes on the element once the step finished.
        classes: Vec<String>,
    },
    /// The element's stream completed.
    Completed {
        /// Virtual time of the step that completed the stream.
        at: Duration,
        /// Element name.
        element: String,
    },
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Change {
                at,
                element,
                change,
                classes,
            } => write!(
                f,
                "t={}ms element={element} origin={} classes=[{}]",
                at.as_millis(),
                change.map_or("none", |o| o.as_str()),
                classes.join(",")
            ),
            Self::Completed { at, element } => {
                write!(f, "t={}ms element={element} completed", at.as_millis())
            }
        }
    }
}

/// A scenario bound to a fresh simulated host and tracker.
pub struct Replay {
    /// Simulated document and clock.
    host: Arc<SimHost>,
    /// Tracker under observation.
    monitor: FocusOriginMonitor<SimHost>,
    /// Scenario names to host elements.
    ids: HashMap<String, ElementId>,
    /// Open subscriptions, in the order monitoring started.
    watched: Vec<(String, FocusChanges)>,
    /// Everything observed so far.
    transcript: Vec<Entry>,
}

impl Replay {
    /// Build the element tree and start the scenario's initial monitors.
    pub fn new(scenario: &Scenario, config: MonitorConfig, headless: bool) -> Result<Self> {
        let host = Arc::new(if headless {
            SimHost::headless()
        } else {
            SimHost::new()
        });
        let monitor = FocusOriginMonitor::new(host.clone(), host.clone(), config);

        let mut ids = HashMap::new();
        for decl in &scenario.elements {
            let parent = match &decl.parent {
                Some(name) => Some(lookup(&ids, name)?),
                None => None,
            };
            ids.insert(decl.id.clone(), host.create(&decl.id, parent));
        }

        let mut replay = Self {
            host,
            monitor,
            ids,
            watched: Vec::new(),
            transcript: Vec::new(),
        };
        for decl in &scenario.monitor {
            replay.watch(&decl.id, decl.subtree)?;
        }
        replay.collect();
        Ok(replay)
    }

    /// Execute every step in order.
    pub fn run_steps(&mut self, steps: &[Step]) -> Result<()> {
        for step in steps {
            self.step(step)?;
        }
        Ok(())
    }

    /// Execute one step and record what the monitored streams emitted.
    pub fn step(&mut self, step: &Step) -> Result<()> {
        debug!(?step, now_ms = self.host.now().as_millis(), "replay_step");
        match step {
            Step::KeyDown => self.host.key_down(),
            Step::MouseDown => self.host.mouse_down(),
            Step::TouchStart(id) => {
                let el = self.element(id)?;
                self.host.touch_start(&el);
            }
            Step::Focus(id) => {
                let el = self.element(id)?;
                self.host.focus(&el);
            }
            Step::FocusVia(id, origin) => {
                let el = self.element(id)?;
                self.monitor.focus_via(&el, *origin);
            }
            Step::Blur => self.host.blur(),
            Step::BlurWindow => self.host.blur_window(),
            Step::FocusWindow => self.host.focus_window(),
            Step::Wait(ms) => self.host.advance(Duration::from_millis(*ms)),
            Step::Monitor(id, subtree) => self.watch(id, *subtree)?,
            Step::Stop(id) => {
                let el = self.element(id)?;
                self.monitor.stop_monitoring(&el);
            }
        }
        self.collect();
        Ok(())
    }

    /// Everything observed so far.
    pub fn transcript(&self) -> &[Entry] {
        &self.transcript
    }

    /// Resolve a scenario name.
    fn element(&self, name: &str) -> Result<ElementId> {
        lookup(&self.ids, name)
    }

    /// Subscribe to `name`, replacing any earlier subscription to it.
    fn watch(&mut self, name: &str, subtree: bool) -> Result<()> {
        let el = self.element(name)?;
        let changes = self.monitor.monitor(&el, subtree);
        match self.watched.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = changes,
            None => self.watched.push((name.to_string(), changes)),
        }
        Ok(())
    }

    /// Move pending stream items into the transcript and forget completed streams.
    fn collect(&mut self) {
        let at = self.host.now();
        let host = &self.host;
        let ids = &self.ids;
        let transcript = &mut self.transcript;
        self.watched.retain_mut(|(name, changes)| {
            let classes = ids.get(name).map(|el| host.classes(el)).unwrap_or_default();
            loop {
                match changes.try_recv() {
                    Ok(change) => transcript.push(Entry::Change {
                        at,
                        element: name.clone(),
                        change,
                        classes: classes.clone(),
                    }),
                    Err(TryRecvError::Empty) => return true,
                    Err(TryRecvError::Closed) => {
                        transcript.push(Entry::Completed {
                            at,
                            element: name.clone(),
                        });
                        return false;
                    }
                }
            }
        });
    }
}

/// Resolve `name` in `ids`.
fn lookup(ids: &HashMap<String, ElementId>, name: &str) -> Result<ElementId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| Error::UnknownElement(name.to_string()))
}

/// Resolve the monitor configuration from the `run` arguments.
fn resolve_config(args: &RunArgs) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(buffer) = args.touch_buffer {
        config.touch_buffer_ms = u64::try_from(buffer.as_millis()).unwrap_or(u64::MAX);
        config.validate()?;
    }
    Ok(config)
}

/// Execute the `run` subcommand: replay the scenario and print the transcript.
pub fn run(args: &RunArgs) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;
    let config = resolve_config(args)?;
    info!(
        scenario = %args.scenario.display(),
        elements = scenario.elements.len(),
        steps = scenario.steps.len(),
        touch_buffer_ms = config.touch_buffer_ms,
        headless = args.headless,
        "replay_start"
    );

    let mut replay = Replay::new(&scenario, config, args.headless)?;
    replay.run_steps(&scenario.steps)?;
    for entry in replay.transcript() {
        println!("{entry}");
    }
    info!(entries = replay.transcript().len(), "replay_done");
    Ok(())
}
