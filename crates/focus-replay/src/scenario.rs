//! Scenario files: an element tree, the elements to monitor, and a script of
//! interactions.
//!
//! ```ron
//! (
//!     elements: [
//!         (id: "toolbar"),
//!         (id: "save", parent: Some("toolbar")),
//!     ],
//!     monitor: [(id: "toolbar", subtree: true)],
//!     steps: [KeyDown, Focus("save"), Wait(0), TouchStart("save"), Wait(700)],
//! )
//! ```

use std::{collections::HashSet, fs, path::Path};

use focus_origin::FocusOrigin;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A scripted interaction session.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Element tree, parents before children.
    pub elements: Vec<ElementDecl>,
    /// Elements monitored before the first step.
    #[serde(default)]
    pub monitor: Vec<MonitorDecl>,
    /// Interactions, executed in order.
    pub steps: Vec<Step>,
}

/// One element of the tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementDecl {
    /// Name used by monitor entries and steps.
    pub id: String,
    /// Enclosing element, if any.
    #[serde(default)]
    pub parent: Option<String>,
}

/// An element to monitor from the start.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorDecl {
    /// Element name.
    pub id: String,
    /// Treat focus anywhere inside the element as focus on it.
    #[serde(default)]
    pub subtree: bool,
}

/// One interaction.
///
/// Steps between two `Wait`s belong to the same task, so a `KeyDown` followed
/// by a `Focus` classifies that focus as keyboard. `Wait(0)` ends the task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum Step {
    /// A key is pressed anywhere.
    KeyDown,
    /// A mouse button is pressed anywhere.
    MouseDown,
    /// A touch starts on the named element.
    TouchStart(String),
    /// Focus moves to the named element.
    Focus(String),
    /// Focus the named element through the tracker with an explicit origin.
    FocusVia(String, FocusOrigin),
    /// The focused element loses focus.
    Blur,
    /// The window loses focus.
    BlurWindow,
    /// The window regains focus.
    FocusWindow,
    /// Advance the clock by this many milliseconds.
    Wait(u64),
    /// Start monitoring the named element, optionally including its subtree.
    Monitor(String, bool),
    /// Stop monitoring the named element.
    Stop(String),
}

impl Step {
    /// Element named by this step, if any.
    pub fn element(&self) -> Option<&str> {
        match self {
            Self::TouchStart(id)
            | Self::Focus(id)
            | Self::FocusVia(id, _)
            | Self::Monitor(id, _)
            | Self::Stop(id) => Some(id),
            Self::KeyDown
            | Self::MouseDown
            | Self::Blur
            | Self::BlurWindow
            | Self::FocusWindow
            | Self::Wait(_) => None,
        }
    }
}

impl Scenario {
    /// Parse and check a scenario from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        let scenario: Self = ron::from_str(text).map_err(|e| Error::scenario(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text).map_err(|e| match e {
            Error::Scenario(msg) => Error::scenario(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Check that names are unique, parents come first, and every reference resolves.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for el in &self.elements {
            if el.id.is_empty() {
                return Err(Error::scenario("element id must not be empty"));
            }
            if let Some(parent) = &el.parent
                && !seen.contains(parent.as_str())
            {
                return Err(Error::scenario(format!(
                    "parent {parent:?} of {:?} must be declared before it",
                    el.id
                )));
            }
            if !seen.insert(el.id.as_str()) {
                return Err(Error::scenario(format!("duplicate element id {:?}", el.id)));
            }
        }

        let referenced = self
            .monitor
            .iter()
            .map(|m| m.id.as_str())
            .chain(self.steps.iter().filter_map(Step::element));
        for id in referenced {
            if !seen.contains(id) {
                return Err(Error::UnknownElement(id.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_scenario() {
        let scenario = Scenario::from_ron(
            r#"(
                elements: [(id: "list"), (id: "item", parent: Some("list"))],
                monitor: [(id: "list", subtree: true)],
                steps: [
                    KeyDown,
                    Focus("item"),
                    FocusVia("list", program),
                    TouchStart("item"),
                    Wait(650),
                    Monitor("item", false),
                    Stop("list"),
                    BlurWindow,
                    FocusWindow,
                    Blur,
                    MouseDown,
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(scenario.elements.len(), 2);
        assert!(scenario.monitor[0].subtree);
        assert_eq!(
            scenario.steps[2],
            Step::FocusVia("list".into(), FocusOrigin::Program)
        );
        assert_eq!(scenario.steps[4], Step::Wait(650));
    }

    #[test]
    fn monitor_list_is_optional() {
        let scenario = Scenario::from_ron(r#"(elements: [(id: "a")], steps: [])"#).unwrap();
        assert!(scenario.monitor.is_empty());
    }

    #[test]
    fn rejects_unknown_element() {
        let err = Scenario::from_ron(r#"(elements: [(id: "a")], steps: [Focus("b")])"#)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownElement(id) if id == "b"));
    }

    #[test]
    fn rejects_parent_declared_late() {
        let err = Scenario::from_ron(
            r#"(elements: [(id: "child", parent: Some("root")), (id: "root")], steps: [])"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Scenario(_)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err =
            Scenario::from_ron(r#"(elements: [(id: "a"), (id: "a")], steps: [])"#).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_unknown_origin() {
        let err = Scenario::from_ron(
            r#"(elements: [(id: "a")], steps: [FocusVia("a", telepathy)])"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Scenario(_)));
    }
}
