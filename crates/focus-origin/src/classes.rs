//! Class-like markers reflected onto monitored elements.

use serde::{Deserialize, Serialize};

use crate::origin::FocusOrigin;

/// Names of the five markers toggled on a monitored element.
///
/// Whenever `focused` is set, exactly one of the four origin markers is set too;
/// all five are cleared when the element is unfocused or no longer monitored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusClasses {
    /// Set while the element holds focus, regardless of origin.
    pub focused: String,
    /// Set while focused via touch.
    pub touch: String,
    /// Set while focused via keyboard.
    pub keyboard: String,
    /// Set while focused via mouse.
    pub mouse: String,
    /// Set while focused programmatically.
    pub program: String,
}

impl Default for FocusClasses {
    fn default() -> Self {
        Self {
            focused: "has-focus".into(),
            touch: "focus-via-touch".into(),
            keyboard: "focus-via-keyboard".into(),
            mouse: "focus-via-mouse".into(),
            program: "focus-via-program".into(),
        }
    }
}

impl FocusClasses {
    /// Marker name for a given origin.
    pub fn for_origin(&self, origin: FocusOrigin) -> &str {
        match origin {
            FocusOrigin::Touch => &self.touch,
            FocusOrigin::Mouse => &self.mouse,
            FocusOrigin::Keyboard => &self.keyboard,
            FocusOrigin::Program => &self.program,
        }
    }

    /// Every marker name, `focused` first.
    pub fn names(&self) -> [&str; 5] {
        [
            &self.focused,
            &self.touch,
            &self.keyboard,
            &self.mouse,
            &self.program,
        ]
    }

    /// The desired on/off state of every marker for `origin`.
    pub fn toggles(&self, origin: Option<FocusOrigin>) -> [(&str, bool); 5] {
        [
            (self.focused.as_str(), origin.is_some()),
            (self.touch.as_str(), origin == Some(FocusOrigin::Touch)),
            (self.keyboard.as_str(), origin == Some(FocusOrigin::Keyboard)),
            (self.mouse.as_str(), origin == Some(FocusOrigin::Mouse)),
            (self.program.as_str(), origin == Some(FocusOrigin::Program)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_origin_marker_when_focused() {
        let classes = FocusClasses::default();
        for origin in FocusOrigin::ALL {
            let on: Vec<&str> = classes
                .toggles(Some(origin))
                .into_iter()
                .filter_map(|(name, set)| set.then_some(name))
                .collect();
            assert_eq!(on, vec!["has-focus", classes.for_origin(origin)]);
        }
    }

    #[test]
    fn all_markers_off_when_unfocused() {
        let classes = FocusClasses::default();
        assert!(classes.toggles(None).iter().all(|(_, set)| !set));
    }
}
