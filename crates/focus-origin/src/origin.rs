//! Focus origin values and the per-element focus state machine.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The inferred cause of a focus transition.
///
/// An absent origin (the element lost focus, or no cause is pending) is
/// expressed as `Option<FocusOrigin>::None` throughout the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusOrigin {
    /// Focus followed a touch on the focused node or one of its descendants.
    Touch,
    /// Focus followed a mouse or pointer press.
    Mouse,
    /// Focus followed a key press.
    Keyboard,
    /// No interactive cause was detected.
    Program,
}

impl FocusOrigin {
    /// All origins, in class-toggle order.
    pub const ALL: [Self; 4] = [Self::Touch, Self::Keyboard, Self::Mouse, Self::Program];

    /// Lowercase name of the origin.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Touch => "touch",
            Self::Mouse => "mouse",
            Self::Keyboard => "keyboard",
            Self::Program => "program",
        }
    }
}

impl fmt::Display for FocusOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusOrigin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "touch" => Ok(Self::Touch),
            "mouse" => Ok(Self::Mouse),
            "keyboard" => Ok(Self::Keyboard),
            "program" => Ok(Self::Program),
            _ => Err(Error::UnknownOrigin {
                name: s.to_string(),
            }),
        }
    }
}

/// Focus lifecycle of a single monitored element.
///
/// `Focused(a) -> Focused(b)` is never observed directly: the host always
/// blurs before it focuses again, so each focus is classified afresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FocusState {
    /// The element (or, in subtree mode, its subtree) does not hold focus.
    #[default]
    Unfocused,
    /// The element holds focus, acquired via the given origin.
    Focused(FocusOrigin),
}

impl FocusState {
    /// The active origin, if focused.
    pub fn origin(self) -> Option<FocusOrigin> {
        match self {
            Self::Unfocused => None,
            Self::Focused(origin) => Some(origin),
        }
    }

    /// True while focused.
    pub fn is_focused(self) -> bool {
        matches!(self, Self::Focused(_))
    }
}

impl From<Option<FocusOrigin>> for FocusState {
    fn from(origin: Option<FocusOrigin>) -> Self {
        origin.map_or(Self::Unfocused, Self::Focused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Keyboard".parse::<FocusOrigin>().unwrap(), FocusOrigin::Keyboard);
        assert_eq!(" touch ".parse::<FocusOrigin>().unwrap(), FocusOrigin::Touch);
        assert_eq!(
            "stylus".parse::<FocusOrigin>(),
            Err(Error::UnknownOrigin {
                name: "stylus".into()
            })
        );
    }

    #[test]
    fn display_matches_parse() {
        for origin in FocusOrigin::ALL {
            assert_eq!(origin.to_string().parse::<FocusOrigin>().unwrap(), origin);
        }
    }

    #[test]
    fn state_tracks_origin() {
        assert_eq!(FocusState::from(None), FocusState::Unfocused);
        let state = FocusState::from(Some(FocusOrigin::Mouse));
        assert!(state.is_focused());
        assert_eq!(state.origin(), Some(FocusOrigin::Mouse));
    }
}
