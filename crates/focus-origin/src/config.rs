//! Tracker configuration, loadable from RON.

use std::{collections::HashSet, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    classes::FocusClasses,
    error::{Error, Result},
};

/// How long a touch target stays live after `touchstart`.
///
/// Some platforms deliver the focus that follows a touch asynchronously, so the
/// touch cannot be matched within the same task the way key and mouse presses are.
pub const TOUCH_BUFFER_MS: u64 = 650;

/// Tunables for a [`FocusOriginMonitor`](crate::FocusOriginMonitor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Lifetime of a touch target, in milliseconds.
    pub touch_buffer_ms: u64,
    /// Optional cap on buffered changes per subscriber; the oldest are dropped
    /// beyond it. `None` buffers every change until it is read.
    pub stream_capacity: Option<usize>,
    /// Marker names reflected onto monitored elements.
    pub classes: FocusClasses,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            touch_buffer_ms: TOUCH_BUFFER_MS,
            stream_capacity: None,
            classes: FocusClasses::default(),
        }
    }
}

impl MonitorConfig {
    /// Touch buffer as a `Duration`.
    pub fn touch_buffer(&self) -> Duration {
        Duration::from_millis(self.touch_buffer_ms)
    }

    /// Parse and validate a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| Error::Parse {
            path: None,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a RON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Read {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        Self::from_ron(&text).map_err(|e| e.with_path(path.to_path_buf()))
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.touch_buffer_ms == 0 {
            return Err(Error::Validation {
                message: "touch_buffer_ms must be greater than zero".into(),
            });
        }
        if self.stream_capacity == Some(0) {
            return Err(Error::Validation {
                message: "stream_capacity must be greater than zero when set".into(),
            });
        }
        let names = self.classes.names();
        if let Some(empty) = names.iter().position(|n| n.trim().is_empty()) {
            return Err(Error::Validation {
                message: format!("class name #{empty} is empty"),
            });
        }
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name) {
                return Err(Error::Validation {
                    message: format!("class name {name:?} is used more than once"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ron_yields_defaults() {
        let cfg = MonitorConfig::from_ron("()").unwrap();
        assert_eq!(cfg, MonitorConfig::default());
        assert_eq!(cfg.touch_buffer(), Duration::from_millis(650));
    }

    #[test]
    fn partial_override() {
        let cfg = MonitorConfig::from_ron(
            r#"(touch_buffer_ms: 300, classes: (focused: "cdk-focused"))"#,
        )
        .unwrap();
        assert_eq!(cfg.touch_buffer_ms, 300);
        assert_eq!(cfg.classes.focused, "cdk-focused");
        assert_eq!(cfg.classes.mouse, "focus-via-mouse");
        assert_eq!(cfg.stream_capacity, None);
    }

    #[test]
    fn rejects_zero_touch_buffer() {
        let err = MonitorConfig::from_ron("(touch_buffer_ms: 0)").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn stream_capacity_is_opt_in() {
        let cfg = MonitorConfig::from_ron("(stream_capacity: Some(16))").unwrap();
        assert_eq!(cfg.stream_capacity, Some(16));
        let err = MonitorConfig::from_ron("(stream_capacity: Some(0))").unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn rejects_duplicate_class_names() {
        let err = MonitorConfig::from_ron(r#"(classes: (touch: "x", mouse: "x"))"#).unwrap_err();
        assert!(err.pretty().contains("\"x\""));
    }

    #[test]
    fn rejects_malformed_ron() {
        let err = MonitorConfig::from_ron("(touch_buffer_ms: )").unwrap_err();
        assert!(matches!(err, Error::Parse { path: None, .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = MonitorConfig::load(Path::new("/nonexistent/focus-origin.ron")).unwrap_err();
        assert!(matches!(err, Error::Read { path: Some(_), .. }));
    }
}
