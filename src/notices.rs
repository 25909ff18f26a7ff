//! Human-readable notices for the presentation layer.

use serde::{Deserialize, Serialize};

/// How long the presentation keeps a notice on screen.
pub const NOTICE_DISPLAY_SECS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    pub display_secs: f64,
}

impl Notice {
    pub fn normal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Normal,
            display_secs: NOTICE_DISPLAY_SECS,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            display_secs: NOTICE_DISPLAY_SECS,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
