//! Persistent alerts for conditions an operator should notice.

use tracing::{error, info, warn};

/// Severity of an [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
}

/// Named condition that is either active or not.
///
/// Only transitions are logged: activation at the alert's level, clearing at info.
#[derive(Debug, Clone)]
pub struct Alert {
    text: String,
    level: AlertLevel,
    active: bool,
}

impl Alert {
    pub fn new(text: impl Into<String>, level: AlertLevel) -> Self {
        Self { text: text.into(), level, active: false }
    }

    pub fn set(&mut self, active: bool) {
        if active == self.active {
            return;
        }
        self.active = active;

        if active {
            match self.level {
                AlertLevel::Info => info!("Alert: {}", self.text),
                AlertLevel::Warning => warn!("Alert: {}", self.text),
                AlertLevel::Error => error!("Alert: {}", self.text),
            }
        } else {
            info!("Alert cleared: {}", self.text);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn level(&self) -> AlertLevel {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_inactive() {
        let alert = Alert::new("lead motor lost connection", AlertLevel::Error);
        assert!(!alert.is_active());
        assert_eq!(alert.text(), "lead motor lost connection");
        assert_eq!(alert.level(), AlertLevel::Error);
    }

    #[test]
    fn test_set_and_clear() {
        let mut alert = Alert::new("test", AlertLevel::Warning);
        alert.set(true);
        assert!(alert.is_active());
        alert.set(true);
        assert!(alert.is_active());
        alert.set(false);
        assert!(!alert.is_active());
    }
}
