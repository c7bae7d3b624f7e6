//! Notification toggles.

use serde::{Deserialize, Serialize};

/// Controls which lifecycle events produce outbound notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Send a verification message after signup and on resend.
    #[serde(default = "default_true")]
    pub send_verification_emails: bool,
    /// Send an alert after every successful login.
    #[serde(default)]
    pub send_login_notifications: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            send_verification_emails: true,
            send_login_notifications: false,
        }
    }
}

fn default_true() -> bool {
    true
}
