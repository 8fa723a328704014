//! Single-slot, last-write-wins notification cell.
//!
//! A new notification replaces whatever is showing and carries a fresh
//! [`ExpiryToken`]; an expiry only takes effect when its token still matches
//! the current notification, so a stale timer can never hide a newer message.

use std::time::Duration;

use tokio::time::Instant;

pub const NOTIFICATION_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpiryToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub visible: bool,
    pub issued_at: Instant,
    pub expires_at: Instant,
    token: ExpiryToken,
}

impl Notification {
    pub fn token(&self) -> ExpiryToken {
        self.token
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationSlot {
    current: Option<Notification>,
    generation: u64,
}

impl NotificationSlot {
    /// Replaces the current notification and returns the token its timer must present.
    pub fn show(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> ExpiryToken {
        self.generation = self.generation.wrapping_add(1);
        let token = ExpiryToken(self.generation);
        self.current = Some(Notification {
            message: message.into(),
            kind,
            visible: true,
            issued_at: now,
            expires_at: now + NOTIFICATION_TTL,
            token,
        });
        token
    }

    /// Hides the notification if `token` still names it. Returns whether anything changed.
    pub fn expire(&mut self, token: ExpiryToken) -> bool {
        match self.current.as_mut() {
            Some(current) if current.token == token && current.visible => {
                current.visible = false;
                true
            }
            _ => false,
        }
    }

    pub fn visible(&self) -> Option<&Notification> {
        self.current.as_ref().filter(|n| n.visible)
    }

    /// Last notification issued, visible or not.
    pub fn latest(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}
