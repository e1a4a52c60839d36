use std::sync::Arc;

use crate::backend::database::Database;
use crate::backend::live::ChangeBus;
use crate::backend::notifications;
use crate::common::error::Result;
use crate::common::models::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationFilter {
    All,
    Unread,
}

/// Per-user view over the notifications collection. Persisted like every
/// other collection; the filter/mark surface matches the feed UI.
pub struct NotificationFeed {
    db: Arc<Database>,
    bus: ChangeBus,
    user_id: String,
}

impl NotificationFeed {
    pub fn new(db: Arc<Database>, bus: ChangeBus, user_id: String) -> Self {
        Self { db, bus, user_id }
    }

    pub async fn list(&self, filter: NotificationFilter) -> Result<Vec<Notification>> {
        let mut all = notifications::for_user(&self.db, &self.user_id).await?;
        if filter == NotificationFilter::Unread {
            all.retain(|n| !n.read);
        }
        Ok(all)
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<()> {
        notifications::mark_read(&self.db, &self.bus, notification_id).await
    }

    /// Returns the number of notifications actually flipped.
    pub async fn mark_all_read(&self) -> Result<u64> {
        notifications::mark_all_read(&self.db, &self.bus, &self.user_id).await
    }

    pub async fn unread_count(&self) -> Result<usize> {
        Ok(self.list(NotificationFilter::Unread).await?.len())
    }
}
