//! Reading and acknowledging in-app notifications.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::Notification;
use crate::store::{query_as, run_transaction, Collection, DocRef, DocumentStore, Filter};

pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Notifications addressed to `uid`, newest first.
    pub async fn list_for_user(&self, uid: &str) -> Result<Vec<Notification>> {
        let mut notifications = query_as::<Notification>(
            self.store.as_ref(),
            &Collection::Notifications,
            &Filter::RecipientUid(uid.to_string()),
        )
        .await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    /// Marks a notification read. Only its recipient may do so.
    pub async fn mark_read(&self, uid: &str, id: &str) -> Result<Notification> {
        let doc = DocRef::notification(id);
        let doc = &doc;

        run_transaction(&self.store, move |mut tx| async move {
            let mut notification = tx
                .get_as::<Notification>(doc)
                .await?
                .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;
            if notification.recipient_uid != uid {
                return Err(AppError::Forbidden(
                    "You can only update your own notifications".to_string(),
                ));
            }
            if !notification.read {
                notification.read = true;
                tx.set(doc.clone(), notification.clone());
            }
            Ok((tx, notification))
        })
        .await
    }
}
