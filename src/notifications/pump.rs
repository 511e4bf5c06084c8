use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use super::feed::{Notification, NotificationFeed};
use super::interpret::{interpret, WinAlert};
use crate::session::SessionContext;
use crate::stream::StreamEvent;

pub type SharedFeed = Arc<Mutex<NotificationFeed>>;

/// Receives rendered notifications as they enter the feed.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification, feed: &NotificationFeed);

    /// This session won an auction. Raised before the matching notification.
    fn alert(&self, alert: &WinAlert);
}

pub struct NotificationPump;

impl NotificationPump {
    /// Spawn a task that interprets every stream event in delivery order,
    /// pushes it to `feed` and forwards it to `sink`.
    ///
    /// Events are handled one at a time as they arrive; nothing is buffered.
    /// The task ends when the stream client is dropped.
    pub fn start(
        mut rx: broadcast::Receiver<StreamEvent>,
        session: SessionContext,
        feed: SharedFeed,
        sink: Arc<dyn NotificationSink>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let mut interpretation = interpret(&event, &session);
                        if let Some(alert) = interpretation.alert.take() {
                            tracing::info!("auction {} won by this session", alert.auction_id);
                            sink.alert(&alert);
                        }
                        let mut feed = feed.lock().await;
                        let notification = feed.push(interpretation);
                        sink.notify(&notification, &feed);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("notification pump lagged, dropped {n} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
