//! Notifier implementations

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{Notice, Outcome};
use crate::traits::Notifier;
use shared::{component_debug, component_info, component_warn, ComponentId};

/// Reports action results through tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: Notice) {
        match &notice.outcome {
            Outcome::Succeeded => {
                component_info!(ComponentId::current(), "✅ {} of {} succeeded", notice.kind, notice.entry);
            }
            Outcome::Failed { reason } => {
                component_warn!(
                    ComponentId::current(),
                    "❌ {} of {} failed and was undone: {}",
                    notice.kind,
                    notice.entry,
                    reason
                );
            }
        }
    }
}

/// Forwards notices to a channel, e.g. for a UI toast queue
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<Notice>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::Sender<Notice>) -> Self {
        Self { sender }
    }

    /// Notifier plus the receiving end, buffered to `capacity`
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notice>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, notice: Notice) {
        if self.sender.send(notice).await.is_err() {
            component_debug!(ComponentId::current(), "Notice receiver dropped");
        }
    }
}
