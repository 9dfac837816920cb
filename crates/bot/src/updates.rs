//! Inbound update loop.
//!
//! Long-polls Telegram for new messages and answers each one through the
//! [`CommandRouter`]. Updates are handled in arrival order; each handler
//! runs in its own task so a panic is logged without stopping the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use herald_common::types::RecipientId;
use herald_engine::commands::{CommandRouter, Request};
use herald_notifier::telegram::{TelegramClient, Update};

/// Pause after a failed getUpdates call before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct UpdatePoller {
    client: TelegramClient,
    router: Arc<CommandRouter>,
    hold: Duration,
    offset: Option<i64>,
    bot_username: Option<String>,
}

impl UpdatePoller {
    pub fn new(client: TelegramClient, router: Arc<CommandRouter>, hold: Duration) -> Self {
        Self {
            client,
            router,
            hold,
            offset: None,
            bot_username: None,
        }
    }

    /// Ignore group-chat commands addressed to other bots.
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    /// Poll until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(hold_secs = self.hold.as_secs(), "Update poller started");

        loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.client.get_updates(self.offset, self.hold) => result,
            };

            let updates = match result {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "Polling error, backing off");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => continue,
                    }
                }
            };

            if let Some(next) = next_offset(&updates) {
                self.offset = Some(next);
            }

            for update in &updates {
                if let Some((chat, text)) = message_text(update) {
                    self.handle(chat, text).await;
                }
            }
        }

        tracing::info!("Update poller stopped");
    }

    async fn handle(&self, chat: RecipientId, text: &str) {
        let Some(request) = Request::parse_for(text, self.bot_username.as_deref()) else {
            return;
        };

        let client = self.client.clone();
        let router = self.router.clone();
        let task = tokio::spawn(async move {
            let notice_id = match request.pending_notice() {
                Some(notice) => client.send_message(chat, &notice).await.ok(),
                None => None,
            };

            let reply = router.handle(chat, &request).await;

            if let Some(id) = notice_id
                && let Err(e) = client.delete_message(chat, id).await
            {
                tracing::debug!(recipient = %chat, error = %e, "Could not delete progress notice");
            }
            if let Err(e) = client.send_message(chat, &reply).await {
                tracing::warn!(recipient = %chat, error = %e, "Failed to send reply");
            }
        });

        if let Err(e) = task.await {
            tracing::error!(recipient = %chat, error = %e, "Command handler aborted unexpectedly");
        }
    }
}

/// Offset that acknowledges every update in `updates`.
pub fn next_offset(updates: &[Update]) -> Option<i64> {
    updates.iter().map(|u| u.update_id + 1).max()
}

/// Chat and text of a plain text message, if the update carries one.
pub fn message_text(update: &Update) -> Option<(RecipientId, &str)> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?;
    Some((RecipientId(message.chat.id), text))
}
