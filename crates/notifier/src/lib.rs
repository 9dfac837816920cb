//! Outbound delivery of notifications to recipients.
//!
//! The [`Notifier`] trait is the seam the dispatcher talks to. The Telegram
//! Bot API implementation also exposes the inbound side (long-polled updates)
//! used by the bot binary.

pub mod telegram;

use async_trait::async_trait;

use herald_common::error::DeliveryError;
use herald_common::types::RecipientId;

pub use telegram::TelegramClient;

/// Delivers a rendered message to a single recipient.
///
/// `DeliveryError::PermissionRevoked` must only be returned when the recipient
/// can no longer be reached at all; the dispatcher prunes on it.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError>;
}
