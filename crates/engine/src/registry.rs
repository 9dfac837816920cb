//! Subscription registry — in-memory recipient → location mapping.
//!
//! The registry is owned by the application root and handed (as a cheap
//! clone of the handle) to both the command path and the dispatcher. All
//! access goes through one `RwLock`, so subscribe/unsubscribe and
//! prune-on-revocation serialize against each other.
//!
//! State is ephemeral: a restart clears every subscription.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use herald_common::types::{RecipientId, Subject, Subscription};

#[derive(Debug, Clone)]
struct Entry {
    /// Position of the recipient's first subscription; keeps iteration stable.
    seq: u64,
    subject: Subject,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<RecipientId, Entry>,
    next_seq: u64,
}

/// Shared handle to the subscription map.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `recipient` to `subject`, replacing any existing subject.
    ///
    /// Callers must have verified that the subject resolves before calling.
    /// Returns the previous subject, if there was one.
    pub async fn subscribe(&self, recipient: RecipientId, subject: Subject) -> Option<Subject> {
        let mut state = self.state.write().await;
        if let Some(entry) = state.entries.get_mut(&recipient) {
            let previous = std::mem::replace(&mut entry.subject, subject);
            tracing::info!(recipient = %recipient, subject = %entry.subject, previous = %previous, "Subscription replaced");
            return Some(previous);
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        tracing::info!(recipient = %recipient, subject = %subject, "Subscription created");
        state.entries.insert(recipient, Entry { seq, subject });
        None
    }

    /// Remove the recipient's subscription. Returns the subject it was for.
    pub async fn unsubscribe(&self, recipient: RecipientId) -> Option<Subject> {
        let removed = self
            .state
            .write()
            .await
            .entries
            .remove(&recipient)
            .map(|e| e.subject);
        if let Some(subject) = &removed {
            tracing::info!(recipient = %recipient, subject = %subject, "Subscription removed");
        }
        removed
    }

    /// Remove the recipient only if they are still subscribed to `subject`.
    ///
    /// Used for pruning: a recipient who resubscribed to a different location
    /// while a dispatch was in flight keeps the new subscription.
    pub async fn remove_if_matches(&self, recipient: RecipientId, subject: &Subject) -> bool {
        let mut state = self.state.write().await;
        let matches = state
            .entries
            .get(&recipient)
            .is_some_and(|e| &e.subject == subject);
        if matches {
            state.entries.remove(&recipient);
        }
        matches
    }

    pub async fn get(&self, recipient: RecipientId) -> Option<Subject> {
        self.state
            .read()
            .await
            .entries
            .get(&recipient)
            .map(|e| e.subject.clone())
    }

    /// Point-in-time copy of all entries in first-subscription order.
    ///
    /// The copy is detached from the registry, so mutating the registry while
    /// walking it cannot skip or repeat entries.
    pub async fn entries(&self) -> Vec<Subscription> {
        let state = self.state.read().await;
        let mut ordered: Vec<(u64, Subscription)> = state
            .entries
            .iter()
            .map(|(recipient, entry)| {
                (
                    entry.seq,
                    Subscription {
                        recipient: *recipient,
                        subject: entry.subject.clone(),
                    },
                )
            })
            .collect();
        ordered.sort_by_key(|(seq, _)| *seq);
        ordered.into_iter().map(|(_, sub)| sub).collect()
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}
