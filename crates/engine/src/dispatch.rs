//! Dispatch cycle — one paced pass over every subscription.
//!
//! For each entry of a point-in-time registry snapshot:
//! 1. Fetch fresh weather for the subscribed location
//! 2. Send the formatted update (or, if the fetch failed, a failure notice)
//! 3. Prune the recipient if Telegram reports they revoked access
//! 4. Pause before the next entry to stay under the Bot API rate limit
//!
//! A single recipient's failure is counted and logged, never propagated.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use herald_common::types::{DispatchOutcome, Subscription};
use herald_fetcher::DataFetcher;
use herald_notifier::Notifier;

use crate::formatter;
use crate::registry::SubscriptionRegistry;

/// Default pause between consecutive recipients.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(1000);

/// Runs dispatch cycles against the shared registry.
pub struct Dispatcher {
    registry: SubscriptionRegistry,
    fetcher: Arc<dyn DataFetcher>,
    notifier: Arc<dyn Notifier>,
    send_delay: Duration,
    /// Held for the duration of a cycle.
    in_flight: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        registry: SubscriptionRegistry,
        fetcher: Arc<dyn DataFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            notifier,
            send_delay: DEFAULT_SEND_DELAY,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_send_delay(mut self, send_delay: Duration) -> Self {
        self.send_delay = send_delay;
        self
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Run one full cycle.
    ///
    /// Returns `None` without doing any work if another cycle is still running.
    pub async fn run_cycle(&self) -> Option<DispatchOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!("Previous dispatch cycle still running, skipping this one");
            return None;
        };

        let cycle_id = Uuid::new_v4();
        let mut outcome = DispatchOutcome::empty(cycle_id, Utc::now());

        if self.registry.count().await == 0 {
            tracing::info!(cycle_id = %cycle_id, "No active subscriptions, skipping dispatch cycle");
            return Some(outcome);
        }

        let snapshot = self.registry.entries().await;
        tracing::info!(
            cycle_id = %cycle_id,
            subscribers = snapshot.len(),
            "Sending scheduled weather updates"
        );

        let total = snapshot.len();
        for (index, subscription) in snapshot.iter().enumerate() {
            self.dispatch_one(cycle_id, subscription, &mut outcome).await;
            outcome.processed += 1;

            if index + 1 < total && !self.send_delay.is_zero() {
                tokio::time::sleep(self.send_delay).await;
            }
        }

        outcome.finished_at = Utc::now();
        tracing::info!(
            cycle_id = %cycle_id,
            processed = outcome.processed,
            success_count = outcome.success_count,
            error_count = outcome.error_count,
            pruned = outcome.pruned.len(),
            elapsed_ms = (outcome.finished_at - outcome.started_at).num_milliseconds(),
            "Dispatch cycle completed"
        );

        Some(outcome)
    }

    async fn dispatch_one(
        &self,
        cycle_id: Uuid,
        subscription: &Subscription,
        outcome: &mut DispatchOutcome,
    ) {
        let recipient = subscription.recipient;
        let subject = &subscription.subject;

        let snapshot = match self.fetcher.fetch(subject).await {
            Ok(snapshot) => snapshot,
            Err(fetch_err) => {
                outcome.error_count += 1;
                tracing::warn!(
                    cycle_id = %cycle_id,
                    recipient = %recipient,
                    subject = %subject,
                    error = %fetch_err,
                    "Weather fetch failed"
                );

                let notice = formatter::format_fetch_failure(subject, &fetch_err);
                if let Err(send_err) = self.notifier.send(recipient, &notice).await {
                    if send_err.is_permission_revoked() {
                        self.prune(cycle_id, subscription, outcome).await;
                    } else {
                        tracing::warn!(
                            cycle_id = %cycle_id,
                            recipient = %recipient,
                            error = %send_err,
                            "Failed to deliver fetch-failure notice"
                        );
                    }
                }
                return;
            }
        };

        let message = formatter::format_update(&snapshot);
        match self.notifier.send(recipient, &message).await {
            Ok(()) => {
                outcome.success_count += 1;
                tracing::info!(
                    cycle_id = %cycle_id,
                    recipient = %recipient,
                    subject = %subject,
                    "Sent weather update"
                );
            }
            Err(send_err) => {
                outcome.error_count += 1;
                tracing::warn!(
                    cycle_id = %cycle_id,
                    recipient = %recipient,
                    subject = %subject,
                    error = %send_err,
                    "Failed to deliver weather update"
                );
                if send_err.is_permission_revoked() {
                    self.prune(cycle_id, subscription, outcome).await;
                }
            }
        }
    }

    async fn prune(&self, cycle_id: Uuid, subscription: &Subscription, outcome: &mut DispatchOutcome) {
        if self
            .registry
            .remove_if_matches(subscription.recipient, &subscription.subject)
            .await
        {
            outcome.pruned.push(subscription.recipient);
            tracing::info!(
                cycle_id = %cycle_id,
                recipient = %subscription.recipient,
                "Removed subscription, recipient revoked delivery permission"
            );
        }
    }
}
