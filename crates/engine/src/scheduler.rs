//! Recurring dispatch scheduler.
//!
//! Fires a dispatch cycle once per interval for as long as the process runs.
//! The first cycle happens one full interval after start, not immediately.
//! Shutdown is observed only between cycles, so a cycle that has started
//! always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;

pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
}

impl Scheduler {
    /// `interval` must be non-zero.
    pub fn new(dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        // A slow cycle must not trigger a burst of catch-up cycles.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Dispatch scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // Run in its own task so a panic inside a cycle is contained.
            let dispatcher = self.dispatcher.clone();
            let cycle = tokio::spawn(async move { dispatcher.run_cycle().await });
            if let Err(e) = cycle.await {
                tracing::error!(error = %e, "Dispatch cycle aborted unexpectedly, scheduler continues");
            }
        }

        let remaining = self.dispatcher.registry().count().await;
        tracing::info!(
            remaining_subscriptions = remaining,
            "Dispatch scheduler stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use herald_common::error::FetchError;
    use herald_common::types::{RecipientId, Subject, WeatherSnapshot};
    use herald_fetcher::{DataFetcher, MockDataFetcher};
    use herald_notifier::MockNotifier;

    use crate::registry::SubscriptionRegistry;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            location: "Oslo".to_string(),
            country: "NO".to_string(),
            temperature: 3,
            feels_like: 0,
            description: "snow".to_string(),
            humidity: 90,
            pressure: 1001.0,
            wind_speed: 6.1,
            wind_direction: None,
            visibility_km: Some(2.5),
            icon: "13d".to_string(),
        }
    }

    async fn counting_dispatcher(sends: Arc<AtomicUsize>) -> Arc<Dispatcher> {
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(RecipientId(7), Subject::parse("Oslo").unwrap())
            .await;

        let mut fetcher = MockDataFetcher::new();
        fetcher.expect_fetch().returning(|_| Ok(snapshot()));
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(move |_, _| {
            sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        Arc::new(Dispatcher::new(registry, Arc::new(fetcher), Arc::new(notifier)))
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_run_future_is_send() {
        let dispatcher = counting_dispatcher(Arc::new(AtomicUsize::new(0))).await;
        let run = Scheduler::new(dispatcher, Duration::from_secs(60)).run(CancellationToken::new());
        assert_send(&run);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_after_full_interval() {
        let sends = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting_dispatcher(sends.clone()).await;
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            Scheduler::new(dispatcher, Duration::from_secs(60)).run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(sends.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sends.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(sends.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_further_cycles() {
        let sends = Arc::new(AtomicUsize::new(0));
        let dispatcher = counting_dispatcher(sends.clone()).await;
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            Scheduler::new(dispatcher, Duration::from_secs(60)).run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        shutdown.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sends.load(Ordering::SeqCst), 0);
    }

    /// Panics on its first call, succeeds afterwards.
    struct PanicOnceFetcher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl DataFetcher for PanicOnceFetcher {
        async fn fetch(&self, _subject: &Subject) -> Result<WeatherSnapshot, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("provider client bug");
            }
            Ok(snapshot())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_cycle_does_not_stop_scheduler() {
        let registry = SubscriptionRegistry::new();
        registry
            .subscribe(RecipientId(7), Subject::parse("Oslo").unwrap())
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = PanicOnceFetcher {
            calls: calls.clone(),
        };
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_, _| Ok(()));

        let dispatcher = Arc::new(Dispatcher::new(registry, Arc::new(fetcher), Arc::new(notifier)));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            Scheduler::new(dispatcher, Duration::from_secs(10)).run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
