use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use herald_api::state::AppState;
use herald_common::config::AppConfig;
use herald_engine::{CommandRouter, Dispatcher, Scheduler, SubscriptionRegistry};
use herald_fetcher::{DataFetcher, OpenWeatherClient};
use herald_notifier::TelegramClient;
use herald_bot::updates::UpdatePoller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald_bot=info,herald_engine=info,herald_notifier=info,herald_fetcher=info,herald_api=info"
                    .into()
            }),
        )
        .json()
        .init();

    // Programming faults are logged; the process keeps serving.
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Unhandled panic");
    }));

    tracing::info!("WeatherHerald bot starting...");

    // Missing credentials are fatal
    let config = AppConfig::from_env()?;

    let fetcher: Arc<dyn DataFetcher> = Arc::new(OpenWeatherClient::new(
        config.openweather_api_url.clone(),
        config.openweather_api_key.clone(),
        config.http_timeout(),
    )?);
    let telegram = TelegramClient::new(
        &config.telegram_api_url,
        &config.telegram_bot_token,
        config.http_timeout(),
    )?;

    let registry = SubscriptionRegistry::new();
    let dispatcher = Arc::new(
        Dispatcher::new(registry.clone(), fetcher.clone(), Arc::new(telegram.clone()))
            .with_send_delay(config.send_delay()),
    );
    let router = Arc::new(CommandRouter::new(
        registry.clone(),
        fetcher,
        config.dispatch_interval(),
    ));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let scheduler = tokio::spawn(
        Scheduler::new(dispatcher, config.dispatch_interval()).run(shutdown.clone()),
    );
    let health = tokio::spawn(herald_api::serve(
        AppState::new(registry.clone(), config.clone()),
        shutdown.clone(),
    ));

    let bot_username = match telegram.get_me().await {
        Ok(me) => me.username,
        Err(e) => {
            tracing::warn!(error = %e, "Could not fetch bot identity, accepting any @mention");
            None
        }
    };

    tracing::info!(
        bot_username = bot_username.as_deref().unwrap_or("unknown"),
        "Bot is running and ready to receive messages"
    );
    UpdatePoller::new(telegram, router, config.poll_timeout())
        .with_bot_username(bot_username)
        .run(shutdown.clone())
        .await;

    // Let an in-flight dispatch cycle finish before exiting.
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Scheduler task failed");
    }
    match health.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Health server exited with error"),
        Err(e) => tracing::error!(error = %e, "Health server task failed"),
    }

    let remaining = registry.count().await;
    tracing::info!(active_subscriptions = remaining, "WeatherHerald bot stopped.");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Error setting up SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error setting up SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully..."),
    }
}
