//! Command router — turns inbound chat text into replies.
//!
//! Parsing is table-driven: the first word of a `/command` is looked up in
//! [`ROUTES`]; anything that isn't a command is treated as a city name.
//! Handlers return the reply text and never talk to the transport directly.

use std::sync::Arc;
use std::time::Duration;

use herald_common::error::SubjectError;
use herald_common::types::{RecipientId, Subject};
use herald_fetcher::DataFetcher;

use crate::formatter::{escape_html, format_weather};
use crate::registry::SubscriptionRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandKind {
    Start,
    Help,
    Weather,
    Subscribe,
    Unsubscribe,
    Status,
}

/// Command name → handler kind.
const ROUTES: &[(&str, CommandKind)] = &[
    ("start", CommandKind::Start),
    ("help", CommandKind::Help),
    ("weather", CommandKind::Weather),
    ("subscribe", CommandKind::Subscribe),
    ("unsubscribe", CommandKind::Unsubscribe),
    ("status", CommandKind::Status),
];

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Start,
    Help,
    /// `/weather <city>`; the argument may be empty.
    Weather(String),
    /// `/subscribe <city>`; the argument may be empty.
    Subscribe(String),
    Unsubscribe,
    Status,
    /// Free text, treated as a city name.
    Lookup(String),
}

impl Request {
    /// Parse inbound text. Returns `None` for blank text and unknown commands.
    ///
    /// Any `@username` suffix is accepted; use [`Request::parse_for`] once the
    /// bot's own username is known.
    pub fn parse(text: &str) -> Option<Self> {
        Self::parse_for(text, None)
    }

    /// Like [`Request::parse`], but commands addressed to a different bot
    /// (`/weather@OtherBot`) are ignored.
    pub fn parse_for(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let Some(command) = text.strip_prefix('/') else {
            return Some(Request::Lookup(text.to_string()));
        };

        let (head, args) = match command.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (command, ""),
        };
        // Group chats address commands as `/weather@SomeBot`.
        let (name, addressee) = match head.split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (head, None),
        };
        if let (Some(addressee), Some(me)) = (addressee, bot_username)
            && !addressee.eq_ignore_ascii_case(me.trim_start_matches('@'))
        {
            return None;
        }

        let (_, kind) = ROUTES
            .iter()
            .find(|(route, _)| route.eq_ignore_ascii_case(name))?;

        Some(match kind {
            CommandKind::Start => Request::Start,
            CommandKind::Help => Request::Help,
            CommandKind::Weather => Request::Weather(args.to_string()),
            CommandKind::Subscribe => Request::Subscribe(args.to_string()),
            CommandKind::Unsubscribe => Request::Unsubscribe,
            CommandKind::Status => Request::Status,
        })
    }

    /// Progress notice to show while a lookup is running, if this request does one.
    pub fn pending_notice(&self) -> Option<String> {
        match self {
            Request::Weather(city) | Request::Lookup(city) if !city.trim().is_empty() => Some(
                format!("🔍 Fetching weather for {}...", escape_html(city.trim())),
            ),
            Request::Subscribe(city) if !city.trim().is_empty() => {
                Some(format!("🔍 Verifying city {}...", escape_html(city.trim())))
            }
            _ => None,
        }
    }
}

/// Describe an update interval in words, e.g. "every hour", "every 15 minutes".
pub fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    let (n, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("every {unit}")
    } else {
        format!("every {n} {unit}s")
    }
}

/// Handles chat requests against the shared registry.
pub struct CommandRouter {
    registry: SubscriptionRegistry,
    fetcher: Arc<dyn DataFetcher>,
    update_interval: Duration,
}

impl CommandRouter {
    pub fn new(
        registry: SubscriptionRegistry,
        fetcher: Arc<dyn DataFetcher>,
        update_interval: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            update_interval,
        }
    }

    /// Produce the reply for `request` sent by `recipient`.
    pub async fn handle(&self, recipient: RecipientId, request: &Request) -> String {
        match request {
            Request::Start => self.welcome(),
            Request::Help => self.help(),
            Request::Weather(city) | Request::Lookup(city) => self.weather(city).await,
            Request::Subscribe(city) => self.subscribe(recipient, city).await,
            Request::Unsubscribe => self.unsubscribe(recipient).await,
            Request::Status => self.status(recipient).await,
        }
    }

    async fn weather(&self, raw: &str) -> String {
        let subject = match Subject::parse(raw) {
            Ok(subject) => subject,
            Err(e) => return invalid_city_reply(&e, "/weather London"),
        };

        match self.fetcher.fetch(&subject).await {
            Ok(snapshot) => format_weather(&snapshot),
            Err(e) => {
                tracing::info!(subject = %subject, error = %e, "Weather lookup failed");
                format!("❌ {}", e.user_message())
            }
        }
    }

    async fn subscribe(&self, recipient: RecipientId, raw: &str) -> String {
        let subject = match Subject::parse(raw) {
            Ok(subject) => subject,
            Err(e) => return invalid_city_reply(&e, "/subscribe London"),
        };

        // Verify before persisting so unknown cities never enter the registry.
        if let Err(e) = self.fetcher.fetch(&subject).await {
            tracing::info!(recipient = %recipient, subject = %subject, error = %e, "Subscription verification failed");
            return format!("❌ {}", e.user_message());
        }

        let city = escape_html(subject.as_str());
        let every = describe_interval(self.update_interval);
        self.registry.subscribe(recipient, subject).await;

        format!(
            "✅ Subscribed to weather updates for <b>{city}</b>!\n\n\
             You will receive weather updates {every}. Use /unsubscribe to stop."
        )
    }

    async fn unsubscribe(&self, recipient: RecipientId) -> String {
        match self.registry.unsubscribe(recipient).await {
            Some(subject) => format!(
                "✅ Unsubscribed from weather updates for <b>{}</b>.",
                escape_html(subject.as_str())
            ),
            None => "❌ You are not subscribed to any weather updates.".to_string(),
        }
    }

    async fn status(&self, recipient: RecipientId) -> String {
        match self.registry.get(recipient).await {
            Some(subject) => format!(
                "📊 <b>Subscription Status</b>\n\n\
                 ✅ Active subscription for: <b>{}</b>\n\n\
                 You will receive weather updates {}.",
                escape_html(subject.as_str()),
                describe_interval(self.update_interval)
            ),
            None => "📊 <b>Subscription Status</b>\n\n\
                     ❌ No active subscription.\n\n\
                     Use /subscribe [city] to start receiving weather updates."
                .to_string(),
        }
    }

    fn welcome(&self) -> String {
        format!(
            "🌤️ <b>Welcome to WeatherHerald!</b>\n\n\
             I can help you check the weather for any city around the world.\n\n\
             {}\n\n\
             <b>Example:</b>\n\
             /weather London\n\
             /weather New York\n\
             /weather Tokyo\n\n\
             Just send me a city name and I'll tell you the weather! 🌍",
            self.command_list()
        )
    }

    fn help(&self) -> String {
        format!(
            "📖 <b>WeatherHerald Help</b>\n\n\
             <b>How to use:</b>\n\
             1. Send a city name (e.g., \"London\" or \"New York\")\n\
             2. Or use the command: /weather [city name]\n\n\
             {}\n\n\
             <b>Examples:</b>\n\
             /weather Paris\n\
             /subscribe London\n\
             Tokyo",
            self.command_list()
        )
    }

    fn command_list(&self) -> String {
        format!(
            "<b>Commands:</b>\n\
             /start - Show the welcome message\n\
             /help - Show help information\n\
             /weather [city] - Get weather for a city\n\
             /subscribe [city] - Get weather updates {} for a city\n\
             /unsubscribe - Stop scheduled updates\n\
             /status - Check your subscription status",
            describe_interval(self.update_interval)
        )
    }
}

fn invalid_city_reply(error: &SubjectError, example: &str) -> String {
    match error {
        SubjectError::Empty => format!("Please provide a city name. Example: {example}"),
        SubjectError::TooLong { .. } | SubjectError::ControlCharacter => {
            format!("❌ Invalid city name: {error}.")
        }
    }
}
