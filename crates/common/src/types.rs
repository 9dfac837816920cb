use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SubjectError;

/// Telegram chat identifier a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecipientId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A location name a recipient wants weather for.
///
/// Always trimmed and non-empty; constructing one is the only way into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    pub const MAX_LENGTH: usize = 100;

    pub fn parse(raw: &str) -> Result<Self, SubjectError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SubjectError::Empty);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(SubjectError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(SubjectError::ControlCharacter);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registry entry: who gets updates, and for which location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub recipient: RecipientId,
    pub subject: Subject,
}

/// Current conditions for a location, as returned by the weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub country: String,
    /// Degrees Celsius, rounded
    pub temperature: i32,
    /// Degrees Celsius, rounded
    pub feels_like: i32,
    pub description: String,
    /// Percent
    pub humidity: u8,
    /// hPa
    pub pressure: f64,
    /// m/s
    pub wind_speed: f64,
    /// Meteorological degrees; `None` when the provider omits it
    pub wind_direction: Option<f64>,
    /// Kilometres, one decimal; `None` when the provider omits it
    pub visibility_km: Option<f64>,
    /// Provider icon code, e.g. `"10d"`
    pub icon: String,
}

/// Summary of one dispatch cycle, logged and then dropped.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub cycle_id: Uuid,
    pub processed: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub pruned: Vec<RecipientId>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DispatchOutcome {
    pub fn empty(cycle_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            processed: 0,
            success_count: 0,
            error_count: 0,
            pruned: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }
}
