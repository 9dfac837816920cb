use thiserror::Error;

/// Why a city name was rejected before reaching the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("city name must not be empty")]
    Empty,

    #[error("city name must be at most {max} characters")]
    TooLong { max: usize },

    #[error("city name must not contain control characters")]
    ControlCharacter,
}

/// Failure to obtain a weather snapshot from the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("location not found")]
    NotFound,

    #[error("weather provider rejected the API key")]
    Unauthorized,

    /// Catch-all for transport failures, timeouts, 5xx and malformed payloads.
    #[error("weather provider unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Message safe to show to an end user. Never includes transport details.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::NotFound => "City not found. Please check the city name and try again.",
            FetchError::Unauthorized => "Invalid API key. Please check your OpenWeather API key.",
            FetchError::Unavailable(_) => "Failed to fetch weather data. Please try again later.",
        }
    }
}

/// Failure to deliver a message to a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The recipient blocked the bot or otherwise withdrew access.
    #[error("recipient revoked delivery permission: {0}")]
    PermissionRevoked(String),

    #[error("transient delivery failure: {0}")]
    Transient(String),
}

impl DeliveryError {
    pub fn is_permission_revoked(&self) -> bool {
        matches!(self, DeliveryError::PermissionRevoked(_))
    }
}
