//! Message formatter — renders weather snapshots as Telegram HTML.
//!
//! Pure functions only. Every string that came from the provider or the user
//! is escaped before interpolation.

use herald_common::error::FetchError;
use herald_common::types::{Subject, WeatherSnapshot};

/// Glyph shown when the provider returns an icon code we don't know.
pub const FALLBACK_GLYPH: &str = "🌤️";

/// Map an OpenWeather icon code (`01d`, `10n`, ...) to a display glyph.
pub fn icon_glyph(code: &str) -> &'static str {
    match code {
        "01d" => "☀️",
        "01n" => "🌙",
        "02d" => "⛅",
        "02n" | "03d" | "03n" | "04d" | "04n" => "☁️",
        "09d" | "09n" => "🌧️",
        "10d" | "10n" => "🌦️",
        "11d" | "11n" => "⛈️",
        "13d" | "13n" => "❄️",
        "50d" | "50n" => "🌫️",
        _ => FALLBACK_GLYPH,
    }
}

/// Eight-point compass label for a meteorological bearing.
pub fn compass_point(degrees: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized + 22.5) / 45.0) as usize % POINTS.len();
    POINTS[index]
}

/// Escape the three characters Telegram's HTML parse mode treats specially.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render current conditions.
pub fn format_weather(snapshot: &WeatherSnapshot) -> String {
    let place = if snapshot.country.is_empty() {
        escape_html(&snapshot.location)
    } else {
        format!(
            "{}, {}",
            escape_html(&snapshot.location),
            escape_html(&snapshot.country)
        )
    };

    let wind_direction = match snapshot.wind_direction {
        Some(deg) => format!("{:.0}° ({})", deg, compass_point(deg)),
        None => "unknown".to_string(),
    };
    let visibility = match snapshot.visibility_km {
        Some(km) => format!("{:.1} km", km),
        None => "unknown".to_string(),
    };

    format!(
        "{glyph} <b>Weather in {place}</b>\n\
         \n\
         🌡️ Temperature: <b>{temp}°C</b>\n\
         🤔 Feels like: <b>{feels}°C</b>\n\
         📝 Description: <b>{description}</b>\n\
         💧 Humidity: <b>{humidity}%</b>\n\
         📊 Pressure: <b>{pressure} hPa</b>\n\
         💨 Wind Speed: <b>{wind_speed} m/s</b>\n\
         🧭 Wind Direction: <b>{wind_direction}</b>\n\
         👁️ Visibility: <b>{visibility}</b>",
        glyph = icon_glyph(&snapshot.icon),
        temp = snapshot.temperature,
        feels = snapshot.feels_like,
        description = escape_html(&snapshot.description),
        humidity = snapshot.humidity,
        pressure = snapshot.pressure,
        wind_speed = snapshot.wind_speed,
    )
}

/// Render the scheduled-update variant sent by the dispatcher.
pub fn format_update(snapshot: &WeatherSnapshot) -> String {
    format!("⏰ <b>Weather Update</b>\n\n{}", format_weather(snapshot))
}

/// Notice sent to a subscriber when their scheduled lookup failed.
pub fn format_fetch_failure(subject: &Subject, error: &FetchError) -> String {
    format!(
        "❌ Failed to fetch weather update for <b>{}</b>. {}",
        escape_html(subject.as_str()),
        error.user_message()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            location: "London".to_string(),
            country: "GB".to_string(),
            temperature: 15,
            feels_like: 14,
            description: "light rain".to_string(),
            humidity: 82,
            pressure: 1012.0,
            wind_speed: 4.63,
            wind_direction: Some(240.0),
            visibility_km: Some(9.0),
            icon: "10d".to_string(),
        }
    }

    #[test]
    fn test_format_weather() {
        let text = format_weather(&snapshot());
        assert!(text.starts_with("🌦️ <b>Weather in London, GB</b>"));
        assert!(text.contains("Temperature: <b>15°C</b>"));
        assert!(text.contains("Feels like: <b>14°C</b>"));
        assert!(text.contains("Description: <b>light rain</b>"));
        assert!(text.contains("Humidity: <b>82%</b>"));
        assert!(text.contains("Pressure: <b>1012 hPa</b>"));
        assert!(text.contains("Wind Speed: <b>4.63 m/s</b>"));
        assert!(text.contains("Wind Direction: <b>240° (SW)</b>"));
        assert!(text.contains("Visibility: <b>9.0 km</b>"));
    }

    #[test]
    fn test_zero_readings_are_not_unknown() {
        let mut s = snapshot();
        s.wind_direction = Some(0.0);
        s.visibility_km = Some(0.0);
        let text = format_weather(&s);
        assert!(text.contains("Wind Direction: <b>0° (N)</b>"));
        assert!(text.contains("Visibility: <b>0.0 km</b>"));
        assert!(!text.contains("unknown"));
    }

    #[test]
    fn test_missing_readings_are_unknown() {
        let mut s = snapshot();
        s.wind_direction = None;
        s.visibility_km = None;
        let text = format_weather(&s);
        assert!(text.contains("Wind Direction: <b>unknown</b>"));
        assert!(text.contains("Visibility: <b>unknown</b>"));
    }

    #[test]
    fn test_missing_country_omits_separator() {
        let mut s = snapshot();
        s.country = String::new();
        assert!(format_weather(&s).contains("<b>Weather in London</b>"));
    }

    #[test]
    fn test_icon_lookup_and_fallback() {
        assert_eq!(icon_glyph("01d"), "☀️");
        assert_eq!(icon_glyph("01n"), "🌙");
        assert_eq!(icon_glyph("04n"), "☁️");
        assert_eq!(icon_glyph("13d"), "❄️");
        assert_eq!(icon_glyph("99x"), FALLBACK_GLYPH);
        assert_eq!(icon_glyph(""), FALLBACK_GLYPH);
    }

    #[test]
    fn test_compass_point() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(359.0), "N");
        assert_eq!(compass_point(90.0), "E");
        assert_eq!(compass_point(200.0), "S");
        assert_eq!(compass_point(292.5), "NW");
    }

    #[test]
    fn test_provider_text_is_escaped() {
        let mut s = snapshot();
        s.location = "Q<b>&A".to_string();
        let text = format_weather(&s);
        assert!(text.contains("Weather in Q&lt;b&gt;&amp;A, GB"));
    }

    #[test]
    fn test_format_update_has_header() {
        let text = format_update(&snapshot());
        assert!(text.starts_with("⏰ <b>Weather Update</b>\n\n"));
        assert!(text.contains("Weather in London, GB"));
    }

    #[test]
    fn test_format_fetch_failure() {
        let subject = Subject::parse("Atlantis").unwrap();
        let text = format_fetch_failure(&subject, &FetchError::NotFound);
        assert!(text.contains("<b>Atlantis</b>"));
        assert!(text.contains(FetchError::NotFound.user_message()));

        let text = format_fetch_failure(&subject, &FetchError::Unavailable("tcp reset".into()));
        assert!(!text.contains("tcp reset"));
    }

    #[test]
    fn test_formatting_is_deterministic() {
        assert_eq!(format_weather(&snapshot()), format_weather(&snapshot()));
    }
}
