//! Web Interaction Skills
//!
//! Builtins backed by public HTTP APIs: the current weather via
//! Open-Meteo (its geocoding endpoint resolves the spoken location
//! name, so no separate geocoding service is needed) and a random joke.

use crate::skills::registry::SkillProvider;
use crate::skills::types::{ExecutionError, ParamMap, ParameterDefinition, Skill, SkillAction};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const JOKE_URL: &str = "https://official-joke-api.appspot.com/random_joke";

/// Provider for the web-facing skills. The HTTP client is shared and
/// carries the request timeout.
pub struct WebProvider {
    client: reqwest::Client,
}

impl WebProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SkillProvider for WebProvider {
    fn name(&self) -> &'static str {
        "web"
    }

    fn skills(&self) -> anyhow::Result<Vec<Skill>> {
        Ok(vec![
            Skill::new(
                "get_weather",
                "Looks up and reports the current weather and today's forecast for a city or \
                 place named by the user.",
                vec![ParameterDefinition::string(
                    "location_name",
                    "Name of the city or place to get the weather for, e.g. 'Paris' or \
                     'New York, USA'.",
                    true,
                )],
                Arc::new(GetWeather {
                    client: self.client.clone(),
                }),
            )?,
            Skill::new(
                "tell_joke",
                "Tells a random joke. Takes no parameters.",
                Vec::new(),
                Arc::new(TellJoke {
                    client: self.client.clone(),
                }),
            )?,
        ])
    }
}

// Open-Meteo geocoding reply (only the fields we read).
#[derive(Debug, Deserialize)]
struct GeocodingReply {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastReply {
    current_weather: Option<CurrentWeather>,
    daily: Option<DailyForecast>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: Option<f64>,
    weathercode: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct DailyForecast {
    #[serde(default)]
    temperature_2m_max: Vec<f64>,
    #[serde(default)]
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

struct GetWeather {
    client: reqwest::Client,
}

#[async_trait]
impl SkillAction for GetWeather {
    async fn run(&self, params: &ParamMap) -> Result<String, ExecutionError> {
        let location_name = params
            .get("location_name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ExecutionError::MissingParameter("location_name".to_string()))?;

        let place = self.geocode(location_name).await?;
        debug!(place = %place.name, lat = place.latitude, lon = place.longitude, "geocoded location");
        let place_label = match &place.country {
            Some(country) => format!("{}, {}", place.name, country),
            None => place.name.clone(),
        };

        let forecast: ForecastReply = self
            .client
            .get(FORECAST_URL)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current_weather", "true".to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max"
                        .to_string(),
                ),
                ("timezone", "auto".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .map_err(http_failure("weather service"))?
            .error_for_status()
            .map_err(http_failure("weather service"))?
            .json()
            .await
            .map_err(http_failure("weather service"))?;

        let current = forecast.current_weather.ok_or_else(|| {
            ExecutionError::Failed("the weather service reply had no current conditions".into())
        })?;

        let mut parts = vec![format!(
            "It is currently {:.0}°C in {} with {}.",
            current.temperature,
            place_label,
            current
                .weathercode
                .map(describe_weather_code)
                .unwrap_or("unknown conditions"),
        )];
        if let Some(wind) = current.windspeed {
            parts.push(format!("Wind at {wind:.0} km/h."));
        }
        if let Some(daily) = forecast.daily {
            if let (Some(max), Some(min)) = (
                daily.temperature_2m_max.first(),
                daily.temperature_2m_min.first(),
            ) {
                parts.push(format!("Today's high is {max:.0}°C, the low {min:.0}°C."));
            }
            if let Some(Some(chance)) = daily.precipitation_probability_max.first() {
                parts.push(format!("Chance of precipitation: {chance:.0}%."));
            }
        }
        Ok(parts.join(" "))
    }
}

impl GetWeather {
    async fn geocode(&self, location_name: &str) -> Result<GeocodingResult, ExecutionError> {
        let reply: GeocodingReply = self
            .client
            .get(GEOCODING_URL)
            .query(&[("name", location_name), ("count", "1")])
            .send()
            .await
            .map_err(http_failure("geocoding service"))?
            .error_for_status()
            .map_err(http_failure("geocoding service"))?
            .json()
            .await
            .map_err(http_failure("geocoding service"))?;

        reply.results.into_iter().next().ok_or_else(|| {
            ExecutionError::Failed(format!(
                "I could not find a place called '{location_name}'; try a more specific name"
            ))
        })
    }
}

/// WMO weather interpretation codes, abbreviated to the common ones.
fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "clear skies",
        1 => "mostly clear skies",
        2 => "partly cloudy skies",
        3 => "overcast skies",
        45 | 48 => "fog",
        51 | 53 | 55 => "drizzle",
        56 | 57 => "freezing drizzle",
        61 | 63 => "rain",
        65 => "heavy rain",
        66 | 67 => "freezing rain",
        71 | 73 => "snow",
        75 | 77 => "heavy snow",
        80 | 81 => "rain showers",
        82 => "violent rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorms",
        96 | 99 => "thunderstorms with hail",
        _ => "unusual conditions",
    }
}

#[derive(Debug, Deserialize)]
struct JokeReply {
    setup: String,
    punchline: String,
}

struct TellJoke {
    client: reqwest::Client,
}

#[async_trait]
impl SkillAction for TellJoke {
    async fn run(&self, _params: &ParamMap) -> Result<String, ExecutionError> {
        let joke: JokeReply = self
            .client
            .get(JOKE_URL)
            .send()
            .await
            .map_err(http_failure("joke service"))?
            .error_for_status()
            .map_err(http_failure("joke service"))?
            .json()
            .await
            .map_err(http_failure("joke service"))?;

        Ok(format!("{} ... {}", joke.setup, joke.punchline))
    }
}

fn http_failure(service: &'static str) -> impl Fn(reqwest::Error) -> ExecutionError {
    move |e| {
        if e.is_timeout() {
            ExecutionError::Failed(format!("the {service} took too long to respond"))
        } else if e.is_connect() {
            ExecutionError::Failed(format!("I could not reach the {service}; check the network"))
        } else {
            ExecutionError::Failed(format!("the {service} request failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_exposes_both_skills() {
        let provider = WebProvider::new(reqwest::Client::new());
        let skills = provider.skills().unwrap();
        let names: Vec<&str> = skills.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["get_weather", "tell_joke"]);
        assert!(skills[1].parameters_expected().is_empty());
    }

    #[test]
    fn weather_codes_have_descriptions() {
        assert_eq!(describe_weather_code(0), "clear skies");
        assert_eq!(describe_weather_code(95), "thunderstorms");
        assert_eq!(describe_weather_code(200), "unusual conditions");
    }

    #[tokio::test]
    async fn get_weather_requires_location() {
        let provider = WebProvider::new(reqwest::Client::new());
        let weather = provider.skills().unwrap().remove(0);
        let err = weather.invoke(&ParamMap::new()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::MissingParameter(p) if p == "location_name"));
    }

    #[test]
    fn geocoding_reply_parses_without_results() {
        let reply: GeocodingReply = serde_json::from_str(r#"{"generationtime_ms": 0.5}"#).unwrap();
        assert!(reply.results.is_empty());
    }

    #[test]
    fn forecast_reply_parses_minimal_payload() {
        let json = r#"{
            "current_weather": {"temperature": 21.4, "windspeed": 9.0, "weathercode": 2},
            "daily": {
                "temperature_2m_max": [24.0],
                "temperature_2m_min": [14.5],
                "precipitation_probability_max": [35]
            }
        }"#;
        let reply: ForecastReply = serde_json::from_str(json).unwrap();
        let current = reply.current_weather.unwrap();
        assert_eq!(current.weathercode, Some(2));
        assert_eq!(reply.daily.unwrap().temperature_2m_max, vec![24.0]);
    }
}
