//! Ambient temperature resolution.
//!
//! Two-stage best-effort pipeline: IP geolocation, then a weather lookup at the
//! resolved coordinates. A failed geolocation falls back to a fixed default
//! location; a failed weather lookup is returned to the caller, who suppresses
//! advisories. Neither stage retries.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use url::Url;

const FALLBACK_CITY: &str = "Tel Aviv";
const FALLBACK_LAT: &str = "32.0853";
const FALLBACK_LON: &str = "34.7818";

const DEFAULT_GEO_URL: &str = "https://ipinfo.io/json";
const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const DEFAULT_API_KEY: &str = "2803f0a97dc5858a4a10a7d80bbc63f2";

/// Resolved ambient conditions at run end.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherReading {
    pub city: String,
    pub temp_c: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    pub lat: String,
    pub lon: String,
    pub city: String,
}

pub fn fallback_location() -> Location {
    Location {
        lat: FALLBACK_LAT.to_string(),
        lon: FALLBACK_LON.to_string(),
        city: FALLBACK_CITY.to_string(),
    }
}

/// Best-effort geolocation + weather client.
///
/// Endpoints are fields so tests can point the resolver at fixtures.
pub struct EnvironmentResolver {
    pub geo_url: String,
    pub weather_url: String,
    pub api_key: String,
}

impl Default for EnvironmentResolver {
    fn default() -> Self {
        Self {
            geo_url: DEFAULT_GEO_URL.to_string(),
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
        }
    }
}

impl EnvironmentResolver {
    /// Resolve the current city and temperature.
    ///
    /// Geolocation failures are recovered via the fallback location; a weather
    /// lookup failure is the caller's signal that no advisory can be given.
    pub fn resolve(&self) -> Result<WeatherReading> {
        let location = match self.fetch_location() {
            Ok(location) => location,
            Err(err) => {
                log::warn!(
                    "geolocation failed ({err:#}); defaulting to {}",
                    FALLBACK_CITY
                );
                fallback_location()
            }
        };
        let temp_c = self.fetch_temperature(&location)?;
        Ok(WeatherReading {
            city: location.city,
            temp_c,
        })
    }

    fn fetch_location(&self) -> Result<Location> {
        let body: Value = ureq::get(&self.geo_url)
            .call()
            .context("geolocation request failed")?
            .into_json()
            .context("geolocation response was not JSON")?;
        parse_location(&body)
    }

    fn fetch_temperature(&self, location: &Location) -> Result<f32> {
        let mut url = Url::parse(&self.weather_url)
            .with_context(|| format!("invalid weather endpoint '{}'", self.weather_url))?;
        url.query_pairs_mut()
            .append_pair("lat", &location.lat)
            .append_pair("lon", &location.lon)
            .append_pair("appid", &self.api_key)
            .append_pair("units", "metric");
        let body: Value = ureq::get(url.as_str())
            .call()
            .context("weather request failed")?
            .into_json()
            .context("weather response was not JSON")?;
        parse_temperature(&body)
    }
}

/// Extract coordinates and city from an ipinfo-style payload.
pub fn parse_location(body: &Value) -> Result<Location> {
    let loc = body
        .get("loc")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("geolocation response missing 'loc'"))?;
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| anyhow!("malformed 'loc' field '{}'", loc))?;
    let city = body
        .get("city")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_CITY);
    Ok(Location {
        lat: lat.trim().to_string(),
        lon: lon.trim().to_string(),
        city: city.to_string(),
    })
}

/// Extract the metric temperature from an OpenWeather-style payload.
pub fn parse_temperature(body: &Value) -> Result<f32> {
    body.get("main")
        .and_then(|main| main.get("temp"))
        .and_then(Value::as_f64)
        .map(|t| t as f32)
        .ok_or_else(|| {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("missing 'main.temp'");
            anyhow!("weather response unusable: {}", message)
        })
}
