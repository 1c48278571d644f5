use crate::collectors::CollectError;
use crate::report::Weather;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    name: String,
    main: ApiMain,
    #[serde(default)]
    weather: Vec<ApiCondition>,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    description: String,
}

pub async fn current_weather(
    client: &Client,
    api_key: &str,
    city: &str,
    timeout: Duration,
) -> Option<Weather> {
    if api_key.trim().is_empty() || city.trim().is_empty() {
        debug!(collector = "weather", "api key or city not configured");
        return None;
    }
    fetch(client, api_key, city, timeout)
        .await
        .map_err(|err| debug!(collector = "weather", city, error = %err, "weather lookup failed"))
        .ok()
}

async fn fetch(
    client: &Client,
    api_key: &str,
    city: &str,
    timeout: Duration,
) -> Result<Weather, CollectError> {
    let body = client
        .get(ENDPOINT)
        .query(&[("q", city), ("appid", api_key), ("units", "metric")])
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    parse_weather(&body)
}

pub fn parse_weather(body: &str) -> Result<Weather, CollectError> {
    let resp: ApiResponse =
        serde_json::from_str(body).map_err(|err| CollectError::Parse(err.to_string()))?;
    let description = resp
        .weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .unwrap_or_else(|| "n/a".to_string());
    Ok(Weather {
        city: resp.name,
        description,
        temperature_c: resp.main.temp,
        humidity_percent: resp.main.humidity,
    })
}
