//! Spoken weather reports: current conditions from OpenWeatherMap, turned
//! into a conversational Spanish script by a local Ollama model.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{LlmConfig, WeatherConfig};

const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

lazy_static! {
    static ref THINK_BLOCK: Regex = Regex::new(r"(?is)<think>.*?</think>").unwrap();
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    pub name: String,
    pub dt: i64,
    /// Offset from UTC in seconds
    #[serde(default)]
    pub timezone: i32,
    pub sys: Sys,
    pub main: Main,
    pub wind: Wind,
    pub clouds: Clouds,
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub visibility: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sys {
    pub country: String,
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Main {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Clouds {
    pub all: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub description: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Spell a decimal the way it is read aloud in Spanish: `12.5` becomes
/// `12 punto 50`, whole numbers drop the fraction.
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{value:.2}");
    match fixed.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => fixed.replacen('.', " punto ", 1),
    }
}

/// Local time of a unix timestamp as `HH:MM:SS del DD/MM/YYYY`.
pub fn format_timestamp(ts: i64, tz_offset: i32) -> String {
    const FORMAT: &str = "%H:%M:%S del %d/%m/%Y";
    let Some(utc) = DateTime::from_timestamp(ts, 0) else {
        return ts.to_string();
    };
    match FixedOffset::east_opt(tz_offset) {
        Some(offset) => utc.with_timezone(&offset).format(FORMAT).to_string(),
        None => utc.format(FORMAT).to_string(),
    }
}

/// Remove `<think>...</think>` reasoning blocks some models emit.
pub fn strip_think_blocks(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// Forecaster prompt built only from the measured values.
pub fn build_prompt(weather: &CurrentWeather) -> String {
    let tz = weather.timezone;
    let description = weather
        .weather
        .first()
        .map(|c| c.description.as_str())
        .unwrap_or("sin datos");

    let mut prompt = format!(
        "Eres una meteoróloga uruguaya joven y simpática. Escribe un informe del tiempo completo pero breve en español, \
         usando exclusivamente los siguientes datos ya preformateados para {city}, {country}. \
         Sé clara, fresca, natural y un poco conversacional, como si hablaras con amigos o familia. \
         Cuando menciones números decimales, usa la palabra 'punto' en vez del símbolo. \
         Haz el informe más interesante y útil para el público general, agregando explicaciones o consejos prácticos sobre el clima, pero sin inventar datos. \
         Hora local actual: {now}. \
         Salida del sol: {sunrise}. \
         Puesta del sol: {sunset}. \
         Temperatura actual: {temp} grados Celsius. \
         Sensación térmica: {feels_like} grados. \
         Temperatura mínima: {temp_min} grados, máxima: {temp_max} grados. \
         Humedad: {humidity} por ciento. \
         Viento: {wind} kilómetros por hora. \
         Nubosidad: {clouds} por ciento. \
         Condición principal: {description}. ",
        city = weather.name,
        country = weather.sys.country,
        now = format_timestamp(weather.dt, tz),
        sunrise = format_timestamp(weather.sys.sunrise, tz),
        sunset = format_timestamp(weather.sys.sunset, tz),
        temp = format_decimal(weather.main.temp),
        feels_like = format_decimal(weather.main.feels_like),
        temp_min = format_decimal(weather.main.temp_min),
        temp_max = format_decimal(weather.main.temp_max),
        humidity = weather.main.humidity,
        wind = format_decimal(weather.wind.speed),
        clouds = weather.clouds.all,
    );
    if let Some(visibility) = weather.visibility {
        prompt.push_str(&format!("Visibilidad: {visibility} metros. "));
    }
    prompt.push_str(
        "No uses ningún tipo de marcado, etiquetas, ni formato especial: solo texto plano, ya que el resultado será leído por un sistema TTS. \
         No inventes ni asumas datos que no estén explícitamente presentes arriba. \
         Redacta el informe de forma natural y humana, explicando el significado de los valores para el público general.",
    );
    prompt
}

pub async fn fetch_weather(client: &reqwest::Client, config: &WeatherConfig, api_key: &str) -> Result<CurrentWeather> {
    info!("fetching current weather for {}", config.city);
    let weather = client
        .get(OPENWEATHER_URL)
        .query(&[
            ("q", config.city.as_str()),
            ("appid", api_key),
            ("units", config.units.as_str()),
            ("lang", config.lang.as_str()),
        ])
        .send()
        .await
        .context("weather request failed")?
        .error_for_status()
        .context("weather service returned an error")?
        .json::<CurrentWeather>()
        .await
        .context("unexpected weather response")?;
    debug!(?weather, "current weather");
    Ok(weather)
}

pub async fn generate_report(client: &reqwest::Client, config: &LlmConfig, prompt: &str) -> Result<String> {
    info!("requesting report from {} ({})", config.url, config.model);
    let response = client
        .post(&config.url)
        .timeout(Duration::from_secs(config.timeout_secs))
        .json(&GenerateRequest {
            model: &config.model,
            prompt,
            stream: false,
        })
        .send()
        .await
        .with_context(|| format!("Ollama server is not reachable at {}", config.url))?
        .error_for_status()
        .context("Ollama request failed")?
        .json::<GenerateResponse>()
        .await
        .context("unexpected Ollama response")?;

    Ok(strip_think_blocks(&response.response))
}
