use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub banner: BannerConfig,
    pub colors: ColorConfig,
    pub features: FeatureToggles,
    pub thresholds: ThresholdsConfig,
    pub weather: WeatherConfig,
    pub timeouts_ms: TimeoutsConfig,
    pub network: NetworkConfig,
    pub certificates: CertificatesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub left_column_width: usize,
    pub bar_width: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerFont {
    Plain,
    Framed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BannerConfig {
    pub text: String,
    pub font: BannerFont,
    pub justify: Justify,
    pub style: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColorConfig {
    pub ok: String,
    pub warn: String,
    pub critical: String,
    pub unknown: String,
    pub accent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureToggles {
    pub show_banner: bool,
    pub show_quote: bool,
    pub show_weather: bool,
    pub show_systemd: bool,
    pub show_network_speed: bool,
    pub show_ssl_certs: bool,
    pub show_updates: bool,
    pub show_public_ip: bool,
}

/// Warn/critical pair for one metric, both in percent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    pub warn: f64,
    pub critical: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub cpu: Thresholds,
    pub memory: Thresholds,
    pub disk: Thresholds,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: String,
    pub city: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub public_ip: u64,
    pub systemd: u64,
    pub updates: u64,
    pub certificate: u64,
    pub weather: u64,
    pub command: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub public_ip_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CertificatesConfig {
    /// Empty means the local host name.
    pub host: String,
    pub ports: Vec<u16>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            left_column_width: default_left_column_width(),
            bar_width: default_bar_width(),
        }
    }
}

impl Default for BannerConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: BannerFont::Plain,
            justify: Justify::Left,
            style: "cyan".to_string(),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            ok: "green".to_string(),
            warn: "yellow".to_string(),
            critical: "red".to_string(),
            unknown: "bright black".to_string(),
            accent: "cyan".to_string(),
        }
    }
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            show_banner: false,
            show_quote: true,
            show_weather: false,
            show_systemd: true,
            show_network_speed: false,
            show_ssl_certs: true,
            show_updates: true,
            show_public_ip: true,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warn: default_warn_percent(),
            critical: default_critical_percent(),
        }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            cpu: Thresholds::default(),
            memory: Thresholds::default(),
            disk: Thresholds::default(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            public_ip: 3_000,
            systemd: 5_000,
            updates: 10_000,
            certificate: 3_000,
            weather: 5_000,
            command: 3_000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            public_ip_url: "https://api.ipify.org".to_string(),
        }
    }
}

impl Default for CertificatesConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            ports: vec![443, 8443],
        }
    }
}

impl TimeoutsConfig {
    pub fn public_ip(&self) -> Duration {
        Duration::from_millis(self.public_ip)
    }

    pub fn systemd(&self) -> Duration {
        Duration::from_millis(self.systemd)
    }

    pub fn updates(&self) -> Duration {
        Duration::from_millis(self.updates)
    }

    pub fn certificate(&self) -> Duration {
        Duration::from_millis(self.certificate)
    }

    pub fn weather(&self) -> Duration {
        Duration::from_millis(self.weather)
    }

    pub fn command(&self) -> Duration {
        Duration::from_millis(self.command)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    /// Loads the config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = match fs::read_to_string(path_ref) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path_display, "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path_display,
                    source,
                })
            }
        };

        Self::from_yaml(&text, &path_display)
    }

    pub fn from_yaml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        // An empty document is valid and means "all defaults".
        let cfg: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })?
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 {
            return Err(ConfigError::Validation(
                "display.width must be > 0".to_string(),
            ));
        }
        if self.display.left_column_width == 0
            || self.display.left_column_width >= self.display.width
        {
            return Err(ConfigError::Validation(
                "display.left_column_width must be in 1..display.width".to_string(),
            ));
        }
        if self.display.bar_width == 0 {
            return Err(ConfigError::Validation(
                "display.bar_width must be > 0".to_string(),
            ));
        }

        validate_thresholds("cpu", &self.thresholds.cpu)?;
        validate_thresholds("memory", &self.thresholds.memory)?;
        validate_thresholds("disk", &self.thresholds.disk)?;
        validate_timeouts(&self.timeouts_ms)?;

        if self.features.show_public_ip && self.network.public_ip_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "network.public_ip_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_thresholds(metric: &str, t: &Thresholds) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&t.warn) || !(0.0..=100.0).contains(&t.critical) {
        return Err(ConfigError::Validation(format!(
            "thresholds.{metric} values must be in range 0..100"
        )));
    }
    if t.warn >= t.critical {
        return Err(ConfigError::Validation(format!(
            "thresholds.{metric}.warn must be lower than critical"
        )));
    }
    Ok(())
}

fn validate_timeouts(t: &TimeoutsConfig) -> Result<(), ConfigError> {
    let all = [
        ("public_ip", t.public_ip),
        ("systemd", t.systemd),
        ("updates", t.updates),
        ("certificate", t.certificate),
        ("weather", t.weather),
        ("command", t.command),
    ];
    for (name, value) in all {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "timeouts_ms.{name} must be > 0"
            )));
        }
    }
    Ok(())
}

const fn default_width() -> usize {
    80
}

const fn default_left_column_width() -> usize {
    20
}

const fn default_bar_width() -> usize {
    20
}

const fn default_warn_percent() -> f64 {
    70.0
}

const fn default_critical_percent() -> f64 {
    85.0
}
