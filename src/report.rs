//! Records produced by the collectors for a single run.

/// A display-ready metric. `numeric` carries the value used for
/// classification when the metric has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub name: String,
    pub value: String,
    pub numeric: Option<f64>,
    pub unit: Option<String>,
}

impl Reading {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            numeric: None,
            unit: None,
        }
    }

    pub fn percent(name: &str, value: impl Into<String>, percent: f64) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            numeric: Some(percent),
            unit: Some("%".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsInfo {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CpuInfo {
    pub model: String,
    pub cores: usize,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryInfo {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskMount {
    pub path: String,
    pub used_percent: f64,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub family: AddressFamily,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSessions {
    pub user: String,
    pub sessions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput {
    pub rx_bytes_per_sec: u64,
    pub tx_bytes_per_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateStatus {
    /// `host:port`
    pub endpoint: String,
    /// `YYYY-MM-DD`, UTC.
    pub expires_on: String,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub city: String,
    pub description: String,
    pub temperature_c: f64,
    pub humidity_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

/// Everything gathered in one run. `None` marks a collector that could not
/// produce a value, or a feature that was switched off.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// RFC 3339 timestamp of the run, shown in the header.
    pub generated_at: String,
    pub os: Option<OsInfo>,
    pub uptime: Option<String>,
    pub boot_time: Option<String>,
    pub cpu: Option<CpuInfo>,
    pub memory: Option<MemoryInfo>,
    pub load: Option<LoadAverage>,
    pub process_count: Option<usize>,
    pub users: Option<Vec<UserSessions>>,
    pub disks: Vec<DiskMount>,
    pub interfaces: Vec<NetworkInterface>,
    pub public_ip: Option<String>,
    pub throughput: Option<Throughput>,
    pub failed_services: Option<Vec<String>>,
    pub package_updates: Option<usize>,
    pub certificates: Vec<CertificateStatus>,
    pub weather: Option<Weather>,
    pub quote: Option<Quote>,
}

impl Report {
    pub fn new(generated_at: String) -> Self {
        Self {
            generated_at,
            ..Self::default()
        }
    }

    pub fn has_network(&self) -> bool {
        !self.interfaces.is_empty() || self.public_ip.is_some() || self.throughput.is_some()
    }

    pub fn has_enhanced(&self) -> bool {
        self.failed_services.is_some()
            || self.package_updates.is_some()
            || !self.certificates.is_empty()
            || self.weather.is_some()
    }
}
