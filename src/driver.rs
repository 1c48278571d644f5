use crate::collectors::{checks, network, sessions, system, tls, weather};
use crate::config::Config;
use crate::quotes;
use crate::report::Report;
use reqwest::Client;
use std::future::Future;
use std::time::{Duration, SystemTime};
use tokio::task;
use tokio::time;
use tracing::{debug, warn};

/// Budget for collectors that only read local counters.
const LOCAL_TIMEOUT: Duration = Duration::from_secs(5);
const CERT_TIMEOUT_MARGIN: Duration = Duration::from_millis(500);

/// Runs one collector under its own timeout. A timed-out collector is
/// dropped (which also kills any child process it spawned) and reported as
/// unavailable; siblings are unaffected.
pub async fn probe<T, F>(name: &'static str, timeout: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Option<T>>,
{
    match time::timeout(timeout, fut).await {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            debug!(collector = name, "collector returned no data");
            None
        }
        Err(_elapsed) => {
            warn!(
                collector = name,
                timeout_ms = timeout.as_millis() as u64,
                "collector timed out"
            );
            None
        }
    }
}

/// [`probe`] for synchronous collectors, which run on the blocking pool.
async fn probe_blocking<T, F>(name: &'static str, timeout: Duration, f: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> Option<T> + Send + 'static,
{
    probe(name, timeout, async move {
        task::spawn_blocking(f)
            .await
            .map_err(|err| warn!(collector = name, error = %err, "collector task failed"))
            .ok()
            .flatten()
    })
    .await
}

/// Skips the collector entirely when its feature is switched off.
async fn when<T, F>(enabled: bool, fut: F) -> Option<T>
where
    F: Future<Output = Option<T>>,
{
    if enabled {
        fut.await
    } else {
        None
    }
}

pub async fn collect(cfg: &Config) -> Report {
    let client = Client::builder()
        .user_agent(concat!("motdstat/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new());
    let features = &cfg.features;
    let timeouts = &cfg.timeouts_ms;
    let cert_host = if cfg.certificates.host.trim().is_empty() {
        system::host_name().unwrap_or_else(|| "localhost".to_string())
    } else {
        cfg.certificates.host.trim().to_string()
    };
    let cert_budget =
        timeouts.certificate() * cfg.certificates.ports.len().max(1) as u32 + CERT_TIMEOUT_MARGIN;

    let (
        (os, uptime, boot_time, cpu, memory, load, process_count),
        (disks, interfaces, users, public_ip, throughput),
        (failed_services, package_updates, certificates, weather),
    ) = tokio::join!(
        async {
            tokio::join!(
                probe_blocking("os", LOCAL_TIMEOUT, system::os_info),
                probe_blocking("uptime", LOCAL_TIMEOUT, system::uptime),
                probe_blocking("boot_time", LOCAL_TIMEOUT, system::boot_time),
                probe_blocking("cpu", LOCAL_TIMEOUT, system::cpu),
                probe_blocking("memory", LOCAL_TIMEOUT, system::memory),
                probe_blocking("load", LOCAL_TIMEOUT, system::load_average),
                probe_blocking("processes", LOCAL_TIMEOUT, system::process_count),
            )
        },
        async {
            tokio::join!(
                probe_blocking("disk", LOCAL_TIMEOUT, || Some(system::disk_usage())),
                probe(
                    "interfaces",
                    timeouts.command(),
                    network::interfaces(timeouts.command())
                ),
                probe(
                    "users",
                    timeouts.command(),
                    sessions::logged_in_users(timeouts.command())
                ),
                when(
                    features.show_public_ip,
                    probe(
                        "public_ip",
                        timeouts.public_ip(),
                        network::public_ip(&client, &cfg.network.public_ip_url, timeouts.public_ip()),
                    )
                ),
                when(
                    features.show_network_speed,
                    probe_blocking("network_speed", LOCAL_TIMEOUT, system::network_throughput)
                ),
            )
        },
        async {
            tokio::join!(
                when(
                    features.show_systemd,
                    probe(
                        "systemd",
                        timeouts.systemd(),
                        checks::failed_services(timeouts.systemd())
                    )
                ),
                when(
                    features.show_updates,
                    probe(
                        "updates",
                        timeouts.updates(),
                        checks::package_updates(timeouts.updates())
                    )
                ),
                when(
                    features.show_ssl_certs,
                    probe("certificates", cert_budget, async {
                        Some(
                            tls::certificate_expiry(
                                &cert_host,
                                &cfg.certificates.ports,
                                timeouts.certificate(),
                            )
                            .await,
                        )
                    })
                ),
                when(
                    features.show_weather,
                    probe(
                        "weather",
                        timeouts.weather(),
                        weather::current_weather(
                            &client,
                            &cfg.weather.api_key,
                            &cfg.weather.city,
                            timeouts.weather(),
                        )
                    )
                ),
            )
        },
    );

    let mut report = Report::new(timestamp(SystemTime::now()));
    report.os = os;
    report.uptime = uptime;
    report.boot_time = boot_time;
    report.cpu = cpu;
    report.memory = memory;
    report.load = load;
    report.process_count = process_count;
    report.users = users;
    report.disks = disks.unwrap_or_default();
    report.interfaces = interfaces.unwrap_or_default();
    report.public_ip = public_ip;
    report.throughput = throughput;
    report.failed_services = failed_services;
    report.package_updates = package_updates;
    report.certificates = certificates.unwrap_or_default();
    report.weather = weather;
    if features.show_quote {
        report.quote = quotes::pick(quotes::time_seed());
    }

    debug!(
        disks = report.disks.len(),
        interfaces = report.interfaces.len(),
        certificates = report.certificates.len(),
        "collection finished"
    );
    report
}

pub fn timestamp(at: SystemTime) -> String {
    humantime::format_rfc3339_seconds(at).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant, UNIX_EPOCH};

    #[tokio::test]
    async fn stuck_collector_does_not_hold_back_siblings() {
        let started = Instant::now();
        let (stuck, fast) = tokio::join!(
            probe("stuck", Duration::from_millis(100), std::future::pending::<Option<u32>>()),
            probe("fast", Duration::from_secs(5), async { Some(7_u32) }),
        );
        assert_eq!(stuck, None);
        assert_eq!(fast, Some(7));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn blocking_collector_that_overruns_is_unavailable() {
        let started = Instant::now();
        let out = probe_blocking("slow", Duration::from_millis(100), || {
            std::thread::sleep(Duration::from_millis(600));
            Some(1_u8)
        })
        .await;
        assert_eq!(out, None);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn panicking_collector_is_unavailable() {
        let out: Option<u8> =
            probe_blocking("boom", Duration::from_secs(1), || panic!("probe exploded")).await;
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn disabled_feature_never_runs() {
        let out = when(false, async { Some(1) }).await;
        assert_eq!(out, None);
        assert_eq!(when(true, async { Some(2) }).await, Some(2));
    }

    #[tokio::test]
    async fn collect_with_enrichment_disabled_still_produces_report() {
        let mut cfg = Config::default();
        cfg.features.show_public_ip = false;
        cfg.features.show_systemd = false;
        cfg.features.show_updates = false;
        cfg.features.show_ssl_certs = false;
        cfg.features.show_quote = true;

        let report = collect(&cfg).await;
        assert!(!report.generated_at.is_empty());
        assert!(report.public_ip.is_none());
        assert!(report.failed_services.is_none());
        assert!(report.package_updates.is_none());
        assert!(report.certificates.is_empty());
        assert!(report.quote.is_some());
    }

    #[test]
    fn timestamp_is_rfc3339() {
        assert_eq!(timestamp(UNIX_EPOCH), "1970-01-01T00:00:00Z");
    }
}
