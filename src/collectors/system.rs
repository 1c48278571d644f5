use crate::report::{CpuInfo, DiskMount, LoadAverage, MemoryInfo, OsInfo, Throughput};
use std::collections::HashSet;
use std::fs;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};
use sysinfo::{CpuExt, DiskExt, NetworkExt, NetworksExt, System, SystemExt};
use tracing::debug;

const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);
const NET_SAMPLE_WINDOW: Duration = Duration::from_secs(1);
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Mounts at or below these paths are never reported.
const DENIED_MOUNT_PREFIXES: &[&str] = &[
    "/snap",
    "/boot/efi",
    "/run",
    "/dev",
    "/sys",
    "/proc",
    "/var/lib/docker",
];

const PSEUDO_FILESYSTEMS: &[&str] = &[
    "tmpfs", "devtmpfs", "squashfs", "overlay", "proc", "sysfs", "cgroup", "cgroup2",
];

/// Mounts at or below this usage are hidden, except `/`.
const DISK_USAGE_FLOOR_PERCENT: f64 = 5.0;

pub fn uptime() -> Option<String> {
    let system = System::new();
    match system.uptime() {
        0 => {
            debug!(collector = "uptime", "uptime not reported");
            None
        }
        secs => Some(format_uptime(secs)),
    }
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| {
            if n == 1 {
                format!("{n} {unit}")
            } else {
                format!("{n} {unit}s")
            }
        })
        .collect();

    if parts.is_empty() {
        "less than a minute".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn boot_time() -> Option<String> {
    let system = System::new();
    let boot = system.boot_time();
    if boot == 0 {
        debug!(collector = "boot_time", "boot time not reported");
        return None;
    }
    let at = UNIX_EPOCH + Duration::from_secs(boot);
    Some(humantime::format_rfc3339_seconds(at).to_string())
}

pub fn host_name() -> Option<String> {
    System::new().host_name()
}

pub fn os_info() -> Option<OsInfo> {
    let system = System::new();
    let hostname = system.host_name()?;
    let os = system
        .long_os_version()
        .or_else(|| system.name())
        .unwrap_or_else(|| "Unknown".to_string());
    let kernel = system
        .kernel_version()
        .unwrap_or_else(|| "Unknown".to_string());

    Some(OsInfo {
        hostname,
        os,
        kernel,
    })
}

/// Blocks for the sampling window; run it off the async threads.
pub fn cpu() -> Option<CpuInfo> {
    let mut system = System::new();
    system.refresh_cpu();
    thread::sleep(CPU_SAMPLE_WINDOW);
    system.refresh_cpu();

    let cpus = system.cpus();
    if cpus.is_empty() {
        debug!(collector = "cpu", "no cpus reported");
        return None;
    }

    let sum: f32 = cpus.iter().map(|c| c.cpu_usage()).sum();
    let usage_percent = (sum / cpus.len() as f32) as f64;
    let model = cpus
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "Unknown CPU".to_string());

    Some(CpuInfo {
        model,
        cores: cpus.len(),
        usage_percent,
    })
}

pub fn memory() -> Option<MemoryInfo> {
    let mut system = System::new();
    system.refresh_memory();
    memory_from_bytes(system.total_memory(), system.available_memory())
}

fn memory_from_bytes(total: u64, available: u64) -> Option<MemoryInfo> {
    if total == 0 {
        debug!(collector = "memory", "total memory is zero");
        return None;
    }
    let used = total.saturating_sub(available);
    Some(MemoryInfo {
        total_gb: round1(total as f64 / BYTES_PER_GB),
        used_gb: round1(used as f64 / BYTES_PER_GB),
        free_gb: round1(available.min(total) as f64 / BYTES_PER_GB),
        usage_percent: used as f64 / total as f64 * 100.0,
    })
}

/// One mounted filesystem as reported by the OS, before filtering.
#[derive(Debug, Clone)]
pub struct RawMount {
    pub path: String,
    pub fs_type: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

pub fn disk_usage() -> Vec<DiskMount> {
    let mut system = System::new();
    system.refresh_disks_list();
    system.refresh_disks();

    let raw: Vec<RawMount> = system
        .disks()
        .iter()
        .map(|d| RawMount {
            path: d.mount_point().to_string_lossy().to_string(),
            fs_type: String::from_utf8_lossy(d.file_system()).to_string(),
            total_bytes: d.total_space(),
            available_bytes: d.available_space(),
        })
        .collect();
    debug!(collector = "disk", mounts = raw.len(), "mounts enumerated");

    filter_mounts(raw)
}

/// Drops denylisted, pseudo and near-empty mounts and sorts the rest by
/// usage, highest first.
pub fn filter_mounts(raw: Vec<RawMount>) -> Vec<DiskMount> {
    let mut seen = HashSet::new();
    let mut out: Vec<DiskMount> = raw
        .into_iter()
        .filter(|m| m.total_bytes > 0)
        .filter(|m| seen.insert(m.path.clone()))
        .map(|m| {
            let used = m.total_bytes.saturating_sub(m.available_bytes);
            let is_pseudo = PSEUDO_FILESYSTEMS.contains(&m.fs_type.as_str());
            (
                DiskMount {
                    used_percent: used as f64 / m.total_bytes as f64 * 100.0,
                    total_bytes: m.total_bytes,
                    used_bytes: used,
                    free_bytes: m.total_bytes - used,
                    path: m.path,
                },
                is_pseudo,
            )
        })
        .filter(|(d, is_pseudo)| {
            if d.path == "/" {
                return true;
            }
            !is_pseudo && !is_denied_mount(&d.path) && d.used_percent > DISK_USAGE_FLOOR_PERCENT
        })
        .map(|(d, _)| d)
        .collect();

    out.sort_by(|a, b| b.used_percent.total_cmp(&a.used_percent));
    out
}

fn is_denied_mount(path: &str) -> bool {
    DENIED_MOUNT_PREFIXES.iter().any(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

pub fn load_average() -> Option<LoadAverage> {
    let avg = System::new().load_average();
    // sysinfo reports zeros both for an idle box and for an unreadable source.
    let readable = cfg!(target_os = "linux") && fs::read_to_string("/proc/loadavg").is_ok();
    load_reading(avg.one, avg.five, avg.fifteen, readable)
}

fn load_reading(one: f64, five: f64, fifteen: f64, source_readable: bool) -> Option<LoadAverage> {
    if one == 0.0 && five == 0.0 && fifteen == 0.0 && !source_readable {
        debug!(collector = "load", "load average unavailable");
        return None;
    }
    Some(LoadAverage { one, five, fifteen })
}

pub fn process_count() -> Option<usize> {
    let mut system = System::new();
    system.refresh_processes();
    match system.processes().len() {
        0 => None,
        n => Some(n),
    }
}

/// Blocks for the sampling window; run it off the async threads.
pub fn network_throughput() -> Option<Throughput> {
    let mut system = System::new();
    system.refresh_networks_list();
    let before = network_totals(&system);
    thread::sleep(NET_SAMPLE_WINDOW);
    system.refresh_networks();
    let after = network_totals(&system);

    if system.networks().iter().next().is_none() {
        debug!(collector = "network_speed", "no interfaces reported");
        return None;
    }

    let secs = NET_SAMPLE_WINDOW.as_secs().max(1);
    Some(Throughput {
        rx_bytes_per_sec: after.0.saturating_sub(before.0) / secs,
        tx_bytes_per_sec: after.1.saturating_sub(before.1) / secs,
    })
}

fn network_totals(system: &System) -> (u64, u64) {
    system
        .networks()
        .iter()
        .filter(|(iface, _)| iface.as_str() != "lo")
        .fold((0, 0), |(rx, tx), (_, data)| {
            (rx + data.total_received(), tx + data.total_transmitted())
        })
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    fn mount(path: &str, fs_type: &str, used_percent: u64) -> RawMount {
        let total = 100 * GB;
        RawMount {
            path: path.to_string(),
            fs_type: fs_type.to_string(),
            total_bytes: total,
            available_bytes: total - used_percent * GB,
        }
    }

    #[test]
    fn all_zero_load_without_a_source_is_unavailable() {
        assert_eq!(load_reading(0.0, 0.0, 0.0, false), None);
        let idle = load_reading(0.0, 0.0, 0.0, true).expect("idle host");
        assert_eq!(idle.fifteen, 0.0);
        let busy = load_reading(1.5, 0.75, 0.25, false).expect("busy host");
        assert_eq!(busy.one, 1.5);
    }

    #[test]
    fn uptime_phrasing() {
        assert_eq!(format_uptime(30), "less than a minute");
        assert_eq!(format_uptime(60), "1 minute");
        assert_eq!(format_uptime(3_600), "1 hour");
        assert_eq!(format_uptime(2 * 86_400 + 5 * 60), "2 days, 5 minutes");
        assert_eq!(
            format_uptime(86_400 + 2 * 3_600 + 60),
            "1 day, 2 hours, 1 minute"
        );
    }

    #[test]
    fn denylisted_mount_excluded_even_when_busy() {
        let out = filter_mounts(vec![mount("/snap/core/123", "ext4", 50)]);
        assert!(out.is_empty());
    }

    #[test]
    fn usage_floor_applies_to_regular_mounts() {
        let out = filter_mounts(vec![mount("/data", "ext4", 4), mount("/srv", "ext4", 6)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "/srv");
    }

    #[test]
    fn root_always_included() {
        let out = filter_mounts(vec![mount("/", "overlay", 1)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "/");
    }

    #[test]
    fn pseudo_filesystems_excluded() {
        let out = filter_mounts(vec![mount("/mnt/ram", "tmpfs", 40)]);
        assert!(out.is_empty());
    }

    #[test]
    fn prefix_match_respects_path_components() {
        let out = filter_mounts(vec![mount("/runner", "ext4", 30), mount("/run/user/1000", "ext4", 30)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, "/runner");
    }

    #[test]
    fn sorted_by_usage_descending_and_deduplicated() {
        let out = filter_mounts(vec![
            mount("/", "ext4", 20),
            mount("/var", "ext4", 71),
            mount("/home", "ext4", 45),
            mount("/var", "ext4", 10),
        ]);
        let paths: Vec<&str> = out.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/var", "/home", "/"]);
        assert_eq!(out[0].used_bytes, 71 * GB);
        assert_eq!(out[0].free_bytes, 29 * GB);
    }

    #[test]
    fn memory_figures_are_rounded_gigabytes() {
        let info = memory_from_bytes(8 * GB, 6 * GB).expect("memory info");
        assert_eq!(info.total_gb, 8.0);
        assert_eq!(info.used_gb, 2.0);
        assert_eq!(info.free_gb, 6.0);
        assert_eq!(info.usage_percent, 25.0);
        assert!(memory_from_bytes(0, 0).is_none());
    }
}
