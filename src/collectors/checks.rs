use crate::collectors::{run_checked, run_command, CollectError};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_FAILED_UNITS: usize = 5;

const APT_ARGS: &[&str] = &["list", "--upgradable"];
const RPM_ARGS: &[&str] = &["check-update", "-q"];
const NO_ARGS: &[&str] = &[];

/// Names of failed systemd units, at most five. `Some(vec![])` means the
/// query worked and nothing has failed.
pub async fn failed_services(timeout: Duration) -> Option<Vec<String>> {
    let args = [
        "list-units",
        "--state=failed",
        "--no-legend",
        "--plain",
        "--no-pager",
    ];
    match run_checked("systemctl", &args, timeout).await {
        Ok(stdout) => Some(parse_failed_units(&stdout)),
        Err(CollectError::Timeout(_)) => {
            warn!(collector = "systemd", "systemctl timed out");
            None
        }
        Err(err) => {
            debug!(collector = "systemd", error = %err, "systemctl unavailable");
            None
        }
    }
}

pub fn parse_failed_units(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_start().trim_start_matches('●').trim_start();
            let cols: Vec<&str> = line.split_whitespace().collect();
            let (unit, active, sub) = (cols.first()?, cols.get(2)?, cols.get(3)?);
            (*active == "failed" || *sub == "failed").then(|| unit.to_string())
        })
        .take(MAX_FAILED_UNITS)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
}

impl PackageManager {
    /// Picks the first supported manager whose executable exists.
    pub fn detect_with(exists: impl Fn(&str) -> bool) -> Option<Self> {
        [
            ("/usr/bin/apt", Self::Apt),
            ("/usr/bin/dnf", Self::Dnf),
            ("/usr/bin/yum", Self::Yum),
            ("/usr/bin/checkupdates", Self::Pacman),
        ]
        .into_iter()
        .find(|(path, _)| exists(path))
        .map(|(_, pm)| pm)
    }

    pub fn detect() -> Option<Self> {
        Self::detect_with(|p| Path::new(p).exists())
    }

    fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Apt => ("apt", APT_ARGS),
            Self::Dnf => ("dnf", RPM_ARGS),
            Self::Yum => ("yum", RPM_ARGS),
            Self::Pacman => ("checkupdates", NO_ARGS),
        }
    }

    /// Interprets the exit code and output of [`Self::command`].
    pub fn count_updates(self, code: Option<i32>, stdout: &str) -> Result<usize, CollectError> {
        let (program, _) = self.command();
        match (self, code) {
            (Self::Apt, Some(0)) => Ok(count_apt_upgradable(stdout)),
            (Self::Dnf | Self::Yum, Some(0)) => Ok(0),
            (Self::Dnf | Self::Yum, Some(100)) => Ok(count_rpm_updates(stdout)),
            (Self::Pacman, Some(0)) => Ok(stdout.lines().filter(|l| !l.trim().is_empty()).count()),
            (Self::Pacman, Some(2)) => Ok(0),
            _ => Err(CollectError::Exit {
                program: program.to_string(),
                code,
            }),
        }
    }
}

pub async fn package_updates(timeout: Duration) -> Option<usize> {
    let Some(pm) = PackageManager::detect() else {
        debug!(collector = "updates", "no supported package manager");
        return None;
    };
    let (program, args) = pm.command();
    let result = match run_command(program, args, timeout).await {
        Ok(out) => pm.count_updates(out.code, &out.stdout),
        Err(err) => Err(err),
    };
    result
        .map_err(|err| debug!(collector = "updates", manager = ?pm, error = %err, "update check failed"))
        .ok()
}

fn count_apt_upgradable(stdout: &str) -> usize {
    stdout
        .lines()
        .filter(|l| l.contains("upgradable from"))
        .count()
}

fn count_rpm_updates(stdout: &str) -> usize {
    let lines: Vec<&str> = stdout
        .lines()
        .take_while(|l| !l.starts_with("Obsoleting Packages"))
        .collect();
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.starts_with(char::is_whitespace))
        .filter(|(i, l)| {
            // Long names wrap: version and repo move to an indented line.
            let continued = lines
                .get(i + 1)
                .is_some_and(|next| next.starts_with(char::is_whitespace) && !next.trim().is_empty());
            l.split_whitespace().count() >= 3 || continued
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_failed_units_with_and_without_marker() {
        let out = "\
● nginx.service loaded failed failed A high performance web server
cron.service    loaded failed failed Regular background program processing daemon
foo.mount       loaded active mounted Something fine
";
        assert_eq!(parse_failed_units(out), vec!["nginx.service", "cron.service"]);
    }

    #[test]
    fn failed_units_capped_at_five() {
        let out: String = (0..8)
            .map(|i| format!("unit{i}.service loaded failed failed Unit {i}\n"))
            .collect();
        let units = parse_failed_units(&out);
        assert_eq!(units.len(), 5);
        assert_eq!(units[4], "unit4.service");
    }

    #[test]
    fn empty_systemctl_output_means_all_ok() {
        assert!(parse_failed_units("").is_empty());
    }

    #[test]
    fn detects_first_available_manager() {
        let pm = PackageManager::detect_with(|p| p == "/usr/bin/dnf" || p == "/usr/bin/yum");
        assert_eq!(pm, Some(PackageManager::Dnf));
        assert_eq!(PackageManager::detect_with(|_| false), None);
    }

    #[test]
    fn counts_apt_upgradable() {
        let out = "\
Listing...
openssl/jammy-updates 3.0.2-0ubuntu1.18 amd64 [upgradable from: 3.0.2-0ubuntu1.17]
curl/jammy-updates 7.81.0-1ubuntu1.19 amd64 [upgradable from: 7.81.0-1ubuntu1.18]
";
        let n = PackageManager::Apt.count_updates(Some(0), out).expect("apt count");
        assert_eq!(n, 2);
    }

    #[test]
    fn counts_dnf_updates_from_exit_100() {
        let out = "\n\
kernel.x86_64            5.14.0-427.el9       baseos
openssl.x86_64           1:3.0.7-27.el9       baseos
Obsoleting Packages
grub2-tools.x86_64       1:2.06-77.el9        baseos
";
        assert!(out.starts_with("\nkernel"));
        assert_eq!(PackageManager::Dnf.count_updates(Some(100), out).expect("dnf"), 2);
        assert_eq!(PackageManager::Yum.count_updates(Some(0), "").expect("yum"), 0);
        assert!(PackageManager::Dnf.count_updates(Some(1), "").is_err());
    }

    #[test]
    fn counts_dnf_rows_wrapped_onto_two_lines() {
        let out = "
kernel.x86_64                                5.14.0-427.el9     baseos
python3-some-really-long-package-name.noarch
                                             1.2.3-4.el9        appstream
vim-enhanced.x86_64                          2:8.2.2637-20.el9  appstream
";
        assert_eq!(PackageManager::Dnf.count_updates(Some(100), out).expect("dnf"), 3);
    }

    #[test]
    fn pacman_exit_two_means_none() {
        assert_eq!(PackageManager::Pacman.count_updates(Some(2), "").expect("pacman"), 0);
        assert_eq!(
            PackageManager::Pacman
                .count_updates(Some(0), "linux 6.1 -> 6.2\nvim 9.0 -> 9.1\n")
                .expect("pacman"),
            2
        );
    }
}
