use crate::collectors::{run_checked, CollectError};
use crate::report::{AddressFamily, NetworkInterface};
use reqwest::Client;
use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

const IPV6_DISPLAY_CHARS: usize = 20;

pub async fn interfaces(timeout: Duration) -> Option<Vec<NetworkInterface>> {
    match run_checked("ip", &["-o", "addr", "show"], timeout).await {
        Ok(stdout) => Some(parse_ip_addr(&stdout)),
        Err(err) => {
            debug!(collector = "interfaces", error = %err, "ip addr failed");
            None
        }
    }
}

/// Parses `ip -o addr show`. Keeps the first address of each family per
/// interface and skips loopback.
pub fn parse_ip_addr(output: &str) -> Vec<NetworkInterface> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for line in output.lines() {
        let mut cols = line.split_whitespace().skip(1);
        let (Some(name), Some(family), Some(cidr)) = (cols.next(), cols.next(), cols.next())
        else {
            continue;
        };
        let name = name.split('@').next().unwrap_or(name).trim_end_matches(':');
        if name == "lo" {
            continue;
        }
        let family = match family {
            "inet" => AddressFamily::V4,
            "inet6" => AddressFamily::V6,
            _ => continue,
        };
        let address = cidr.split('/').next().unwrap_or(cidr);
        if address.parse::<IpAddr>().is_err() {
            continue;
        }
        if !seen.insert((name.to_string(), family)) {
            continue;
        }

        let address = match family {
            AddressFamily::V4 => address.to_string(),
            AddressFamily::V6 => shorten_ipv6(address),
        };
        out.push(NetworkInterface {
            name: name.to_string(),
            family,
            address,
        });
    }

    out
}

pub fn shorten_ipv6(address: &str) -> String {
    if address.chars().count() <= IPV6_DISPLAY_CHARS {
        return address.to_string();
    }
    let head: String = address.chars().take(IPV6_DISPLAY_CHARS).collect();
    format!("{head}...")
}

pub async fn public_ip(client: &Client, url: &str, timeout: Duration) -> Option<String> {
    fetch_public_ip(client, url, timeout)
        .await
        .map_err(|err| debug!(collector = "public_ip", url, error = %err, "lookup failed"))
        .ok()
}

async fn fetch_public_ip(client: &Client, url: &str, timeout: Duration) -> Result<String, CollectError> {
    let body = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let candidate = body.trim();
    candidate
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| CollectError::Parse(format!("not an IP address: {candidate:.40}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP_OUTPUT: &str = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
1: lo    inet6 ::1/128 scope host \\       valid_lft forever preferred_lft forever
2: eth0    inet 192.168.1.20/24 brd 192.168.1.255 scope global dynamic eth0\\       valid_lft 85000sec preferred_lft 85000sec
2: eth0    inet 192.168.1.21/24 brd 192.168.1.255 scope global secondary eth0\\       valid_lft forever preferred_lft forever
2: eth0    inet6 2001:db8:abcd:12:a00:27ff:fe4e:66a1/64 scope global dynamic \\       valid_lft 3000sec preferred_lft 3000sec
5: veth1a2b@if4    inet6 fe80::1/64 scope link \\       valid_lft forever preferred_lft forever
";

    #[test]
    fn parses_non_loopback_interfaces() {
        let ifaces = parse_ip_addr(IP_OUTPUT);
        assert_eq!(ifaces.len(), 3);

        assert_eq!(ifaces[0].name, "eth0");
        assert_eq!(ifaces[0].family, AddressFamily::V4);
        assert_eq!(ifaces[0].address, "192.168.1.20");

        assert_eq!(ifaces[1].family, AddressFamily::V6);
        assert_eq!(ifaces[1].address, "2001:db8:abcd:12:a00...");

        assert_eq!(ifaces[2].name, "veth1a2b");
        assert_eq!(ifaces[2].address, "fe80::1");
    }

    #[test]
    fn ignores_garbage_lines() {
        assert!(parse_ip_addr("garbage\n\n3: wlan0 link/ether aa:bb\n").is_empty());
    }

    #[test]
    fn short_ipv6_left_alone() {
        assert_eq!(shorten_ipv6("fe80::1"), "fe80::1");
        assert_eq!(shorten_ipv6("12345678901234567890"), "12345678901234567890");
        assert_eq!(shorten_ipv6("123456789012345678901"), "12345678901234567890...");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let client = Client::new();
        let ip = public_ip(&client, "http://127.0.0.1:9/", Duration::from_millis(500)).await;
        assert!(ip.is_none());
    }
}
