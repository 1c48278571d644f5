//! Turns a [`Report`] into the text blocks printed at login.

use crate::config::{BannerFont, Config, Justify, Thresholds};
use crate::report::{AddressFamily, Reading, Report};
use crate::severity::{classify_certificate, classify_reading, Severity};
use colored::{Color, Colorize};
use tracing::trace;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub reading: Reading,
    pub severity: Option<Severity>,
}

impl Row {
    fn plain(label: &str, value: impl Into<String>) -> Self {
        Self {
            reading: Reading::text(label, value),
            severity: None,
        }
    }

    fn tiered(label: &str, value: impl Into<String>, severity: Severity) -> Self {
        Self {
            reading: Reading::text(label, value),
            severity: Some(severity),
        }
    }

    /// Classified from the reading's numeric value.
    fn measured(reading: Reading, thresholds: Thresholds) -> Self {
        let severity = classify_reading(reading.numeric, thresholds);
        trace!(
            metric = %reading.name,
            value = ?reading.numeric,
            unit = reading.unit.as_deref().unwrap_or(""),
            %severity,
            "classified"
        );
        Self {
            reading,
            severity: Some(severity),
        }
    }

    fn unknown(label: &str) -> Self {
        Self::tiered(label, UNKNOWN, Severity::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub title: String,
    pub rows: Vec<Row>,
}

/// Rendered blocks in display order. Blocks without content are left out.
pub fn render(report: &Report, cfg: &Config) -> Vec<String> {
    let mut out = vec![header(report, cfg)];
    if let Some(banner) = banner(cfg) {
        out.push(banner);
    }
    let blocks = [
        Some(system_block(report, cfg)),
        disk_block(report, cfg),
        network_block(report),
        enhanced_block(report),
    ];
    out.extend(blocks.iter().flatten().map(|b| draw_block(b, cfg)));
    if let Some(quote) = quote(report, cfg) {
        out.push(quote);
    }
    out
}

pub fn render_to_string(report: &Report, cfg: &Config) -> String {
    let mut text = render(report, cfg).join("\n");
    text.push('\n');
    text
}

fn header(report: &Report, cfg: &Config) -> String {
    let title = format!("System status at {}", report.generated_at);
    format!(
        "{}\n{}",
        paint(&title, &cfg.colors.accent).bold(),
        paint(&"═".repeat(cfg.display.width), &cfg.colors.accent)
    )
}

fn banner(cfg: &Config) -> Option<String> {
    let b = &cfg.banner;
    if !cfg.features.show_banner || b.text.trim().is_empty() {
        return None;
    }
    let mut lines: Vec<String> = b.text.lines().map(|l| l.trim_end().to_string()).collect();
    if b.font == BannerFont::Framed {
        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let edge = format!("+{}+", "-".repeat(inner + 2));
        let mut framed = vec![edge.clone()];
        framed.extend(
            lines
                .iter()
                .map(|l| format!("| {:<inner$} |", l, inner = inner)),
        );
        framed.push(edge);
        lines = framed;
    }

    let width = cfg.display.width;
    let text = lines
        .iter()
        .map(|l| {
            let pad = width.saturating_sub(l.chars().count());
            let indent = match b.justify {
                Justify::Left => 0,
                Justify::Center => pad / 2,
                Justify::Right => pad,
            };
            format!("{}{}", " ".repeat(indent), paint(l, &b.style).bold())
        })
        .collect::<Vec<_>>()
        .join("\n");
    Some(text)
}

pub fn system_block(report: &Report, cfg: &Config) -> Block {
    let t = &cfg.thresholds;
    let mut rows = Vec::new();

    match &report.os {
        Some(os) => {
            rows.push(Row::plain("Hostname", &os.hostname));
            rows.push(Row::plain("OS", &os.os));
            rows.push(Row::plain("Kernel", &os.kernel));
        }
        None => rows.push(Row::unknown("Hostname")),
    }
    rows.push(match &report.uptime {
        Some(u) => Row::plain("Uptime", u),
        None => Row::unknown("Uptime"),
    });
    if let Some(boot) = &report.boot_time {
        rows.push(Row::plain("Booted", boot));
    }

    match &report.cpu {
        Some(cpu) => {
            rows.push(Row::plain(
                "CPU",
                format!("{} ({} cores)", cpu.model, cpu.cores),
            ));
            rows.push(Row::measured(
                Reading::percent(
                    "CPU usage",
                    gauge(cpu.usage_percent, cfg.display.bar_width),
                    cpu.usage_percent,
                ),
                t.cpu,
            ));
        }
        None => rows.push(Row::unknown("CPU usage")),
    }

    rows.push(match &report.memory {
        Some(m) => Row::measured(
            Reading::percent(
                "Memory",
                format!(
                    "{} {:.1} / {:.1} GB ({:.1} GB free)",
                    gauge(m.usage_percent, cfg.display.bar_width),
                    m.used_gb,
                    m.total_gb,
                    m.free_gb
                ),
                m.usage_percent,
            ),
            t.memory,
        ),
        None => Row::unknown("Memory"),
    });

    if let Some(load) = report.load {
        rows.push(Row::plain(
            "Load average",
            format!("{:.2}, {:.2}, {:.2}", load.one, load.five, load.fifteen),
        ));
    }
    if let Some(n) = report.process_count {
        rows.push(Row::plain("Processes", n.to_string()));
    }
    if let Some(users) = &report.users {
        let value = if users.is_empty() {
            "none".to_string()
        } else {
            users
                .iter()
                .map(|u| format!("{} ({})", u.user, u.sessions))
                .collect::<Vec<_>>()
                .join(", ")
        };
        rows.push(Row::plain("Users", value));
    }

    Block {
        title: "System".to_string(),
        rows,
    }
}

pub fn disk_block(report: &Report, cfg: &Config) -> Option<Block> {
    if report.disks.is_empty() {
        return None;
    }
    let rows = report
        .disks
        .iter()
        .map(|d| {
            Row::measured(
                Reading::percent(
                    &d.path,
                    format!(
                        "{} of {} ({} free)",
                        gauge(d.used_percent, cfg.display.bar_width),
                        format_bytes(d.total_bytes),
                        format_bytes(d.free_bytes)
                    ),
                    d.used_percent,
                ),
                cfg.thresholds.disk,
            )
        })
        .collect();
    Some(Block {
        title: "Disk usage".to_string(),
        rows,
    })
}

pub fn network_block(report: &Report) -> Option<Block> {
    if !report.has_network() {
        return None;
    }
    let mut rows: Vec<Row> = report
        .interfaces
        .iter()
        .map(|i| {
            let family = match i.family {
                AddressFamily::V4 => "IPv4",
                AddressFamily::V6 => "IPv6",
            };
            Row::plain(&format!("{} ({family})", i.name), &i.address)
        })
        .collect();
    if let Some(ip) = &report.public_ip {
        rows.push(Row::plain("Public IP", ip));
    }
    if let Some(t) = report.throughput {
        rows.push(Row::plain(
            "Throughput",
            format!(
                "down {}/s, up {}/s",
                format_bytes(t.rx_bytes_per_sec),
                format_bytes(t.tx_bytes_per_sec)
            ),
        ));
    }
    Some(Block {
        title: "Network".to_string(),
        rows,
    })
}

pub fn enhanced_block(report: &Report) -> Option<Block> {
    if !report.has_enhanced() {
        return None;
    }
    let mut rows = Vec::new();

    if let Some(failed) = &report.failed_services {
        if failed.is_empty() {
            rows.push(Row::tiered("Services", "All services OK", Severity::Ok));
        } else {
            rows.push(Row::tiered(
                "Failed services",
                failed.join(", "),
                Severity::Critical,
            ));
        }
    }
    if let Some(n) = report.package_updates {
        rows.push(match n {
            0 => Row::tiered("Updates", "System up to date", Severity::Ok),
            1 => Row::tiered("Updates", "1 update available", Severity::Warn),
            n => Row::tiered("Updates", format!("{n} updates available"), Severity::Warn),
        });
    }
    for cert in &report.certificates {
        rows.push(Row::tiered(
            "Certificate",
            format!(
                "{} expires {} ({} days)",
                cert.endpoint, cert.expires_on, cert.days_remaining
            ),
            classify_certificate(cert.days_remaining),
        ));
    }
    if let Some(w) = &report.weather {
        rows.push(Row::plain(
            "Weather",
            format!(
                "{}: {:.1}°C, {}, {}% humidity",
                w.city, w.temperature_c, w.description, w.humidity_percent
            ),
        ));
    }

    Some(Block {
        title: "Checks".to_string(),
        rows,
    })
}

fn quote(report: &Report, cfg: &Config) -> Option<String> {
    let q = report.quote.as_ref()?;
    let lines = wrap(&format!("\"{}\"", q.text), cfg.display.width);
    Some(format!(
        "{}\n{}",
        lines.join("\n").italic(),
        paint(&format!("  - {}", q.author), &cfg.colors.accent)
    ))
}

fn draw_block(block: &Block, cfg: &Config) -> String {
    let left = cfg.display.left_column_width;
    let value_width = cfg.display.width.saturating_sub(left + 1).max(1);
    let mut lines = vec![
        paint(&block.title, &cfg.colors.accent).bold().to_string(),
        paint(&"─".repeat(cfg.display.width), &cfg.colors.accent).to_string(),
    ];
    for row in &block.rows {
        let label = truncate(&row.reading.name, left.saturating_sub(1));
        let value = truncate(&row.reading.value, value_width);
        let value = match row.severity {
            Some(s) => paint(&value, s.color_name(&cfg.colors)).to_string(),
            None => value,
        };
        lines.push(format!("{:<left$} {}", label.bold(), value, left = left));
    }
    lines.join("\n")
}

fn paint(text: &str, color: &str) -> colored::ColoredString {
    text.color(color.parse::<Color>().unwrap_or(Color::White))
}

fn gauge(percent: f64, width: usize) -> String {
    let ratio = (percent / 100.0).clamp(0.0, 1.0);
    let filled = (ratio * width as f64).round() as usize;
    format!(
        "[{}{}] {:>5.1}%",
        "█".repeat(filled),
        "░".repeat(width.saturating_sub(filled)),
        percent
    )
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let head: String = text.chars().take(keep).collect();
    format!("{head}...")
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
