use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use devman_shared::device::Device;
use devman_shared::tags::TagAction;
use once_cell::sync::Lazy;

use crate::admin::TagUpdate;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

const WIDTH_ID: usize = 18;
const WIDTH_HOST: usize = 24;
const WIDTH_OS: usize = 10;
const WIDTH_LAST: usize = 14;

static ANSI: Lazy<bool> = Lazy::new(|| std::io::stdout().is_terminal());

fn paint(code: &str, s: &str, ansi: bool) -> String {
    if ansi {
        format!("{code}{s}{RESET}")
    } else {
        s.to_string()
    }
}

fn visible_len(s: &str) -> usize {
    // strip ANSI CSI sequences: \x1b[ ... m
    let mut n = 0usize;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for x in chars.by_ref() {
                if x == 'm' {
                    break;
                }
            }
            continue;
        }
        n += 1;
    }
    n
}

fn pad_cell(s: &str, width: usize) -> String {
    let vis = visible_len(s);
    if vis >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - vis))
    }
}

fn row(cells: [&str; 4], tail: &str) -> String {
    format!(
        "{} {} {} {} {}",
        pad_cell(cells[0], WIDTH_ID),
        pad_cell(cells[1], WIDTH_HOST),
        pad_cell(cells[2], WIDTH_OS),
        pad_cell(cells[3], WIDTH_LAST),
        tail
    )
    .trim_end()
    .to_string()
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max.saturating_sub(3)).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Format a timestamp relative to `now` (e.g., "2 min ago", "3 days ago")
pub fn format_relative_time(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(time);

    let secs = duration.num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    if secs < 60 {
        return format!("{} sec ago", secs);
    }

    let mins = duration.num_minutes();
    if mins < 60 {
        return format!("{} min ago", mins);
    }

    let hours = duration.num_hours();
    if hours < 24 {
        return format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" });
    }

    let days = duration.num_days();
    if days < 30 {
        return format!("{} day{} ago", days, if days == 1 { "" } else { "s" });
    }

    let months = days / 30;
    if months < 12 {
        return format!("{} month{} ago", months, if months == 1 { "" } else { "s" });
    }

    let years = days / 365;
    format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
}

pub fn render_devices_table(devices: &[Device], now: DateTime<Utc>, ansi: bool) -> String {
    if devices.is_empty() {
        return paint(DIM, "No devices found", ansi);
    }

    let mut lines = Vec::with_capacity(devices.len() + 2);
    lines.push(paint(BOLD, "Devices", ansi));
    lines.push(format!(
        "  {}",
        row(
            [
                &paint(DIM, "ID", ansi),
                &paint(DIM, "HOSTNAME", ansi),
                &paint(DIM, "OS", ansi),
                &paint(DIM, "LAST SEEN", ansi),
            ],
            &paint(DIM, "TAGS", ansi),
        )
    ));

    for dev in devices {
        let host = truncate_str(&dev.hostname, WIDTH_HOST - 1);
        let os = truncate_str(&dev.os, WIDTH_OS - 1);
        let last_seen = format_relative_time(dev.last_seen, now);
        let tags = if dev.tags.is_empty() {
            paint(DIM, "-", ansi)
        } else {
            paint(CYAN, &dev.tags.join(","), ansi)
        };

        lines.push(format!(
            "  {}",
            row([&dev.id, &host, &os, &last_seen], &tags)
        ));
    }

    lines.join("\n")
}

pub fn print_devices_table(devices: &[Device], now: DateTime<Utc>) {
    println!("{}", render_devices_table(devices, now, *ANSI));
}

pub fn render_tags(device_id: &str, tags: &[String], ansi: bool) -> String {
    if tags.is_empty() {
        return format!("Device {device_id} has no tags.");
    }
    let mut out = format!("Tags for device {}:", paint(BOLD, device_id, ansi));
    for tag in tags {
        out.push_str(&format!("\n  {}", paint(CYAN, tag, ansi)));
    }
    out
}

pub fn print_tags(device_id: &str, tags: &[String]) {
    println!("{}", render_tags(device_id, tags, *ANSI));
}

/// Acknowledgement for one removed device, printed as soon as the registry confirms it.
pub fn render_removal(device: &Device, ansi: bool) -> String {
    format!(
        "Device {} removed successfully. {}",
        paint(GREEN, &device.id, ansi),
        paint(
            DIM,
            &format!("({}, Last seen: {})", device.hostname, device.last_seen),
            ansi
        )
    )
}

pub fn print_removal(device: &Device) {
    println!("{}", render_removal(device, *ANSI));
}

pub fn render_removed(removed: &[Device], days: u32) -> String {
    format!(
        "Removed {} device(s) older than {} days.",
        removed.len(),
        days
    )
}

pub fn print_removed(removed: &[Device], days: u32) {
    println!("{}", render_removed(removed, days));
}

pub fn render_tag_update(update: &TagUpdate, ansi: bool) -> String {
    let mut out = if update.changed.is_empty() {
        match update.action {
            TagAction::Add => "No new tags were added.".to_string(),
            TagAction::Remove => "No tags were removed.".to_string(),
        }
    } else {
        let verb = match update.action {
            TagAction::Add => "Added",
            TagAction::Remove => "Removed",
        };
        format!(
            "{verb} tags on device {}: {}",
            update.device_id,
            paint(GREEN, &update.changed.to_string(), ansi)
        )
    };

    let current = if update.current.is_empty() {
        paint(YELLOW, "none", ansi)
    } else {
        paint(CYAN, &update.current.to_string(), ansi)
    };
    out.push_str(&format!("\nCurrent tags: {current}"));
    out
}

pub fn print_tag_update(update: &TagUpdate) {
    println!("{}", render_tag_update(update, *ANSI));
}

pub fn print_search_results(term: &str, devices: &[Device], now: DateTime<Utc>) {
    if devices.is_empty() {
        println!("No devices found matching '{term}'.");
    } else {
        print_devices_table(devices, now);
    }
}
