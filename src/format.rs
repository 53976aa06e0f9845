use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::system::Snapshot;

const NAME_WIDTH: usize = 24;

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

fn pad_unicode(s: &str, width: usize) -> String {
    let truncated = truncate_unicode(s, width);
    let fill = width.saturating_sub(truncated.width());
    format!("{truncated}{}", " ".repeat(fill))
}

pub fn format_rate(kbps: f64) -> String {
    if kbps >= 1024.0 * 1024.0 {
        format!("{:.1} GB/s", kbps / (1024.0 * 1024.0))
    } else if kbps >= 1024.0 {
        format!("{:.1} MB/s", kbps / 1024.0)
    } else {
        format!("{kbps:.2} KB/s")
    }
}

/// One-line host summary, e.g. for a status bar or a log line.
pub fn summary_line(snapshot: &Snapshot) -> String {
    format!(
        "{}  CPU {:.1}%  MEM {:.1}% ({:.2} GB free)  DISK {:.1}% ({:.2} GB used)  NET tx {} rx {}",
        snapshot.clock_label(),
        snapshot.cpu_percent,
        snapshot.memory.percent,
        snapshot.memory.available_gb,
        snapshot.disk.percent,
        snapshot.disk.used_gb,
        format_rate(snapshot.network.sent_kbps),
        format_rate(snapshot.network.recv_kbps),
    )
}

/// Header plus up to `limit` rows of the snapshot's ranked process list.
pub fn process_table(snapshot: &Snapshot, limit: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(limit.min(snapshot.processes.len()) + 1);
    lines.push(format!(
        "{:>8}  {}  {:>7}  {:>7}",
        "PID",
        pad_unicode("NAME", NAME_WIDTH),
        "CPU%",
        "MEM%"
    ));
    for process in snapshot.processes.iter().take(limit) {
        lines.push(format!(
            "{:>8}  {}  {:>7.1}  {:>7.1}",
            process.pid,
            pad_unicode(&process.name, NAME_WIDTH),
            process.cpu_percent,
            process.memory_percent
        ));
    }
    lines
}
