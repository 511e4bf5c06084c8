//! Plain-text rendering for the terminal client.

use chrono::{Local, TimeZone};

use crate::api::{Auction, StatusLevel, StatusMessage};
use crate::notifications::{Notification, NotificationFeed, NotificationSink, Tone, WinAlert};

pub fn tone_marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Success => "[ok]",
        Tone::Info => "[i]",
        Tone::Warning => "[!]",
    }
}

pub fn format_notification(notification: &Notification) -> String {
    let time = Local
        .timestamp_millis_opt(notification.id)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "{} {} {}: {}",
        time,
        tone_marker(notification.tone()),
        notification.title,
        notification.message
    )
}

/// Newest entry first, one line each.
pub fn format_feed(feed: &NotificationFeed) -> String {
    feed.iter()
        .map(|n| format!("  - {}: {}", n.title, n.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_alert(alert: &WinAlert) -> String {
    let banner = "*".repeat(48);
    format!("{banner}\n{}\n(Leilão {})\n{banner}", alert.message(), alert.auction_id)
}

pub fn format_status(status: &StatusMessage) -> String {
    let prefix = match status.level {
        StatusLevel::Loading => "...",
        StatusLevel::Success => "ok",
        StatusLevel::Error => "erro",
    };
    format!("[{prefix}] {}", status.text)
}

pub fn format_auctions(auctions: &[Auction]) -> String {
    if auctions.is_empty() {
        return "Nenhum leilão ativo no momento.".to_string();
    }
    auctions
        .iter()
        .map(|auction| {
            let mut line = format!("#{} {}", auction.id, auction.display_desc());
            if let Some(valor) = auction.valor_inicial {
                line.push_str(&format!(" (inicial R${valor:.2})"));
            }
            if let Some(fim) = auction.fim.as_deref() {
                line.push_str(&format!(" até {fim}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints notifications and win alerts to stdout.
#[derive(Debug, Default)]
pub struct TerminalSink {
    /// Reprint the whole feed after each notification.
    pub show_feed: bool,
}

impl NotificationSink for TerminalSink {
    fn notify(&self, notification: &Notification, feed: &NotificationFeed) {
        println!("{}", format_notification(notification));
        if self.show_feed && feed.len() > 1 {
            println!("{}", format_feed(feed));
        }
    }

    fn alert(&self, alert: &WinAlert) {
        println!("{}", format_alert(alert));
    }
}
