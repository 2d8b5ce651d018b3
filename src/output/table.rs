use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::dates::parse_sent_at;
use crate::db::models::{Account, MessageSummary};
use crate::db::DatabaseStats;
use crate::sync::SyncReport;

const FROM_WIDTH: usize = 24;
const SUBJECT_WIDTH: usize = 56;
const DATE_WIDTH: usize = 12;

pub fn format_messages(messages: &[MessageSummary]) -> String {
    format_messages_at(messages, Utc::now())
}

fn format_messages_at(messages: &[MessageSummary], now: DateTime<Utc>) -> String {
    if messages.is_empty() {
        return "No messages stored. Run `mailsync sync` to fetch recent mail.".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "  {:<from$}  {:<subject$}  {:<date$}\n",
        "From",
        "Subject",
        "Date",
        from = FROM_WIDTH,
        subject = SUBJECT_WIDTH,
        date = DATE_WIDTH,
    ));
    out.push_str(&format!(
        "  {}  {}  {}\n",
        "-".repeat(FROM_WIDTH),
        "-".repeat(SUBJECT_WIDTH),
        "-".repeat(DATE_WIDTH)
    ));

    for message in messages {
        let marker = if message.is_read { ' ' } else { '*' };
        let sender = if message.sender_name.trim().is_empty() {
            message.sender_address.as_str()
        } else {
            message.sender_name.as_str()
        };
        let from = truncate_for_width(sender, FROM_WIDTH);
        let subject = truncate_for_width(&message.subject, SUBJECT_WIDTH);
        let date = truncate_for_width(&relative_date(&message.sent_at, now), DATE_WIDTH);

        out.push_str(&format!(
            "{} {:<from$}  {:<subject$}  {:<date$}\n",
            marker,
            from,
            subject,
            date,
            from = pad_width(&from, FROM_WIDTH),
            subject = pad_width(&subject, SUBJECT_WIDTH),
            date = DATE_WIDTH,
        ));
    }

    out
}

pub fn format_accounts(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts configured.".to_string();
    }

    let mut out = String::new();
    out.push_str("Accounts\n");
    out.push_str("========\n");
    for account in accounts {
        out.push_str(&format!(
            "{}  {}  token={}  last_sync={}\n",
            account.user_id,
            account.email_address,
            if account.has_access_token() {
                "stored"
            } else {
                "missing"
            },
            account.last_sync.as_deref().unwrap_or("never")
        ));
    }
    out
}

pub fn format_stats(stats: &DatabaseStats) -> String {
    let mut out = String::new();
    out.push_str("mailsync stats\n");
    out.push_str("==============\n");
    out.push_str(&format!("Accounts: {}\n", stats.total_accounts));
    out.push_str(&format!("Messages: {}\n", stats.total_messages));

    if !stats.messages_by_owner.is_empty() {
        out.push('\n');
        out.push_str("Messages by owner\n");
        out.push_str("-----------------\n");
        for row in &stats.messages_by_owner {
            out.push_str(&format!("{:<24} {:>8}\n", row.owner, row.count));
        }
    }

    out
}

pub fn format_sync_report(report: &SyncReport) -> String {
    format!(
        "sync {}: listed={} fetched={} dropped={} added={} already_stored={}",
        report.owner,
        report.listed,
        report.attempted,
        report.dropped(),
        report.inserted,
        report.skipped
    )
}

fn relative_date(raw: &str, now: DateTime<Utc>) -> String {
    let Some(parsed) = parse_sent_at(raw) else {
        return if raw.trim().is_empty() {
            "-".to_string()
        } else {
            raw.to_string()
        };
    };

    let delta = now.signed_duration_since(parsed);
    if delta.num_seconds() < 0 {
        return "in future".to_string();
    }
    if delta.num_minutes() < 1 {
        return "just now".to_string();
    }
    if delta.num_hours() < 1 {
        return format!("{}m ago", delta.num_minutes());
    }
    if delta.num_hours() < 24 {
        return format!("{}h ago", delta.num_hours());
    }
    if delta.num_days() == 1 {
        return "yesterday".to_string();
    }
    if delta.num_days() < 7 {
        return format!("{}d ago", delta.num_days());
    }
    parsed.format("%Y-%m-%d").to_string()
}

// `format!` pads by char count; widen the field for double-width glyphs.
fn pad_width(value: &str, width: usize) -> usize {
    let display = UnicodeWidthStr::width(value);
    let chars = value.chars().count();
    if display >= width {
        chars
    } else {
        chars + (width - display)
    }
}

fn truncate_for_width(value: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(value) <= max_width {
        return value.to_string();
    }

    if max_width <= 1 {
        return "…".to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    for c in value.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw + 1 > max_width {
            break;
        }
        out.push(c);
        width += cw;
    }
    out.push('…');
    out
}
