use anyhow::Result;

use crate::db::models::{Account, MessageSummary};
use crate::db::DatabaseStats;
use crate::sync::SyncReport;

pub fn format_messages(messages: &[MessageSummary]) -> Result<String> {
    Ok(serde_json::to_string_pretty(messages)?)
}

pub fn format_accounts(accounts: &[Account]) -> Result<String> {
    Ok(serde_json::to_string_pretty(accounts)?)
}

pub fn format_stats(stats: &DatabaseStats) -> Result<String> {
    Ok(serde_json::to_string_pretty(stats)?)
}

pub fn format_sync_report(report: &SyncReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
