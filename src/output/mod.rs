pub mod json;
pub mod table;

use anyhow::Result;

use crate::db::models::{Account, MessageSummary};
use crate::db::DatabaseStats;
use crate::sync::SyncReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Table
        }
    }
}

pub fn format_messages(format: OutputFormat, messages: &[MessageSummary]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_messages(messages)),
        OutputFormat::Json => json::format_messages(messages),
    }
}

pub fn format_accounts(format: OutputFormat, accounts: &[Account]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_accounts(accounts)),
        OutputFormat::Json => json::format_accounts(accounts),
    }
}

pub fn format_stats(format: OutputFormat, stats: &DatabaseStats) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_stats(stats)),
        OutputFormat::Json => json::format_stats(stats),
    }
}

pub fn format_sync_report(format: OutputFormat, report: &SyncReport) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table::format_sync_report(report)),
        OutputFormat::Json => json::format_sync_report(report),
    }
}
