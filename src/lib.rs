//! mailsync library entrypoint.
//!
//! Modules:
//! - `sync`: the fetch, normalize, dedup and persist pipeline
//! - `connectors`: provider trait and the Gmail REST client
//! - `extract`: message-detail validation and field extraction
//! - `db`: SQLite store, migrations and models
//! - `auth`: caller sessions and the identity/token seam
//! - `config`: environment-driven settings
//! - `output`: table and JSON rendering for the CLI

pub mod auth;
pub mod config;
pub mod connectors;
pub mod dates;
pub mod db;
pub mod extract;
pub mod output;
pub mod sync;
