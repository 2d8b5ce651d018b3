use std::path::PathBuf;

use mailsync::db::models::{Account, MessageSummary};
use mailsync::db::Database;
use mailsync::extract::summarize_payload;
use serde_json::json;
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("mailsync-store-it-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp test root");
    root
}

fn summary(owner: &str, id: &str, sent_at: &str) -> MessageSummary {
    let payload = json!({
        "id": id,
        "threadId": format!("t-{id}"),
        "snippet": "Tom &amp; Jerry &lt;3",
        "labelIds": ["INBOX"],
        "payload": {
            "headers": [
                { "name": "From", "value": "Alerts <alerts@example.com>" },
                { "name": "Date", "value": sent_at }
            ]
        }
    });
    summarize_payload(owner, &payload).expect("valid payload")
}

#[test]
fn two_handles_on_one_file_never_duplicate() {
    let root = temp_root();
    let path = root.join("mailsync.db");
    let first = Database::open(&path).expect("open first handle");
    let second = Database::open(&path).expect("open second handle");

    let a = summary("user-1", "A", "2024-01-01");
    let b = summary("user-1", "B", "2024-01-02");
    let c = summary("user-1", "C", "2024-01-03");

    let left = first
        .insert_summaries_if_absent("user-1", &[a.clone(), b.clone()])
        .expect("first batch");
    let right = second
        .insert_summaries_if_absent("user-1", &[b, c])
        .expect("second batch");

    assert_eq!(left.inserted, 2);
    assert_eq!(right.inserted, 1);
    assert_eq!(right.skipped, 1);

    let ids: Vec<String> = first
        .list_summaries("user-1")
        .expect("list")
        .into_iter()
        .map(|stored| stored.provider_message_id)
        .collect();
    assert_eq!(ids, vec!["C", "B", "A"]);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn stored_summaries_keep_extracted_fields() {
    let root = temp_root();
    let db = Database::open(&root.join("mailsync.db")).expect("open db");
    db.upsert_account(&Account::new("user-1", "user-1@example.com"))
        .expect("insert account");

    db.insert_summaries_if_absent(
        "user-1",
        &[summary("user-1", "A", "Tue, 2 Jan 2024 10:00:00 -0800 (PST)")],
    )
    .expect("insert");

    let stored = db.list_summaries("user-1").expect("list");
    assert_eq!(stored.len(), 1);
    let message = &stored[0];
    assert_eq!(message.subject, "(No Subject)");
    assert_eq!(message.snippet, "Tom & Jerry <3");
    assert_eq!(message.sender_name, "Alerts");
    assert_eq!(message.sender_address, "alerts@example.com");
    assert_eq!(
        message.sent_at_utc.as_deref(),
        Some("2024-01-02T18:00:00+00:00")
    );
    assert!(message.is_read);

    let stats = db.get_stats().expect("stats");
    assert_eq!(stats.total_accounts, 1);
    assert_eq!(stats.total_messages, 1);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn reopening_preserves_rows_and_schema() {
    let root = temp_root();
    let path = root.join("mailsync.db");
    {
        let db = Database::open(&path).expect("open db");
        db.insert_summaries_if_absent("user-1", &[summary("user-1", "A", "2024-01-01")])
            .expect("insert");
    }

    let reopened = Database::open(&path).expect("reopen db");
    assert_eq!(reopened.count_summaries("user-1").expect("count"), 1);
    let again = reopened
        .insert_summaries_if_absent("user-1", &[summary("user-1", "A", "2024-01-01")])
        .expect("insert again");
    assert_eq!(again.inserted, 0);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn concurrent_handles_converge_without_lock_errors() {
    let root = temp_root();
    let path = root.join("mailsync.db");
    Database::open(&path).expect("create schema");

    let writers = 8;
    let batches_per_writer = 20;
    let errors: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..writers)
            .map(|writer| {
                let path = path.clone();
                scope.spawn(move || {
                    let db = Database::open(&path).expect("open writer handle");
                    let mut errors = Vec::new();
                    for batch in 0..batches_per_writer {
                        let start = writer * 3 + batch;
                        let records: Vec<MessageSummary> = (start..start + 15)
                            .map(|n| summary("user-1", &format!("m{n:03}"), "2024-01-01"))
                            .collect();
                        if let Err(error) = db.insert_summaries_if_absent("user-1", &records) {
                            errors.push(error.to_string());
                        }
                    }
                    errors
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("writer thread"))
            .collect()
    });

    assert!(errors.is_empty(), "insert errors: {errors:?}");

    // Writer w covers ids 3w ..= 3w + batches + 13.
    let expected = (writers - 1) * 3 + batches_per_writer + 14;
    let db = Database::open(&path).expect("reopen db");
    let stored = db.list_summaries("user-1").expect("list");
    let mut ids: Vec<String> = stored
        .into_iter()
        .map(|summary| summary.provider_message_id)
        .collect();
    ids.sort();
    let total = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert_eq!(total, expected);
    assert_eq!(ids.first().map(String::as_str), Some("m000"));
    assert_eq!(
        ids.last().cloned(),
        Some(format!("m{:03}", expected - 1))
    );

    let _ = std::fs::remove_dir_all(root);
}
