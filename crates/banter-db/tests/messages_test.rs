mod common;

use banter_db::DELETED_PLACEHOLDER;
use banter_types::models::LinkPreview;
use common::{open_db, tick, user};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[test]
fn sending_advances_the_conversation_pointer() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    let mid = new_id();
    db.insert_message(&mid, &conv, &alice, "hey", None, None).unwrap();

    let row = db.get_conversation(&conv).unwrap().unwrap();
    assert_eq!(row.last_message_id.as_deref(), Some(mid.as_str()));
}

#[test]
fn soft_delete_keeps_the_row_but_scrubs_it() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    let mid = new_id();
    db.insert_message(&mid, &conv, &alice, "oops", None, None).unwrap();
    db.toggle_reaction(&mid, &bob, "😂").unwrap();

    db.soft_delete_message(&mid).unwrap();

    let row = db.get_message(&mid).unwrap().unwrap();
    assert!(row.deleted);
    assert_eq!(row.content, DELETED_PLACEHOLDER);

    // Still present in the timeline.
    let listed = db.list_messages(&conv, 10, None).unwrap();
    assert!(listed.iter().any(|m| m.message.id == mid));

    // Reactions went with it.
    assert!(db.reactions_for_messages(&[mid]).unwrap().is_empty());
}

#[test]
fn dangling_reply_reference_resolves_to_nothing() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    let ghost = new_id();
    let mid = new_id();
    db.insert_message(&mid, &conv, &alice, "re: nothing", None, Some(&ghost)).unwrap();

    // The message lands with the reference intact.
    let row = db.get_message(&mid).unwrap().unwrap();
    assert_eq!(row.reply_to_message_id.as_deref(), Some(ghost.as_str()));

    // But the referenced message cannot be resolved.
    assert!(db.get_message_with_sender(&ghost).unwrap().is_none());
}

#[test]
fn pagination_walks_newest_first() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    for i in 0..5 {
        tick();
        db.insert_message(&new_id(), &conv, &alice, &format!("msg {}", i), None, None).unwrap();
    }

    let first = db.list_messages(&conv, 2, None).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].message.content, "msg 4");
    assert_eq!(first[1].message.content, "msg 3");

    let oldest = first.last().unwrap();
    let cursor = (oldest.message.created_at, oldest.message.id.as_str());
    let second = db.list_messages(&conv, 2, Some(cursor)).unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].message.content, "msg 2");
    assert_eq!(second[1].message.content, "msg 1");
}

#[test]
fn pagination_keeps_same_millisecond_neighbors() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    for i in 0..3 {
        db.insert_message(&new_id(), &conv, &alice, &format!("msg {}", i), None, None).unwrap();
    }
    // Collapse all three onto one timestamp to force a tie at the boundary.
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE messages SET created_at = 1000 WHERE conversation_id = ?1",
            [&conv],
        )?;
        Ok(())
    })
    .unwrap();

    let first = db.list_messages(&conv, 2, None).unwrap();
    assert_eq!(first.len(), 2);

    let oldest = first.last().unwrap();
    let second = db
        .list_messages(&conv, 2, Some((oldest.message.created_at, oldest.message.id.as_str())))
        .unwrap();
    assert_eq!(second.len(), 1);

    let mut seen: Vec<&str> = first
        .iter()
        .chain(second.iter())
        .map(|m| m.message.id.as_str())
        .collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 3, "every message appears exactly once");
}

#[test]
fn sender_display_data_is_joined_in() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    let mid = new_id();
    db.insert_message(&mid, &conv, &alice, "hi", None, None).unwrap();

    let listed = db.list_messages(&conv, 10, None).unwrap();
    assert_eq!(listed[0].sender_name, "Alice");
}

#[test]
fn link_preview_patch_skips_deleted_messages() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    let mid = new_id();
    db.insert_message(&mid, &conv, &alice, "https://example.com", None, None).unwrap();

    let preview = LinkPreview {
        url: "https://example.com".into(),
        title: Some("Example".into()),
        description: None,
        image: None,
        site_name: None,
    };

    assert!(db.patch_link_preview(&mid, &preview).unwrap());
    let row = db.get_message(&mid).unwrap().unwrap();
    assert_eq!(row.preview_title.as_deref(), Some("Example"));

    db.soft_delete_message(&mid).unwrap();
    assert!(!db.patch_link_preview(&mid, &preview).unwrap());
}
