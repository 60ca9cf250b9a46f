mod common;

use common::{open_db, user};

fn seed_message(db: &banter_db::Database, conv: &str, sender: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    db.insert_message(&id, conv, sender, "hello", None, None).unwrap();
    id
}

#[test]
fn toggle_alternates_between_present_and_absent() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();
    let mid = seed_message(&db, &conv, &alice);

    assert!(db.toggle_reaction(&mid, &bob, "❤️").unwrap());
    assert_eq!(db.reactions_for_messages(&[mid.clone()]).unwrap().len(), 1);

    assert!(!db.toggle_reaction(&mid, &bob, "❤️").unwrap());
    assert!(db.reactions_for_messages(&[mid.clone()]).unwrap().is_empty());

    assert!(db.toggle_reaction(&mid, &bob, "❤️").unwrap());
    assert_eq!(db.reactions_for_messages(&[mid]).unwrap().len(), 1);
}

#[test]
fn different_emojis_toggle_independently() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();
    let mid = seed_message(&db, &conv, &alice);

    db.toggle_reaction(&mid, &bob, "👍").unwrap();
    db.toggle_reaction(&mid, &bob, "🎉").unwrap();
    db.toggle_reaction(&mid, &bob, "👍").unwrap();

    let rows = db.reactions_for_messages(&[mid]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].emoji, "🎉");
}

#[test]
fn batch_fetch_covers_several_messages_with_names() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();
    let m1 = seed_message(&db, &conv, &alice);
    let m2 = seed_message(&db, &conv, &bob);

    db.toggle_reaction(&m1, &bob, "👍").unwrap();
    db.toggle_reaction(&m1, &alice, "👍").unwrap();
    db.toggle_reaction(&m2, &alice, "😮").unwrap();

    let rows = db.reactions_for_messages(&[m1.clone(), m2.clone()]).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.iter().filter(|r| r.message_id == m1).count(), 2);
    assert!(rows.iter().any(|r| r.user_name == "Alice"));
    assert!(rows.iter().any(|r| r.user_name == "Bob"));
}
