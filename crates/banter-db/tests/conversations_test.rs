mod common;

use common::{open_db, tick, user};

#[test]
fn direct_conversation_is_unique_in_either_order() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    assert!(db.find_direct_conversation(&alice, &bob).unwrap().is_none());

    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    assert_eq!(db.find_direct_conversation(&alice, &bob).unwrap(), Some(conv.clone()));
    assert_eq!(db.find_direct_conversation(&bob, &alice).unwrap(), Some(conv));
}

#[test]
fn direct_conversation_watermarks_favor_the_initiator() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    let mine = db.get_membership(&conv, &alice).unwrap().unwrap();
    let theirs = db.get_membership(&conv, &bob).unwrap().unwrap();
    assert!(mine.last_read_time > 0, "initiator starts read");
    assert_eq!(theirs.last_read_time, 0, "recipient starts unread");
}

#[test]
fn group_creation_sets_roles_and_emits_system_message() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let conv = db.create_group("lunch crew", None, &alice, &[bob.clone()]).unwrap();

    let creator = db.get_membership(&conv, &alice).unwrap().unwrap();
    assert_eq!(creator.role.as_deref(), Some("admin"));
    assert!(creator.last_read_time > 0);

    let member = db.get_membership(&conv, &bob).unwrap().unwrap();
    assert_eq!(member.role.as_deref(), Some("member"));
    assert_eq!(member.last_read_time, 0);

    let messages = db.list_messages(&conv, 10, None).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].message.message_type, "system");
    assert_eq!(messages[0].message.content, "Alice created the group");

    let row = db.get_conversation(&conv).unwrap().unwrap();
    assert_eq!(row.last_message_id.as_deref(), Some(messages[0].message.id.as_str()));
}

#[test]
fn rename_emits_exactly_one_system_message_and_stays_unread_free() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_group("old name", None, &alice, &[bob.clone()]).unwrap();
    tick();

    db.update_group(&conv, Some("new name"), None, &alice).unwrap();

    let messages = db.list_messages(&conv, 10, None).unwrap();
    assert_eq!(messages.len(), 2, "creation + rename");
    assert!(messages[0].message.content.contains("new name"));
    assert_eq!(db.get_conversation(&conv).unwrap().unwrap().name.as_deref(), Some("new name"));

    // System messages never count toward unread.
    assert_eq!(db.unread_count(&conv, &bob, 0).unwrap(), 0);
}

#[test]
fn image_change_is_silent() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let conv = db.create_group("pics", None, &alice, &[]).unwrap();

    db.update_group(&conv, None, Some("https://cdn.example/img.png"), &alice).unwrap();

    assert_eq!(db.list_messages(&conv, 10, None).unwrap().len(), 1, "creation only");
}

#[test]
fn add_member_is_a_noop_for_existing_members() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let carol = user(&db, "Carol");
    let conv = db.create_group("trio", None, &alice, &[bob.clone()]).unwrap();
    tick();

    assert!(!db.add_member(&conv, &bob, &alice).unwrap());
    assert!(db.add_member(&conv, &carol, &alice).unwrap());

    let messages = db.list_messages(&conv, 10, None).unwrap();
    assert_eq!(messages.len(), 2, "creation + one addition");
    assert_eq!(messages[0].message.content, "Carol was added by Alice");
}

#[test]
fn leaving_reduces_membership_and_keeps_attribution() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_group("pair", None, &alice, &[bob.clone()]).unwrap();
    tick();

    let outcome = db.leave_group(&conv, &alice).unwrap();
    assert!(!outcome.conversation_deleted);
    assert!(db.get_membership(&conv, &alice).unwrap().is_none());
    assert!(db.get_membership(&conv, &bob).unwrap().is_some());

    let messages = db.list_messages(&conv, 10, None).unwrap();
    assert_eq!(messages[0].message.content, "Alice left the group");
}

#[test]
fn last_member_leaving_deletes_the_group_and_its_contents() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let conv = db.create_group("solo", None, &alice, &[]).unwrap();

    let mid = uuid::Uuid::new_v4().to_string();
    db.insert_message(&mid, &conv, &alice, "goodbye", None, None).unwrap();
    db.toggle_reaction(&mid, &alice, "👋").unwrap();

    let outcome = db.leave_group(&conv, &alice).unwrap();
    assert!(outcome.conversation_deleted);

    assert!(db.get_conversation(&conv).unwrap().is_none());
    assert!(db.get_message(&mid).unwrap().is_none());
    assert!(db.reactions_for_messages(&[mid]).unwrap().is_empty());
}

#[test]
fn invite_codes_are_stable_and_case_insensitive() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_group("open house", None, &alice, &[]).unwrap();

    let code = db.generate_invite_code(&conv).unwrap();
    assert_eq!(code.len(), 8);
    assert_eq!(db.generate_invite_code(&conv).unwrap(), code, "existing code is reused");

    let found = db.find_by_invite_code(&code.to_lowercase()).unwrap().unwrap();
    assert_eq!(found.id, conv);

    tick();
    db.join_group(&conv, &bob).unwrap();
    let membership = db.get_membership(&conv, &bob).unwrap().unwrap();
    assert!(membership.last_read_time > 0, "joiner starts read");

    let messages = db.list_messages(&conv, 10, None).unwrap();
    assert_eq!(messages[0].message.content, "Bob joined via invite link");
}

#[test]
fn unread_counts_follow_the_watermark() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_group("counts", None, &alice, &[bob.clone()]).unwrap();
    tick();

    let m1 = uuid::Uuid::new_v4().to_string();
    db.insert_message(&m1, &conv, &alice, "one", None, None).unwrap();
    tick();
    let m2 = uuid::Uuid::new_v4().to_string();
    db.insert_message(&m2, &conv, &alice, "two", None, None).unwrap();

    assert_eq!(db.unread_count(&conv, &bob, 0).unwrap(), 2);
    // Own messages never count.
    let alice_watermark = db.get_membership(&conv, &alice).unwrap().unwrap().last_read_time;
    assert_eq!(db.unread_count(&conv, &alice, alice_watermark).unwrap(), 0);

    // Deleted messages stop counting.
    db.soft_delete_message(&m2).unwrap();
    assert_eq!(db.unread_count(&conv, &bob, 0).unwrap(), 1);

    // Reading moves the watermark to now.
    db.mark_as_read(&conv, &bob).unwrap();
    let watermark = db.get_membership(&conv, &bob).unwrap().unwrap().last_read_time;
    assert_eq!(db.unread_count(&conv, &bob, watermark).unwrap(), 0);

    // Sending marks the conversation read for the sender.
    tick();
    let m3 = uuid::Uuid::new_v4().to_string();
    db.insert_message(&m3, &conv, &bob, "reply", None, None).unwrap();
    let watermark = db.get_membership(&conv, &bob).unwrap().unwrap().last_read_time;
    assert_eq!(db.unread_count(&conv, &bob, watermark).unwrap(), 0);
}

#[test]
fn read_status_reports_the_other_members() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let carol = user(&db, "Carol");
    let conv = db.create_group("receipts", None, &alice, &[bob.clone(), carol.clone()]).unwrap();

    let status = db.read_status(&conv, &alice).unwrap();
    assert_eq!(status.len(), 2);
    assert!(status.iter().all(|(id, _)| id != &alice));
}
