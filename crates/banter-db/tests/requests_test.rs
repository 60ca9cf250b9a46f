mod common;

use common::{open_db, user};

#[test]
fn one_request_per_ordered_pair() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let first = db.send_request(&alice, &bob).unwrap().unwrap();
    let second = db.send_request(&alice, &bob).unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn reverse_direction_gets_its_own_request_while_pending() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let forward = db.send_request(&alice, &bob).unwrap().unwrap();
    let backward = db.send_request(&bob, &alice).unwrap().unwrap();
    assert_ne!(forward, backward);
}

#[test]
fn accepting_connects_the_pair_and_blocks_a_reverse_request() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let rid = db.send_request(&alice, &bob).unwrap().unwrap();
    let conv = db.accept_request(&rid, &bob, &alice).unwrap();

    let request = db.get_request(&rid).unwrap().unwrap();
    assert_eq!(request.status, "accepted");

    // The conversation exists with both memberships; the accepting
    // recipient starts read, the original sender unread.
    let recipient = db.get_membership(&conv, &bob).unwrap().unwrap();
    let sender = db.get_membership(&conv, &alice).unwrap().unwrap();
    assert!(recipient.last_read_time > 0);
    assert_eq!(sender.last_read_time, 0);

    // Bob requesting Alice now signals "already connected".
    assert!(db.send_request(&bob, &alice).unwrap().is_none());
}

#[test]
fn declined_is_terminal_and_resend_returns_the_declined_id() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let rid = db.send_request(&alice, &bob).unwrap().unwrap();
    db.decline_request(&rid).unwrap();

    assert_eq!(db.get_request(&rid).unwrap().unwrap().status, "declined");

    // Re-sending does not revive or duplicate; the sender just gets the
    // declined request's id back.
    let again = db.send_request(&alice, &bob).unwrap().unwrap();
    assert_eq!(again, rid);
    assert_eq!(db.get_request(&rid).unwrap().unwrap().status, "declined");
}

#[test]
fn pair_lookup_is_direction_sensitive() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let rid = db.send_request(&alice, &bob).unwrap().unwrap();

    let found = db.get_request_by_pair(&alice, &bob).unwrap().unwrap();
    assert_eq!(found.id, rid);
    assert!(db.get_request_by_pair(&bob, &alice).unwrap().is_none());
}

#[test]
fn pending_inbox_lists_senders_newest_first() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let carol = user(&db, "Carol");

    db.send_request(&bob, &alice).unwrap();
    common::tick();
    db.send_request(&carol, &alice).unwrap();

    assert_eq!(db.pending_count(&alice).unwrap(), 2);

    let inbox = db.pending_incoming(&alice).unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].1.name, "Carol");
    assert_eq!(inbox[1].1.name, "Bob");

    // Declining one shrinks the inbox.
    db.decline_request(&inbox[1].0.id).unwrap();
    assert_eq!(db.pending_count(&alice).unwrap(), 1);
}
