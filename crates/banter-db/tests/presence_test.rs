mod common;

use common::{open_db, user};

#[test]
fn one_row_per_user_latest_state_wins() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    db.upsert_presence(&bob, true, true, Some(&conv)).unwrap();
    db.upsert_presence(&bob, true, false, Some(&conv)).unwrap();

    let rows = db.presence_for_conversation(&conv, &alice).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].0.is_typing);
    assert_eq!(rows[0].1.name, "Bob");
}

#[test]
fn own_presence_is_excluded() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    db.upsert_presence(&alice, true, true, Some(&conv)).unwrap();

    assert!(db.presence_for_conversation(&conv, &alice).unwrap().is_empty());
}

#[test]
fn presence_is_scoped_to_the_conversation() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    db.upsert_presence(&bob, true, true, None).unwrap();

    assert!(db.presence_for_conversation(&conv, &alice).unwrap().is_empty());
}

#[test]
fn stale_entries_are_filtered_at_read_time() {
    let db = open_db();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");
    let conv = db.create_direct_conversation(&alice, &bob).unwrap();

    db.upsert_presence(&bob, true, true, Some(&conv)).unwrap();
    assert_eq!(db.presence_for_conversation(&conv, &alice).unwrap().len(), 1);

    // Age the row past the staleness window; the next read drops it.
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE presence SET last_active = last_active - 60000 WHERE user_id = ?1",
            [&bob],
        )?;
        Ok(())
    })
    .unwrap();

    assert!(db.presence_for_conversation(&conv, &alice).unwrap().is_empty());
}

#[test]
fn heartbeat_refreshes_the_durable_online_flag() {
    let db = open_db();
    let alice = user(&db, "Alice");

    db.set_user_online(&alice, false, 0).unwrap();
    assert!(!db.get_user(&alice).unwrap().unwrap().is_online);

    db.upsert_presence(&alice, true, false, None).unwrap();
    assert!(db.get_user(&alice).unwrap().unwrap().is_online);
}
