mod common;

use common::open_db;

#[test]
fn upsert_is_keyed_on_external_identity() {
    let db = open_db();

    let first = db.upsert_user("ext-1", "Alice", "alice@example.com", "").unwrap();
    let second = db
        .upsert_user("ext-1", "Alice Cooper", "alice@example.com", "https://cdn/a.png")
        .unwrap();
    assert_eq!(first, second);

    let row = db.get_user(&first).unwrap().unwrap();
    assert_eq!(row.name, "Alice Cooper");
    assert_eq!(row.avatar_url, "https://cdn/a.png");
    assert!(row.is_online);
}

#[test]
fn offline_marking_tolerates_unknown_identities() {
    let db = open_db();
    let id = db.upsert_user("ext-1", "Alice", "alice@example.com", "").unwrap();

    db.set_offline_by_external_id("ext-never-seen").unwrap();
    db.set_offline_by_external_id("ext-1").unwrap();

    assert!(!db.get_user(&id).unwrap().unwrap().is_online);
}

#[test]
fn search_is_case_insensitive_and_excludes_the_caller() {
    let db = open_db();
    let alice = db.upsert_user("ext-1", "Alice", "alice@example.com", "").unwrap();
    db.upsert_user("ext-2", "Alina", "alina@example.com", "").unwrap();
    db.upsert_user("ext-3", "Bob", "bob@example.com", "").unwrap();

    let hits = db.search_users(&alice, "ALI").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Alina");

    // Empty term lists everyone else.
    let all = db.search_users(&alice, "").unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn search_treats_like_wildcards_as_literals() {
    let db = open_db();
    let me = db.upsert_user("ext-0", "Me", "me@example.com", "").unwrap();
    db.upsert_user("ext-1", "100% Legit", "legit@example.com", "").unwrap();
    db.upsert_user("ext-2", "snake_case", "snake@example.com", "").unwrap();
    db.upsert_user("ext-3", "Plain", "plain@example.com", "").unwrap();

    let hits = db.search_users(&me, "%").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "100% Legit");

    let hits = db.search_users(&me, "_").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "snake_case");

    assert!(db.search_users(&me, "0% L").unwrap().len() == 1);
}

#[test]
fn profile_rename_sticks() {
    let db = open_db();
    let alice = db.upsert_user("ext-1", "Alice", "alice@example.com", "").unwrap();

    db.update_user_name(&alice, "Alicia").unwrap();

    assert_eq!(db.get_user(&alice).unwrap().unwrap().name, "Alicia");
}
