#![allow(dead_code)]

use banter_db::Database;

pub fn open_db() -> Database {
    Database::open_in_memory().expect("in-memory db")
}

/// Register a user and return their internal id.
pub fn user(db: &Database, name: &str) -> String {
    db.upsert_user(
        &format!("ext-{}", name),
        name,
        &format!("{}@example.com", name.to_lowercase()),
        "",
    )
    .expect("upsert user")
}

/// Millisecond timestamps back every watermark comparison; a short pause
/// keeps consecutive operations from landing on the same tick.
pub fn tick() {
    std::thread::sleep(std::time::Duration::from_millis(3));
}
