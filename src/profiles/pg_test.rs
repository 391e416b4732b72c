//! Requires `DATABASE_URL` pointing at a disposable Postgres database.

use super::*;

async fn store() -> PgProfileStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
    let pool = crate::db::init_pool(&crate::db::DbConfig::new(url)).await.expect("pool should initialize");
    PgProfileStore::new(pool)
}

fn unique(prefix: &str) -> String {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    format!("{prefix}{nanos}")
}

#[tokio::test]
async fn put_then_get_and_find() {
    let store = store().await;
    let uid = unique("uid-");
    let username = unique("user");
    let profile = UserProfile::new(&uid, &username, "live@example.com");
    store.put(&profile).await.unwrap();

    let fetched = store.get(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.username, username);
    assert_eq!(store.find_by_username(&username).await.unwrap().len(), 1);
    assert!(store.find_by_username(&unique("nobody")).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let store = store().await;
    let username = unique("dup");
    store.put(&UserProfile::new(unique("a-"), &username, "a@example.com")).await.unwrap();

    let err = store.put(&UserProfile::new(unique("b-"), &username, "b@example.com")).await.unwrap_err();
    assert!(matches!(err, ProfileStoreError::UsernameConflict(ref name) if name == &username));
}
