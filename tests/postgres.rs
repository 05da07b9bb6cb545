//! Store adapters against a real database. Run with
//! `DATABASE_URL=postgres://... cargo test --test postgres -- --ignored`.

use chrono::{Duration, Utc};
use futures::future::join_all;
use sqlx::PgPool;
use task_api::models::{NewUser, RefreshToken};
use task_api::store::{PgRefreshTokenStore, PgUserStore, RefreshTokenStore, StoreError, UserStore};
use uuid::Uuid;

async fn pool() -> Option<PgPool> {
    dotenv::dotenv().ok();
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        }
    };
    let pool = PgPool::connect(&url).await.expect("connect to DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

fn new_user() -> NewUser {
    NewUser {
        id: Uuid::new_v4(),
        name: "Pg User".to_string(),
        email: format!("pg-{}@example.com", Uuid::new_v4()),
        password_hash: "not-a-real-hash".to_string(),
        created_at: Utc::now(),
    }
}

async fn seeded_user(pool: &PgPool) -> Uuid {
    PgUserStore::new(pool.clone())
        .create(new_user())
        .await
        .expect("create user")
        .id
}

#[actix_rt::test]
#[ignore]
async fn test_duplicate_email_is_a_conflict() {
    let Some(pool) = pool().await else { return };
    let users = PgUserStore::new(pool);

    let first = new_user();
    let mut second = new_user();
    second.email = first.email.clone();

    users.create(first).await.unwrap();
    match users.create(second).await {
        Err(StoreError::Conflict(_)) => {}
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[actix_rt::test]
#[ignore]
async fn test_rotate_is_single_use() {
    let Some(pool) = pool().await else { return };
    let user_id = seeded_user(&pool).await;
    let tokens = PgRefreshTokenStore::new(pool);
    let now = Utc::now();

    let old = RefreshToken::new(user_id, now + Duration::days(1), now);
    tokens.create(&old).await.unwrap();

    let replacement = Uuid::new_v4();
    let rotated = tokens
        .rotate(old.token, now, replacement, now + Duration::days(1))
        .await
        .unwrap()
        .expect("first rotation succeeds");
    assert_eq!(rotated.token, replacement);
    assert_eq!(rotated.user_id, user_id);

    assert!(tokens.get_by_id(old.token, now).await.unwrap().is_none());
    assert!(tokens.get_by_id(replacement, now).await.unwrap().is_some());

    let again = tokens
        .rotate(old.token, now, Uuid::new_v4(), now + Duration::days(1))
        .await
        .unwrap();
    assert!(again.is_none());
}

#[actix_rt::test]
#[ignore]
async fn test_rotate_of_expired_token_writes_nothing() {
    let Some(pool) = pool().await else { return };
    let user_id = seeded_user(&pool).await;
    let tokens = PgRefreshTokenStore::new(pool.clone());
    let now = Utc::now();

    let expired = RefreshToken::new(user_id, now - Duration::minutes(1), now - Duration::days(1));
    tokens.create(&expired).await.unwrap();

    let replacement = Uuid::new_v4();
    let rotated = tokens
        .rotate(expired.token, now, replacement, now + Duration::days(1))
        .await
        .unwrap();
    assert!(rotated.is_none());

    // The expired row is still stored but reads as absent; no replacement exists.
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE token = $1")
        .bind(expired.token)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert!(tokens.get_by_id(expired.token, now).await.unwrap().is_none());
    assert!(tokens.get_by_id(replacement, now).await.unwrap().is_none());

    assert_eq!(tokens.purge_expired(user_id, now).await.unwrap(), 1);
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE token = $1")
        .bind(expired.token)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[actix_rt::test]
#[ignore]
async fn test_concurrent_rotations_have_one_winner() {
    let Some(pool) = pool().await else { return };
    let user_id = seeded_user(&pool).await;
    let tokens = PgRefreshTokenStore::new(pool.clone());
    let now = Utc::now();

    let old = RefreshToken::new(user_id, now + Duration::days(1), now);
    tokens.create(&old).await.unwrap();

    let attempts = (0..8).map(|_| {
        let tokens = tokens.clone();
        tokio::spawn(async move {
            tokens
                .rotate(old.token, now, Uuid::new_v4(), now + Duration::days(1))
                .await
        })
    });
    let results = join_all(attempts).await;

    let winners = results
        .into_iter()
        .map(|joined| joined.expect("task completes").expect("rotate succeeds"))
        .filter(Option::is_some)
        .count();
    assert_eq!(winners, 1);

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
