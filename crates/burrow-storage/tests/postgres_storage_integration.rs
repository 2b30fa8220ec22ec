//! These tests start a Postgres container and need a reachable Docker
//! daemon. Run them with `cargo test -p burrow-storage -- --ignored`.

use std::time::Duration;

use burrow_core::{DeletionRequest, NewUrl, OwnedUrl, OwnerId, ServiceStats, ShortCode};
use burrow_storage::{PostgresStorage, ReadStorage, Storage, StorageError};
use burrow_test_infra::postgres::{PostgresConfig, PostgresServer};
use sqlx::postgres::PgPoolOptions;

struct Fixture {
    _postgres: PostgresServer,
    storage: PostgresStorage,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = connect_with_retry(&url).await;

        let storage = PostgresStorage::new(pool);
        storage.init().await.expect("create schema");

        Self {
            _postgres: postgres,
            storage,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn owner(value: &str) -> OwnerId {
    OwnerId::new(value).unwrap()
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn save_then_get_returns_original_url() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .save_url("http://example.com/a", &code("Ab3dE9"), &owner("u1"))
        .await
        .unwrap();

    let url = fixture.storage.get_url(&code("Ab3dE9")).await.unwrap();
    assert_eq!(url, "http://example.com/a");
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn init_is_idempotent() {
    let fixture = Fixture::start().await;

    fixture.storage.init().await.unwrap();
    fixture.storage.health_check().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn duplicate_original_url_conflicts_and_resolves_to_first_code() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .save_url("https://example.com", &code("first1"), &owner("u1"))
        .await
        .unwrap();

    let err = fixture
        .storage
        .save_url("https://example.com", &code("second"), &owner("u2"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    let existing = fixture
        .storage
        .short_code_for("https://example.com")
        .await
        .unwrap();
    assert_eq!(existing, code("first1"));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn taken_short_code_is_a_collision() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .save_url("https://one.example", &code("abc123"), &owner("u1"))
        .await
        .unwrap();

    let err = fixture
        .storage
        .save_url("https://two.example", &code("abc123"), &owner("u1"))
        .await
        .unwrap_err();
    assert_eq!(err, StorageError::CodeCollision("abc123".to_string()));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn unknown_code_is_not_found() {
    let fixture = Fixture::start().await;

    let err = fixture.storage.get_url(&code("nope")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn soft_delete_is_scoped_by_owner() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .save_url("http://example.com/a", &code("Ab3dE9"), &owner("u1"))
        .await
        .unwrap();
    fixture
        .storage
        .save_url("http://example.com/b", &code("Zz9yX8"), &owner("u2"))
        .await
        .unwrap();

    fixture
        .storage
        .soft_delete(&[
            DeletionRequest::new(owner("u1"), vec![code("Ab3dE9"), code("Zz9yX8")]),
            DeletionRequest::new(owner("u1"), vec![code("Ab3dE9")]),
        ])
        .await
        .unwrap();

    assert!(matches!(
        fixture.storage.get_url(&code("Ab3dE9")).await,
        Err(StorageError::Gone(_))
    ));
    assert_eq!(
        fixture.storage.get_url(&code("Zz9yX8")).await.unwrap(),
        "http://example.com/b"
    );
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn bulk_save_inserts_all_rows() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .bulk_save_urls(
            &[
                NewUrl {
                    short_code: code("first1"),
                    original_url: "https://one.example".to_string(),
                },
                NewUrl {
                    short_code: code("second"),
                    original_url: "https://two.example".to_string(),
                },
            ],
            &owner("u1"),
        )
        .await
        .unwrap();

    assert_eq!(
        fixture.storage.get_url(&code("first1")).await.unwrap(),
        "https://one.example"
    );
    assert_eq!(
        fixture.storage.get_url(&code("second")).await.unwrap(),
        "https://two.example"
    );
    assert_eq!(
        fixture
            .storage
            .list_urls_for_owner(&owner("u1"))
            .await
            .unwrap(),
        vec![
            OwnedUrl {
                short_code: code("first1"),
                original_url: "https://one.example".to_string(),
            },
            OwnedUrl {
                short_code: code("second"),
                original_url: "https://two.example".to_string(),
            },
        ]
    );
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn bulk_save_rolls_back_on_conflict() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .save_url("https://taken.example", &code("taken1"), &owner("u1"))
        .await
        .unwrap();

    let err = fixture
        .storage
        .bulk_save_urls(
            &[
                NewUrl {
                    short_code: code("fresh1"),
                    original_url: "https://fresh.example".to_string(),
                },
                NewUrl {
                    short_code: code("fresh2"),
                    original_url: "https://taken.example".to_string(),
                },
            ],
            &owner("u1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    assert!(matches!(
        fixture.storage.get_url(&code("fresh1")).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn list_for_unknown_owner_is_empty() {
    let fixture = Fixture::start().await;

    let listed = fixture
        .storage
        .list_urls_for_owner(&owner("nobody"))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn stats_count_active_urls_and_owners() {
    let fixture = Fixture::start().await;

    fixture
        .storage
        .save_url("https://one.example", &code("one111"), &owner("u1"))
        .await
        .unwrap();
    fixture
        .storage
        .save_url("https://two.example", &code("two222"), &owner("u2"))
        .await
        .unwrap();
    fixture
        .storage
        .soft_delete(&[DeletionRequest::new(owner("u1"), vec![code("one111")])])
        .await
        .unwrap();

    assert_eq!(
        fixture.storage.stats().await.unwrap(),
        ServiceStats { urls: 1, users: 2 }
    );
}
