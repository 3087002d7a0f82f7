//! Requires a Docker daemon: `cargo test -p shorturl-storage -- --ignored`.

use shorturl_storage::{NewUrlMapping, PostgresRepository, Repository, ShortToken, StorageError};
use shorturl_test_infra::postgres::{PostgresConfig, PostgresServer};

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let pool = postgres.connect().await.expect("connect postgres");

        let repo = PostgresRepository::new(pool);
        repo.migrate().await.expect("create schema");

        Self {
            _postgres: postgres,
            repo,
        }
    }

    async fn count_rows(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM short_urls")
            .fetch_one(self.repo.pool())
            .await
            .expect("count rows")
    }
}

fn mapping(correlation_id: &str, url: &str, token: &str) -> NewUrlMapping {
    NewUrlMapping::new(correlation_id, url, token)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn add_and_get_url() {
    let fixture = Fixture::start().await;

    let token = fixture
        .repo
        .add_url(mapping("c1", "http://yandex.ru", "4rSPg8ap"))
        .await
        .unwrap();
    assert_eq!(token.as_str(), "4rSPg8ap");

    let got = fixture.repo.get_url(&token).await.unwrap().unwrap();
    assert_eq!(got.original_url, "http://yandex.ru");
    assert_eq!(got.correlation_id, "c1");
    assert!(!got.deleted);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn add_existing_url_returns_stored_token() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(mapping("c1", "http://yandex.ru", "first"))
        .await
        .unwrap();
    let token = fixture
        .repo
        .add_url(mapping("c2", "http://yandex.ru", "second"))
        .await
        .unwrap();

    assert_eq!(token.as_str(), "first");
    assert_eq!(fixture.count_rows().await, 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn get_unknown_token_returns_none() {
    let fixture = Fixture::start().await;

    let got = fixture
        .repo
        .get_url(&ShortToken::new("AAAAAAAAAA"))
        .await
        .unwrap();

    assert!(got.is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn batch_preserves_order_and_reuses_existing() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .add_url(mapping("old", "http://ya.ru", "edVPg3ks"))
        .await
        .unwrap();

    let stored = fixture
        .repo
        .add_batch(vec![
            mapping("1", "http://a.example", "aaaa"),
            mapping("2", "http://ya.ru", "ignored"),
            mapping("3", "http://b.example", "bbbb"),
        ])
        .await
        .unwrap();

    let correlation: Vec<_> = stored.iter().map(|m| m.correlation_id.as_str()).collect();
    let tokens: Vec<_> = stored.iter().map(|m| m.short_url.as_str()).collect();
    assert_eq!(correlation, ["1", "2", "3"]);
    assert_eq!(tokens, ["aaaa", "edVPg3ks", "bbbb"]);
    assert_eq!(fixture.count_rows().await, 3);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn failing_row_rolls_back_whole_batch() {
    let fixture = Fixture::start().await;

    // Item 2 reuses item 1's token for a different URL.
    let err = fixture
        .repo
        .add_batch(vec![
            mapping("1", "http://a.example", "dup"),
            mapping("2", "http://b.example", "dup"),
            mapping("3", "http://c.example", "cccc"),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Query(_)));
    assert_eq!(fixture.count_rows().await, 0);
    assert!(fixture
        .repo
        .get_url(&ShortToken::new("dup"))
        .await
        .unwrap()
        .is_none());
}
